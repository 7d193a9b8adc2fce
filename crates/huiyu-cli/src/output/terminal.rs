//! Terminal output with persona colouring

use huiyu_core::{Role, Utterance};
use std::io::{self, Write};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

fn color_choice() -> ColorChoice {
    if std::env::var_os("NO_COLOR").is_some() {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    }
}

/// Print the master's reply to stdout
pub fn print_answer(answer: &str) -> io::Result<()> {
    let mut stdout = StandardStream::stdout(color_choice());
    stdout.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)).set_bold(true))?;
    write!(stdout, "法师: ")?;
    stdout.reset()?;
    writeln!(stdout, "{}", answer)
}

/// Print the apology for a turn that produced no answer to stderr
pub fn print_apology(message: &str) -> io::Result<()> {
    let mut stderr = StandardStream::stderr(color_choice());
    stderr.set_color(ColorSpec::new().set_fg(Some(Color::Red)))?;
    writeln!(stderr, "{}", message)?;
    stderr.reset()
}

/// Print a history transcript, one utterance per line
pub fn print_history(history: &[Utterance]) -> io::Result<()> {
    let mut stdout = StandardStream::stdout(color_choice());
    for utterance in history {
        let color = match utterance.role {
            Role::User => Color::Cyan,
            Role::Assistant => Color::Yellow,
        };
        stdout.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true))?;
        write!(stdout, "{}: ", utterance.role.label())?;
        stdout.reset()?;
        writeln!(stdout, "{}", utterance.content)?;
    }
    Ok(())
}
