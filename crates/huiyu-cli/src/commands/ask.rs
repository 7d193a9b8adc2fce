//! Conversational turns: `ask` and `chat`

use super::{join_words, AppContext, Services};
use crate::app::{AskArgs, ChatArgs, OutputFormat};
use crate::output::terminal;
use anyhow::Result;
use huiyu_core::{HuiyuError, TurnOutcome};
use std::io::{self, BufRead, Write};

pub async fn run(args: AskArgs, ctx: &AppContext) -> Result<()> {
    let query = join_words(&args.query);
    let services = Services::build(ctx)?;

    let outcome = services
        .orchestrator
        .invoke(&args.thread, &query, None)
        .await?;

    match ctx.format {
        OutputFormat::Json => {
            let json = turn_json(&args.thread, &outcome, ctx.verbose);
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Cli => terminal::print_answer(&outcome.final_answer)?,
    }

    services.report_metrics(ctx);
    Ok(())
}

/// Answer and history; the graph trace is only included when verbose
fn turn_json(thread: &str, outcome: &TurnOutcome, verbose: bool) -> serde_json::Value {
    let mut json = serde_json::json!({
        "thread_id": thread,
        "final_answer": outcome.final_answer,
        "chat_history": outcome.chat_history,
    });
    if verbose {
        json["trace"] = serde_json::json!({
            "route": outcome.route,
            "loop_step": outcome.loop_step,
            "path": outcome.path,
        });
    }
    json
}

/// Read questions line by line until EOF or an exit word
pub async fn run_chat(args: ChatArgs, ctx: &AppContext) -> Result<()> {
    let services = Services::build(ctx)?;
    let stdin = io::stdin();

    eprintln!("Thread '{}'. Type 'exit' or Ctrl-D to leave.", args.thread);

    loop {
        eprint!("信众> ");
        io::stderr().flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if matches!(query, "exit" | "quit" | "再见") {
            break;
        }

        match services.orchestrator.invoke(&args.thread, query, None).await {
            Ok(outcome) => terminal::print_answer(&outcome.final_answer)?,
            // An unavailable answer ends the turn, not the session
            Err(HuiyuError::AnswerUnavailable) => {
                terminal::print_apology(&HuiyuError::AnswerUnavailable.to_string())?
            }
            Err(e) => return Err(e.into()),
        }
    }

    services.report_metrics(ctx);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use huiyu_core::{GraphNode, Route, Utterance};

    fn outcome() -> TurnOutcome {
        TurnOutcome {
            final_answer: "放下即是。".to_string(),
            chat_history: vec![
                Utterance::user("我很焦虑"),
                Utterance::assistant("放下即是。"),
            ],
            route: Some(Route::Hyde),
            loop_step: 2,
            path: vec![GraphNode::IntentRouter, GraphNode::Answer],
        }
    }

    #[test]
    fn test_turn_json_hides_graph_internals() {
        let json = turn_json("u1", &outcome(), false);
        let text = json.to_string();

        assert_eq!(json["final_answer"], "放下即是。");
        assert_eq!(json["chat_history"].as_array().unwrap().len(), 2);
        assert!(json.get("trace").is_none());
        assert!(!text.contains("loop_step"));
        assert!(!text.contains("hyde"));
        assert!(!text.contains("intent_router"));
    }

    #[test]
    fn test_turn_json_trace_when_verbose() {
        let json = turn_json("u1", &outcome(), true);
        assert_eq!(json["trace"]["route"], "hyde");
        assert_eq!(json["trace"]["loop_step"], 2);
    }
}
