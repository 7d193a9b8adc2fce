//! Single-turn answer command (no history, no memory)

use super::{join_words, AppContext, Services};
use crate::app::{AnswerArgs, OutputFormat};
use crate::output::terminal;
use anyhow::Result;

pub async fn run(args: AnswerArgs, ctx: &AppContext) -> Result<()> {
    let question = join_words(&args.question);
    let services = Services::build(ctx)?;

    let context = match args.context {
        Some(context) => context,
        None => services.orchestrator.retrieve_context(&question).await,
    };

    let answer = services
        .orchestrator
        .answer(&question, &context, &[])
        .await?;

    match ctx.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "question": question,
                    "context": context,
                    "answer": answer,
                }))?
            );
        }
        OutputFormat::Cli => terminal::print_answer(&answer)?,
    }

    services.report_metrics(ctx);
    Ok(())
}
