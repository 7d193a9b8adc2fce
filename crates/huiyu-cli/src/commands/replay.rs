//! Replay a question set through the single-turn path

use super::{AppContext, Services};
use crate::app::ReplayArgs;
use anyhow::{anyhow, Context, Result};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ReplayRow {
    user_input: String,
    retrieved_contexts: String,
    response: String,
    reference: String,
}

pub async fn run(args: ReplayArgs, ctx: &AppContext) -> Result<()> {
    let services = Services::build(ctx)?;

    let mut reader = csv::Reader::from_path(&args.input)
        .with_context(|| format!("failed to open {}", args.input.display()))?;
    let headers = reader.headers()?.clone();
    let question_idx = headers
        .iter()
        .position(|h| h == args.column)
        .ok_or_else(|| anyhow!("Column '{}' not found in {}", args.column, args.input.display()))?;
    let reference_idx = headers.iter().position(|h| h == "reference");

    let mut writer = csv::Writer::from_path(&args.output)
        .with_context(|| format!("failed to create {}", args.output.display()))?;

    let mut total = 0;
    let mut failed = 0;

    for record in reader.records() {
        let record = record?;
        let question = record.get(question_idx).unwrap_or_default().trim().to_string();
        if question.is_empty() {
            continue;
        }
        total += 1;

        let context = services.orchestrator.retrieve_context(&question).await;

        let response = match services.orchestrator.answer(&question, &context, &[]).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!("No answer for '{}': {}", question, e);
                failed += 1;
                String::new()
            }
        };

        eprint!("\rAnswered {} questions", total);

        writer.serialize(ReplayRow {
            user_input: question,
            retrieved_contexts: context,
            response,
            reference: reference_idx
                .and_then(|i| record.get(i))
                .unwrap_or_default()
                .to_string(),
        })?;
    }
    writer.flush()?;

    eprintln!();
    println!(
        "Replayed {} questions ({} without answer) -> {}",
        total,
        failed,
        args.output.display()
    );

    services.report_metrics(ctx);
    Ok(())
}
