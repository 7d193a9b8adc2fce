//! Conversation history commands

use super::AppContext;
use crate::app::{HistoryAction, HistoryArgs, OutputFormat};
use crate::output::terminal;
use anyhow::Result;
use chrono::Local;
use huiyu_core::{HuiyuError, MemoryStore, SqliteMemoryStore};

pub fn run(args: HistoryArgs, ctx: &AppContext) -> Result<()> {
    let store = SqliteMemoryStore::new(ctx.db.clone());

    match args.action {
        HistoryAction::Show { thread } => {
            let record = store
                .load(&thread)?
                .ok_or_else(|| HuiyuError::ThreadNotFound(thread.clone()))?;

            match ctx.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&record)?),
                OutputFormat::Cli => {
                    println!(
                        "Thread {} ({} turns, updated {})",
                        record.thread_id,
                        record.turn_count,
                        record
                            .updated_at
                            .with_timezone(&Local)
                            .format("%Y-%m-%d %H:%M:%S")
                    );
                    println!();
                    terminal::print_history(&record.snapshot.chat_history)?;
                }
            }
        }
        HistoryAction::List => {
            let records = store.list()?;
            match ctx.format {
                OutputFormat::Json => {
                    let summary: Vec<_> = records
                        .iter()
                        .map(|r| {
                            serde_json::json!({
                                "thread_id": r.thread_id,
                                "turn_count": r.turn_count,
                                "updated_at": r.updated_at,
                            })
                        })
                        .collect();
                    println!("{}", serde_json::to_string_pretty(&summary)?);
                }
                OutputFormat::Cli => {
                    if records.is_empty() {
                        println!("No conversations");
                    }
                    for r in &records {
                        println!(
                            "{:<24} {:>4} turns  {}",
                            r.thread_id,
                            r.turn_count,
                            r.updated_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
                        );
                    }
                }
            }
        }
        HistoryAction::Clear { thread } => {
            if !store.delete(&thread)? {
                return Err(HuiyuError::ThreadNotFound(thread).into());
            }
            println!("Cleared thread {}", thread);
        }
    }
    Ok(())
}
