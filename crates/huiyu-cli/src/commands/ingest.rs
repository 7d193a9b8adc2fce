//! Ingest command

use super::AppContext;
use crate::app::{IngestArgs, OutputFormat};
use crate::progress::ProgressReporter;
use anyhow::{anyhow, Result};
use huiyu_core::{ingest_corpus, HttpEmbedder, IngestProgress};
use std::sync::Mutex;

pub async fn run(args: IngestArgs, ctx: &AppContext) -> Result<()> {
    let root = args
        .path
        .or_else(|| ctx.config.corpus_path.clone())
        .ok_or_else(|| anyhow!("No corpus path given and corpus_path is not configured"))?;

    let embedder = HttpEmbedder::from_config(ctx.config.llm_service.clone())?;
    let reporter = Mutex::new(ProgressReporter::new(0));
    let show_progress = ctx.format == OutputFormat::Cli;

    let stats = ingest_corpus(
        &ctx.db,
        &embedder,
        &ctx.config.retrieval,
        &root,
        args.force,
        Some(Box::new(move |p: IngestProgress| {
            if !show_progress {
                return;
            }
            if let Ok(mut reporter) = reporter.lock() {
                reporter.update(p.processed_files, p.total_files);
                if p.current_file.is_empty() {
                    reporter.finish();
                } else {
                    reporter.set_message(&format!("Indexing {}", p.current_file));
                }
            }
        })),
    )
    .await?;

    match ctx.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
        OutputFormat::Cli => {
            println!("Ingest complete:");
            println!("  Files:    {} scanned", stats.scanned_files);
            println!("  Indexed:  {}", stats.indexed_files);
            println!("  Skipped:  {} (unchanged)", stats.skipped_files);
            println!("  Removed:  {}", stats.removed_files);
            println!(
                "  Chunks:   {} parents, {} children",
                stats.parent_chunks, stats.child_chunks
            );
        }
    }
    Ok(())
}
