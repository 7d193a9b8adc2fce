//! Status command

use super::AppContext;
use crate::app::OutputFormat;
use anyhow::Result;

pub fn run(ctx: &AppContext) -> Result<()> {
    let stats = ctx.db()?.get_stats()?;

    match ctx.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        OutputFormat::Cli => {
            println!("Documents:       {}", stats.document_count);
            println!("Parent chunks:   {}", stats.parent_chunk_count);
            println!("Child chunks:    {}", stats.child_chunk_count);
            println!(
                "Models:          {}",
                if stats.embedding_models.is_empty() {
                    "-".to_string()
                } else {
                    stats.embedding_models.join(", ")
                }
            );
            println!();
            println!("Conversations:   {}", stats.conversation_count);
            println!();
            println!("LLM service:     {}", ctx.config.llm_service.url);
            println!("Chat model:      {}", ctx.config.llm_service.model);
        }
    }
    Ok(())
}
