//! Graph stages
//!
//! Each stage reads the turn state, makes at most one model or retriever call
//! and writes its result back. Classification stages never fail; they resolve
//! errors to a fixed default.

mod answerer;
mod contextualizer;
mod fallback;
mod grader;
mod rewriter;
mod router;

pub use answerer::{strip_framing, truncate_answer, Answerer, SILENT_ANSWER};
pub use contextualizer::{clean_rewrite, Contextualizer};
pub use fallback::{apply_fallback, FALLBACK_CONTEXT};
pub use grader::RelevanceGrader;
pub use rewriter::HydeRewriter;
pub use router::IntentRouter;

use crate::error::Result;
use crate::llm::{ChatMessage, CompletionOptions, LLMClient};

/// Temperature for classification and rewriting-by-rule
pub(crate) const CLASSIFY_TEMPERATURE: f32 = 0.1;

/// Send a single user prompt and return the trimmed reply
pub(crate) async fn ask(
    client: &dyn LLMClient,
    prompt: String,
    options: CompletionOptions,
) -> Result<String> {
    let reply = client
        .chat_completion(vec![ChatMessage::user(prompt)], &options)
        .await?;
    Ok(reply.trim().to_string())
}
