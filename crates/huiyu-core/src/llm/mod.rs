//! LLM integration
//!
//! Provides the language model gateway used by every reasoning stage and the
//! embedding services used by the index:
//! - OpenAI-compatible chat completions with bounded retry
//! - Embedding generation via external services (TEI, vLLM, OpenAI, etc.)

mod cache;
mod client;
mod http_embedder;
mod traits;

pub use client::{APIMetrics, ChatMessage, CompletionOptions, LLMClient, MetricsSnapshot, VLLMClient};
pub use http_embedder::HttpEmbedder;
pub use traits::*;
