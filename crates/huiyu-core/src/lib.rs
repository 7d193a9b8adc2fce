//! Huiyu Core Library
//!
//! Retrieval-grounded scripture dialogue for the "慧语" persona.
//!
//! # Features
//! - Turn graph with intent routing, contextualization and HyDE rewriting
//! - Relevance grading with a bounded rewrite/retrieve/grade loop
//! - Graceful decline when the corpus has nothing relevant
//! - Per-thread conversation memory (in-memory or SQLite)
//! - Parent/child chunk index with cosine similarity retrieval

pub mod config;
pub mod db;
pub mod error;
pub mod graph;
pub mod index;
pub mod llm;
pub mod memory;
pub mod retrieval;
pub mod text;

pub use config::{Config, GraphConfig, LLMServiceConfig, RetrievalConfig};
pub use db::Database;
pub use error::{Error, HuiyuError, Result};
pub use graph::{
    Grade, GraphNode, Orchestrator, Role, Route, TurnOutcome, TurnState, Utterance,
    FALLBACK_CONTEXT,
};
pub use index::{ingest_corpus, IngestProgress, IngestStats};
pub use llm::{
    ChatMessage, CompletionOptions, Embedder, HttpEmbedder, LLMClient, MetricsSnapshot,
    VLLMClient,
};
pub use memory::{ConversationRecord, InMemoryStore, MemoryStore, SqliteMemoryStore};
pub use retrieval::{ParentChildRetriever, Retriever};

/// Default cache directory name
pub const CACHE_DIR_NAME: &str = "huiyu";

/// Default config directory name
pub const CONFIG_DIR_NAME: &str = "huiyu";
