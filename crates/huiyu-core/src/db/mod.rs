//! Database layer for huiyu
//!
//! Provides SQLite-based storage with:
//! - Conversation records keyed by thread identifier
//! - Parent/child chunk index with embeddings stored as BLOBs

mod conversations;
mod corpus;
mod schema;
mod stats;
pub mod vectors;

pub use conversations::StoredConversation;
pub use corpus::{hash_content, ChildChunkMatch, NewParentChunk};
pub use schema::Database;
pub use stats::DatabaseStats;
use std::path::PathBuf;

impl Database {
    /// Get the default database path
    pub fn default_path() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::CACHE_DIR_NAME)
            .join("huiyu.sqlite")
    }
}
