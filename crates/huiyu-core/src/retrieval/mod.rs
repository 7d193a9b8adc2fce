//! Context retrieval for the turn graph

mod parent_child;

pub use parent_child::ParentChildRetriever;

use crate::error::Result;
use async_trait::async_trait;

/// Source of scripture context for a query.
///
/// Returns the joined passage text, or an empty string when nothing matches.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(&self, query: &str) -> Result<String>;
}
