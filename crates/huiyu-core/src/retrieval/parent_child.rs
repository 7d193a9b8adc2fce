//! Small-to-big retrieval: match fine child chunks, return their parents

use super::Retriever;
use crate::db::Database;
use crate::error::{HuiyuError, Result};
use crate::llm::Embedder;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Separator between parent passages in the returned context
pub const PASSAGE_SEPARATOR: &str = "\n\n";

/// Retriever over the parent/child chunk index
pub struct ParentChildRetriever {
    db: Arc<Mutex<Database>>,
    embedder: Arc<dyn Embedder>,
    top_k: usize,
}

impl ParentChildRetriever {
    pub fn new(db: Arc<Mutex<Database>>, embedder: Arc<dyn Embedder>, top_k: usize) -> Self {
        Self {
            db,
            embedder,
            top_k: top_k.max(1),
        }
    }

    /// Resolve the top-k children to distinct parent passages in rank order
    fn lookup(&self, embedding: &[f32]) -> Result<Vec<String>> {
        let db = self
            .db
            .lock()
            .map_err(|_| HuiyuError::Retrieval("Database lock poisoned".to_string()))?;

        let matches = db.search_child_chunks(embedding, self.embedder.model_name(), self.top_k)?;

        let mut seen = HashSet::new();
        let mut passages = Vec::new();
        for m in matches {
            if !seen.insert(m.parent_id) {
                continue;
            }
            if let Some(text) = db.get_parent_text(m.parent_id)? {
                passages.push(text);
            }
        }
        Ok(passages)
    }
}

#[async_trait]
impl Retriever for ParentChildRetriever {
    async fn retrieve(&self, query: &str) -> Result<String> {
        if query.trim().is_empty() {
            return Ok(String::new());
        }

        let embedding = self.embedder.embed(query).await?;
        let passages = self.lookup(&embedding)?;

        tracing::debug!(passages = passages.len(), "Retrieved context");

        Ok(passages.join(PASSAGE_SEPARATOR))
    }
}
