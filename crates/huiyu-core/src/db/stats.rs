//! Database statistics

use super::Database;
use crate::error::Result;

/// Database stats
#[derive(Debug, Clone, serde::Serialize)]
pub struct DatabaseStats {
    pub document_count: usize,
    pub parent_chunk_count: usize,
    pub child_chunk_count: usize,
    pub conversation_count: usize,
    pub embedding_models: Vec<String>,
}

impl Database {
    /// Get database statistics
    pub fn get_stats(&self) -> Result<DatabaseStats> {
        let count = |sql: &str| -> Result<usize> {
            let n: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
            Ok(n as usize)
        };

        let mut stmt = self
            .conn
            .prepare("SELECT model FROM model_metadata ORDER BY model")?;
        let embedding_models = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(DatabaseStats {
            document_count: count("SELECT COUNT(*) FROM corpus_documents")?,
            parent_chunk_count: count("SELECT COUNT(*) FROM parent_chunks")?,
            child_chunk_count: count("SELECT COUNT(*) FROM child_chunks")?,
            conversation_count: count("SELECT COUNT(*) FROM conversations")?,
            embedding_models,
        })
    }

    /// Vacuum the database
    pub fn vacuum(&self) -> Result<()> {
        self.conn.execute("VACUUM", [])?;
        Ok(())
    }
}
