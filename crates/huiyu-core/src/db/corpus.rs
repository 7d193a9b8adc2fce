//! Parent/child chunk storage and similarity search

use super::vectors::{bytes_to_embedding, cosine_similarity, embedding_to_bytes};
use super::Database;
use crate::error::Result;
use chrono::Utc;
use rusqlite::params;
use sha2::{Digest, Sha256};
use std::collections::HashSet;

/// Hash content using SHA-256
pub fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Parent chunk with its embedded children, ready to be written
#[derive(Debug, Clone)]
pub struct NewParentChunk {
    pub position: usize,
    pub text: String,
    /// (child text, child embedding) in document order
    pub children: Vec<(String, Vec<f32>)>,
}

/// Child chunk scored against a query embedding
#[derive(Debug, Clone, PartialEq)]
pub struct ChildChunkMatch {
    pub child_id: i64,
    pub parent_id: i64,
    pub score: f32,
}

impl Database {
    /// Content hash recorded for an indexed corpus file
    pub fn get_document_hash(&self, path: &str) -> Result<Option<String>> {
        let result = self.conn.query_row(
            "SELECT hash FROM corpus_documents WHERE path = ?1",
            params![path],
            |row| row.get(0),
        );
        match result {
            Ok(hash) => Ok(Some(hash)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Replace a corpus file and all of its chunks atomically
    pub fn replace_document(
        &self,
        path: &str,
        hash: &str,
        char_count: usize,
        model: &str,
        parents: &[NewParentChunk],
    ) -> Result<()> {
        let now = Utc::now().to_rfc3339();

        self.conn.execute("BEGIN IMMEDIATE", [])?;
        let result = (|| {
            self.conn
                .execute("DELETE FROM corpus_documents WHERE path = ?1", params![path])?;
            self.conn.execute(
                "INSERT INTO corpus_documents (path, hash, char_count, indexed_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![path, hash, char_count as i64, now],
            )?;
            let document_id = self.conn.last_insert_rowid();

            for (seq, parent) in parents.iter().enumerate() {
                self.conn.execute(
                    "INSERT INTO parent_chunks (document_id, seq, pos, text)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![document_id, seq as i64, parent.position as i64, parent.text],
                )?;
                let parent_id = self.conn.last_insert_rowid();

                for (child_seq, (text, embedding)) in parent.children.iter().enumerate() {
                    self.conn.execute(
                        "INSERT INTO child_chunks (parent_id, seq, text, model, embedding)
                         VALUES (?1, ?2, ?3, ?4, ?5)",
                        params![
                            parent_id,
                            child_seq as i64,
                            text,
                            model,
                            embedding_to_bytes(embedding)
                        ],
                    )?;
                }
            }
            Ok(())
        })();

        if result.is_ok() {
            self.conn.execute("COMMIT", [])?;
        } else {
            let _ = self.conn.execute("ROLLBACK", []);
        }
        result
    }

    /// Drop indexed files under `prefix` that are no longer part of the corpus
    pub fn prune_documents(&self, prefix: &str, present: &HashSet<String>) -> Result<usize> {
        let mut stmt = self.conn.prepare("SELECT path FROM corpus_documents")?;
        let stale: Vec<String> = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?
            .into_iter()
            .filter(|path| path.starts_with(prefix) && !present.contains(path))
            .collect();

        for path in &stale {
            self.conn
                .execute("DELETE FROM corpus_documents WHERE path = ?1", params![path])?;
        }
        Ok(stale.len())
    }

    /// Score every child chunk of `model` against the query embedding.
    ///
    /// Rows are read in insertion order and sorted with a stable sort, so equal
    /// scores keep index order.
    pub fn search_child_chunks(
        &self,
        query_embedding: &[f32],
        model: &str,
        limit: usize,
    ) -> Result<Vec<ChildChunkMatch>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, parent_id, embedding FROM child_chunks WHERE model = ?1 ORDER BY id",
        )?;

        let mut matches = stmt
            .query_map(params![model], |row| {
                let bytes: Vec<u8> = row.get(2)?;
                Ok(ChildChunkMatch {
                    child_id: row.get(0)?,
                    parent_id: row.get(1)?,
                    score: cosine_similarity(query_embedding, &bytes_to_embedding(&bytes)),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches.truncate(limit);

        Ok(matches)
    }

    pub fn get_parent_text(&self, parent_id: i64) -> Result<Option<String>> {
        let result = self.conn.query_row(
            "SELECT text FROM parent_chunks WHERE id = ?1",
            params![parent_id],
            |row| row.get(0),
        );
        match result {
            Ok(text) => Ok(Some(text)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parent(text: &str, children: &[(&str, Vec<f32>)]) -> NewParentChunk {
        NewParentChunk {
            position: 0,
            text: text.to_string(),
            children: children
                .iter()
                .map(|(t, e)| (t.to_string(), e.clone()))
                .collect(),
        }
    }

    fn setup() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        db
    }

    #[test]
    fn test_hash_content() {
        let hash = hash_content("诸行无常");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hash_content("诸行无常"));
    }

    #[test]
    fn test_replace_document_and_search() {
        let db = setup();
        db.replace_document(
            "a.txt",
            "h1",
            10,
            "m",
            &[
                parent("parent one", &[("c1", vec![1.0, 0.0]), ("c2", vec![0.0, 1.0])]),
                parent("parent two", &[("c3", vec![0.7, 0.7])]),
            ],
        )
        .unwrap();

        assert_eq!(db.get_document_hash("a.txt").unwrap().as_deref(), Some("h1"));

        let matches = db.search_child_chunks(&[1.0, 0.0], "m", 2).unwrap();
        assert_eq!(matches.len(), 2);
        let first_parent = db.get_parent_text(matches[0].parent_id).unwrap();
        let second_parent = db.get_parent_text(matches[1].parent_id).unwrap();
        assert_eq!(first_parent.as_deref(), Some("parent one"));
        assert_eq!(second_parent.as_deref(), Some("parent two"));
    }

    #[test]
    fn test_ties_keep_index_order() {
        let db = setup();
        db.replace_document(
            "a.txt",
            "h",
            1,
            "m",
            &[
                parent("p1", &[("c1", vec![0.6, 0.8])]),
                parent("p2", &[("c2", vec![0.6, 0.8])]),
                parent("p3", &[("c3", vec![0.6, 0.8])]),
            ],
        )
        .unwrap();

        let matches = db.search_child_chunks(&[1.0, 0.0], "m", 3).unwrap();
        let ids: Vec<i64> = matches.iter().map(|m| m.child_id).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn test_replace_drops_old_chunks() {
        let db = setup();
        db.replace_document("a.txt", "h1", 1, "m", &[parent("old", &[("c", vec![1.0])])])
            .unwrap();
        db.replace_document("a.txt", "h2", 1, "m", &[parent("new", &[("c", vec![1.0])])])
            .unwrap();

        let matches = db.search_child_chunks(&[1.0], "m", 10).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(
            db.get_parent_text(matches[0].parent_id).unwrap().as_deref(),
            Some("new")
        );
    }

    #[test]
    fn test_prune_documents() {
        let db = setup();
        db.replace_document("a.txt", "h", 1, "m", &[parent("a", &[("c", vec![1.0])])])
            .unwrap();
        db.replace_document("b.txt", "h", 1, "m", &[parent("b", &[("c", vec![1.0])])])
            .unwrap();

        let present: HashSet<String> = ["a.txt".to_string()].into_iter().collect();
        assert_eq!(db.prune_documents("other/", &present).unwrap(), 0);
        assert_eq!(db.prune_documents("", &present).unwrap(), 1);
        assert!(db.get_document_hash("b.txt").unwrap().is_none());
        assert_eq!(db.search_child_chunks(&[1.0], "m", 10).unwrap().len(), 1);
    }

    #[test]
    fn test_search_filters_by_model() {
        let db = setup();
        db.replace_document("a.txt", "h", 1, "other", &[parent("a", &[("c", vec![1.0])])])
            .unwrap();
        assert!(db.search_child_chunks(&[1.0], "m", 10).unwrap().is_empty());
    }
}
