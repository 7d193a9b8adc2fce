//! Corpus ingestion: scan, chunk, embed and store parent/child chunks

use super::chunker::chunk_parent_child;
use super::scanner::{scan_files, ScanOptions};
use crate::config::RetrievalConfig;
use crate::db::{hash_content, Database, NewParentChunk};
use crate::error::{HuiyuError, Result};
use crate::llm::Embedder;
use crate::text::to_simplified;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const BATCH_SIZE: usize = 32;
const CONCURRENT_BATCHES: usize = 4;

/// Ingest progress
#[derive(Debug, Clone)]
pub struct IngestProgress {
    pub total_files: usize,
    pub processed_files: usize,
    pub current_file: String,
}

/// Ingest statistics
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct IngestStats {
    pub scanned_files: usize,
    pub indexed_files: usize,
    pub skipped_files: usize,
    pub removed_files: usize,
    pub parent_chunks: usize,
    pub child_chunks: usize,
}

/// Index every corpus file under `root` that is new or has changed.
///
/// Unchanged files (same path and content hash) are skipped unless `force` is
/// set. Files previously indexed under `root` that no longer exist are removed.
/// The database lock is taken per statement and never held while embedding.
pub async fn ingest_corpus(
    db: &Mutex<Database>,
    embedder: &dyn Embedder,
    config: &RetrievalConfig,
    root: &Path,
    force: bool,
    progress: Option<Box<dyn Fn(IngestProgress) + Send + Sync>>,
) -> Result<IngestStats> {
    if !root.exists() {
        return Err(HuiyuError::InvalidInput(format!(
            "Corpus path does not exist: {}",
            root.display()
        )));
    }

    let root = root.canonicalize()?;
    let files = scan_files(&root, &ScanOptions::with_pattern(&config.file_pattern))?;
    let model = embedder.model_name().to_string();

    let mut stats = IngestStats {
        scanned_files: files.len(),
        ..Default::default()
    };
    let mut present = HashSet::new();

    tracing::info!(files = files.len(), root = %root.display(), "Ingesting corpus");

    for (i, file) in files.iter().enumerate() {
        let key = file.path.to_string_lossy().to_string();
        present.insert(key.clone());

        if let Some(ref cb) = progress {
            cb(IngestProgress {
                total_files: files.len(),
                processed_files: i,
                current_file: file.relative_path.clone(),
            });
        }

        let bytes = std::fs::read(&file.path)?;
        let content = String::from_utf8_lossy(&bytes);
        let hash = hash_content(&content);

        let stored_hash = lock(db)?.get_document_hash(&key)?;
        if !force && stored_hash.as_deref() == Some(hash.as_str()) {
            tracing::debug!(file = %file.relative_path, "Unchanged, skipping");
            stats.skipped_files += 1;
            continue;
        }

        let content = to_simplified(&content);
        let parents = chunk_parent_child(
            &content,
            config.parent_chunk_size,
            config.parent_chunk_overlap,
            config.child_chunk_size,
            config.child_chunk_overlap,
        );

        let child_texts: Vec<String> = parents
            .iter()
            .flat_map(|p| p.children.iter().map(|c| c.text.clone()))
            .collect();
        let embeddings = embed_in_batches(embedder, &child_texts).await?;

        if let Some(first) = embeddings.first() {
            let db = lock(db)?;
            if !force && !db.check_model_compatibility(&model, first.len())? {
                return Err(HuiyuError::Index(format!(
                    "Embedding dimensions for model '{}' changed; re-run with --force",
                    model
                )));
            }
            db.register_model(&model, first.len())?;
        }

        let mut embeddings = embeddings.into_iter();
        let new_parents: Vec<NewParentChunk> = parents
            .into_iter()
            .map(|parent| NewParentChunk {
                position: parent.chunk.position,
                text: parent.chunk.text,
                children: parent
                    .children
                    .into_iter()
                    .zip(embeddings.by_ref())
                    .map(|(child, embedding)| (child.text, embedding))
                    .collect(),
            })
            .collect();

        stats.parent_chunks += new_parents.len();
        stats.child_chunks += child_texts.len();

        lock(db)?.replace_document(&key, &hash, content.chars().count(), &model, &new_parents)?;
        stats.indexed_files += 1;

        tracing::debug!(
            file = %file.relative_path,
            parents = new_parents.len(),
            children = child_texts.len(),
            "Indexed"
        );
    }

    if root.is_dir() {
        let prefix = format!("{}{}", root.to_string_lossy(), std::path::MAIN_SEPARATOR);
        let db = lock(db)?;
        stats.removed_files = db.prune_documents(&prefix, &present)?;
        if stats.removed_files > 0 {
            db.vacuum()?;
        }
    }

    if let Some(ref cb) = progress {
        cb(IngestProgress {
            total_files: files.len(),
            processed_files: files.len(),
            current_file: String::new(),
        });
    }

    tracing::info!(
        indexed = stats.indexed_files,
        skipped = stats.skipped_files,
        removed = stats.removed_files,
        "Ingest complete"
    );

    Ok(stats)
}

fn lock(db: &Mutex<Database>) -> Result<MutexGuard<'_, Database>> {
    db.lock()
        .map_err(|_| HuiyuError::Index("Database lock poisoned".to_string()))
}

/// Embed texts in fixed-size batches, several in flight, preserving order
async fn embed_in_batches(embedder: &dyn Embedder, texts: &[String]) -> Result<Vec<Vec<f32>>> {
    let batches: Vec<Vec<Vec<f32>>> = stream::iter(texts.chunks(BATCH_SIZE))
        .map(|batch| async move {
            let embeddings = embedder.embed_batch(batch).await?;
            if embeddings.len() != batch.len() {
                return Err(HuiyuError::Index(format!(
                    "Embedder returned {} vectors for {} texts",
                    embeddings.len(),
                    batch.len()
                )));
            }
            Ok(embeddings)
        })
        .buffered(CONCURRENT_BATCHES)
        .boxed()
        .try_collect()
        .await?;

    Ok(batches.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingEmbedder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for CountingEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(vec![text.chars().count() as f32, 1.0])
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts
                .iter()
                .map(|t| vec![t.chars().count() as f32, 1.0])
                .collect())
        }

        fn dimensions(&self) -> usize {
            2
        }

        fn model_name(&self) -> &str {
            "counting"
        }
    }

    #[tokio::test]
    async fn test_embed_in_batches_preserves_order() {
        let embedder = CountingEmbedder {
            calls: AtomicUsize::new(0),
        };
        let texts: Vec<String> = (1..=70).map(|n| "x".repeat(n)).collect();

        let embeddings = embed_in_batches(&embedder, &texts).await.unwrap();
        assert_eq!(embeddings.len(), 70);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 3);
        for (i, e) in embeddings.iter().enumerate() {
            assert_eq!(e[0], (i + 1) as f32);
        }
    }

    fn open_db() -> Mutex<Database> {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        Mutex::new(db)
    }

    fn assert_send<T: Send>(_: &T) {}

    #[test]
    fn test_ingest_future_is_send() {
        let db = open_db();
        let embedder = CountingEmbedder {
            calls: AtomicUsize::new(0),
        };
        let config = RetrievalConfig::default();
        let future = ingest_corpus(
            &db,
            &embedder,
            &config,
            Path::new("/nonexistent/huiyu/corpus"),
            false,
            None,
        );
        assert_send(&future);
    }

    #[tokio::test]
    async fn test_db_is_unlocked_while_embedding() {
        struct LockCheckingEmbedder<'a> {
            db: &'a Mutex<Database>,
        }

        #[async_trait]
        impl<'a> Embedder for LockCheckingEmbedder<'a> {
            async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
                Ok(vec![1.0])
            }

            async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
                assert!(self.db.try_lock().is_ok(), "database locked during embedding");
                Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
            }

            fn dimensions(&self) -> usize {
                2
            }

            fn model_name(&self) -> &str {
                "lock-check"
            }
        }

        let db = open_db();
        let corpus = tempfile::TempDir::new().unwrap();
        std::fs::write(corpus.path().join("a.txt"), "诸行无常，诸法无我，涅槃寂静。").unwrap();

        let stats = ingest_corpus(
            &db,
            &LockCheckingEmbedder { db: &db },
            &RetrievalConfig::default(),
            corpus.path(),
            false,
            None,
        )
        .await
        .unwrap();
        assert_eq!(stats.indexed_files, 1);
    }

    #[tokio::test]
    async fn test_missing_root_is_invalid_input() {
        let db = open_db();
        let embedder = CountingEmbedder {
            calls: AtomicUsize::new(0),
        };

        let err = ingest_corpus(
            &db,
            &embedder,
            &RetrievalConfig::default(),
            Path::new("/nonexistent/huiyu/corpus"),
            false,
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, HuiyuError::InvalidInput(_)));
    }
}
