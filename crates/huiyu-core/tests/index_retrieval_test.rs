//! Corpus ingest and parent/child retrieval against a temporary corpus

use async_trait::async_trait;
use huiyu_core::{
    ingest_corpus, Database, Embedder, IngestProgress, ParentChildRetriever, Result,
    RetrievalConfig, Retriever,
};
use std::fs;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Deterministic embedder: [prajna chars, latin letters, bias]
struct IndicatorEmbedder;

fn indicator(text: &str) -> Vec<f32> {
    let prajna = text.chars().filter(|c| "般若波罗蜜".contains(*c)).count();
    let latin = text.chars().filter(|c| c.is_ascii_alphabetic()).count();
    vec![prajna as f32, latin as f32, 1.0]
}

#[async_trait]
impl Embedder for IndicatorEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(indicator(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| indicator(t)).collect())
    }

    fn dimensions(&self) -> usize {
        3
    }

    fn model_name(&self) -> &str {
        "indicator"
    }
}

const HEART: &str = "观自在菩萨，行深般若波罗蜜多时，照见五蕴皆空，度一切苦厄。\
舍利子，色不异空，空不异色，色即是空，空即是色，受想行识，亦复如是。";
const FOX: &str = "The quick brown fox jumps over the lazy dog. A stitch in time saves nine.";

fn small_chunks() -> RetrievalConfig {
    RetrievalConfig {
        top_k: 1,
        child_chunk_size: 10,
        child_chunk_overlap: 2,
        parent_chunk_size: 40,
        parent_chunk_overlap: 5,
        ..RetrievalConfig::default()
    }
}

fn setup_corpus() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("sutras")).unwrap();
    fs::write(dir.path().join("sutras/heart.txt"), HEART).unwrap();
    fs::write(dir.path().join("fox.txt"), FOX).unwrap();
    fs::write(dir.path().join("README.md"), "not part of the corpus").unwrap();
    dir
}

fn open_db() -> Arc<Mutex<Database>> {
    let db = Database::open_in_memory().unwrap();
    db.initialize().unwrap();
    Arc::new(Mutex::new(db))
}

#[tokio::test]
async fn test_ingest_is_incremental() {
    let corpus = setup_corpus();
    let db = open_db();
    let config = small_chunks();

    let stats = ingest_corpus(&db, &IndicatorEmbedder, &config, corpus.path(), false, None)
        .await
        .unwrap();
    assert_eq!(stats.scanned_files, 2);
    assert_eq!(stats.indexed_files, 2);
    assert!(stats.parent_chunks >= 3);
    assert!(stats.child_chunks > stats.parent_chunks);

    let again = ingest_corpus(&db, &IndicatorEmbedder, &config, corpus.path(), false, None)
        .await
        .unwrap();
    assert_eq!(again.indexed_files, 0);
    assert_eq!(again.skipped_files, 2);

    fs::write(corpus.path().join("fox.txt"), "Changed text about foxes.").unwrap();
    let changed = ingest_corpus(&db, &IndicatorEmbedder, &config, corpus.path(), false, None)
        .await
        .unwrap();
    assert_eq!(changed.indexed_files, 1);
    assert_eq!(changed.skipped_files, 1);

    let forced = ingest_corpus(&db, &IndicatorEmbedder, &config, corpus.path(), true, None)
        .await
        .unwrap();
    assert_eq!(forced.indexed_files, 2);

    fs::remove_file(corpus.path().join("fox.txt")).unwrap();
    let pruned = ingest_corpus(&db, &IndicatorEmbedder, &config, corpus.path(), false, None)
        .await
        .unwrap();
    assert_eq!(pruned.removed_files, 1);

    let db_stats = db.lock().unwrap().get_stats().unwrap();
    assert_eq!(db_stats.document_count, 1);
    assert_eq!(db_stats.embedding_models, vec!["indicator".to_string()]);
}

#[tokio::test]
async fn test_progress_reports_every_file() {
    let corpus = setup_corpus();
    let db = open_db();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();

    ingest_corpus(
        &db,
        &IndicatorEmbedder,
        &small_chunks(),
        corpus.path(),
        false,
        Some(Box::new(move |p: IngestProgress| {
            sink.lock().unwrap().push((p.processed_files, p.total_files))
        })),
    )
    .await
    .unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.first(), Some(&(0, 2)));
    assert_eq!(seen.last(), Some(&(2, 2)));
}

#[tokio::test]
async fn test_retrieves_parent_of_best_child() {
    let corpus = setup_corpus();
    let db = open_db();
    ingest_corpus(&db, &IndicatorEmbedder, &small_chunks(), corpus.path(), false, None)
        .await
        .unwrap();

    let retriever =
        ParentChildRetriever::new(db, Arc::new(IndicatorEmbedder), 1);

    let context = retriever.retrieve("般若波罗蜜").await.unwrap();
    assert!(context.contains("般若波罗蜜"));
    // Parents are wider than the matched child
    assert!(context.chars().count() > 10);

    let latin = retriever.retrieve("fox").await.unwrap();
    assert!(latin.chars().any(|c| c.is_ascii_alphabetic()));
    assert!(!latin.contains('空'));
}

#[tokio::test]
async fn test_retrieval_is_deterministic() {
    let corpus = setup_corpus();
    let db = open_db();
    ingest_corpus(&db, &IndicatorEmbedder, &small_chunks(), corpus.path(), false, None)
        .await
        .unwrap();

    let retriever =
        ParentChildRetriever::new(db, Arc::new(IndicatorEmbedder), 3);
    let first = retriever.retrieve("色即是空").await.unwrap();
    let second = retriever.retrieve("色即是空").await.unwrap();
    assert_eq!(first, second);
    assert!(!first.is_empty());
}

#[tokio::test]
async fn test_traditional_corpus_is_indexed_simplified() {
    let corpus = TempDir::new().unwrap();
    fs::write(
        corpus.path().join("heart_trad.txt"),
        "觀自在菩薩，行深般若波羅蜜多時，照見五蘊皆空。",
    )
    .unwrap();
    let db = open_db();
    ingest_corpus(&db, &IndicatorEmbedder, &small_chunks(), corpus.path(), false, None)
        .await
        .unwrap();

    let retriever = ParentChildRetriever::new(db, Arc::new(IndicatorEmbedder), 1);
    let context = retriever.retrieve("般若波罗蜜").await.unwrap();
    assert!(context.contains("观自在菩萨"));
    assert!(!context.contains("觀"));
}
