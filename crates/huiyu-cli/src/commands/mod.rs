//! CLI command handlers

pub mod answer;
pub mod ask;
pub mod config;
pub mod history;
pub mod ingest;
pub mod replay;
pub mod status;

use crate::app::OutputFormat;
use anyhow::{Context, Result};
use huiyu_core::{
    Config, Database, HttpEmbedder, LLMClient, Orchestrator, ParentChildRetriever,
    SqliteMemoryStore, VLLMClient,
};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

/// Shared state for one CLI invocation
pub struct AppContext {
    pub db: Arc<Mutex<Database>>,
    pub config: Config,
    pub config_path: PathBuf,
    pub format: OutputFormat,
    pub verbose: bool,
}

impl AppContext {
    pub fn db(&self) -> Result<MutexGuard<'_, Database>> {
        self.db
            .lock()
            .map_err(|_| anyhow::anyhow!("database lock poisoned"))
    }
}

/// Model client and orchestrator wired from config
pub struct Services {
    pub client: Arc<VLLMClient>,
    pub orchestrator: Orchestrator,
}

impl Services {
    pub fn build(ctx: &AppContext) -> Result<Self> {
        let llm = &ctx.config.llm_service;
        let client = Arc::new(
            VLLMClient::new(llm.clone()).context("failed to create language model client")?,
        );
        let dyn_client: Arc<dyn LLMClient> = client.clone();

        let embedder = Arc::new(HttpEmbedder::new(
            dyn_client.clone(),
            llm.embedding_model.clone(),
        ));
        let retriever = Arc::new(ParentChildRetriever::new(
            ctx.db.clone(),
            embedder,
            ctx.config.retrieval.top_k,
        ));
        let memory = Arc::new(SqliteMemoryStore::new(ctx.db.clone()));

        let orchestrator = Orchestrator::new(
            dyn_client,
            retriever,
            memory,
            ctx.config.graph.clone(),
        );

        Ok(Self {
            client,
            orchestrator,
        })
    }

    /// Print gateway counters when running verbose
    pub fn report_metrics(&self, ctx: &AppContext) {
        if ctx.verbose {
            let m = self.client.metrics();
            eprintln!(
                "LLM requests: {} (errors {}, retries {}), avg latency {:.0} ms",
                m.total_requests, m.total_errors, m.total_retries, m.avg_latency_ms
            );
            eprintln!(
                "Embedding cache: {} entries, {:.0}% hit rate",
                m.cache_entries, m.cache_hit_rate
            );
        }
    }
}

/// Join positional words into one query string
pub fn join_words(words: &[String]) -> String {
    words.join(" ").trim().to_string()
}
