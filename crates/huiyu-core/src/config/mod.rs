//! Configuration management
//!
//! Everything the graph, the gateway and the index need is carried by an
//! explicit [`Config`] value handed to constructors.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Default corpus directory for `ingest`
    #[serde(default)]
    pub corpus_path: Option<PathBuf>,

    /// LLM service configuration
    #[serde(default)]
    pub llm_service: LLMServiceConfig,

    /// Index and retrieval parameters
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Turn graph parameters
    #[serde(default)]
    pub graph: GraphConfig,
}

/// LLM service configuration for external inference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMServiceConfig {
    /// Base URL of the OpenAI-compatible chat service
    #[serde(default = "default_url")]
    pub url: String,

    /// Model name for chat completions
    #[serde(default = "default_chat_model")]
    pub model: String,

    /// Base URL for embeddings service (can be different from LLM URL)
    #[serde(default)]
    pub embedding_url: Option<String>,

    /// Model name for embeddings
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Embedding dimensions
    #[serde(default)]
    pub embedding_dimensions: Option<usize>,

    /// API key (optional, for authenticated services)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Attempts per gateway call, including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl LLMServiceConfig {
    /// Get the embeddings URL (falls back to main URL if not specified)
    pub fn embeddings_url(&self) -> &str {
        self.embedding_url.as_deref().unwrap_or(&self.url)
    }
}

impl Default for LLMServiceConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            model: default_chat_model(),
            embedding_url: std::env::var("HUIYU_EMBEDDING_URL").ok(),
            embedding_model: default_embedding_model(),
            embedding_dimensions: std::env::var("HUIYU_EMBEDDING_DIMS")
                .ok()
                .and_then(|s| s.parse().ok()),
            api_key: std::env::var("HUIYU_LLM_API_KEY")
                .or_else(|_| std::env::var("OPENAI_API_KEY"))
                .ok(),
            timeout_secs: default_timeout(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_url() -> String {
    std::env::var("HUIYU_LLM_URL").unwrap_or_else(|_| "https://api.deepseek.com".to_string())
}

fn default_chat_model() -> String {
    std::env::var("HUIYU_LLM_MODEL").unwrap_or_else(|_| "deepseek-chat".to_string())
}

fn default_embedding_model() -> String {
    std::env::var("HUIYU_EMBEDDING_MODEL")
        .unwrap_or_else(|_| "BAAI/bge-small-zh-v1.5".to_string())
}

fn default_timeout() -> u64 {
    60
}

fn default_max_attempts() -> u32 {
    std::env::var("HUIYU_LLM_MAX_ATTEMPTS")
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|n| *n > 0)
        .unwrap_or(3)
}

/// Chunking and retrieval parameters for the parent/child index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Child chunks returned by similarity search
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Child (matching) chunk size in characters
    #[serde(default = "default_child_chunk_size")]
    pub child_chunk_size: usize,

    #[serde(default = "default_child_chunk_overlap")]
    pub child_chunk_overlap: usize,

    /// Parent (context) chunk size in characters
    #[serde(default = "default_parent_chunk_size")]
    pub parent_chunk_size: usize,

    #[serde(default = "default_parent_chunk_overlap")]
    pub parent_chunk_overlap: usize,

    /// Glob pattern for corpus files
    #[serde(default = "default_file_pattern")]
    pub file_pattern: String,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            child_chunk_size: default_child_chunk_size(),
            child_chunk_overlap: default_child_chunk_overlap(),
            parent_chunk_size: default_parent_chunk_size(),
            parent_chunk_overlap: default_parent_chunk_overlap(),
            file_pattern: default_file_pattern(),
        }
    }
}

fn default_top_k() -> usize {
    3
}
fn default_child_chunk_size() -> usize {
    128
}
fn default_child_chunk_overlap() -> usize {
    20
}
fn default_parent_chunk_size() -> usize {
    1024
}
fn default_parent_chunk_overlap() -> usize {
    100
}
fn default_file_pattern() -> String {
    "**/*.txt".to_string()
}

/// Turn graph parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Upper bound on rewrite stages per turn
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// History entries shown to the intent router
    #[serde(default = "default_router_history")]
    pub router_history: usize,

    /// History entries shown to the contextualizer
    #[serde(default = "default_contextualize_history")]
    pub contextualize_history: usize,

    /// Hard cap on answer length in characters (`None` disables it)
    #[serde(default = "default_answer_char_limit")]
    pub answer_char_limit: Option<usize>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            router_history: default_router_history(),
            contextualize_history: default_contextualize_history(),
            answer_char_limit: default_answer_char_limit(),
        }
    }
}

fn default_max_retries() -> u32 {
    3
}
fn default_router_history() -> usize {
    2
}
fn default_contextualize_history() -> usize {
    4
}
fn default_answer_char_limit() -> Option<usize> {
    Some(300)
}

impl Config {
    /// Load config from default path
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load config from a specific path, falling back to defaults if absent
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_yaml::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save config to default path
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_path())
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::CONFIG_DIR_NAME)
            .join("config.yml")
    }

    /// Reject chunking parameters that would never advance
    pub fn validate(&self) -> Result<()> {
        let r = &self.retrieval;
        if r.child_chunk_overlap >= r.child_chunk_size {
            return Err(crate::error::HuiyuError::Config(format!(
                "child_chunk_overlap ({}) must be smaller than child_chunk_size ({})",
                r.child_chunk_overlap, r.child_chunk_size
            )));
        }
        if r.parent_chunk_overlap >= r.parent_chunk_size {
            return Err(crate::error::HuiyuError::Config(format!(
                "parent_chunk_overlap ({}) must be smaller than parent_chunk_size ({})",
                r.parent_chunk_overlap, r.parent_chunk_size
            )));
        }
        if r.top_k == 0 {
            return Err(crate::error::HuiyuError::Config(
                "top_k must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.graph.max_retries, 3);
        assert_eq!(config.graph.router_history, 2);
        assert_eq!(config.graph.contextualize_history, 4);
        assert_eq!(config.retrieval.child_chunk_size, 128);
        assert_eq!(config.retrieval.parent_chunk_size, 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "graph:\n  max_retries: 5\nretrieval:\n  top_k: 4\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.graph.max_retries, 5);
        assert_eq!(config.graph.contextualize_history, 4);
        assert_eq!(config.retrieval.top_k, 4);
        assert_eq!(config.retrieval.child_chunk_overlap, 20);
    }

    #[test]
    fn test_validate_rejects_overlap() {
        let mut config = Config::default();
        config.retrieval.child_chunk_overlap = 128;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_missing_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("nope.yml")).unwrap();
        assert_eq!(config.retrieval.top_k, 3);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("huiyu").join("config.yml");

        let mut config = Config::default();
        config.graph.answer_char_limit = None;
        config.corpus_path = Some(PathBuf::from("/srv/sutras"));
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.graph.answer_char_limit, None);
        assert_eq!(loaded.corpus_path, Some(PathBuf::from("/srv/sutras")));
    }
}
