//! Error types for huiyu

use thiserror::Error;

/// Result type alias using HuiyuError
pub type Result<T> = std::result::Result<T, HuiyuError>;

/// Error type alias for convenience
pub type Error = HuiyuError;

/// Apology shown to the user when no answer could be produced
pub const GENERIC_APOLOGY: &str =
    "阿弥陀佛，贫僧此刻心神未定，一时无法作答。施主请稍后再来相问。";

/// Exit codes for CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const NOT_FOUND: i32 = 2;
    pub const INVALID_INPUT: i32 = 3;
    pub const ANSWER_UNAVAILABLE: i32 = 4;
}

/// Main error type for huiyu
#[derive(Debug, Error)]
pub enum HuiyuError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Walk directory error: {0}")]
    WalkDir(#[from] walkdir::Error),

    #[error("Thread not found: {0}")]
    ThreadNotFound(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Retrieval error: {0}")]
    Retrieval(String),

    #[error("Memory store error: {0}")]
    Memory(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Glob pattern error: {0}")]
    GlobPattern(#[from] glob::PatternError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("External service error: {0}")]
    ExternalError(String),

    /// The answer stage failed; the cause is logged, only the apology is shown
    #[error("{}", GENERIC_APOLOGY)]
    AnswerUnavailable,

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl HuiyuError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ThreadNotFound(_) => exit_codes::NOT_FOUND,
            Self::InvalidInput(_) | Self::Config(_) => exit_codes::INVALID_INPUT,
            Self::AnswerUnavailable => exit_codes::ANSWER_UNAVAILABLE,
            _ => exit_codes::GENERAL_ERROR,
        }
    }

    /// Whether a gateway call that failed this way is worth another attempt
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Http(e) if e.is_timeout() || e.is_connect())
    }
}
