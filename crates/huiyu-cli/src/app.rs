//! CLI argument definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "huiyu")]
#[command(
    author,
    version,
    about = "Scripture-grounded dialogue with the 慧语 persona"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "cli")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build or update the scripture index
    Ingest(IngestArgs),

    /// Ask one question within a conversation thread
    Ask(AskArgs),

    /// Interactive conversation on stdin
    Chat(ChatArgs),

    /// Single-turn answer without history
    Answer(AnswerArgs),

    /// Replay a CSV question set through the single-turn path
    Replay(ReplayArgs),

    /// Inspect or clear conversation memory
    History(HistoryArgs),

    /// Show index and memory status
    Status,

    /// Show or initialize configuration
    Config(ConfigArgs),
}

#[derive(Args)]
pub struct IngestArgs {
    /// Corpus directory or file (defaults to corpus_path from config)
    pub path: Option<PathBuf>,

    /// Re-index unchanged files
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Args)]
pub struct AskArgs {
    /// Conversation thread identifier
    #[arg(short, long, env = "HUIYU_THREAD", default_value = "default")]
    pub thread: String,

    /// Question
    #[arg(required = true)]
    pub query: Vec<String>,
}

#[derive(Args)]
pub struct ChatArgs {
    /// Conversation thread identifier
    #[arg(short, long, env = "HUIYU_THREAD", default_value = "default")]
    pub thread: String,
}

#[derive(Args)]
pub struct AnswerArgs {
    /// Question
    #[arg(required = true)]
    pub question: Vec<String>,

    /// Use this context instead of retrieving one
    #[arg(long)]
    pub context: Option<String>,
}

#[derive(Args)]
pub struct ReplayArgs {
    /// CSV with a question column
    #[arg(short, long)]
    pub input: PathBuf,

    /// CSV to write question/context/answer rows to
    #[arg(short, long)]
    pub output: PathBuf,

    /// Name of the question column
    #[arg(long, default_value = "user_input")]
    pub column: String,
}

#[derive(Args)]
pub struct HistoryArgs {
    #[command(subcommand)]
    pub action: HistoryAction,
}

#[derive(Subcommand)]
pub enum HistoryAction {
    /// Show one thread's history
    Show { thread: String },
    /// List all threads
    #[command(alias = "ls")]
    List,
    /// Delete one thread's history
    #[command(alias = "rm")]
    Clear { thread: String },
}

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write the effective configuration to the default path
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Clone, Copy, ValueEnum, Default, PartialEq)]
pub enum OutputFormat {
    #[default]
    Cli,
    Json,
}
