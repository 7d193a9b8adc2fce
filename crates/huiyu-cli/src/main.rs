//! Huiyu CLI
//!
//! Scripture-grounded dialogue over a local index.

use anyhow::Result;
use clap::Parser;
use huiyu_core::{Config, Database, HuiyuError};
use std::sync::{Arc, Mutex};
use tracing_subscriber::filter::LevelFilter;

mod app;
mod commands;
mod output;
mod progress;

use app::{Cli, Commands};
use commands::AppContext;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr and are off unless asked for: a user sees the answer
    // or the apology, never a raw model or index error
    let level = if cli.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::OFF
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    let config_path = std::env::var("HUIYU_CONFIG")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| Config::default_path());

    // Open database (use HUIYU_DB env var if set, otherwise use default)
    let db_path = std::env::var("HUIYU_DB")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| Database::default_path());

    let result = match Config::load_from(&config_path) {
        Ok(config) => match open_database(&db_path) {
            Ok(db) => {
                let ctx = AppContext {
                    db: Arc::new(Mutex::new(db)),
                    config,
                    config_path,
                    format: cli.format,
                    verbose: cli.verbose,
                };
                dispatch(cli.command, &ctx).await
            }
            Err(e) => Err(e.into()),
        },
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        if let Some(err) = e.downcast_ref::<HuiyuError>() {
            eprintln!("{}", err);
            std::process::exit(err.exit_code());
        }
        return Err(e);
    }
    Ok(())
}

fn open_database(path: &std::path::Path) -> huiyu_core::Result<Database> {
    let db = Database::open(path)?;
    db.initialize()?;
    Ok(db)
}

async fn dispatch(command: Commands, ctx: &AppContext) -> Result<()> {
    match command {
        Commands::Ingest(args) => commands::ingest::run(args, ctx).await,
        Commands::Ask(args) => commands::ask::run(args, ctx).await,
        Commands::Chat(args) => commands::ask::run_chat(args, ctx).await,
        Commands::Answer(args) => commands::answer::run(args, ctx).await,
        Commands::Replay(args) => commands::replay::run(args, ctx).await,
        Commands::History(args) => commands::history::run(args, ctx),
        Commands::Status => commands::status::run(ctx),
        Commands::Config(args) => commands::config::run(args, ctx),
    }
}
