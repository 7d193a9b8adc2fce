//! Configuration commands

use super::AppContext;
use crate::app::{ConfigAction, ConfigArgs, OutputFormat};
use anyhow::{bail, Result};

pub fn run(args: ConfigArgs, ctx: &AppContext) -> Result<()> {
    match args.action {
        ConfigAction::Show => {
            // Never echo the key itself
            let mut config = ctx.config.clone();
            if config.llm_service.api_key.is_some() {
                config.llm_service.api_key = Some("***".to_string());
            }
            match ctx.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&config)?),
                OutputFormat::Cli => print!("{}", serde_yaml::to_string(&config)?),
            }
        }
        ConfigAction::Init { force } => {
            let path = &ctx.config_path;
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            let mut config = ctx.config.clone();
            config.llm_service.api_key = None;
            config.save_to(path)?;
            println!("Wrote {}", path.display());
        }
    }
    Ok(())
}
