//! Defaults command - dump the stock settings and rule tables

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use territory_core::{GameConfig, RuleBook};

#[derive(Args)]
pub struct DefaultsArgs {
    /// Write the stock rule tables here
    #[arg(long, value_name = "FILE")]
    pub rules: Option<PathBuf>,

    /// Write the default game settings here
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// With no file given, the rule tables are printed to stdout
pub fn run(args: DefaultsArgs) -> Result<()> {
    let rules = RuleBook::standard();

    if args.rules.is_none() && args.config.is_none() {
        println!("{}", serde_json::to_string_pretty(&rules.to_tables())?);
        return Ok(());
    }

    if let Some(path) = &args.rules {
        rules
            .save(path)
            .with_context(|| format!("Failed to write rule tables: {}", path.display()))?;
        tracing::info!("Saved rule tables to {}", path.display());
    }
    if let Some(path) = &args.config {
        GameConfig::default()
            .save(path)
            .with_context(|| format!("Failed to write settings: {}", path.display()))?;
        tracing::info!("Saved settings to {}", path.display());
    }
    Ok(())
}
