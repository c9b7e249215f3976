//! Territory CLI - Command-line interface
//!
//! Commands:
//! - play: Run a game between the bundled example players
//! - defaults: Write the stock settings and rule tables as JSON

mod defaults;
mod example_ai;
mod play;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "territory")]
#[command(about = "Hex-grid territory conquest engine")]
struct Cli {
    /// Random seed for map generation, combat and the example players
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a game between example players
    Play(play::PlayArgs),
    /// Write default settings and rule tables
    Defaults(defaults::DefaultsArgs),
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so --json output stays clean
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Play(args) => play::run(args, cli.seed),
        Commands::Defaults(args) => defaults::run(args),
    }
}
