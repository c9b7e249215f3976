//! Play command - run one game between the example players
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run() - orchestration
//! - Level 2: load_settings(), play_game(), report_outcome()
//! - Level 3: apply_overrides(), build_session()
//! - Level 4: formatting utilities

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use territory_core::{GameConfig, RuleBook, World};
use territory_turns::{GameOutcome, GameSession, TurnCoordinator};

use crate::example_ai::ExampleAi;

/// Used when neither the settings file nor the command line bounds the game
const DEFAULT_MAX_ROUNDS: u64 = 100;

/// Longest wait for runtime tasks once the game is over
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

// ============================================================================
// COMMAND ARGUMENTS (Level 4 - Configuration)
// ============================================================================

#[derive(Args)]
pub struct PlayArgs {
    /// Game settings JSON file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Rule tables JSON file (stock tables when omitted)
    #[arg(long, value_name = "FILE")]
    pub rules: Option<PathBuf>,

    /// Number of players (at most four on generated maps)
    #[arg(long)]
    pub players: Option<usize>,

    /// Board width in tiles
    #[arg(long)]
    pub width: Option<i32>,

    /// Board height in tiles
    #[arg(long)]
    pub height: Option<i32>,

    /// Stop after this many full rounds
    #[arg(long)]
    pub max_rounds: Option<u64>,

    /// Per-turn deadline in milliseconds
    #[arg(long)]
    pub turn_timeout_ms: Option<u64>,

    /// Pause before each turn in milliseconds
    #[arg(long)]
    pub turn_delay_ms: Option<u64>,

    /// Output the outcome as JSON
    #[arg(long)]
    pub json: bool,
}

/// JSON shape of a finished game
#[derive(Clone, Debug, Serialize)]
struct OutcomeReport {
    winner: Option<u32>,
    reason: String,
    final_turn: u64,
    turns_issued: u64,
    standings: Vec<StandingReport>,
}

#[derive(Clone, Debug, Serialize)]
struct StandingReport {
    player: u32,
    tiles: usize,
}

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

/// Run play command
///
/// 1. Load settings and rule tables
/// 2. Generate the map and play it out
/// 3. Report the outcome
pub fn run(args: PlayArgs, seed: Option<u64>) -> Result<()> {
    let (config, rules) = load_settings(&args, seed)?;

    tracing::info!(
        "Starting game: {} players on {}x{} (max {} rounds)",
        config.players,
        config.width,
        config.height,
        config.max_rounds.unwrap_or(DEFAULT_MAX_ROUNDS)
    );

    let outcome = play_game(config, rules)?;

    report_outcome(&outcome, args.json)
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

fn load_settings(args: &PlayArgs, seed: Option<u64>) -> Result<(GameConfig, RuleBook)> {
    let config = match &args.config {
        Some(path) => GameConfig::load(path)
            .with_context(|| format!("Failed to load settings: {}", path.display()))?,
        None => GameConfig::default(),
    };
    let rules = match &args.rules {
        Some(path) => RuleBook::load(path)
            .with_context(|| format!("Failed to load rule tables: {}", path.display()))?,
        None => RuleBook::standard(),
    };
    Ok((apply_overrides(config, args, seed), rules))
}

fn play_game(config: GameConfig, rules: RuleBook) -> Result<GameOutcome> {
    let seed = config.seed;
    let (world, players) = World::generate(Arc::new(rules), config).context("Failed to generate map")?;
    let session = build_session(world, &players, seed)?;

    let runtime = tokio::runtime::Runtime::new()?;
    let outcome = runtime.block_on(session.run());
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    outcome.context("Game aborted")
}

fn report_outcome(outcome: &GameOutcome, json: bool) -> Result<()> {
    let report = to_report(outcome);
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    match report.winner {
        Some(winner) => println!("Winner: P{} ({})", winner, report.reason),
        None => println!("No winner ({})", report.reason),
    }
    println!("Turn {} reached after {} player turns", report.final_turn, report.turns_issued);
    for standing in &report.standings {
        println!("  P{}: {} tiles", standing.player, standing.tiles);
    }
    Ok(())
}

// ============================================================================
// LEVEL 3 - STEPS
// ============================================================================

/// Command-line values win over the settings file
fn apply_overrides(mut config: GameConfig, args: &PlayArgs, seed: Option<u64>) -> GameConfig {
    if let Some(players) = args.players {
        config = config.with_players(players);
    }
    if args.width.is_some() || args.height.is_some() {
        let width = args.width.unwrap_or(config.width);
        let height = args.height.unwrap_or(config.height);
        config = config.with_board_size(width, height);
    }
    let rounds = args.max_rounds.or(config.max_rounds).unwrap_or(DEFAULT_MAX_ROUNDS);
    config = config.with_max_rounds(rounds);
    if let Some(ms) = args.turn_timeout_ms {
        config = config.with_turn_timeout(Duration::from_millis(ms));
    }
    if let Some(ms) = args.turn_delay_ms {
        config = config.with_turn_start_delay(Duration::from_millis(ms));
    }
    if let Some(seed) = seed {
        config = config.with_seed(seed);
    }
    config
}

fn build_session(world: World, players: &[territory_core::PlayerId], seed: Option<u64>) -> Result<GameSession> {
    let coordinator = TurnCoordinator::new(world, players)?;
    let session = players.iter().fold(GameSession::new(coordinator), |session, &player| {
        let ai = match seed {
            Some(seed) => ExampleAi::with_seed(seed.wrapping_add(u64::from(player.0))),
            None => ExampleAi::new(),
        };
        session.with_routine(player, ai)
    });
    Ok(session)
}

// ============================================================================
// LEVEL 4 - FORMATTING
// ============================================================================

fn to_report(outcome: &GameOutcome) -> OutcomeReport {
    OutcomeReport {
        winner: outcome.winner.map(|p| p.0),
        reason: format!("{:?}", outcome.reason),
        final_turn: outcome.final_turn,
        turns_issued: outcome.turns_issued,
        standings: outcome
            .standings
            .iter()
            .map(|&(player, tiles)| StandingReport { player: player.0, tiles })
            .collect(),
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use territory_core::PlayerId;
    use territory_turns::EndReason;

    fn args() -> PlayArgs {
        PlayArgs {
            config: None,
            rules: None,
            players: None,
            width: None,
            height: None,
            max_rounds: None,
            turn_timeout_ms: None,
            turn_delay_ms: None,
            json: false,
        }
    }

    #[test]
    fn test_overrides_apply_on_top_of_file_settings() {
        let file = GameConfig::default().with_board_size(30, 12).with_max_rounds(7);
        let mut args = args();
        args.width = Some(8);
        args.players = Some(3);

        let config = apply_overrides(file, &args, Some(5));
        assert_eq!((config.width, config.height), (8, 12));
        assert_eq!(config.players, 3);
        assert_eq!(config.max_rounds, Some(7));
        assert_eq!(config.seed, Some(5));
    }

    #[test]
    fn test_unbounded_games_get_a_round_limit() {
        let config = apply_overrides(GameConfig::default(), &args(), None);
        assert_eq!(config.max_rounds, Some(DEFAULT_MAX_ROUNDS));
    }

    #[test]
    fn test_report_names_the_winner() {
        let outcome = GameOutcome {
            winner: Some(PlayerId(2)),
            reason: EndReason::LastPlayerStanding,
            final_turn: 9,
            turns_issued: 17,
            standings: vec![(PlayerId(1), 0), (PlayerId(2), 12)],
        };
        let report = to_report(&outcome);
        assert_eq!(report.winner, Some(2));
        assert_eq!(report.reason, "LastPlayerStanding");
        assert_eq!(report.standings[1].tiles, 12);
    }
}
