//! Game settings

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Per-game tunables; the rule catalogs live in [`crate::RuleBook`]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Number of players on a generated map
    pub players: usize,
    pub width: i32,
    pub height: i32,
    /// Multiplier applied when a tile holds more units than the threshold
    pub grouping_bonus: f64,
    pub grouping_threshold: usize,
    /// Fraction of max health regained by a unit that rested for a round
    pub health_recover_per_turn: f64,
    pub first_turn: u64,
    /// Wall-clock window a player has between accepted commands
    pub turn_timeout_ms: u64,
    /// Pause before a player's routine starts thinking
    pub turn_start_delay_ms: u64,
    /// How often finished player routines are reclaimed
    pub cleanup_interval_ms: u64,
    /// Stop after this many full rounds (None = play until one player is left)
    pub max_rounds: Option<u64>,
    /// Random seed for reproducibility (None = random)
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            players: 2,
            width: 20,
            height: 20,
            grouping_bonus: 1.3,
            grouping_threshold: 3,
            health_recover_per_turn: 0.1,
            first_turn: 1,
            turn_timeout_ms: 30_000,
            turn_start_delay_ms: 0,
            cleanup_interval_ms: 5_000,
            max_rounds: None,
            seed: None,
        }
    }
}

impl GameConfig {
    pub fn with_players(mut self, players: usize) -> Self {
        self.players = players;
        self
    }

    pub fn with_board_size(mut self, width: i32, height: i32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_turn_timeout(mut self, timeout: Duration) -> Self {
        self.turn_timeout_ms = saturating_millis(timeout);
        self
    }

    pub fn with_turn_start_delay(mut self, delay: Duration) -> Self {
        self.turn_start_delay_ms = saturating_millis(delay);
        self
    }

    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval_ms = saturating_millis(interval);
        self
    }

    pub fn with_max_rounds(mut self, rounds: u64) -> Self {
        self.max_rounds = Some(rounds);
        self
    }

    pub fn with_grouping(mut self, bonus: f64, threshold: usize) -> Self {
        self.grouping_bonus = bonus;
        self.grouping_threshold = threshold;
        self
    }

    pub fn turn_timeout(&self) -> Duration {
        Duration::from_millis(self.turn_timeout_ms)
    }

    pub fn turn_start_delay(&self) -> Duration {
        Duration::from_millis(self.turn_start_delay_ms)
    }

    pub fn cleanup_interval(&self) -> Duration {
        // A zero period would make the sweep timer spin
        Duration::from_millis(self.cleanup_interval_ms.max(1))
    }

    /// Load from JSON file; missing fields take their defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save to JSON file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Whole milliseconds, pinned at `u64::MAX` for absurdly long durations
fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: GameConfig = serde_json::from_str(r#"{"players": 4, "seed": 7}"#).unwrap();
        assert_eq!(config.players, 4);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.turn_timeout(), Duration::from_secs(30));
        assert_eq!(config.max_rounds, None);
    }

    #[test]
    fn test_builders() {
        let config = GameConfig::default()
            .with_board_size(6, 5)
            .with_turn_timeout(Duration::from_millis(250))
            .with_max_rounds(3);
        assert_eq!((config.width, config.height), (6, 5));
        assert_eq!(config.turn_timeout_ms, 250);
        assert_eq!(config.max_rounds, Some(3));
    }

    #[test]
    fn test_huge_durations_saturate() {
        let config = GameConfig::default()
            .with_turn_timeout(Duration::MAX)
            .with_turn_start_delay(Duration::from_micros(1500));
        assert_eq!(config.turn_timeout_ms, u64::MAX);
        assert_eq!(config.turn_timeout(), Duration::from_millis(u64::MAX));
        assert_eq!(config.turn_start_delay_ms, 1);
    }
}
