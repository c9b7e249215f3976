//! End-to-end tests for the territory binary

use std::process::Command;

use territory_core::{GameConfig, RuleBook, RuleTables};

// ============================================================================
// TEST FIXTURES
// ============================================================================

fn territory() -> Command {
    Command::new(env!("CARGO_BIN_EXE_territory"))
}

fn scratch_dir(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("territory-cli-{}-{}", name, std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

// ============================================================================
// DEFAULTS
// ============================================================================

#[test]
fn test_defaults_prints_stock_rules() {
    let output = territory().arg("defaults").output().unwrap();
    assert!(output.status.success());

    let tables: RuleTables = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(RuleBook::from_tables(&tables).unwrap(), RuleBook::standard());
}

#[test]
fn test_defaults_writes_loadable_files() {
    let dir = scratch_dir("defaults");
    let rules = dir.join("rules.json");
    let config = dir.join("settings.json");

    let status = territory()
        .arg("defaults")
        .arg("--rules")
        .arg(&rules)
        .arg("--config")
        .arg(&config)
        .status()
        .unwrap();
    assert!(status.success());

    assert_eq!(RuleBook::load(&rules).unwrap(), RuleBook::standard());
    assert_eq!(GameConfig::load(&config).unwrap(), GameConfig::default());
    std::fs::remove_dir_all(dir).ok();
}

// ============================================================================
// PLAY
// ============================================================================

#[test]
fn test_short_game_reports_json_outcome() {
    let output = territory()
        .args(["--seed", "4", "play", "--width", "8", "--height", "8", "--max-rounds", "3", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let turns = report["turns_issued"].as_u64().unwrap();
    assert!((1..=6).contains(&turns));
    assert_eq!(report["standings"].as_array().unwrap().len(), 2);
    assert!(report["final_turn"].as_u64().unwrap() <= 4);
}

#[test]
fn test_too_many_players_fails() {
    let output = territory()
        .args(["play", "--players", "5", "--max-rounds", "1"])
        .output()
        .unwrap();
    assert!(!output.status.success());
}

#[test]
fn test_missing_settings_file_fails() {
    let output = territory()
        .args(["play", "--config", "/nonexistent/settings.json"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to load settings"));
}
