//! Territory Core - rules engine for a hex-grid territory-conquest game
//!
//! This crate provides the authoritative game state and its mechanics:
//! - Board geometry (offset hex grid), tiles and per-tile domain shares
//! - Rule catalogs for terrains, units, items and buildings
//! - Units, buildings and the element registry
//! - A* routing and fog-of-war projections
//! - Unit actions (move, attack, influence, found, equip, produce)
//! - End-of-round upkeep, elimination and map generation

pub mod error;
pub mod rules;
pub mod board;
pub mod elements;
pub mod registry;
pub mod config;
pub mod movement;
pub mod visibility;
pub mod world;
pub mod actions;

// Re-exports for convenient access
pub use error::{ActionError, ConfigError, ConsistencyError, RuleViolation};
pub use rules::{
    BuildingAttributes, BuildingType, ItemType, Mobility, Production, RuleBook, RuleTables,
    TerrainAttributes, TerrainType, UnitAttributes, UnitStats, UnitType,
};
pub use board::{Board, Bounds, Domain, Position, Tile};
pub use elements::{Building, ElementId, ElementKind, PlayerId, Unit};
pub use registry::{ElementRegistry, RegistryEntry};
pub use config::GameConfig;
pub use movement::{find_route, route_cost, Route};
pub use visibility::player_view;
pub use world::{RoundReport, World, MAX_GENERATED_PLAYERS};
pub use actions::{AttackOutcome, MoveOutcome};
