//! Error taxonomy for the rules engine
//!
//! Rule violations are expected outcomes of a bad command and never touch the
//! board. Consistency errors mean an engine invariant broke and must escalate.

use crate::board::Position;
use crate::elements::ElementId;
use crate::rules::{BuildingType, ItemType, UnitType};
use thiserror::Error;

/// A command asked for something the game rules forbid
#[derive(Clone, Debug, PartialEq, Error)]
pub enum RuleViolation {
    #[error("destination {0} is not on the board")]
    InvalidDestination(Position),

    #[error("unit is already at {0}")]
    SameDestination(Position),

    #[error("unit {0} has no remaining movements this turn")]
    NoRemainingMovements(ElementId),

    #[error("destination costs {cost} movements but only {remaining} remain")]
    UnreachableDestination { cost: u32, remaining: u32 },

    #[error("no route from {from} to {to}")]
    ImpossibleRoute { from: Position, to: Position },

    #[error("target needs range {required} but unit range is {range}")]
    OutOfRange { required: u32, range: u32 },

    #[error("no enemy unit to attack at {0}")]
    NoEnemyAtTarget(Position),

    #[error("tile {0} is occupied by another player's units")]
    TileOccupiedByEnemy(Position),

    #[error("tile {position} domain share {share:.3} is not a majority")]
    NoMajorityDomain { position: Position, share: f64 },

    #[error("tile {0} already has a building")]
    BuildingAlreadyInTile(Position),

    #[error("terrain at {0} cannot receive a building")]
    TileCannotReceiveBuilding(Position),

    #[error("{0:?} units cannot found a {1:?}")]
    UnitCannotFoundBuilding(UnitType, BuildingType),

    #[error("no building at {0}")]
    NoBuildingInTile(Position),

    #[error("building at {0} has no {1:?} in its inventory")]
    ItemNotInInventory(Position, ItemType),

    #[error("unit {0} already carries {1:?}")]
    UnitAlreadyHasItem(ElementId, ItemType),

    #[error("element {0} does not belong to the acting player")]
    NotOwner(ElementId),

    #[error("element {0} no longer exists")]
    NoSuchElement(ElementId),
}

/// An engine invariant was violated; never a normal game outcome
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConsistencyError {
    #[error("game element {0} not found")]
    ElementNotFound(ElementId),

    #[error("game element {0} registered twice")]
    DuplicateElement(ElementId),

    #[error("game element {0} is not a {1}")]
    WrongElementKind(ElementId, &'static str),

    #[error("position {0} is outside the board")]
    PositionOutOfBounds(Position),
}

/// Failure of an executor operation
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ActionError {
    #[error(transparent)]
    Rule(#[from] RuleViolation),

    #[error(transparent)]
    Consistency(#[from] ConsistencyError),
}

/// Static configuration could not be used to build a game
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("rule catalog has no entry for {0}")]
    MissingRule(String),

    #[error("board dimensions {width}x{height} are invalid")]
    InvalidBoardSize { width: i32, height: i32 },

    #[error("map generation supports at most {max} players, got {requested}")]
    UnsupportedPlayerCount { requested: usize, max: usize },

    #[error("at least one player is required")]
    NoPlayers,

    #[error("board setup failed: {0}")]
    Setup(#[from] ConsistencyError),

    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_violation_messages() {
        let err = RuleViolation::UnreachableDestination { cost: 4, remaining: 1 };
        assert_eq!(err.to_string(), "destination costs 4 movements but only 1 remain");

        let err = RuleViolation::NoMajorityDomain {
            position: Position::new(1, 2),
            share: 0.25,
        };
        assert_eq!(err.to_string(), "tile (1, 2) domain share 0.250 is not a majority");
    }

    #[test]
    fn test_action_error_wraps_both_kinds() {
        let rule: ActionError = RuleViolation::SameDestination(Position::new(0, 0)).into();
        assert!(matches!(rule, ActionError::Rule(_)));

        let fatal: ActionError = ConsistencyError::ElementNotFound(ElementId(9)).into();
        assert!(matches!(fatal, ActionError::Consistency(_)));
        assert_eq!(fatal.to_string(), "game element #9 not found");
    }
}
