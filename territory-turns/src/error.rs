//! Errors raised while scheduling turns and dispatching commands

use crate::commands::CommandType;
use territory_core::{
    ActionError, ConsistencyError, ElementId, ItemType, PlayerId, Position, RuleViolation, UnitType,
};
use thiserror::Error;

/// Why a command was not applied; carried in every rejected response
#[derive(Clone, Debug, PartialEq, Error)]
pub enum Rejection {
    #[error("it is {expected}'s turn, not {received}'s")]
    WrongPlayer { expected: PlayerId, received: PlayerId },

    #[error("validation code does not match the current turn")]
    StaleOrForgedCode,

    #[error("no executor defined for {0:?}")]
    NoExecutorDefined(CommandType),

    #[error("no turn has been issued yet")]
    NotStarted,

    #[error("the game is over")]
    GameOver,

    #[error("the turn was cancelled")]
    TurnCancelled,

    #[error("the game session has closed")]
    SessionClosed,

    #[error(transparent)]
    Rule(#[from] RuleViolation),
}

/// A command could not even be built from the player's snapshot
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum InvalidCommand {
    #[error("element {0} is not owned by {1}")]
    NotOwnedByPlayer(ElementId, PlayerId),

    #[error("coordinates {0} must not be negative")]
    NegativeCoordinates(Position),

    #[error("unit {0} already carries {1:?}")]
    UnitAlreadyHasItem(ElementId, ItemType),

    #[error("{0:?} units cannot found buildings")]
    CannotFoundBuildings(UnitType),
}

/// No other living player could be found when advancing the turn
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("no living player left to take a turn")]
pub struct NoLivingPlayer;

/// Engine failure that aborts the game
#[derive(Clone, Debug, PartialEq, Error)]
pub enum CoordinatorError {
    #[error(transparent)]
    Consistency(#[from] ConsistencyError),

    #[error("executor for {expected:?} received a {received:?} command")]
    MisroutedCommand { expected: CommandType, received: CommandType },

    #[error("a game needs at least one player")]
    NoPlayers,

    #[error("coordinator has not been started")]
    NotStarted,
}

/// Outcome of a failed executor call
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ExecutionError {
    #[error(transparent)]
    Rule(#[from] RuleViolation),

    #[error(transparent)]
    Fatal(#[from] CoordinatorError),
}

impl From<ConsistencyError> for ExecutionError {
    fn from(err: ConsistencyError) -> Self {
        ExecutionError::Fatal(err.into())
    }
}

impl From<ActionError> for ExecutionError {
    fn from(err: ActionError) -> Self {
        match err {
            ActionError::Rule(v) => ExecutionError::Rule(v),
            ActionError::Consistency(e) => e.into(),
        }
    }
}
