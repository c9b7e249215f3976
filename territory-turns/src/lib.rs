//! Territory Turns - turn scheduling for the territory rules engine
//!
//! - Player directory with liveness and wrap detection
//! - Command surface, authentication and the dispatch table
//! - The synchronous turn coordinator state machine
//! - An async session running decision routines on cancellable threads

pub mod error;
pub mod players;
pub mod commands;
pub mod dispatch;
pub mod coordinator;
pub mod session;

pub use error::{CoordinatorError, ExecutionError, InvalidCommand, NoLivingPlayer, Rejection};
pub use players::{Advance, PlayerDirectory, PlayerSlot};
pub use commands::{CommandKind, CommandResponse, CommandType, PlayerCommand};
pub use dispatch::{DispatchTable, Effect, Executor};
pub use coordinator::{EndReason, GameOutcome, TurnCoordinator, TurnState, TurnTicket};
pub use session::{CancelToken, CommandRequest, DecisionRoutine, GameSession, TurnHandle};
