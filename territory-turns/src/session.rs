//! Game session - runs decision routines against the coordinator
//!
//! Each issued turn launches the player's routine on its own named thread.
//! The routine talks back through a [`TurnHandle`]; the session loop owns the
//! coordinator and serializes every request, so the world only ever has one
//! writer.
//!
//! Routine threads are detached from the async runtime. A routine that never
//! returns cannot hold up the session or the runtime's shutdown; once its
//! turn is over it is cut off from the game and abandoned.

use crate::commands::{CommandResponse, PlayerCommand};
use crate::coordinator::{GameOutcome, TurnCoordinator};
use crate::error::{CoordinatorError, Rejection};
use rustc_hash::FxHashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use territory_core::{Board, PlayerId, RuleBook};
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;

const REQUEST_BUFFER: usize = 16;

/// A player's decision-making logic
///
/// `play_turn` runs on a dedicated thread. It should check
/// [`TurnHandle::is_cancelled`] between expensive steps. A routine that
/// ignores cancellation loses its turn at the deadline, every later submit
/// is refused, and the session finishes without waiting for it.
pub trait DecisionRoutine: Send + Sync + 'static {
    fn play_turn(&self, board: Board, handle: TurnHandle);
}

/// Cooperative cancellation flag shared with one running routine
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// One command travelling from a routine to the session loop
#[derive(Debug)]
pub struct CommandRequest {
    pub command: PlayerCommand,
    pub code: u64,
    pub reply: oneshot::Sender<CommandResponse>,
}

/// A routine's connection to the game for the duration of one turn
#[derive(Clone, Debug)]
pub struct TurnHandle {
    player: PlayerId,
    code: u64,
    turn: u64,
    rules: Arc<RuleBook>,
    cancel: CancelToken,
    requests: mpsc::Sender<CommandRequest>,
}

impl TurnHandle {
    pub fn player(&self) -> PlayerId {
        self.player
    }

    pub fn code(&self) -> u64 {
        self.code
    }

    pub fn turn(&self) -> u64 {
        self.turn
    }

    pub fn rules(&self) -> &RuleBook {
        &self.rules
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Submit a command with this turn's validation code and wait for the reply
    pub fn submit(&self, command: PlayerCommand) -> CommandResponse {
        self.submit_with_code(command, self.code)
    }

    /// Submit with an explicit code; must not be called from async context
    pub fn submit_with_code(&self, command: PlayerCommand, code: u64) -> CommandResponse {
        if self.is_cancelled() {
            return CommandResponse::rejected(None, Rejection::TurnCancelled);
        }
        let (reply, response) = oneshot::channel();
        let request = CommandRequest { command, code, reply };
        if self.requests.blocking_send(request).is_err() {
            return CommandResponse::rejected(None, Rejection::SessionClosed);
        }
        response
            .blocking_recv()
            .unwrap_or_else(|_| CommandResponse::rejected(None, Rejection::SessionClosed))
    }

    pub fn end_turn(&self) -> CommandResponse {
        self.submit(PlayerCommand::end_of_turn(self.player))
    }
}

struct RunningRoutine {
    player: PlayerId,
    cancel: CancelToken,
    task: JoinHandle<()>,
}

pub struct GameSession {
    coordinator: TurnCoordinator,
    routines: FxHashMap<PlayerId, Arc<dyn DecisionRoutine>>,
    turn_start_delay: Duration,
    cleanup_interval: Duration,
    active: Option<RunningRoutine>,
    retired: Vec<RunningRoutine>,
}

impl GameSession {
    pub fn new(coordinator: TurnCoordinator) -> Self {
        let config = coordinator.world().config();
        let turn_start_delay = config.turn_start_delay();
        let cleanup_interval = config.cleanup_interval();
        Self {
            coordinator,
            routines: FxHashMap::default(),
            turn_start_delay,
            cleanup_interval,
            active: None,
            retired: Vec::new(),
        }
    }

    /// Players without a routine simply time out every turn
    pub fn with_routine(mut self, player: PlayerId, routine: impl DecisionRoutine) -> Self {
        self.routines.insert(player, Arc::new(routine));
        self
    }

    pub fn coordinator(&self) -> &TurnCoordinator {
        &self.coordinator
    }

    /// Play until the coordinator reaches game over
    pub async fn run(mut self) -> Result<GameOutcome, CoordinatorError> {
        let (requests, mut inbox) = mpsc::channel::<CommandRequest>(REQUEST_BUFFER);
        let mut sweep = tokio::time::interval(self.cleanup_interval);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let result = match self.coordinator.start(Instant::now()) {
            Ok(()) => self.serve(&requests, &mut inbox, &mut sweep).await,
            Err(err) => Err(err),
        };
        self.shutdown();
        result
    }

    async fn serve(
        &mut self,
        requests: &mpsc::Sender<CommandRequest>,
        inbox: &mut mpsc::Receiver<CommandRequest>,
        sweep: &mut tokio::time::Interval,
    ) -> Result<GameOutcome, CoordinatorError> {
        loop {
            if let Some(outcome) = self.coordinator.outcome() {
                return Ok(outcome);
            }
            self.launch_pending(requests);
            let deadline = self.coordinator.deadline().ok_or(CoordinatorError::NotStarted)?;

            tokio::select! {
                Some(request) = inbox.recv() => {
                    let response = self.coordinator.execute(&request.command, request.code, Instant::now())?;
                    // the routine may have given up waiting
                    let _ = request.reply.send(response);
                }
                _ = tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)) => {
                    // the next launch cancels the timed-out routine
                    self.coordinator.time_out(Instant::now())?;
                }
                _ = sweep.tick() => self.sweep_finished(),
            }
        }
    }

    /// Start the routine for a freshly issued turn, cancelling the previous one
    fn launch_pending(&mut self, requests: &mpsc::Sender<CommandRequest>) {
        let Some(ticket) = self.coordinator.take_ticket() else {
            return;
        };
        if let Some(previous) = self.active.take() {
            previous.cancel.cancel();
            self.retired.push(previous);
        }
        let Some(routine) = self.routines.get(&ticket.player).cloned() else {
            tracing::warn!("No decision routine for {}; turn {} will time out", ticket.player, ticket.turn);
            return;
        };

        let cancel = CancelToken::new();
        let handle = TurnHandle {
            player: ticket.player,
            code: ticket.code,
            turn: ticket.turn,
            rules: Arc::clone(self.coordinator.world().rules()),
            cancel: cancel.clone(),
            requests: requests.clone(),
        };
        let delay = self.turn_start_delay;
        let player = ticket.player;
        let board = ticket.board;
        let spawned = thread::Builder::new()
            .name(format!("routine-{}-turn-{}", player.0, ticket.turn))
            .spawn(move || {
                if !delay.is_zero() {
                    thread::sleep(delay);
                }
                if handle.is_cancelled() {
                    return;
                }
                let played = std::panic::catch_unwind(AssertUnwindSafe(|| routine.play_turn(board, handle)));
                if played.is_err() {
                    tracing::error!("Decision routine for {} panicked", player);
                }
            });
        match spawned {
            Ok(task) => self.active = Some(RunningRoutine { player, cancel, task }),
            Err(err) => tracing::error!("Failed to start routine for {}: {}; turn will time out", player, err),
        }
    }

    fn sweep_finished(&mut self) {
        let before = self.retired.len();
        self.retired.retain(|r| !r.task.is_finished());
        let reclaimed = before - self.retired.len();
        if reclaimed > 0 {
            tracing::debug!("Reclaimed {} finished decision routines", reclaimed);
        }
    }

    /// Cancel every routine; the ones still running are left to die alone
    fn shutdown(&mut self) {
        if let Some(active) = self.active.take() {
            tracing::debug!("Cancelling routine for {}", active.player);
            self.retired.push(active);
        }
        for routine in self.retired.drain(..) {
            routine.cancel.cancel();
            if !routine.task.is_finished() {
                tracing::warn!("Abandoning routine for {} that is still running", routine.player);
            }
        }
    }
}
