//! Turn coordinator - who may act, for how long, and what happens between turns
//!
//! The coordinator is a synchronous state machine. It never looks at the
//! clock itself: every entry point takes `now`, so the async session (or a
//! test) decides what time it is.
//!
//! ```text
//! Idle --start--> AwaitingCommands(P, code, deadline)
//!   command ok        -> AwaitingCommands(P, code, now + timeout)
//!   EndOfTurn/timeout -> AwaitingCommands(next, new code, new deadline)
//!   no living player  -> GameOver
//! ```

use crate::commands::{CommandResponse, PlayerCommand};
use crate::dispatch::{DispatchTable, Effect};
use crate::error::{CoordinatorError, ExecutionError, NoLivingPlayer, Rejection};
use crate::players::{Advance, PlayerDirectory};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::time::{Duration, Instant};
use territory_core::{Board, PlayerId, World};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EndReason {
    LastPlayerStanding,
    RoundLimit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    AwaitingCommands {
        player: PlayerId,
        code: u64,
        deadline: Instant,
    },
    GameOver {
        winner: Option<PlayerId>,
        reason: EndReason,
    },
}

/// Everything a decision routine needs to start its turn
#[derive(Clone, Debug)]
pub struct TurnTicket {
    pub player: PlayerId,
    pub code: u64,
    pub turn: u64,
    pub board: Board,
}

/// Summary of a finished game
#[derive(Clone, Debug, PartialEq)]
pub struct GameOutcome {
    pub winner: Option<PlayerId>,
    pub reason: EndReason,
    pub final_turn: u64,
    pub turns_issued: u64,
    /// Tiles held with a majority domain, in turn order
    pub standings: Vec<(PlayerId, usize)>,
}

pub struct TurnCoordinator {
    world: World,
    directory: PlayerDirectory,
    table: DispatchTable,
    state: TurnState,
    /// Independent of the world's generator so seeded games still get fresh codes
    code_rng: ChaCha8Rng,
    turn_timeout: Duration,
    turns_issued: u64,
    rounds_completed: u64,
    last_code: Option<u64>,
    pending_ticket: Option<TurnTicket>,
}

impl TurnCoordinator {
    /// Players take turns in the order given
    pub fn new(world: World, players: &[PlayerId]) -> Result<Self, CoordinatorError> {
        if players.is_empty() {
            return Err(CoordinatorError::NoPlayers);
        }
        let turn_timeout = world.config().turn_timeout();
        Ok(Self {
            world,
            directory: PlayerDirectory::new(players),
            table: DispatchTable::standard(),
            state: TurnState::Idle,
            code_rng: ChaCha8Rng::from_entropy(),
            turn_timeout,
            turns_issued: 0,
            rounds_completed: 0,
            last_code: None,
            pending_ticket: None,
        })
    }

    pub fn with_dispatch_table(mut self, table: DispatchTable) -> Self {
        self.table = table;
        self
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn directory(&self) -> &PlayerDirectory {
        &self.directory
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn turns_issued(&self) -> u64 {
        self.turns_issued
    }

    pub fn current_player(&self) -> Option<PlayerId> {
        match self.state {
            TurnState::AwaitingCommands { player, .. } => Some(player),
            _ => None,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            TurnState::AwaitingCommands { deadline, .. } => Some(deadline),
            _ => None,
        }
    }

    /// The most recently issued turn, if nobody has collected it yet
    pub fn take_ticket(&mut self) -> Option<TurnTicket> {
        self.pending_ticket.take()
    }

    pub fn outcome(&self) -> Option<GameOutcome> {
        match self.state {
            TurnState::GameOver { winner, reason } => Some(GameOutcome {
                winner,
                reason,
                final_turn: self.world.turn(),
                turns_issued: self.turns_issued,
                standings: self.standings(),
            }),
            _ => None,
        }
    }

    fn standings(&self) -> Vec<(PlayerId, usize)> {
        self.directory
            .slots()
            .iter()
            .map(|slot| {
                let held = self
                    .world
                    .board()
                    .iter()
                    .filter(|(_, tile)| tile.domain().has_majority(slot.id))
                    .count();
                (slot.id, held)
            })
            .collect()
    }

    // ========================================================================
    // STATE TRANSITIONS
    // ========================================================================

    /// Issue the first turn; a no-op once started
    pub fn start(&mut self, now: Instant) -> Result<(), CoordinatorError> {
        if self.state != TurnState::Idle {
            return Ok(());
        }
        self.collect_eliminations();
        match self.directory.current() {
            Some(player) if self.directory.is_alive(player) => {
                self.issue_turn(player, now);
                Ok(())
            }
            Some(_) => self.advance(now),
            None => Err(CoordinatorError::NoPlayers),
        }
    }

    /// Authenticate, dispatch and apply one command
    ///
    /// Rule violations and protocol errors come back as a rejected response.
    /// Only consistency failures are returned as `Err`; the game cannot
    /// continue after one.
    pub fn execute(
        &mut self,
        command: &PlayerCommand,
        code: u64,
        now: Instant,
    ) -> Result<CommandResponse, CoordinatorError> {
        let (active, live_code) = match self.state {
            TurnState::Idle => return Ok(CommandResponse::rejected(None, Rejection::NotStarted)),
            TurnState::GameOver { .. } => return Ok(CommandResponse::rejected(None, Rejection::GameOver)),
            TurnState::AwaitingCommands { player, code, .. } => (player, code),
        };

        if command.player() != active {
            tracing::warn!("Rejected command from {} during {}'s turn", command.player(), active);
            let reason = Rejection::WrongPlayer { expected: active, received: command.player() };
            return Ok(CommandResponse::rejected(None, reason));
        }
        if code != live_code {
            tracing::warn!("Rejected command from {} with a stale validation code", active);
            return Ok(CommandResponse::rejected(None, Rejection::StaleOrForgedCode));
        }

        let command_type = command.command_type();
        let Some(executor) = self.table.get(command_type) else {
            let board = self.world.player_view(active);
            return Ok(CommandResponse::rejected(Some(board), Rejection::NoExecutorDefined(command_type)));
        };

        match executor(&mut self.world, command) {
            Ok(effect) => {
                tracing::debug!("{} executed {:?}", active, command.kind());
                let eliminated = self.collect_eliminations();
                let renewed = self.deadline_from(now);
                if let TurnState::AwaitingCommands { deadline, .. } = &mut self.state {
                    *deadline = renewed;
                }
                let board = self.world.player_view(active);

                if eliminated && self.directory.living().len() < 2 {
                    self.finish(EndReason::LastPlayerStanding);
                } else if effect == Effect::EndTurn {
                    tracing::info!("{} ended turn {}", active, self.world.turn());
                    self.advance(now)?;
                } else if !self.directory.is_alive(active) {
                    self.advance(now)?;
                }
                Ok(CommandResponse::Ok { board })
            }
            Err(ExecutionError::Rule(violation)) => {
                tracing::debug!("{} {:?} rejected: {}", active, command_type, violation);
                let board = self.world.player_view(active);
                Ok(CommandResponse::rejected(Some(board), violation.into()))
            }
            Err(ExecutionError::Fatal(err)) => {
                tracing::error!("Aborting game on {:?} from {}: {}", command_type, active, err);
                Err(err)
            }
        }
    }

    /// Force the turn forward once its deadline has passed
    ///
    /// Returns true when the turn was taken away from the active player.
    pub fn time_out(&mut self, now: Instant) -> Result<bool, CoordinatorError> {
        let TurnState::AwaitingCommands { player, deadline, .. } = self.state else {
            return Ok(false);
        };
        if now < deadline {
            return Ok(false);
        }
        tracing::warn!("{} timed out on turn {}", player, self.world.turn());
        self.advance(now)?;
        Ok(true)
    }

    // ========================================================================
    // HELPERS
    // ========================================================================

    /// Mirror world eliminations into the directory; true if anyone fell
    fn collect_eliminations(&mut self) -> bool {
        let mut any = false;
        for player in self.world.take_eliminations() {
            if self.directory.set_not_alive(player) {
                tracing::info!("{} has been eliminated", player);
                any = true;
            }
        }
        any
    }

    fn advance(&mut self, now: Instant) -> Result<(), CoordinatorError> {
        match self.directory.next_player() {
            Ok(Advance { player, wrapped }) => {
                if wrapped {
                    let report = self.world.end_round()?;
                    self.rounds_completed += 1;
                    tracing::info!(
                        "Round {} complete: {} units produced, {} items produced, {} units healed",
                        self.rounds_completed,
                        report.units_produced.len(),
                        report.items_produced,
                        report.units_healed
                    );
                    let limit = self.world.config().max_rounds;
                    if limit.is_some_and(|max| self.rounds_completed >= max) {
                        self.finish(EndReason::RoundLimit);
                        return Ok(());
                    }
                }
                self.issue_turn(player, now);
                Ok(())
            }
            Err(NoLivingPlayer) => {
                self.finish(EndReason::LastPlayerStanding);
                Ok(())
            }
        }
    }

    /// Timeouts too long to represent leave the turn open for a year
    fn deadline_from(&self, now: Instant) -> Instant {
        now.checked_add(self.turn_timeout)
            .unwrap_or_else(|| now + Duration::from_secs(365 * 24 * 60 * 60))
    }

        fn issue_turn(&mut self, player: PlayerId, now: Instant) {
        let mut code: u64 = self.code_rng.gen();
        while self.last_code == Some(code) {
            code = self.code_rng.gen();
        }
        self.last_code = Some(code);
        self.turns_issued += 1;
        self.state = TurnState::AwaitingCommands {
            player,
            code,
            deadline: self.deadline_from(now),
        };
        self.pending_ticket = Some(TurnTicket {
            player,
            code,
            turn: self.world.turn(),
            board: self.world.player_view(player),
        });
        tracing::info!("Turn {} issued to {}", self.world.turn(), player);
    }

    fn finish(&mut self, reason: EndReason) {
        let winner = match reason {
            EndReason::LastPlayerStanding => match self.directory.living().as_slice() {
                [only] => Some(*only),
                _ => None,
            },
            EndReason::RoundLimit => {
                let standings = self.standings();
                let best = standings.iter().map(|&(_, held)| held).max().unwrap_or(0);
                let mut leaders = standings.iter().filter(|&&(_, held)| held == best);
                match (leaders.next(), leaders.next()) {
                    (Some(&(player, _)), None) => Some(player),
                    _ => None,
                }
            }
        };
        self.state = TurnState::GameOver { winner, reason };
        self.pending_ticket = None;
        match winner {
            Some(player) => tracing::info!("Game over after turn {}: {} wins ({:?})", self.world.turn(), player, reason),
            None => tracing::info!("Game over after turn {}: no winner ({:?})", self.world.turn(), reason),
        }
    }
}
