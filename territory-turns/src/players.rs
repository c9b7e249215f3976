//! Player directory - fixed turn order with liveness flags

use crate::error::NoLivingPlayer;
use territory_core::PlayerId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlayerSlot {
    pub id: PlayerId,
    pub alive: bool,
}

/// Result of moving the turn to the next living player
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Advance {
    pub player: PlayerId,
    /// The scan crossed the start of the list, completing a round
    pub wrapped: bool,
}

#[derive(Clone, Debug)]
pub struct PlayerDirectory {
    slots: Vec<PlayerSlot>,
    current: usize,
}

impl PlayerDirectory {
    /// Every player starts alive; the first in the list plays first
    pub fn new(players: &[PlayerId]) -> Self {
        Self {
            slots: players.iter().map(|&id| PlayerSlot { id, alive: true }).collect(),
            current: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &[PlayerSlot] {
        &self.slots
    }

    pub fn current(&self) -> Option<PlayerId> {
        self.slots.get(self.current).map(|s| s.id)
    }

    pub fn is_alive(&self, player: PlayerId) -> bool {
        self.slots.iter().any(|s| s.id == player && s.alive)
    }

    /// Mark a player dead; false if unknown or already dead
    pub fn set_not_alive(&mut self, player: PlayerId) -> bool {
        match self.slots.iter_mut().find(|s| s.id == player && s.alive) {
            Some(slot) => {
                slot.alive = false;
                true
            }
            None => false,
        }
    }

    pub fn living(&self) -> Vec<PlayerId> {
        self.slots.iter().filter(|s| s.alive).map(|s| s.id).collect()
    }

    /// Move to the next living player after the current one
    ///
    /// Fails when the scan comes back to the current index, i.e. nobody else
    /// is alive.
    pub fn next_player(&mut self) -> Result<Advance, NoLivingPlayer> {
        let n = self.slots.len();
        if n == 0 {
            return Err(NoLivingPlayer);
        }
        let start = self.current;
        let mut idx = start;
        loop {
            idx = (idx + 1) % n;
            if idx == start {
                return Err(NoLivingPlayer);
            }
            if self.slots[idx].alive {
                break;
            }
        }
        self.current = idx;
        Ok(Advance {
            player: self.slots[idx].id,
            wrapped: idx < start,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_players() -> PlayerDirectory {
        PlayerDirectory::new(&[PlayerId(1), PlayerId(2), PlayerId(3)])
    }

    #[test]
    fn test_rotation_wraps() {
        let mut players = three_players();
        assert_eq!(players.current(), Some(PlayerId(1)));
        assert_eq!(players.next_player(), Ok(Advance { player: PlayerId(2), wrapped: false }));
        assert_eq!(players.next_player(), Ok(Advance { player: PlayerId(3), wrapped: false }));
        assert_eq!(players.next_player(), Ok(Advance { player: PlayerId(1), wrapped: true }));
    }

    #[test]
    fn test_dead_players_skipped() {
        let mut players = three_players();
        assert!(players.set_not_alive(PlayerId(2)));
        assert!(!players.set_not_alive(PlayerId(2)));
        assert_eq!(players.next_player().unwrap().player, PlayerId(3));
        assert_eq!(players.living(), vec![PlayerId(1), PlayerId(3)]);
    }

    #[test]
    fn test_skipping_past_the_end_wraps() {
        let mut players = three_players();
        players.next_player().unwrap();
        players.set_not_alive(PlayerId(3));
        assert_eq!(players.next_player(), Ok(Advance { player: PlayerId(1), wrapped: true }));
    }

    #[test]
    fn test_last_player_standing() {
        let mut players = three_players();
        players.set_not_alive(PlayerId(2));
        players.set_not_alive(PlayerId(3));
        assert_eq!(players.next_player(), Err(NoLivingPlayer));
        assert_eq!(players.current(), Some(PlayerId(1)));
    }
}
