//! Example player - plays the basics of the game, no strategy
//!
//! Every unit tries, in order: found a city, pick up an item, spread
//! influence, attack, wander. Idle buildings are set to train lieutenants.

use std::sync::Mutex;

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use territory_core::{
    Board, BuildingType, ElementId, PlayerId, Position, Production, RuleBook, TerrainType, Unit, UnitType,
};
use territory_turns::{CommandResponse, DecisionRoutine, PlayerCommand, TurnHandle};

pub struct ExampleAi {
    rng: Mutex<ChaCha8Rng>,
}

impl ExampleAi {
    pub fn new() -> Self {
        Self { rng: Mutex::new(ChaCha8Rng::from_entropy()) }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self { rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)) }
    }
}

impl Default for ExampleAi {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionRoutine for ExampleAi {
    fn play_turn(&self, board: Board, handle: TurnHandle) {
        let mut rng = match self.rng.lock() {
            Ok(rng) => rng,
            Err(poisoned) => poisoned.into_inner(),
        };
        let me = handle.player();
        let units: Vec<ElementId> = board.units_of(me).map(|u| u.id()).collect();
        let buildings: Vec<ElementId> = board.buildings_of(me).map(|b| b.id()).collect();
        let mut turn = Turn { handle: &handle, board, stopped: false };

        for id in units {
            found_city(&mut turn, id);
            equip(&mut turn, id);
            influence(&mut turn, id, &mut *rng);
            attack(&mut turn, id);
            wander(&mut turn, id, &mut *rng);
            if turn.is_over() {
                return;
            }
        }
        for id in buildings {
            set_production(&mut turn, id);
        }
        if !turn.is_over() {
            handle.end_turn();
        }
    }
}

/// The latest board seen this turn and the connection it came from
struct Turn<'a> {
    handle: &'a TurnHandle,
    board: Board,
    stopped: bool,
}

impl Turn<'_> {
    fn me(&self) -> PlayerId {
        self.handle.player()
    }

    fn rules(&self) -> &RuleBook {
        self.handle.rules()
    }

    fn is_over(&self) -> bool {
        self.stopped || self.handle.is_cancelled()
    }

    /// The unit as of the latest board, if it is still alive and this turn goes on
    fn unit(&self, id: ElementId) -> Option<Unit> {
        if self.is_over() {
            return None;
        }
        self.board.find_unit(id).cloned()
    }

    fn remaining(&self, unit: &Unit) -> u32 {
        unit.remaining_movements(self.rules(), self.handle.turn())
    }

    /// Submit and adopt the returned board; false if the command was refused
    fn send(&mut self, command: PlayerCommand) -> bool {
        match self.handle.submit(command) {
            CommandResponse::Ok { board } => {
                self.board = board;
                true
            }
            CommandResponse::Rejected { board: Some(board), reason } => {
                tracing::debug!("{} command refused: {}", self.me(), reason);
                self.board = board;
                false
            }
            CommandResponse::Rejected { board: None, reason } => {
                tracing::debug!("{} stops playing: {}", self.me(), reason);
                self.stopped = true;
                false
            }
        }
    }
}

// ============================================================================
// UNIT ACTIONS
// ============================================================================

/// Priests found a city when there is no building on or next to their tile
fn found_city(turn: &mut Turn, id: ElementId) {
    let Some(unit) = turn.unit(id) else { return };
    if !unit.can_found_buildings(turn.rules()) || !may_found_here(&turn.board, unit.position()) {
        return;
    }
    if let Ok(command) = PlayerCommand::create_building(turn.me(), &unit, BuildingType::City, turn.rules()) {
        turn.send(command);
    }
}

/// Pick up the first item stocked in one of our buildings
fn equip(turn: &mut Turn, id: ElementId) {
    let Some(unit) = turn.unit(id) else { return };
    let item = turn
        .board
        .get(unit.position())
        .and_then(|tile| tile.building())
        .filter(|b| b.owner() == turn.me())
        .and_then(|b| b.inventory().first().copied());
    if let Some(item) = item {
        if let Ok(command) = PlayerCommand::equip_unit(turn.me(), &unit, item) {
            turn.send(command);
        }
    }
}

/// With probability equal to the influence factor, push domain on every
/// tile in range that is not fully ours yet
fn influence(turn: &mut Turn, id: ElementId, rng: &mut impl Rng) {
    let Some(unit) = turn.unit(id) else { return };
    let stats = unit.stats(turn.rules());
    if rng.gen::<f64>() > stats.influence_factor {
        return;
    }
    for target in turn.board.neighbors_within(unit.position(), stats.range) {
        let Some(unit) = turn.unit(id) else { return };
        if turn.remaining(&unit) == 0 {
            return;
        }
        let full = turn.board.get(target).is_some_and(|t| t.domain().share(turn.me()) >= 1.0);
        if full {
            continue;
        }
        if let Ok(command) = PlayerCommand::influence_at(turn.me(), &unit, target) {
            turn.send(command);
        }
    }
}

/// Keep hitting the first enemy in range while movements last
fn attack(turn: &mut Turn, id: ElementId) {
    while let Some(unit) = turn.unit(id) {
        if turn.remaining(&unit) == 0 {
            return;
        }
        let range = unit.stats(turn.rules()).range;
        let target = turn
            .board
            .neighbors_within(unit.position(), range)
            .into_iter()
            .find(|&p| turn.board.get(p).is_some_and(|t| t.has_foreign_units(turn.me())));
        let Some(target) = target else { return };
        let Ok(command) = PlayerCommand::attack(turn.me(), &unit, target) else { return };
        if !turn.send(command) {
            return;
        }
    }
}

/// Step to a neighbouring tile, preferring enemy buildings, until out of movements
fn wander(turn: &mut Turn, id: ElementId, rng: &mut impl Rng) {
    while let Some(unit) = turn.unit(id) {
        if turn.remaining(&unit) == 0 {
            return;
        }
        let open = open_neighbors(&turn.board, turn.rules(), &unit);
        let Some(destination) = pick_destination(&turn.board, turn.me(), &open, rng) else { return };
        let Ok(command) = PlayerCommand::move_to(turn.me(), &unit, destination) else { return };
        if !turn.send(command) {
            return;
        }
    }
}

fn set_production(turn: &mut Turn, id: ElementId) {
    if turn.is_over() {
        return;
    }
    let Some(building) = turn.board.find_building(id).cloned() else { return };
    if building.production().is_some() {
        return;
    }
    let order = Production::Unit(UnitType::Lieutenant);
    if let Ok(command) = PlayerCommand::set_production(turn.me(), &building, order) {
        turn.send(command);
    }
}

// ============================================================================
// HELPERS
// ============================================================================

fn may_found_here(board: &Board, pos: Position) -> bool {
    std::iter::once(pos)
        .chain(board.neighbors(pos))
        .all(|p| board.get(p).is_some_and(|t| t.building().is_none()))
}

/// Neighbours the unit could step onto as far as this board shows
fn open_neighbors(board: &Board, rules: &RuleBook, unit: &Unit) -> Vec<Position> {
    let mobility = rules.unit(unit.unit_type()).mobility;
    board
        .neighbors(unit.position())
        .into_iter()
        .filter(|&p| {
            board.get(p).is_some_and(|t| {
                t.terrain() != TerrainType::Unknown
                    && !t.has_foreign_units(unit.owner())
                    && mobility.admits(rules.terrain(t.terrain()))
            })
        })
        .collect()
}

fn pick_destination(board: &Board, me: PlayerId, open: &[Position], rng: &mut impl Rng) -> Option<Position> {
    let enemy_building = open.iter().copied().find(|&p| {
        board
            .get(p)
            .and_then(|t| t.building())
            .is_some_and(|b| b.owner() != me)
    });
    enemy_building.or_else(|| open.choose(rng).copied())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use territory_core::{GameConfig, World};

    const ME: PlayerId = PlayerId(1);
    const FOE: PlayerId = PlayerId(2);

    fn grass_world() -> World {
        let board = Board::new(5, 5, TerrainType::Grass).unwrap();
        World::new(board, Arc::new(RuleBook::standard()), GameConfig::default().with_seed(3)).unwrap()
    }

    #[test]
    fn test_no_city_next_to_a_building() {
        let mut world = grass_world();
        world.place_building(FOE, BuildingType::Barrack, Position::new(2, 1)).unwrap();
        assert!(!may_found_here(world.board(), Position::new(2, 2)));
        assert!(may_found_here(world.board(), Position::new(0, 4)));
    }

    #[test]
    fn test_open_neighbors_skip_enemies_and_water() {
        let mut world = grass_world();
        let soldier = world.spawn_unit(ME, UnitType::Soldier, Position::new(2, 2)).unwrap();
        world.spawn_unit(FOE, UnitType::Soldier, Position::new(2, 1)).unwrap();
        world.set_terrain(Position::new(2, 3), TerrainType::Water).unwrap();

        let unit = world.unit(soldier).unwrap();
        let open = open_neighbors(world.board(), world.rules(), unit);
        assert_eq!(open.len(), 4);
        assert!(!open.contains(&Position::new(2, 1)));
        assert!(!open.contains(&Position::new(2, 3)));
    }

    #[test]
    fn test_enemy_building_is_preferred() {
        let mut world = grass_world();
        world.place_building(FOE, BuildingType::City, Position::new(3, 2)).unwrap();
        let open = [Position::new(1, 2), Position::new(3, 2), Position::new(2, 3)];
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        for _ in 0..10 {
            assert_eq!(pick_destination(world.board(), ME, &open, &mut rng), Some(Position::new(3, 2)));
        }
        assert_eq!(pick_destination(world.board(), ME, &[], &mut rng), None);
    }
}
