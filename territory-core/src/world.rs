//! Authoritative game world - board, registry, rules and the turn counter
//!
//! Everything that mutates the board funnels through here or through
//! [`crate::actions`], which operates on a `&mut World`.

use crate::board::{Board, Position};
use crate::config::GameConfig;
use crate::elements::{Building, ElementId, ElementKind, PlayerId, Unit};
use crate::error::{ActionError, ConfigError, ConsistencyError, RuleViolation};
use crate::registry::ElementRegistry;
use crate::rules::{BuildingType, Production, RuleBook, TerrainType, UnitType};
use crate::visibility;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rustc_hash::FxHashSet;
use std::sync::Arc;

/// Corner-start maps hold at most this many players
pub const MAX_GENERATED_PLAYERS: usize = 4;

/// What happened during one round's upkeep
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RoundReport {
    pub units_produced: Vec<ElementId>,
    pub items_produced: usize,
    pub units_healed: usize,
}

#[derive(Clone, Debug)]
pub struct World {
    board: Board,
    registry: ElementRegistry,
    rules: Arc<RuleBook>,
    config: GameConfig,
    turn: u64,
    rng: ChaCha8Rng,
    eliminated: FxHashSet<PlayerId>,
    pending_eliminations: Vec<PlayerId>,
}

impl World {
    /// Wrap an existing board; every element already on it is registered
    pub fn new(board: Board, rules: Arc<RuleBook>, config: GameConfig) -> Result<Self, ConsistencyError> {
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let mut registry = ElementRegistry::new();
        for unit in board.units() {
            registry.add_unit(unit)?;
        }
        for building in board.buildings() {
            registry.add_building(building)?;
        }
        Ok(Self {
            board,
            registry,
            rules,
            turn: config.first_turn,
            config,
            rng,
            eliminated: FxHashSet::default(),
            pending_eliminations: Vec::new(),
        })
    }

    /// Random terrain with each player starting in a corner with a City and a Soldier
    ///
    /// Returns the world and the player ids in turn order.
    pub fn generate(rules: Arc<RuleBook>, config: GameConfig) -> Result<(Self, Vec<PlayerId>), ConfigError> {
        if config.players == 0 {
            return Err(ConfigError::NoPlayers);
        }
        if config.players > MAX_GENERATED_PLAYERS {
            return Err(ConfigError::UnsupportedPlayerCount {
                requested: config.players,
                max: MAX_GENERATED_PLAYERS,
            });
        }

        let mut rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let board = Board::from_fn(config.width, config.height, |_| {
            TerrainType::PLAYABLE[rng.gen_range(0..TerrainType::PLAYABLE.len())]
        })?;

        let (width, height) = (config.width, config.height);
        let mut corners = vec![
            Position::new(0, 0),
            Position::new(0, height - 1),
            Position::new(width - 1, height - 1),
            Position::new(width - 1, 0),
        ];
        corners.sort();
        corners.dedup();
        if config.players > corners.len() {
            return Err(ConfigError::UnsupportedPlayerCount {
                requested: config.players,
                max: corners.len(),
            });
        }
        corners.shuffle(&mut rng);

        let players: Vec<PlayerId> = (1..=config.players as u32).map(PlayerId).collect();
        let mut world = World::new(board, rules, config)?;
        world.rng = rng;

        for (&player, &corner) in players.iter().zip(corners.iter()) {
            world.set_terrain(corner, TerrainType::Grass)?;
            world.insert_building(Building::new(player, BuildingType::City, corner))?;
            world.spawn_unit(player, UnitType::Soldier, corner)?;
            tracing::info!("{} starts at {}", player, corner);
        }
        Ok((world, players))
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn registry(&self) -> &ElementRegistry {
        &self.registry
    }

    pub fn rules(&self) -> &Arc<RuleBook> {
        &self.rules
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Global turn counter, advanced once per full round
    pub fn turn(&self) -> u64 {
        self.turn
    }

    /// Uniform value in `[min, 1]`
    pub fn random_factor(&mut self, min: f64) -> f64 {
        let min = min.clamp(0.0, 1.0);
        let u: f64 = self.rng.gen();
        1.0 - (1.0 - u) * (1.0 - min)
    }

    pub fn player_view(&self, player: PlayerId) -> Board {
        visibility::player_view(&self.board, &self.rules, player)
    }

    pub fn is_eliminated(&self, player: PlayerId) -> bool {
        self.eliminated.contains(&player)
    }

    // ========================================================================
    // SETUP
    // ========================================================================

    pub fn set_terrain(&mut self, pos: Position, terrain: TerrainType) -> Result<(), ConsistencyError> {
        self.board.tile_mut(pos)?.set_terrain(terrain);
        Ok(())
    }

    /// Add normalized domain for `player` on the tile at `pos`
    pub fn add_domain(&mut self, pos: Position, player: PlayerId, amount: f64) -> Result<(), ConsistencyError> {
        self.board.tile_mut(pos)?.domain_mut().add(player, amount, true);
        Ok(())
    }

    /// Create a fresh unit at `pos` and register it
    pub fn spawn_unit(&mut self, owner: PlayerId, unit_type: UnitType, pos: Position) -> Result<ElementId, ConsistencyError> {
        let unit = Unit::new(owner, unit_type, pos, &self.rules, self.turn);
        let id = unit.id();
        let tile = self.board.tile_mut(pos)?;
        self.registry.add_unit(&unit)?;
        tile.units_mut().push(unit);
        Ok(id)
    }

    /// Create a building at `pos`; the tile must not have one already
    pub fn place_building(&mut self, owner: PlayerId, building_type: BuildingType, pos: Position) -> Result<ElementId, ActionError> {
        if self.board.tile(pos)?.building().is_some() {
            return Err(RuleViolation::BuildingAlreadyInTile(pos).into());
        }
        let building = Building::new(owner, building_type, pos);
        let id = building.id();
        self.insert_building(building)?;
        Ok(id)
    }

    pub(crate) fn insert_building(&mut self, building: Building) -> Result<(), ConsistencyError> {
        let pos = building.position();
        let tile = self.board.tile_mut(pos)?;
        self.registry.add_building(&building)?;
        if let Some(old) = tile.set_building(Some(building)) {
            self.registry.remove(old.id())?;
        }
        Ok(())
    }

    // ========================================================================
    // ELEMENT RESOLUTION
    // ========================================================================

    /// Resolve a unit through the registry to its live instance
    pub fn unit(&self, id: ElementId) -> Result<&Unit, ConsistencyError> {
        let entry = self.registry.get_kind(id, ElementKind::Unit)?;
        self.board
            .tile(entry.position)?
            .unit(id)
            .ok_or(ConsistencyError::ElementNotFound(id))
    }

    pub(crate) fn unit_mut(&mut self, id: ElementId) -> Result<&mut Unit, ConsistencyError> {
        let entry = *self.registry.get_kind(id, ElementKind::Unit)?;
        self.board
            .tile_mut(entry.position)?
            .unit_mut(id)
            .ok_or(ConsistencyError::ElementNotFound(id))
    }

    pub fn building(&self, id: ElementId) -> Result<&Building, ConsistencyError> {
        let entry = self.registry.get_kind(id, ElementKind::Building)?;
        self.board
            .tile(entry.position)?
            .building()
            .filter(|b| b.id() == id)
            .ok_or(ConsistencyError::ElementNotFound(id))
    }

    pub(crate) fn building_mut(&mut self, id: ElementId) -> Result<&mut Building, ConsistencyError> {
        let entry = *self.registry.get_kind(id, ElementKind::Building)?;
        self.board
            .tile_mut(entry.position)?
            .building_mut()
            .filter(|b| b.id() == id)
            .ok_or(ConsistencyError::ElementNotFound(id))
    }

    pub(crate) fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    pub(crate) fn registry_mut(&mut self) -> &mut ElementRegistry {
        &mut self.registry
    }

    // ========================================================================
    // REMOVAL AND ELIMINATION
    // ========================================================================

    /// Move a unit between tiles, keeping the registry in step
    pub(crate) fn relocate_unit(&mut self, id: ElementId, to: Position) -> Result<(), ConsistencyError> {
        let from = self.registry.get_kind(id, ElementKind::Unit)?.position;
        self.board.tile(to)?;
        let mut unit = self
            .board
            .tile_mut(from)?
            .remove_unit(id)
            .ok_or(ConsistencyError::ElementNotFound(id))?;
        unit.set_position(to);
        self.board.tile_mut(to)?.units_mut().push(unit);
        self.registry.relocate(id, to)
    }

    /// Remove a unit from the board and registry, eliminating its owner if
    /// that was the last thing they had
    pub(crate) fn remove_unit(&mut self, id: ElementId) -> Result<Unit, ConsistencyError> {
        let entry = *self.registry.get_kind(id, ElementKind::Unit)?;
        let unit = self
            .board
            .tile_mut(entry.position)?
            .remove_unit(id)
            .ok_or(ConsistencyError::ElementNotFound(id))?;
        self.registry.remove(id)?;
        self.check_elimination(entry.owner)?;
        Ok(unit)
    }

    /// Destroy the building at `pos`, if any, with the same elimination check
    pub(crate) fn destroy_building(&mut self, pos: Position) -> Result<Option<Building>, ConsistencyError> {
        let Some(building) = self.board.tile_mut(pos)?.set_building(None) else {
            return Ok(None);
        };
        self.registry.remove(building.id())?;
        tracing::info!("Building {} of {} destroyed at {}", building.id(), building.owner(), pos);
        self.check_elimination(building.owner())?;
        Ok(Some(building))
    }

    /// Eliminate `player` if nothing of theirs remains; true if eliminated now
    pub(crate) fn check_elimination(&mut self, player: PlayerId) -> Result<bool, ConsistencyError> {
        if self.eliminated.contains(&player) || self.board.has_presence(player) {
            return Ok(false);
        }
        self.eliminate_player(player)?;
        Ok(true)
    }

    /// Remove every element and domain share of `player` and record the elimination
    pub fn eliminate_player(&mut self, player: PlayerId) -> Result<(), ConsistencyError> {
        for id in self.registry.owned_by(player) {
            let entry = self.registry.remove(id)?;
            let tile = self.board.tile_mut(entry.position)?;
            match entry.kind {
                ElementKind::Unit => {
                    tile.remove_unit(id).ok_or(ConsistencyError::ElementNotFound(id))?;
                }
                ElementKind::Building => {
                    tile.set_building(None).ok_or(ConsistencyError::ElementNotFound(id))?;
                }
            }
        }
        for tile in self.board.tiles_mut() {
            if tile.domain().iter().any(|(p, _)| p == player) {
                tile.domain_mut().remove(player);
            }
        }
        if self.eliminated.insert(player) {
            self.pending_eliminations.push(player);
            tracing::info!("{} eliminated", player);
        }
        Ok(())
    }

    /// Players eliminated since the last call
    pub fn take_eliminations(&mut self) -> Vec<PlayerId> {
        std::mem::take(&mut self.pending_eliminations)
    }

    // ========================================================================
    // END OF ROUND
    // ========================================================================

    /// Add un-normalized influence to a tile and its neighbours
    fn spread_influence(&mut self, pos: Position, owner: PlayerId, amount: f64) -> Result<(), ConsistencyError> {
        self.board.tile_mut(pos)?.domain_mut().add(owner, amount, false);
        for neighbor in self.board.neighbors(pos) {
            self.board.tile_mut(neighbor)?.domain_mut().add(owner, amount, false);
        }
        Ok(())
    }

    /// Advance production on the tile's building and deliver a finished order
    fn process_production(&mut self, pos: Position, report: &mut RoundReport) -> Result<(), ConsistencyError> {
        let rules = Arc::clone(&self.rules);
        let turn = self.turn;
        let tile = self.board.tile_mut(pos)?;
        let Some(building) = tile.building_mut() else {
            return Ok(());
        };
        let Some(order) = building.production() else {
            return Ok(());
        };

        let attributes = rules.building(building.building_type());
        building.add_progress(attributes.production_rate);
        if building.progress() < order.cost(&rules) {
            return Ok(());
        }

        let owner = building.owner();
        let building_id = building.id();
        building.set_production(None);
        match order {
            Production::Unit(unit_type) => {
                let unit = Unit::new(owner, unit_type, pos, &rules, turn);
                report.units_produced.push(unit.id());
                self.registry.add_unit(&unit)?;
                tile.units_mut().push(unit);
            }
            Production::Item(item) => {
                building.stock(item);
                report.items_produced += 1;
            }
        }
        tracing::info!("Building {} finished {}", building_id, order);
        self.spread_influence(pos, owner, attributes.influence_factor)
    }

    /// Heal rested units, spread their influence and refill their movements
    fn process_units(&mut self, pos: Position, report: &mut RoundReport) -> Result<(), ConsistencyError> {
        let rules = Arc::clone(&self.rules);
        let turn = self.turn;
        let recover = self.config.health_recover_per_turn;
        let mut influence = Vec::new();

        for unit in self.board.tile_mut(pos)?.units_mut() {
            let stats = unit.stats(&rules);
            if unit.remaining_movements(&rules, turn) == stats.movements && unit.health() < stats.max_health {
                unit.heal(recover, &rules);
                report.units_healed += 1;
            }
            influence.push((unit.owner(), stats.influence_factor));
            unit.set_remaining_movements(stats.movements, turn);
        }

        for (owner, amount) in influence {
            self.spread_influence(pos, owner, amount)?;
        }
        Ok(())
    }

    /// Round upkeep over every tile in row-major order, then one batched
    /// normalization, then the turn counter advances
    pub fn end_round(&mut self) -> Result<RoundReport, ConsistencyError> {
        let mut report = RoundReport::default();
        let positions: Vec<Position> = self.board.positions().collect();
        for pos in positions {
            self.process_production(pos, &mut report)?;
            self.process_units(pos, &mut report)?;
        }
        self.board.normalize_domains();
        self.turn += 1;
        tracing::info!("Turn {} begins", self.turn);
        Ok(report)
    }
}
