//! Dispatch table - one executor per command type
//!
//! Executors run the command-level checks (ownership, occupancy, domain
//! majority) and then hand off to the core actions.

use crate::commands::{CommandKind, CommandType, PlayerCommand};
use crate::error::{CoordinatorError, ExecutionError};
use rustc_hash::FxHashMap;
use territory_core::{actions, ElementId, PlayerId, Position, RuleViolation, Unit, World};

/// What the coordinator should do after a successful executor call
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Effect {
    Applied,
    EndTurn,
}

pub type Executor = fn(&mut World, &PlayerCommand) -> Result<Effect, ExecutionError>;

#[derive(Clone)]
pub struct DispatchTable {
    executors: FxHashMap<CommandType, Executor>,
}

impl DispatchTable {
    /// Table with no executors; every command fails closed
    pub fn empty() -> Self {
        Self { executors: FxHashMap::default() }
    }

    /// The stock executor for every command type
    pub fn standard() -> Self {
        Self::empty()
            .with(CommandType::EndOfTurn, execute_end_of_turn)
            .with(CommandType::MoveTo, execute_move_to)
            .with(CommandType::Attack, execute_attack)
            .with(CommandType::InfluenceAt, execute_influence_at)
            .with(CommandType::EquipUnit, execute_equip_unit)
            .with(CommandType::SetProduction, execute_set_production)
            .with(CommandType::CreateBuilding, execute_create_building)
    }

    pub fn with(mut self, command_type: CommandType, executor: Executor) -> Self {
        self.executors.insert(command_type, executor);
        self
    }

    pub fn without(mut self, command_type: CommandType) -> Self {
        self.executors.remove(&command_type);
        self
    }

    pub fn get(&self, command_type: CommandType) -> Option<Executor> {
        self.executors.get(&command_type).copied()
    }
}

impl Default for DispatchTable {
    fn default() -> Self {
        Self::standard()
    }
}

// ============================================================================
// COMMAND-LEVEL CHECKS
// ============================================================================

fn misrouted(expected: CommandType, command: &PlayerCommand) -> ExecutionError {
    CoordinatorError::MisroutedCommand {
        expected,
        received: command.command_type(),
    }
    .into()
}

/// Resolve a player-supplied unit id and check who really owns it
fn owned_unit(world: &World, player: PlayerId, id: ElementId) -> Result<&Unit, ExecutionError> {
    if !world.registry().contains(id) {
        return Err(RuleViolation::NoSuchElement(id).into());
    }
    let unit = world.unit(id)?;
    if unit.owner() != player {
        return Err(RuleViolation::NotOwner(id).into());
    }
    Ok(unit)
}

fn in_bounds(world: &World, pos: Position) -> Result<(), RuleViolation> {
    if world.board().contains(pos) {
        Ok(())
    } else {
        Err(RuleViolation::InvalidDestination(pos))
    }
}

// ============================================================================
// EXECUTORS
// ============================================================================

fn execute_end_of_turn(_world: &mut World, command: &PlayerCommand) -> Result<Effect, ExecutionError> {
    match command.kind() {
        CommandKind::EndOfTurn => Ok(Effect::EndTurn),
        _ => Err(misrouted(CommandType::EndOfTurn, command)),
    }
}

fn execute_move_to(world: &mut World, command: &PlayerCommand) -> Result<Effect, ExecutionError> {
    let CommandKind::MoveTo { unit, destination } = *command.kind() else {
        return Err(misrouted(CommandType::MoveTo, command));
    };
    owned_unit(world, command.player(), unit)?;
    in_bounds(world, destination)?;
    if world.board().tile(destination)?.has_foreign_units(command.player()) {
        return Err(RuleViolation::TileOccupiedByEnemy(destination).into());
    }
    actions::move_to(world, unit, destination)?;
    Ok(Effect::Applied)
}

fn execute_attack(world: &mut World, command: &PlayerCommand) -> Result<Effect, ExecutionError> {
    let CommandKind::Attack { unit, target } = *command.kind() else {
        return Err(misrouted(CommandType::Attack, command));
    };
    owned_unit(world, command.player(), unit)?;
    in_bounds(world, target)?;
    let tile = world.board().tile(target)?;
    if tile.units().is_empty() || tile.has_units_of(command.player()) {
        return Err(RuleViolation::NoEnemyAtTarget(target).into());
    }
    actions::attack_at(world, unit, target)?;
    Ok(Effect::Applied)
}

fn execute_influence_at(world: &mut World, command: &PlayerCommand) -> Result<Effect, ExecutionError> {
    let CommandKind::InfluenceAt { unit, target } = *command.kind() else {
        return Err(misrouted(CommandType::InfluenceAt, command));
    };
    owned_unit(world, command.player(), unit)?;
    in_bounds(world, target)?;
    actions::influence_at(world, unit, target, true)?;
    Ok(Effect::Applied)
}

fn execute_equip_unit(world: &mut World, command: &PlayerCommand) -> Result<Effect, ExecutionError> {
    let CommandKind::EquipUnit { unit, item } = *command.kind() else {
        return Err(misrouted(CommandType::EquipUnit, command));
    };
    owned_unit(world, command.player(), unit)?;
    actions::equip_unit(world, unit, item)?;
    Ok(Effect::Applied)
}

fn execute_set_production(world: &mut World, command: &PlayerCommand) -> Result<Effect, ExecutionError> {
    let CommandKind::SetProduction { building, production } = *command.kind() else {
        return Err(misrouted(CommandType::SetProduction, command));
    };
    if !world.registry().contains(building) {
        return Err(RuleViolation::NoSuchElement(building).into());
    }
    if world.building(building)?.owner() != command.player() {
        return Err(RuleViolation::NotOwner(building).into());
    }
    actions::set_production(world, building, production)?;
    Ok(Effect::Applied)
}

fn execute_create_building(world: &mut World, command: &PlayerCommand) -> Result<Effect, ExecutionError> {
    let CommandKind::CreateBuilding { unit, building_type } = *command.kind() else {
        return Err(misrouted(CommandType::CreateBuilding, command));
    };
    let player = command.player();
    let founder = owned_unit(world, player, unit)?;
    let rules = world.rules();
    if !founder.can_found_buildings(rules) {
        return Err(RuleViolation::UnitCannotFoundBuilding(founder.unit_type(), building_type).into());
    }

    let pos = founder.position();
    let tile = world.board().tile(pos)?;
    if !tile.domain().has_majority(player) {
        return Err(RuleViolation::NoMajorityDomain {
            position: pos,
            share: tile.domain().normalized_share(player),
        }
        .into());
    }
    if tile.building().is_some() {
        return Err(RuleViolation::BuildingAlreadyInTile(pos).into());
    }
    if !rules.terrain(tile.terrain()).can_receive_building {
        return Err(RuleViolation::TileCannotReceiveBuilding(pos).into());
    }

    actions::create_building(world, unit, building_type)?;
    Ok(Effect::Applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use territory_core::{Board, BuildingType, GameConfig, RuleBook, TerrainType, UnitType};

    const P1: PlayerId = PlayerId(1);
    const P2: PlayerId = PlayerId(2);

    fn simple_world() -> World {
        let board = Board::new(4, 4, TerrainType::Grass).unwrap();
        World::new(board, Arc::new(RuleBook::standard()), GameConfig::default().with_seed(5)).unwrap()
    }

    fn run(world: &mut World, command: PlayerCommand) -> Result<Effect, ExecutionError> {
        let executor = DispatchTable::standard().get(command.command_type()).unwrap();
        executor(world, &command)
    }

    #[test]
    fn test_standard_table_covers_every_type() {
        let table = DispatchTable::standard();
        for t in CommandType::ALL {
            assert!(table.get(t).is_some(), "{:?}", t);
        }
        assert!(table.without(CommandType::Attack).get(CommandType::Attack).is_none());
    }

    #[test]
    fn test_misrouted_command_is_fatal() {
        let mut world = simple_world();
        let command = PlayerCommand::end_of_turn(P1);
        let err = execute_move_to(&mut world, &command).unwrap_err();
        assert!(matches!(err, ExecutionError::Fatal(CoordinatorError::MisroutedCommand { .. })));
    }

    #[test]
    fn test_move_into_enemy_tile_rejected() {
        let mut world = simple_world();
        let unit = world.spawn_unit(P1, UnitType::Soldier, Position::new(0, 0)).unwrap();
        world.spawn_unit(P2, UnitType::Soldier, Position::new(0, 1)).unwrap();
        let command = PlayerCommand::from_parts(P1, CommandKind::MoveTo { unit, destination: Position::new(0, 1) });
        assert_eq!(
            run(&mut world, command),
            Err(ExecutionError::Rule(RuleViolation::TileOccupiedByEnemy(Position::new(0, 1))))
        );
    }

    #[test]
    fn test_foreign_unit_rejected_after_resolution() {
        let mut world = simple_world();
        let unit = world.spawn_unit(P2, UnitType::Soldier, Position::new(0, 0)).unwrap();
        let command = PlayerCommand::from_parts(P1, CommandKind::MoveTo { unit, destination: Position::new(0, 1) });
        assert_eq!(run(&mut world, command), Err(ExecutionError::Rule(RuleViolation::NotOwner(unit))));
    }

    #[test]
    fn test_dead_unit_is_a_rule_violation() {
        let mut world = simple_world();
        let unit = ElementId::fresh();
        let command = PlayerCommand::from_parts(P1, CommandKind::InfluenceAt { unit, target: Position::new(0, 1) });
        assert_eq!(run(&mut world, command), Err(ExecutionError::Rule(RuleViolation::NoSuchElement(unit))));
    }

    #[test]
    fn test_create_building_requires_majority() {
        let mut world = simple_world();
        let priest = world.spawn_unit(P1, UnitType::Priest, Position::new(2, 2)).unwrap();
        world.add_domain(Position::new(2, 2), P1, 1.0).unwrap();
        world.add_domain(Position::new(2, 2), P2, 1.0).unwrap();
        let command = PlayerCommand::from_parts(
            P1,
            CommandKind::CreateBuilding { unit: priest, building_type: BuildingType::City },
        );
        assert!(matches!(
            run(&mut world, command.clone()),
            Err(ExecutionError::Rule(RuleViolation::NoMajorityDomain { .. }))
        ));

        world.add_domain(Position::new(2, 2), P1, 0.5).unwrap();
        assert_eq!(run(&mut world, command), Ok(Effect::Applied));
        assert!(world.board().tile(Position::new(2, 2)).unwrap().building().is_some());
    }

    #[test]
    fn test_create_building_on_forest_rejected() {
        let mut world = simple_world();
        world.set_terrain(Position::new(1, 1), TerrainType::Forest).unwrap();
        world.add_domain(Position::new(1, 1), P1, 1.0).unwrap();
        let priest = world.spawn_unit(P1, UnitType::Priest, Position::new(1, 1)).unwrap();
        let command = PlayerCommand::from_parts(
            P1,
            CommandKind::CreateBuilding { unit: priest, building_type: BuildingType::Barrack },
        );
        assert_eq!(
            run(&mut world, command),
            Err(ExecutionError::Rule(RuleViolation::TileCannotReceiveBuilding(Position::new(1, 1))))
        );
    }

    #[test]
    fn test_end_of_turn_effect() {
        let mut world = simple_world();
        assert_eq!(run(&mut world, PlayerCommand::end_of_turn(P1)), Ok(Effect::EndTurn));
    }
}
