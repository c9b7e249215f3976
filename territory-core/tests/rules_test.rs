//! Integration tests for the territory rules engine
//!
//! Exercises the world through its public surface: setup, actions, round
//! upkeep and fog-of-war views.

use std::sync::Arc;
use territory_core::{
    actions, ActionError, Board, BuildingType, GameConfig, ItemType, PlayerId, Position, Production,
    RuleBook, RuleViolation, TerrainType, UnitType, World,
};

const ALICE: PlayerId = PlayerId(1);
const BOB: PlayerId = PlayerId(2);

// ============================================================================
// TEST FIXTURES
// ============================================================================

/// Four tiles wide, all grass
fn simple_world() -> World {
    let board = Board::new(4, 4, TerrainType::Grass).unwrap();
    World::new(board, Arc::new(RuleBook::standard()), GameConfig::default().with_seed(7)).unwrap()
}

fn assert_domains_normalized(world: &World) {
    for (pos, tile) in world.board().iter() {
        let total = tile.domain().total();
        assert!(
            tile.domain().is_empty() || (total - 1.0).abs() < 1e-9,
            "domain at {} sums to {}",
            pos,
            total
        );
    }
}

// ============================================================================
// MOVEMENT
// ============================================================================

#[test]
fn test_soldier_walks_two_tiles_then_stops() {
    let mut world = simple_world();
    let soldier = world.spawn_unit(ALICE, UnitType::Soldier, Position::new(0, 0)).unwrap();
    world.spawn_unit(BOB, UnitType::Soldier, Position::new(3, 3)).unwrap();
    let rules = Arc::clone(world.rules());

    actions::move_to(&mut world, soldier, Position::new(0, 1)).unwrap();
    assert_eq!(world.unit(soldier).unwrap().remaining_movements(&rules, world.turn()), 1);

    actions::move_to(&mut world, soldier, Position::new(0, 2)).unwrap();
    assert_eq!(world.unit(soldier).unwrap().remaining_movements(&rules, world.turn()), 0);

    let err = actions::move_to(&mut world, soldier, Position::new(0, 3)).unwrap_err();
    assert_eq!(err, ActionError::Rule(RuleViolation::NoRemainingMovements(soldier)));
    assert_eq!(world.unit(soldier).unwrap().position(), Position::new(0, 2));
}

#[test]
fn test_movements_refill_after_round() {
    let mut world = simple_world();
    let soldier = world.spawn_unit(ALICE, UnitType::Soldier, Position::new(0, 0)).unwrap();
    actions::move_to(&mut world, soldier, Position::new(0, 2)).unwrap();
    world.end_round().unwrap();

    let rules = Arc::clone(world.rules());
    assert_eq!(world.unit(soldier).unwrap().remaining_movements(&rules, world.turn()), 2);
    actions::move_to(&mut world, soldier, Position::new(0, 0)).unwrap();
}

#[test]
fn test_enclosed_goal_is_impossible() {
    let mut world = simple_world();
    let soldier = world.spawn_unit(ALICE, UnitType::Soldier, Position::new(0, 0)).unwrap();
    for pos in [Position::new(3, 2), Position::new(2, 3)] {
        world.spawn_unit(BOB, UnitType::Soldier, pos).unwrap();
    }
    // (3, 3) has only the two neighbours above, both held by Bob
    let err = actions::move_to(&mut world, soldier, Position::new(3, 3)).unwrap_err();
    assert!(matches!(err, ActionError::Rule(RuleViolation::ImpossibleRoute { .. })));
}

// ============================================================================
// COMBAT AND ELIMINATION
// ============================================================================

#[test]
fn test_killed_unit_leaves_board_and_registry() {
    let mut world = simple_world();
    let general = world.spawn_unit(ALICE, UnitType::General, Position::new(1, 1)).unwrap();
    let victim = world.spawn_unit(BOB, UnitType::Soldier, Position::new(1, 2)).unwrap();

    let outcome = actions::attack_at(&mut world, general, Position::new(1, 2)).unwrap();
    assert!(outcome.defender_died);
    assert!(world.unit(victim).is_err());
    assert!(!world.registry().contains(victim));
    assert!(world.board().tile(Position::new(1, 2)).unwrap().units().is_empty());

    assert!(world.is_eliminated(BOB));
    assert_eq!(world.take_eliminations(), vec![BOB]);
    assert!(!world.board().has_presence(BOB));
}

#[test]
fn test_defender_survives_with_building_left() {
    let mut world = simple_world();
    let general = world.spawn_unit(ALICE, UnitType::General, Position::new(1, 1)).unwrap();
    world.spawn_unit(BOB, UnitType::Soldier, Position::new(1, 2)).unwrap();
    world.place_building(BOB, BuildingType::Barrack, Position::new(3, 3)).unwrap();

    actions::attack_at(&mut world, general, Position::new(1, 2)).unwrap();
    assert!(!world.is_eliminated(BOB));
    assert!(world.take_eliminations().is_empty());
}

// ============================================================================
// DOMAIN AND BUILDINGS
// ============================================================================

#[test]
fn test_round_upkeep_keeps_domains_normalized() {
    let mut world = simple_world();
    world.spawn_unit(ALICE, UnitType::Priest, Position::new(0, 0)).unwrap();
    world.spawn_unit(BOB, UnitType::General, Position::new(3, 3)).unwrap();
    let city = world.place_building(ALICE, BuildingType::City, Position::new(1, 1)).unwrap();
    actions::set_production(&mut world, city, Production::Unit(UnitType::Soldier)).unwrap();

    for _ in 0..3 {
        world.end_round().unwrap();
        assert_domains_normalized(&world);
    }
    assert!(world.board().tile(Position::new(0, 0)).unwrap().domain().has_majority(ALICE));
    assert!(world.board().tile(Position::new(3, 3)).unwrap().domain().has_majority(BOB));
}

#[test]
fn test_priest_founds_city_that_produces_items() {
    let mut world = simple_world();
    let priest = world.spawn_unit(ALICE, UnitType::Priest, Position::new(2, 2)).unwrap();
    let city = actions::create_building(&mut world, priest, BuildingType::City).unwrap();
    actions::set_production(&mut world, city, Production::Item(ItemType::Glasses)).unwrap();

    for _ in 0..5 {
        world.end_round().unwrap();
    }
    assert_eq!(world.building(city).unwrap().inventory(), &[ItemType::Glasses]);

    let scout = world.spawn_unit(ALICE, UnitType::Soldier, Position::new(2, 2)).unwrap();
    actions::equip_unit(&mut world, scout, ItemType::Glasses).unwrap();
    assert_eq!(world.unit(scout).unwrap().stats(world.rules()).sight, 2);
}

// ============================================================================
// FOG OF WAR
// ============================================================================

#[test]
fn test_view_resolves_back_to_registry() {
    let mut world = simple_world();
    let soldier = world.spawn_unit(ALICE, UnitType::Soldier, Position::new(0, 0)).unwrap();
    world.spawn_unit(BOB, UnitType::Soldier, Position::new(3, 3)).unwrap();

    let view = world.player_view(ALICE);
    let seen = view.units_of(ALICE).next().unwrap();
    assert_eq!(seen.id(), soldier);
    assert_eq!(world.unit(seen.id()).unwrap().position(), seen.position());
    assert_eq!(view.units_of(BOB).count(), 0);
    assert_eq!(view.find_unit(soldier).map(|u| u.position()), Some(Position::new(0, 0)));
    assert_eq!(view.tile(Position::new(3, 3)).unwrap().terrain(), TerrainType::Unknown);
}
