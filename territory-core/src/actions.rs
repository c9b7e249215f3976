//! Unit and building actions applied to the authoritative world
//!
//! Every action resolves its element ids through the registry and checks its
//! own preconditions before touching the board; a rejected action leaves the
//! world unchanged.

use crate::board::{Position, Tile};
use crate::config::GameConfig;
use crate::elements::{Building, ElementId, PlayerId};
use crate::error::{ActionError, RuleViolation};
use crate::movement::{find_route, Route};
use crate::rules::{BuildingType, ItemType, Production};
use crate::world::World;
use std::sync::Arc;

/// Result of a successful move
#[derive(Clone, Debug, PartialEq)]
pub struct MoveOutcome {
    pub route: Route,
    /// Enemy building razed by entering its tile
    pub destroyed_building: Option<ElementId>,
}

/// Result of one exchange of blows
#[derive(Clone, Debug, PartialEq)]
pub struct AttackOutcome {
    pub defender: ElementId,
    pub damage_dealt: f64,
    pub damage_taken: f64,
    pub attacker_died: bool,
    pub defender_died: bool,
}

// ============================================================================
// HELPERS
// ============================================================================

/// Grouping bonus for crowded tiles, then the owner's domain share on top
fn tile_bonus(value: f64, tile: &Tile, owner: PlayerId, config: &GameConfig) -> f64 {
    let grouped = if tile.units().len() > config.grouping_threshold {
        value * config.grouping_bonus
    } else {
        value
    };
    grouped + grouped * tile.domain().share(owner)
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

fn check_in_bounds(world: &World, target: Position) -> Result<(), RuleViolation> {
    if world.board().contains(target) {
        Ok(())
    } else {
        Err(RuleViolation::InvalidDestination(target))
    }
}

/// Shared checks for ranged actions: movements left and target within range
fn check_ranged(world: &World, unit_id: ElementId, target: Position) -> Result<(), ActionError> {
    check_in_bounds(world, target)?;
    let rules = world.rules();
    let unit = world.unit(unit_id)?;
    if unit.remaining_movements(rules, world.turn()) == 0 {
        return Err(RuleViolation::NoRemainingMovements(unit_id).into());
    }
    let range = unit.stats(rules).range;
    let required = unit.position().distance_to(target);
    if required > range {
        return Err(RuleViolation::OutOfRange { required, range }.into());
    }
    Ok(())
}

/// Charge the terrain cost of `target` against the unit's movements
fn charge_terrain(world: &mut World, unit_id: ElementId, target: Position) -> Result<(), ActionError> {
    let rules = Arc::clone(world.rules());
    let turn = world.turn();
    let cost = rules.terrain(world.board().tile(target)?.terrain()).movement_cost;
    world.unit_mut(unit_id)?.spend_movements(cost, &rules, turn);
    Ok(())
}

/// Apply damage, removing the unit if it dies; true if it died
fn apply_damage(world: &mut World, unit_id: ElementId, damage: f64) -> Result<bool, ActionError> {
    if damage <= 0.0 {
        return Ok(false);
    }
    let unit = world.unit_mut(unit_id)?;
    unit.take_damage(damage);
    if !unit.is_dead() {
        return Ok(false);
    }
    let dead = world.remove_unit(unit_id)?;
    tracing::info!("Unit {} of {} died at {}", dead.id(), dead.owner(), dead.position());
    Ok(true)
}

// ============================================================================
// ACTIONS
// ============================================================================

/// Walk a unit along its cheapest route to `destination`
///
/// A single step is always allowed while the unit has movements left, even
/// when the terrain costs more than what remains.
pub fn move_to(world: &mut World, unit_id: ElementId, destination: Position) -> Result<MoveOutcome, ActionError> {
    check_in_bounds(world, destination)?;
    let rules = Arc::clone(world.rules());
    let turn = world.turn();

    let unit = world.unit(unit_id)?;
    let (owner, start) = (unit.owner(), unit.position());
    if destination == start {
        return Err(RuleViolation::SameDestination(start).into());
    }
    let remaining = unit.remaining_movements(&rules, turn);
    if remaining == 0 {
        return Err(RuleViolation::NoRemainingMovements(unit_id).into());
    }

    let mobility = rules.unit(unit.unit_type()).mobility;
    let route = find_route(world.board(), &rules, start, destination, owner, mobility)?;
    if route.len() > 2 && route.cost > remaining {
        return Err(RuleViolation::UnreachableDestination { cost: route.cost, remaining }.into());
    }

    world.unit_mut(unit_id)?.spend_movements(route.cost, &rules, turn);
    world.relocate_unit(unit_id, destination)?;
    tracing::debug!("Unit {} moved {} -> {} (cost {})", unit_id, start, destination, route.cost);

    let enemy_building = world
        .board()
        .tile(destination)?
        .building()
        .is_some_and(|b| b.owner() != owner);
    let destroyed_building = if enemy_building {
        world.destroy_building(destination)?.map(|b| b.id())
    } else {
        None
    };

    Ok(MoveOutcome { route, destroyed_building })
}

/// Attack the strongest defender on `target`
///
/// Both sides' power is scaled by the grouping and domain bonuses of their
/// own tile, then perturbed by a random factor. The attacker is damaged
/// first; either or both units may die.
pub fn attack_at(world: &mut World, unit_id: ElementId, target: Position) -> Result<AttackOutcome, ActionError> {
    check_ranged(world, unit_id, target)?;
    let rules = Arc::clone(world.rules());

    let unit = world.unit(unit_id)?;
    let owner = unit.owner();
    let stats = unit.stats(&rules);
    let own_tile = world.board().tile(unit.position())?;
    let target_tile = world.board().tile(target)?;
    if target_tile.has_units_of(owner) {
        return Err(RuleViolation::NoEnemyAtTarget(target).into());
    }

    // First unit with the highest defense takes the hit
    let mut defender = None;
    for candidate in target_tile.units() {
        let defense = candidate.stats(&rules).defense;
        if defender.map_or(true, |(_, best, _)| defense > best) {
            defender = Some((candidate, defense, candidate.stats(&rules).minimum_random_factor));
        }
    }
    let Some((defender, defense, defender_random)) = defender else {
        return Err(RuleViolation::NoEnemyAtTarget(target).into());
    };
    let defender_id = defender.id();

    let config = world.config();
    let attack = tile_bonus(stats.attack, own_tile, owner, config);
    let defense = tile_bonus(defense, target_tile, defender.owner(), config);

    let real_attack = attack * world.random_factor(stats.minimum_random_factor);
    let real_defense = defense * world.random_factor(defender_random);
    let total = real_attack + real_defense;

    // The counter-blow is divided by the defense power rather than scaled by it
    let damage_dealt = finite_or_zero(real_attack / total * attack);
    let damage_taken = finite_or_zero(real_defense / total / defense);

    charge_terrain(world, unit_id, target)?;
    let attacker_died = apply_damage(world, unit_id, damage_taken)?;
    let defender_died = apply_damage(world, defender_id, damage_dealt)?;
    tracing::debug!(
        "Unit {} attacked {} at {}: dealt {:.3}, took {:.3}",
        unit_id,
        defender_id,
        target,
        damage_dealt,
        damage_taken
    );

    Ok(AttackOutcome {
        defender: defender_id,
        damage_dealt,
        damage_taken,
        attacker_died,
        defender_died,
    })
}

/// Add the unit's influence to the domain at `target`; returns the amount added
pub fn influence_at(world: &mut World, unit_id: ElementId, target: Position, normalize: bool) -> Result<f64, ActionError> {
    check_ranged(world, unit_id, target)?;
    let rules = Arc::clone(world.rules());

    let unit = world.unit(unit_id)?;
    let owner = unit.owner();
    let stats = unit.stats(&rules);
    let own_tile = world.board().tile(unit.position())?;
    let influence = tile_bonus(stats.influence_factor, own_tile, owner, world.config());
    let amount = influence * world.random_factor(stats.minimum_random_factor);

    charge_terrain(world, unit_id, target)?;
    world.board_mut().tile_mut(target)?.domain_mut().add(owner, amount, normalize);
    tracing::debug!("Unit {} influenced {} by {:.3}", unit_id, target, amount);
    Ok(amount)
}

/// Found a building on the unit's tile; the unit is consumed
pub fn create_building(world: &mut World, unit_id: ElementId, building_type: BuildingType) -> Result<ElementId, ActionError> {
    let unit = world.unit(unit_id)?;
    let (owner, pos) = (unit.owner(), unit.position());
    if world.board().tile(pos)?.building().is_some() {
        return Err(RuleViolation::BuildingAlreadyInTile(pos).into());
    }

    let building = Building::new(owner, building_type, pos);
    let building_id = building.id();
    world.insert_building(building)?;
    world.remove_unit(unit_id)?;
    tracing::info!("{} founded {:?} {} at {}", owner, building_type, building_id, pos);
    Ok(building_id)
}

/// Hand an item from the building on the unit's tile to the unit; only the
/// building's owner may take from its stock
pub fn equip_unit(world: &mut World, unit_id: ElementId, item: ItemType) -> Result<(), ActionError> {
    let unit = world.unit(unit_id)?;
    let (owner, pos) = (unit.owner(), unit.position());
    if unit.has_item(item) {
        return Err(RuleViolation::UnitAlreadyHasItem(unit_id, item).into());
    }
    let building = world
        .board()
        .tile(pos)?
        .building()
        .ok_or(RuleViolation::NoBuildingInTile(pos))?;
    if building.owner() != owner {
        return Err(RuleViolation::NotOwner(building.id()).into());
    }
    if !building.inventory().contains(&item) {
        return Err(RuleViolation::ItemNotInInventory(pos, item).into());
    }

    let building_id = building.id();
    world.building_mut(building_id)?.take_item(item);
    world.unit_mut(unit_id)?.equip(item);
    tracing::debug!("Unit {} equipped {:?} from {}", unit_id, item, building_id);
    Ok(())
}

/// Change a building's order; false when it was already producing that
pub fn set_production(world: &mut World, building_id: ElementId, production: Production) -> Result<bool, ActionError> {
    let building = world.building_mut(building_id)?;
    if building.production() == Some(production) {
        return Ok(false);
    }
    building.set_production(Some(production));
    tracing::debug!("Building {} now producing {}", building_id, production);
    Ok(true)
}
