//! Game elements - units and buildings placed on tiles

use crate::board::Position;
use crate::rules::{BuildingType, ItemType, Production, RuleBook, UnitStats, UnitType};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ELEMENT_ID: AtomicU64 = AtomicU64::new(1);

/// Player identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u32);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// Process-unique element identifier, stable across board copies
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(pub u64);

impl ElementId {
    /// Allocate an id never handed out before in this process
    pub fn fresh() -> Self {
        ElementId(NEXT_ELEMENT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    Unit,
    Building,
}

impl ElementKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            ElementKind::Unit => "unit",
            ElementKind::Building => "building",
        }
    }
}

// ============================================================================
// UNIT
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    id: ElementId,
    owner: PlayerId,
    unit_type: UnitType,
    position: Position,
    health: f64,
    items: Vec<ItemType>,
    remaining_movements: u32,
    last_movement_turn: u64,
}

impl Unit {
    /// A fresh unit at full health and full movements for `turn`
    pub fn new(owner: PlayerId, unit_type: UnitType, position: Position, rules: &RuleBook, turn: u64) -> Self {
        let base = &rules.unit(unit_type).stats;
        Self {
            id: ElementId::fresh(),
            owner,
            unit_type,
            position,
            health: base.max_health,
            items: Vec::new(),
            remaining_movements: base.movements,
            last_movement_turn: turn,
        }
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn owner(&self) -> PlayerId {
        self.owner
    }

    pub fn unit_type(&self) -> UnitType {
        self.unit_type
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn health(&self) -> f64 {
        self.health
    }

    pub fn items(&self) -> &[ItemType] {
        &self.items
    }

    pub fn has_item(&self, item: ItemType) -> bool {
        self.items.contains(&item)
    }

    /// Type base stats plus every carried item
    pub fn stats(&self, rules: &RuleBook) -> UnitStats {
        self.items
            .iter()
            .fold(rules.unit(self.unit_type).stats, |acc, &item| acc + *rules.item(item))
    }

    pub fn can_found_buildings(&self, rules: &RuleBook) -> bool {
        rules.unit(self.unit_type).can_found_buildings
    }

    /// Movements left in `turn`; a unit not moved yet this turn has its full allowance
    pub fn remaining_movements(&self, rules: &RuleBook, turn: u64) -> u32 {
        let max = self.stats(rules).movements;
        if self.last_movement_turn < turn {
            max
        } else {
            self.remaining_movements.min(max)
        }
    }

    pub(crate) fn set_remaining_movements(&mut self, value: u32, turn: u64) {
        self.remaining_movements = value;
        self.last_movement_turn = turn;
    }

    /// Deduct `cost`, flooring at zero
    pub(crate) fn spend_movements(&mut self, cost: u32, rules: &RuleBook, turn: u64) {
        let left = self.remaining_movements(rules, turn).saturating_sub(cost);
        self.set_remaining_movements(left, turn);
    }

    pub(crate) fn set_position(&mut self, position: Position) {
        self.position = position;
    }

    pub(crate) fn take_damage(&mut self, amount: f64) {
        self.health -= amount;
    }

    /// Recover `fraction` of max health, capped at max
    pub(crate) fn heal(&mut self, fraction: f64, rules: &RuleBook) {
        let max = self.stats(rules).max_health;
        self.health = (self.health + max * fraction).min(max);
    }

    pub(crate) fn equip(&mut self, item: ItemType) {
        if !self.has_item(item) {
            self.items.push(item);
        }
    }

    pub fn is_dead(&self) -> bool {
        self.health <= 0.0
    }
}

// ============================================================================
// BUILDING
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Building {
    id: ElementId,
    owner: PlayerId,
    building_type: BuildingType,
    position: Position,
    production: Option<Production>,
    progress: u32,
    inventory: Vec<ItemType>,
}

impl Building {
    pub fn new(owner: PlayerId, building_type: BuildingType, position: Position) -> Self {
        Self {
            id: ElementId::fresh(),
            owner,
            building_type,
            position,
            production: None,
            progress: 0,
            inventory: Vec::new(),
        }
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn owner(&self) -> PlayerId {
        self.owner
    }

    pub fn building_type(&self) -> BuildingType {
        self.building_type
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn production(&self) -> Option<Production> {
        self.production
    }

    pub fn progress(&self) -> u32 {
        self.progress
    }

    /// Items produced here and not yet handed out
    pub fn inventory(&self) -> &[ItemType] {
        &self.inventory
    }

    /// Switching production always discards accumulated progress
    pub(crate) fn set_production(&mut self, production: Option<Production>) {
        self.production = production;
        self.progress = 0;
    }

    pub(crate) fn add_progress(&mut self, amount: u32) {
        self.progress = self.progress.saturating_add(amount);
    }

    pub(crate) fn stock(&mut self, item: ItemType) {
        self.inventory.push(item);
    }

    /// Remove one `item` from the inventory; false if none was stocked
    pub(crate) fn take_item(&mut self, item: ItemType) -> bool {
        match self.inventory.iter().position(|&i| i == item) {
            Some(idx) => {
                self.inventory.remove(idx);
                true
            }
            None => false,
        }
    }
}
