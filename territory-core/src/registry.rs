//! Element registry - id to owner/position lookup for every live element

use crate::board::Position;
use crate::elements::{Building, ElementId, ElementKind, PlayerId, Unit};
use crate::error::ConsistencyError;
use rustc_hash::FxHashMap;

/// Where an element lives and who owns it
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegistryEntry {
    pub kind: ElementKind,
    pub owner: PlayerId,
    pub position: Position,
}

#[derive(Clone, Debug, Default)]
pub struct ElementRegistry {
    entries: FxHashMap<ElementId, RegistryEntry>,
}

impl ElementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.entries.contains_key(&id)
    }

    fn insert(&mut self, id: ElementId, entry: RegistryEntry) -> Result<(), ConsistencyError> {
        if self.entries.contains_key(&id) {
            return Err(ConsistencyError::DuplicateElement(id));
        }
        self.entries.insert(id, entry);
        Ok(())
    }

    pub fn add_unit(&mut self, unit: &Unit) -> Result<(), ConsistencyError> {
        self.insert(
            unit.id(),
            RegistryEntry {
                kind: ElementKind::Unit,
                owner: unit.owner(),
                position: unit.position(),
            },
        )
    }

    pub fn add_building(&mut self, building: &Building) -> Result<(), ConsistencyError> {
        self.insert(
            building.id(),
            RegistryEntry {
                kind: ElementKind::Building,
                owner: building.owner(),
                position: building.position(),
            },
        )
    }

    pub fn get(&self, id: ElementId) -> Result<&RegistryEntry, ConsistencyError> {
        self.entries.get(&id).ok_or(ConsistencyError::ElementNotFound(id))
    }

    /// Lookup that also checks the element is of the expected kind
    pub fn get_kind(&self, id: ElementId, kind: ElementKind) -> Result<&RegistryEntry, ConsistencyError> {
        let entry = self.get(id)?;
        if entry.kind != kind {
            return Err(ConsistencyError::WrongElementKind(id, kind.as_str()));
        }
        Ok(entry)
    }

    pub fn relocate(&mut self, id: ElementId, position: Position) -> Result<(), ConsistencyError> {
        let entry = self.entries.get_mut(&id).ok_or(ConsistencyError::ElementNotFound(id))?;
        entry.position = position;
        Ok(())
    }

    pub fn remove(&mut self, id: ElementId) -> Result<RegistryEntry, ConsistencyError> {
        self.entries.remove(&id).ok_or(ConsistencyError::ElementNotFound(id))
    }

    /// Ids of everything `player` owns, sorted for stable iteration
    pub fn owned_by(&self, player: PlayerId) -> Vec<ElementId> {
        let mut ids: Vec<ElementId> = self
            .entries
            .iter()
            .filter(|(_, e)| e.owner == player)
            .map(|(&id, _)| id)
            .collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{BuildingType, RuleBook, UnitType};

    #[test]
    fn test_add_and_lookup() {
        let rules = RuleBook::standard();
        let unit = Unit::new(PlayerId(1), UnitType::Soldier, Position::new(1, 1), &rules, 1);
        let mut registry = ElementRegistry::new();
        registry.add_unit(&unit).unwrap();

        let entry = registry.get(unit.id()).unwrap();
        assert_eq!(entry.position, Position::new(1, 1));
        assert_eq!(entry.owner, PlayerId(1));
        assert_eq!(
            registry.get_kind(unit.id(), ElementKind::Building),
            Err(ConsistencyError::WrongElementKind(unit.id(), "building"))
        );
    }

    #[test]
    fn test_duplicate_rejected() {
        let city = Building::new(PlayerId(2), BuildingType::City, Position::new(0, 0));
        let mut registry = ElementRegistry::new();
        registry.add_building(&city).unwrap();
        assert_eq!(
            registry.add_building(&city),
            Err(ConsistencyError::DuplicateElement(city.id()))
        );
    }

    #[test]
    fn test_missing_is_an_error() {
        let mut registry = ElementRegistry::new();
        let id = ElementId::fresh();
        assert!(registry.get(id).is_err());
        assert!(registry.remove(id).is_err());
        assert!(registry.relocate(id, Position::new(0, 0)).is_err());
    }
}
