//! Rule catalogs - terrain, unit, item and building attribute tables
//!
//! The catalogs are static configuration loaded once at startup. Every
//! type enum has a dense index so lookups are plain array accesses once the
//! book has been validated for completeness.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Add;
use std::path::Path;

// ============================================================================
// TYPE IDENTIFIERS
// ============================================================================

/// Terrain kinds; `Unknown` marks tiles hidden by fog of war
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TerrainType {
    Unknown,
    Grass,
    Sand,
    Forest,
    Water,
}

impl TerrainType {
    pub const ALL: [TerrainType; 5] = [
        TerrainType::Unknown,
        TerrainType::Grass,
        TerrainType::Sand,
        TerrainType::Forest,
        TerrainType::Water,
    ];

    /// Terrains that can appear on a generated map
    pub const PLAYABLE: [TerrainType; 4] = [
        TerrainType::Grass,
        TerrainType::Sand,
        TerrainType::Forest,
        TerrainType::Water,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Unit kinds, weakest to strongest military rank with the Priest first
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UnitType {
    Priest,
    Soldier,
    Sergeant,
    Lieutenant,
    Captain,
    Major,
    Colonel,
    General,
    Marshal,
}

impl UnitType {
    pub const ALL: [UnitType; 9] = [
        UnitType::Priest,
        UnitType::Soldier,
        UnitType::Sergeant,
        UnitType::Lieutenant,
        UnitType::Captain,
        UnitType::Major,
        UnitType::Colonel,
        UnitType::General,
        UnitType::Marshal,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Equipment carried by units; each adds its stat block to the bearer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ItemType {
    Heart,
    Sandal,
    Armor,
    Sword,
    Shield,
    Belt,
    Glasses,
    Helm,
}

impl ItemType {
    pub const ALL: [ItemType; 8] = [
        ItemType::Heart,
        ItemType::Sandal,
        ItemType::Armor,
        ItemType::Sword,
        ItemType::Shield,
        ItemType::Belt,
        ItemType::Glasses,
        ItemType::Helm,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BuildingType {
    City,
    Barrack,
}

impl BuildingType {
    pub const ALL: [BuildingType; 2] = [BuildingType::City, BuildingType::Barrack];

    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Something a building can work towards
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Production {
    Unit(UnitType),
    Item(ItemType),
}

impl Production {
    /// Progress points needed to complete this production
    pub fn cost(self, rules: &RuleBook) -> u32 {
        match self {
            Production::Unit(t) => rules.unit(t).stats.building_cost,
            Production::Item(t) => rules.item(t).building_cost,
        }
    }
}

impl fmt::Display for Production {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Production::Unit(t) => write!(f, "unit {:?}", t),
            Production::Item(t) => write!(f, "item {:?}", t),
        }
    }
}

// ============================================================================
// ATTRIBUTES
// ============================================================================

/// Which terrain classes something may traverse
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Mobility {
    pub ground: bool,
    pub water: bool,
    pub aerial: bool,
}

impl Mobility {
    pub const GROUND: Mobility = Mobility { ground: true, water: false, aerial: false };

    /// True if any requested class is allowed by the terrain
    pub fn admits(self, terrain: &TerrainAttributes) -> bool {
        (self.ground && terrain.ground) || (self.water && terrain.water) || (self.aerial && terrain.aerial)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TerrainAttributes {
    pub movement_cost: u32,
    pub ground: bool,
    pub water: bool,
    pub aerial: bool,
    pub can_receive_building: bool,
}

impl TerrainAttributes {
    const fn new(movement_cost: u32, ground: bool, water: bool, aerial: bool, can_receive_building: bool) -> Self {
        Self { movement_cost, ground, water, aerial, can_receive_building }
    }
}

/// Additive stat block shared by unit types and items
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitStats {
    pub max_health: f64,
    pub movements: u32,
    pub attack: f64,
    pub defense: f64,
    pub range: u32,
    pub sight: u32,
    pub influence_factor: f64,
    pub minimum_random_factor: f64,
    pub building_cost: u32,
}

impl UnitStats {
    #[allow(clippy::too_many_arguments)]
    const fn new(
        max_health: f64,
        movements: u32,
        attack: f64,
        defense: f64,
        range: u32,
        sight: u32,
        influence_factor: f64,
        minimum_random_factor: f64,
        building_cost: u32,
    ) -> Self {
        Self {
            max_health,
            movements,
            attack,
            defense,
            range,
            sight,
            influence_factor,
            minimum_random_factor,
            building_cost,
        }
    }
}

impl Add for UnitStats {
    type Output = UnitStats;

    fn add(self, other: UnitStats) -> UnitStats {
        UnitStats {
            max_health: self.max_health + other.max_health,
            movements: self.movements + other.movements,
            attack: self.attack + other.attack,
            defense: self.defense + other.defense,
            range: self.range + other.range,
            sight: self.sight + other.sight,
            influence_factor: self.influence_factor + other.influence_factor,
            minimum_random_factor: self.minimum_random_factor + other.minimum_random_factor,
            building_cost: self.building_cost + other.building_cost,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnitAttributes {
    #[serde(flatten)]
    pub stats: UnitStats,
    #[serde(default = "ground_only")]
    pub mobility: Mobility,
    #[serde(default)]
    pub can_found_buildings: bool,
}

fn ground_only() -> Mobility {
    Mobility::GROUND
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BuildingAttributes {
    pub production_rate: u32,
    pub influence_factor: f64,
}

// ============================================================================
// RULE BOOK
// ============================================================================

/// Serialized form of the catalogs, keyed by type name
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RuleTables {
    pub terrains: BTreeMap<TerrainType, TerrainAttributes>,
    pub units: BTreeMap<UnitType, UnitAttributes>,
    pub items: BTreeMap<ItemType, UnitStats>,
    pub buildings: BTreeMap<BuildingType, BuildingAttributes>,
}

/// Validated catalogs indexed by type
#[derive(Clone, Debug, PartialEq)]
pub struct RuleBook {
    terrains: Vec<TerrainAttributes>,
    units: Vec<UnitAttributes>,
    items: Vec<UnitStats>,
    buildings: Vec<BuildingAttributes>,
}

fn dense<K, V>(table: &BTreeMap<K, V>, keys: &[K]) -> Result<Vec<V>, ConfigError>
where
    K: Ord + fmt::Debug,
    V: Clone,
{
    keys.iter()
        .map(|k| {
            table
                .get(k)
                .cloned()
                .ok_or_else(|| ConfigError::MissingRule(format!("{:?}", k)))
        })
        .collect()
}

impl RuleBook {
    /// Build from tables, failing if any type has no entry
    pub fn from_tables(tables: &RuleTables) -> Result<Self, ConfigError> {
        Ok(Self {
            terrains: dense(&tables.terrains, &TerrainType::ALL)?,
            units: dense(&tables.units, &UnitType::ALL)?,
            items: dense(&tables.items, &ItemType::ALL)?,
            buildings: dense(&tables.buildings, &BuildingType::ALL)?,
        })
    }

    pub fn to_tables(&self) -> RuleTables {
        RuleTables {
            terrains: TerrainType::ALL.iter().map(|&t| (t, self.terrain(t).clone())).collect(),
            units: UnitType::ALL.iter().map(|&t| (t, self.unit(t).clone())).collect(),
            items: ItemType::ALL.iter().map(|&t| (t, *self.item(t))).collect(),
            buildings: BuildingType::ALL.iter().map(|&t| (t, self.building(t).clone())).collect(),
        }
    }

    /// The stock catalogs
    pub fn standard() -> Self {
        let terrains = vec![
            TerrainAttributes::new(u32::MAX, true, true, true, false), // Unknown
            TerrainAttributes::new(1, true, false, true, true),        // Grass
            TerrainAttributes::new(2, true, false, true, true),        // Sand
            TerrainAttributes::new(3, true, false, true, false),       // Forest
            TerrainAttributes::new(1, false, true, true, false),       // Water
        ];

        let unit = |stats: UnitStats, can_found_buildings: bool| UnitAttributes {
            stats,
            mobility: Mobility::GROUND,
            can_found_buildings,
        };
        let units = vec![
            unit(UnitStats::new(3.0, 2, 0.0, 1.0, 1, 2, 0.5, 0.6, 10), true), // Priest
            unit(UnitStats::new(1.0, 2, 1.0, 1.0, 1, 1, 0.0, 0.45, 2), false), // Soldier
            unit(UnitStats::new(2.0, 1, 1.0, 1.0, 2, 2, 0.0, 0.45, 3), false), // Sergeant
            unit(UnitStats::new(4.0, 1, 1.0, 2.0, 1, 1, 0.0, 0.5, 5), false), // Lieutenant
            unit(UnitStats::new(5.0, 1, 2.0, 1.0, 1, 1, 0.0, 0.5, 8), false), // Captain
            unit(UnitStats::new(6.0, 2, 4.0, 2.0, 1, 1, 0.0, 0.55, 13), false), // Major
            unit(UnitStats::new(10.0, 1, 6.0, 5.0, 1, 1, 0.0, 0.55, 21), false), // Colonel
            unit(UnitStats::new(15.0, 2, 9.0, 7.0, 2, 3, 0.05, 0.6, 30), false), // General
            unit(UnitStats::new(20.0, 3, 12.0, 9.0, 2, 2, 0.1, 0.7, 40), false), // Marshal
        ];

        let items = vec![
            UnitStats { max_health: 3.0, building_cost: 15, ..UnitStats::default() }, // Heart
            UnitStats { movements: 1, building_cost: 10, ..UnitStats::default() },     // Sandal
            UnitStats { minimum_random_factor: 0.2, building_cost: 15, ..UnitStats::default() }, // Armor
            UnitStats { attack: 3.0, building_cost: 25, ..UnitStats::default() },      // Sword
            UnitStats { defense: 2.0, building_cost: 20, ..UnitStats::default() },     // Shield
            UnitStats { range: 1, building_cost: 20, ..UnitStats::default() },         // Belt
            UnitStats { sight: 1, building_cost: 10, ..UnitStats::default() },         // Glasses
            UnitStats { influence_factor: 0.25, building_cost: 30, ..UnitStats::default() }, // Helm
        ];

        let buildings = vec![
            BuildingAttributes { production_rate: 2, influence_factor: 0.5 }, // City
            BuildingAttributes { production_rate: 3, influence_factor: 0.0 }, // Barrack
        ];

        Self { terrains, units, items, buildings }
    }

    pub fn terrain(&self, t: TerrainType) -> &TerrainAttributes {
        &self.terrains[t.index()]
    }

    pub fn unit(&self, t: UnitType) -> &UnitAttributes {
        &self.units[t.index()]
    }

    pub fn item(&self, t: ItemType) -> &UnitStats {
        &self.items[t.index()]
    }

    pub fn building(&self, t: BuildingType) -> &BuildingAttributes {
        &self.buildings[t.index()]
    }

    /// Load from a JSON file of [`RuleTables`]
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let tables: RuleTables = serde_json::from_str(&content)?;
        Self::from_tables(&tables)
    }

    /// Save to JSON file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(&self.to_tables())?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

impl Default for RuleBook {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_terrain_table() {
        let rules = RuleBook::standard();
        let grass = rules.terrain(TerrainType::Grass);
        assert_eq!(grass.movement_cost, 1);
        assert!(grass.can_receive_building);

        let forest = rules.terrain(TerrainType::Forest);
        assert_eq!(forest.movement_cost, 3);
        assert!(!forest.can_receive_building);

        assert!(!Mobility::GROUND.admits(rules.terrain(TerrainType::Water)));
        assert!(Mobility::GROUND.admits(rules.terrain(TerrainType::Sand)));
    }

    #[test]
    fn test_only_priest_founds_buildings() {
        let rules = RuleBook::standard();
        for t in UnitType::ALL {
            assert_eq!(rules.unit(t).can_found_buildings, t == UnitType::Priest, "{:?}", t);
        }
    }

    #[test]
    fn test_production_cost() {
        let rules = RuleBook::standard();
        assert_eq!(Production::Unit(UnitType::Lieutenant).cost(&rules), 5);
        assert_eq!(Production::Item(ItemType::Sword).cost(&rules), 25);
    }

    #[test]
    fn test_stats_add() {
        let rules = RuleBook::standard();
        let total = rules.unit(UnitType::Soldier).stats + *rules.item(ItemType::Sword);
        assert_eq!(total.attack, 4.0);
        assert_eq!(total.max_health, 1.0);
    }

    #[test]
    fn test_tables_roundtrip_through_json() {
        let rules = RuleBook::standard();
        let json = serde_json::to_string(&rules.to_tables()).unwrap();
        let tables: RuleTables = serde_json::from_str(&json).unwrap();
        assert_eq!(RuleBook::from_tables(&tables).unwrap(), rules);
    }

    #[test]
    fn test_incomplete_tables_rejected() {
        let mut tables = RuleBook::standard().to_tables();
        tables.items.remove(&ItemType::Helm);
        let err = RuleBook::from_tables(&tables).unwrap_err();
        assert!(matches!(err, ConfigError::MissingRule(ref name) if name == "Helm"));
    }
}
