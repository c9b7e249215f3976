//! Hex board geometry with offset coordinates, tiles and domain shares

use crate::elements::{Building, ElementId, PlayerId, Unit};
use crate::error::{ConfigError, ConsistencyError};
use crate::rules::TerrainType;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// GEOMETRY
// ============================================================================

/// Column-offset hex coordinates; odd columns sit half a tile lower
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

/// Direction index: 0=N, 1=NE, 2=SE, 3=S, 4=SW, 5=NW
pub const NORTH: usize = 0;
pub const NORTH_EAST: usize = 1;
pub const SOUTH_EAST: usize = 2;
pub const SOUTH: usize = 3;
pub const SOUTH_WEST: usize = 4;
pub const NORTH_WEST: usize = 5;

/// Offsets (dx, dy) from an even column
pub const EVEN_COLUMN_DIRECTIONS: [(i32, i32); 6] = [
    (0, -1),  // N
    (1, -1),  // NE
    (1, 0),   // SE
    (0, 1),   // S
    (-1, 0),  // SW
    (-1, -1), // NW
];

/// Offsets (dx, dy) from an odd column
pub const ODD_COLUMN_DIRECTIONS: [(i32, i32); 6] = [
    (0, -1), // N
    (1, 0),  // NE
    (1, 1),  // SE
    (0, 1),  // S
    (-1, 1), // SW
    (-1, 0), // NW
];

/// Board extent used for neighbour filtering
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bounds {
    pub width: i32,
    pub height: i32,
}

impl Bounds {
    pub fn contains(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && pos.x < self.width && pos.y < self.height
    }
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    fn is_even_column(&self) -> bool {
        self.x.rem_euclid(2) == 0
    }

    /// Adjacent position in direction (0-5), which may lie off the board
    pub fn neighbor(&self, direction: usize) -> Position {
        let table = if self.is_even_column() {
            &EVEN_COLUMN_DIRECTIONS
        } else {
            &ODD_COLUMN_DIRECTIONS
        };
        let (dx, dy) = table[direction % 6];
        Position::new(self.x + dx, self.y + dy)
    }

    /// Up to six adjacent positions inside `bounds`
    pub fn neighbors(&self, bounds: Bounds) -> Vec<Position> {
        (0..6)
            .map(|d| self.neighbor(d))
            .filter(|p| bounds.contains(*p))
            .collect()
    }

    /// Every in-bounds position at ring distance 1..=radius, excluding self
    ///
    /// Rings expand outwards and never revisit a position, so each appears once.
    pub fn neighbors_within(&self, radius: u32, bounds: Bounds) -> Vec<Position> {
        let mut visited = FxHashSet::default();
        visited.insert(*self);
        let mut frontier = vec![*self];
        let mut result = Vec::new();

        for _ in 0..radius {
            let mut ring = Vec::new();
            for pos in &frontier {
                for n in pos.neighbors(bounds) {
                    if visited.insert(n) {
                        ring.push(n);
                    }
                }
            }
            if ring.is_empty() {
                break;
            }
            result.extend_from_slice(&ring);
            frontier = ring;
        }
        result
    }

    /// The diagonal neighbour heading towards `target`
    pub fn diagonal_toward(&self, target: Position) -> Position {
        let direction = match (self.x < target.x, self.y < target.y) {
            (true, true) => SOUTH_EAST,
            (true, false) => NORTH_EAST,
            (false, true) => SOUTH_WEST,
            (false, false) => NORTH_WEST,
        };
        self.neighbor(direction)
    }

    /// Step count between two positions, walking diagonally until aligned
    /// on a column or row and then straight.
    pub fn distance_to(&self, other: Position) -> u32 {
        let mut current = *self;
        let mut distance = 0;
        while current != other {
            if current.x == other.x {
                distance += current.y.abs_diff(other.y);
                break;
            }
            if current.y == other.y {
                distance += current.x.abs_diff(other.x);
                break;
            }
            current = current.diagonal_toward(other);
            distance += 1;
        }
        distance
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

// ============================================================================
// DOMAIN
// ============================================================================

/// Per-player influence shares on a tile
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    shares: BTreeMap<PlayerId, f64>,
}

impl Domain {
    /// Raw stored share, zero for absent players
    pub fn share(&self, player: PlayerId) -> f64 {
        self.shares.get(&player).copied().unwrap_or(0.0)
    }

    pub fn total(&self) -> f64 {
        self.shares.values().sum()
    }

    /// Share relative to the current total, without mutating
    pub fn normalized_share(&self, player: PlayerId) -> f64 {
        let total = self.total();
        if total > 0.0 {
            self.share(player) / total
        } else {
            0.0
        }
    }

    /// Strictly more than half of the tile's influence
    pub fn has_majority(&self, player: PlayerId) -> bool {
        self.normalized_share(player) > 0.5
    }

    pub fn is_empty(&self) -> bool {
        self.shares.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PlayerId, f64)> + '_ {
        self.shares.iter().map(|(&p, &s)| (p, s))
    }

    /// Add `amount` (possibly negative) to a player's share, flooring at zero
    pub fn add(&mut self, player: PlayerId, amount: f64, normalize: bool) {
        let share = self.shares.entry(player).or_insert(0.0);
        *share = (*share + amount).max(0.0);
        if normalize {
            self.normalize();
        }
    }

    /// Rescale so shares sum to one; a zero total clears the domain
    pub fn normalize(&mut self) {
        let total = self.total();
        if total > 0.0 && total.is_finite() {
            for share in self.shares.values_mut() {
                *share /= total;
            }
        } else {
            self.shares.clear();
        }
    }

    pub fn remove(&mut self, player: PlayerId) {
        self.shares.remove(&player);
        self.normalize();
    }

    pub fn clear(&mut self) {
        self.shares.clear();
    }
}

// ============================================================================
// TILE
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    terrain: TerrainType,
    units: Vec<Unit>,
    building: Option<Building>,
    domain: Domain,
}

impl Tile {
    pub fn new(terrain: TerrainType) -> Self {
        Self {
            terrain,
            units: Vec::new(),
            building: None,
            domain: Domain::default(),
        }
    }

    pub fn terrain(&self) -> TerrainType {
        self.terrain
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn building(&self) -> Option<&Building> {
        self.building.as_ref()
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    pub fn unit(&self, id: ElementId) -> Option<&Unit> {
        self.units.iter().find(|u| u.id() == id)
    }

    pub fn has_units_of(&self, player: PlayerId) -> bool {
        self.units.iter().any(|u| u.owner() == player)
    }

    /// Any unit here belonging to someone other than `player`
    pub fn has_foreign_units(&self, player: PlayerId) -> bool {
        self.units.iter().any(|u| u.owner() != player)
    }

    /// True if `player` owns a unit or the building here
    pub fn exists_player(&self, player: PlayerId) -> bool {
        self.has_units_of(player) || self.building.as_ref().is_some_and(|b| b.owner() == player)
    }

    pub(crate) fn set_terrain(&mut self, terrain: TerrainType) {
        self.terrain = terrain;
    }

    pub(crate) fn unit_mut(&mut self, id: ElementId) -> Option<&mut Unit> {
        self.units.iter_mut().find(|u| u.id() == id)
    }

    pub(crate) fn units_mut(&mut self) -> &mut Vec<Unit> {
        &mut self.units
    }

    pub(crate) fn remove_unit(&mut self, id: ElementId) -> Option<Unit> {
        let idx = self.units.iter().position(|u| u.id() == id)?;
        Some(self.units.remove(idx))
    }

    pub(crate) fn building_mut(&mut self) -> Option<&mut Building> {
        self.building.as_mut()
    }

    pub(crate) fn set_building(&mut self, building: Option<Building>) -> Option<Building> {
        std::mem::replace(&mut self.building, building)
    }

    pub(crate) fn domain_mut(&mut self) -> &mut Domain {
        &mut self.domain
    }

    /// Replace everything with the fog-of-war placeholder
    pub(crate) fn conceal(&mut self) {
        self.terrain = TerrainType::Unknown;
        self.units.clear();
        self.building = None;
        self.domain.clear();
    }
}

// ============================================================================
// BOARD
// ============================================================================

/// Rectangular grid of tiles stored row-major
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Board {
    width: i32,
    height: i32,
    tiles: Vec<Tile>,
}

impl Board {
    /// Board covered in a single terrain
    pub fn new(width: i32, height: i32, terrain: TerrainType) -> Result<Self, ConfigError> {
        Self::from_fn(width, height, |_| terrain)
    }

    /// Board whose terrain is chosen per position, visited row-major
    pub fn from_fn<F>(width: i32, height: i32, mut terrain: F) -> Result<Self, ConfigError>
    where
        F: FnMut(Position) -> TerrainType,
    {
        if width <= 0 || height <= 0 {
            return Err(ConfigError::InvalidBoardSize { width, height });
        }
        let tiles = (0..height)
            .flat_map(|y| (0..width).map(move |x| Position::new(x, y)))
            .map(|pos| Tile::new(terrain(pos)))
            .collect();
        Ok(Self { width, height, tiles })
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn bounds(&self) -> Bounds {
        Bounds { width: self.width, height: self.height }
    }

    pub fn contains(&self, pos: Position) -> bool {
        self.bounds().contains(pos)
    }

    fn index(&self, pos: Position) -> Option<usize> {
        if self.contains(pos) {
            Some((pos.y * self.width + pos.x) as usize)
        } else {
            None
        }
    }

    pub fn get(&self, pos: Position) -> Option<&Tile> {
        self.index(pos).map(|i| &self.tiles[i])
    }

    /// Tile lookup where an off-board position is an engine fault
    pub fn tile(&self, pos: Position) -> Result<&Tile, ConsistencyError> {
        self.get(pos).ok_or(ConsistencyError::PositionOutOfBounds(pos))
    }

    pub(crate) fn tile_mut(&mut self, pos: Position) -> Result<&mut Tile, ConsistencyError> {
        match self.index(pos) {
            Some(i) => Ok(&mut self.tiles[i]),
            None => Err(ConsistencyError::PositionOutOfBounds(pos)),
        }
    }

    /// All positions, row by row
    pub fn positions(&self) -> impl Iterator<Item = Position> {
        let width = self.width;
        (0..self.height).flat_map(move |y| (0..width).map(move |x| Position::new(x, y)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Position, &Tile)> {
        self.positions().zip(self.tiles.iter())
    }

    pub(crate) fn tiles_mut(&mut self) -> impl Iterator<Item = &mut Tile> {
        self.tiles.iter_mut()
    }

    pub fn neighbors(&self, pos: Position) -> Vec<Position> {
        pos.neighbors(self.bounds())
    }

    pub fn neighbors_within(&self, pos: Position, radius: u32) -> Vec<Position> {
        pos.neighbors_within(radius, self.bounds())
    }

    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.tiles.iter().flat_map(|t| t.units.iter())
    }

    pub fn buildings(&self) -> impl Iterator<Item = &Building> {
        self.tiles.iter().filter_map(|t| t.building.as_ref())
    }

    pub fn units_of(&self, player: PlayerId) -> impl Iterator<Item = &Unit> {
        self.units().filter(move |u| u.owner() == player)
    }

    pub fn buildings_of(&self, player: PlayerId) -> impl Iterator<Item = &Building> {
        self.buildings().filter(move |b| b.owner() == player)
    }

    /// Linear scan; works on fog-of-war copies that have no registry
    pub fn find_unit(&self, id: ElementId) -> Option<&Unit> {
        self.units().find(|u| u.id() == id)
    }

    pub fn find_building(&self, id: ElementId) -> Option<&Building> {
        self.buildings().find(|b| b.id() == id)
    }

    /// Whether the player still owns anything on the board
    pub fn has_presence(&self, player: PlayerId) -> bool {
        self.tiles.iter().any(|t| t.exists_player(player))
    }

    pub fn normalize_domains(&mut self) {
        for tile in &mut self.tiles {
            tile.domain.normalize();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDS: Bounds = Bounds { width: 10, height: 10 };

    #[test]
    fn test_neighbors_even_and_odd_columns() {
        let even = Position::new(2, 2);
        assert_eq!(even.neighbor(NORTH_EAST), Position::new(3, 1));
        assert_eq!(even.neighbor(SOUTH_WEST), Position::new(1, 2));

        let odd = Position::new(3, 2);
        assert_eq!(odd.neighbor(NORTH_EAST), Position::new(4, 2));
        assert_eq!(odd.neighbor(SOUTH_WEST), Position::new(2, 3));
    }

    #[test]
    fn test_neighbors_filtered_by_bounds() {
        assert_eq!(Position::new(0, 0).neighbors(BOUNDS).len(), 2);
        assert_eq!(Position::new(5, 5).neighbors(BOUNDS).len(), 6);
    }

    #[test]
    fn test_neighbors_are_symmetric() {
        for x in 0..BOUNDS.width {
            for y in 0..BOUNDS.height {
                let p = Position::new(x, y);
                for n in p.neighbors(BOUNDS) {
                    assert!(n.neighbors(BOUNDS).contains(&p), "{} <-> {}", p, n);
                }
            }
        }
    }

    #[test]
    fn test_neighbors_within_rings() {
        let center = Position::new(5, 5);
        let ring2 = center.neighbors_within(2, BOUNDS);
        assert_eq!(ring2.len(), 18);
        assert!(!ring2.contains(&center));

        let unique: FxHashSet<_> = ring2.iter().collect();
        assert_eq!(unique.len(), ring2.len());
    }

    #[test]
    fn test_neighbors_within_zero() {
        assert!(Position::new(1, 1).neighbors_within(0, BOUNDS).is_empty());
    }

    #[test]
    fn test_distance() {
        let origin = Position::new(0, 0);
        assert_eq!(origin.distance_to(origin), 0);
        assert_eq!(origin.distance_to(Position::new(0, 3)), 3);
        assert_eq!(origin.distance_to(Position::new(4, 0)), 4);
        assert_eq!(origin.distance_to(Position::new(1, 1)), 2);
        for n in Position::new(4, 4).neighbors(BOUNDS) {
            assert_eq!(Position::new(4, 4).distance_to(n), 1);
        }
    }

    #[test]
    fn test_domain_add_floors_at_zero() {
        let mut domain = Domain::default();
        domain.add(PlayerId(1), 0.4, false);
        domain.add(PlayerId(1), -1.0, false);
        assert_eq!(domain.share(PlayerId(1)), 0.0);
    }

    #[test]
    fn test_domain_normalize() {
        let mut domain = Domain::default();
        domain.add(PlayerId(1), 3.0, false);
        domain.add(PlayerId(2), 1.0, false);
        domain.normalize();
        assert!((domain.total() - 1.0).abs() < 1e-9);
        assert!((domain.share(PlayerId(1)) - 0.75).abs() < 1e-9);

        let once = domain.clone();
        domain.normalize();
        for (player, share) in once.iter() {
            assert!((domain.share(player) - share).abs() < 1e-9);
        }
    }

    #[test]
    fn test_domain_zero_total_clears() {
        let mut domain = Domain::default();
        domain.add(PlayerId(1), 0.0, true);
        assert!(domain.is_empty());
    }

    #[test]
    fn test_domain_remove_renormalizes() {
        let mut domain = Domain::default();
        domain.add(PlayerId(1), 0.5, false);
        domain.add(PlayerId(2), 0.25, false);
        domain.remove(PlayerId(1));
        assert!((domain.share(PlayerId(2)) - 1.0).abs() < 1e-9);
        assert!(domain.has_majority(PlayerId(2)));
    }

    #[test]
    fn test_majority_is_strict() {
        let mut domain = Domain::default();
        domain.add(PlayerId(1), 0.5, false);
        domain.add(PlayerId(2), 0.5, false);
        assert!(!domain.has_majority(PlayerId(1)));
    }

    #[test]
    fn test_board_layout() {
        let board = Board::new(4, 3, TerrainType::Grass).unwrap();
        assert_eq!(board.positions().count(), 12);
        assert_eq!(board.positions().nth(5), Some(Position::new(1, 1)));
        assert!(board.tile(Position::new(4, 0)).is_err());
        assert!(Board::new(0, 3, TerrainType::Grass).is_err());
    }
}
