//! Route finding over the board with A*

use crate::board::{Board, Position};
use crate::elements::PlayerId;
use crate::error::RuleViolation;
use crate::rules::{Mobility, RuleBook, TerrainType};
use rustc_hash::FxHashMap;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// A path from start to goal, start included
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route {
    pub positions: Vec<Position>,
    pub cost: u32,
}

impl Route {
    /// Number of tiles in the route, including the start
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Movement cost of a route: every tile's terrain cost except the first
pub fn route_cost(board: &Board, rules: &RuleBook, positions: &[Position]) -> u32 {
    positions
        .iter()
        .skip(1)
        .filter_map(|&p| board.get(p))
        .fold(0u32, |acc, tile| acc.saturating_add(rules.terrain(tile.terrain()).movement_cost))
}

/// Whether a unit of `player` with `mobility` may enter the tile at `pos`
fn can_enter(board: &Board, rules: &RuleBook, pos: Position, player: PlayerId, mobility: Mobility) -> bool {
    match board.get(pos) {
        Some(tile) => {
            tile.terrain() != TerrainType::Unknown
                && !tile.has_foreign_units(player)
                && mobility.admits(rules.terrain(tile.terrain()))
        }
        None => false,
    }
}

/// Lowest-cost route from `start` to `goal` for `player`
///
/// Unknown terrain and tiles holding another player's units are impassable.
/// Ties on estimated total cost go to the node queued first.
pub fn find_route(
    board: &Board,
    rules: &RuleBook,
    start: Position,
    goal: Position,
    player: PlayerId,
    mobility: Mobility,
) -> Result<Route, RuleViolation> {
    let impossible = RuleViolation::ImpossibleRoute { from: start, to: goal };
    if !board.contains(start) || !board.contains(goal) {
        return Err(impossible);
    }

    let mut open_set = BinaryHeap::new();
    let mut came_from: FxHashMap<Position, Position> = FxHashMap::default();
    let mut g_score: FxHashMap<Position, u32> = FxHashMap::default();
    let mut sequence = 0u64;

    g_score.insert(start, 0);
    open_set.push(State {
        position: start,
        cost: 0,
        priority: start.distance_to(goal),
        sequence,
    });

    while let Some(State { position: current, cost, .. }) = open_set.pop() {
        // Stale entry superseded by a cheaper path
        if g_score.get(&current).is_some_and(|&g| g < cost) {
            continue;
        }

        if current == goal {
            let mut positions = vec![current];
            let mut curr = current;
            while let Some(&prev) = came_from.get(&curr) {
                positions.push(prev);
                curr = prev;
            }
            positions.reverse();
            return Ok(Route { positions, cost });
        }

        for neighbor in board.neighbors(current) {
            if !can_enter(board, rules, neighbor, player, mobility) {
                continue;
            }
            let Some(tile) = board.get(neighbor) else { continue };
            let tentative = cost.saturating_add(rules.terrain(tile.terrain()).movement_cost);

            // Closed nodes are reopened whenever a cheaper path turns up
            if g_score.get(&neighbor).is_some_and(|&g| g <= tentative) {
                continue;
            }
            came_from.insert(neighbor, current);
            g_score.insert(neighbor, tentative);
            sequence += 1;
            open_set.push(State {
                position: neighbor,
                cost: tentative,
                priority: tentative.saturating_add(neighbor.distance_to(goal)),
                sequence,
            });
        }
    }

    Err(impossible)
}

/// Priority queue entry; lowest priority first, then oldest first
#[derive(Copy, Clone, Eq, PartialEq)]
struct State {
    position: Position,
    cost: u32,
    priority: u32,
    sequence: u64,
}

impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::Unit;
    use crate::rules::UnitType;

    const P1: PlayerId = PlayerId(1);

    fn grass(width: i32, height: i32) -> Board {
        Board::new(width, height, TerrainType::Grass).unwrap()
    }

    #[test]
    fn test_straight_route() {
        let board = grass(4, 4);
        let rules = RuleBook::standard();
        let route = find_route(&board, &rules, Position::new(0, 0), Position::new(0, 2), P1, Mobility::GROUND).unwrap();
        assert_eq!(route.positions, vec![Position::new(0, 0), Position::new(0, 1), Position::new(0, 2)]);
        assert_eq!(route.cost, 2);
        assert_eq!(route_cost(&board, &rules, &route.positions), 2);
    }

    #[test]
    fn test_route_avoids_expensive_terrain() {
        let rules = RuleBook::standard();
        let forest = Position::new(0, 1);
        let board = Board::from_fn(3, 3, |p| if p == forest { TerrainType::Forest } else { TerrainType::Grass }).unwrap();
        let route = find_route(&board, &rules, Position::new(0, 0), Position::new(0, 2), P1, Mobility::GROUND).unwrap();
        assert!(!route.positions.contains(&forest));
        assert_eq!(route.cost, route_cost(&board, &rules, &route.positions));
        assert!(route.cost < 4);
    }

    #[test]
    fn test_water_blocks_ground_units() {
        let rules = RuleBook::standard();
        let board = Board::from_fn(3, 1, |p| if p.x == 1 { TerrainType::Water } else { TerrainType::Grass }).unwrap();
        let err = find_route(&board, &rules, Position::new(0, 0), Position::new(2, 0), P1, Mobility::GROUND).unwrap_err();
        assert!(matches!(err, RuleViolation::ImpossibleRoute { .. }));
    }

    #[test]
    fn test_enemy_units_block_tile() {
        let rules = RuleBook::standard();
        let mut board = grass(1, 3);
        let blocker = Unit::new(PlayerId(2), UnitType::Soldier, Position::new(0, 1), &rules, 1);
        board.tile_mut(Position::new(0, 1)).unwrap().units_mut().push(blocker);

        assert!(find_route(&board, &rules, Position::new(0, 0), Position::new(0, 2), P1, Mobility::GROUND).is_err());
        // The blocker's owner walks straight through its own tile
        assert!(find_route(&board, &rules, Position::new(0, 0), Position::new(0, 2), PlayerId(2), Mobility::GROUND).is_ok());
    }

    #[test]
    fn test_route_to_self() {
        let board = grass(2, 2);
        let rules = RuleBook::standard();
        let route = find_route(&board, &rules, Position::new(1, 1), Position::new(1, 1), P1, Mobility::GROUND).unwrap();
        assert_eq!(route.len(), 1);
        assert_eq!(route.cost, 0);
    }
}
