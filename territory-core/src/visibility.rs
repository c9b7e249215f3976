//! Fog of war - per-player projections of the authoritative board

use crate::board::{Board, Position};
use crate::elements::PlayerId;
use crate::rules::RuleBook;

/// Row-major visibility mask for `player`
///
/// Units see their own tile plus everything within their sight; buildings
/// see their own tile and its direct neighbours.
pub fn visible_tiles(board: &Board, rules: &RuleBook, player: PlayerId) -> Vec<bool> {
    let width = board.width();
    let mut visible = vec![false; (board.width() * board.height()) as usize];
    let mut mark = |pos: Position| {
        if board.contains(pos) {
            visible[(pos.y * width + pos.x) as usize] = true;
        }
    };

    for unit in board.units_of(player) {
        let sight = unit.stats(rules).sight;
        mark(unit.position());
        for pos in board.neighbors_within(unit.position(), sight) {
            mark(pos);
        }
    }
    for building in board.buildings_of(player) {
        mark(building.position());
        for pos in board.neighbors(building.position()) {
            mark(pos);
        }
    }
    visible
}

/// Clone the board and scrub every tile `player` cannot see
pub fn player_view(board: &Board, rules: &RuleBook, player: PlayerId) -> Board {
    let visible = visible_tiles(board, rules, player);
    let mut view = board.clone();
    for (tile, seen) in view.tiles_mut().zip(visible) {
        if !seen {
            tile.conceal();
        }
    }
    view
}
