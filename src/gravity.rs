//! Gravity: blocks above holes fall to the lowest free row

use crate::block::{Fall, Motion};
use crate::board::Board;
use crate::geometry::GridPos;

/// Rows per second
pub const FALL_SPEED: f64 = 4.0;

/// Lowest free row a block at `pos` can reach by falling straight down.
/// `skip` is the block's own index, which never obstructs itself.
fn landing_row(board: &Board, pos: GridPos, skip: usize) -> i32 {
    let occupancy = board.occupancy();
    let occupied = |row: i32| {
        occupancy
            .get(&GridPos::new(pos.col, row))
            .is_some_and(|&i| i != skip)
    };

    let mut row = pos.row;
    while row + 1 < board.height() && !occupied(row + 1) {
        row += 1;
    }
    row
}

/// Start a fall if the block has empty cells under it. Returns true if it started.
pub fn start_block_fall(board: &mut Board, index: usize) -> bool {
    let Some(block) = board.block(index) else {
        return false;
    };
    if !block.is_resting() || block.is_wobbling() {
        return false;
    }

    let start_row = block.pos.row;
    let target_row = landing_row(board, block.pos, index);
    if target_row <= start_row {
        return false;
    }

    if let Some(block) = board.block_mut(index) {
        block.motion = Motion::Falling(Fall {
            start_row,
            target_row,
            progress: 0.0,
        });
    }
    true
}

/// Indices of resting blocks, lowest first
fn resting_bottom_up(board: &Board) -> Vec<usize> {
    let mut order: Vec<usize> = (0..board.len())
        .filter(|&i| board.blocks()[i].is_resting())
        .collect();
    order.sort_by_key(|&i| std::cmp::Reverse(board.blocks()[i].pos.row));
    order
}

/// Start falls for every unsupported resting block. Returns how many started.
///
/// Lower blocks go first so the blocks above them see their new targets.
/// Wobbling blocks stay put and still support what is above them.
pub fn apply_gravity(board: &mut Board) -> usize {
    let started = resting_bottom_up(board)
        .into_iter()
        .filter(|&index| start_block_fall(board, index))
        .count();
    if started > 0 {
        tracing::trace!("{} blocks started falling", started);
    }
    started
}

/// Drop every unsupported resting block straight to its landing row with
/// no animation. Returns how many moved.
pub fn settle_instantly(board: &mut Board) -> usize {
    let mut moved = 0;
    for index in resting_bottom_up(board) {
        let Some(block) = board.block(index) else {
            continue;
        };
        if block.is_wobbling() {
            continue;
        }
        let (pos, target) = (block.pos, landing_row(board, block.pos, index));
        if target <= pos.row {
            continue;
        }
        if let Some(block) = board.block_mut(index) {
            block.pos.row = target;
            moved += 1;
        }
    }
    moved
}

/// Advance falls. Returns true if any block landed this step.
///
/// Landed blocks are back to resting, so calling this again does nothing for them.
pub fn update_falling_blocks(board: &mut Board, dt: f64) -> bool {
    let mut landed = false;
    for block in board.blocks_mut() {
        let Motion::Falling(fall) = &mut block.motion else {
            continue;
        };

        let span = (fall.target_row - fall.start_row).max(1) as f64;
        fall.progress += dt * FALL_SPEED / span;

        if fall.progress >= 1.0 {
            block.pos.row = fall.target_row;
            block.motion = Motion::Resting;
            landed = true;
        }
    }
    landed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{Block, Charge};
    use crate::geometry::BoardGeometry;

    fn board_with(cells: &[(i32, i32)]) -> Board {
        let mut board = Board::new(BoardGeometry::default());
        for &(col, row) in cells {
            board.insert(Block::new(GridPos::new(col, row), Charge::Positive));
        }
        board
    }

    fn rows_in_column(board: &Board, col: i32) -> Vec<i32> {
        let mut rows: Vec<i32> = board
            .blocks()
            .iter()
            .filter(|b| b.pos.col == col)
            .map(|b| b.pos.row)
            .collect();
        rows.sort();
        rows
    }

    #[test]
    fn test_supported_block_does_not_fall() {
        let mut board = board_with(&[(0, 19), (0, 18)]);
        assert_eq!(apply_gravity(&mut board), 0);
    }

    #[test]
    fn test_floating_stack_falls_together() {
        let mut board = board_with(&[(2, 10), (2, 11)]);
        assert_eq!(apply_gravity(&mut board), 2);
        let targets: Vec<i32> = board.blocks().iter().map(|b| b.settled_pos().row).collect();
        assert!(targets.contains(&19));
        assert!(targets.contains(&18));
    }

    #[test]
    fn test_fall_animates_then_lands() {
        let mut board = board_with(&[(1, 15)]);
        apply_gravity(&mut board);
        // Four rows at four rows per second
        assert!(!update_falling_blocks(&mut board, 0.5));
        assert!(matches!(board.blocks()[0].motion, Motion::Falling(_)));
        assert!(update_falling_blocks(&mut board, 0.5));
        assert_eq!(board.blocks()[0].pos, GridPos::new(1, 19));
        assert!(board.blocks()[0].is_resting());
    }

    #[test]
    fn test_landing_is_reported_once() {
        let mut board = board_with(&[(1, 18)]);
        apply_gravity(&mut board);
        assert!(update_falling_blocks(&mut board, 1.0));
        assert!(!update_falling_blocks(&mut board, 1.0));
        assert_eq!(board.blocks()[0].pos.row, 19);
    }

    #[test]
    fn test_wobbling_block_holds_others_up() {
        let mut board = board_with(&[(4, 15), (4, 14)]);
        if let Some(block) = board.block_mut(0) {
            block.start_wobble();
        }
        apply_gravity(&mut board);
        assert!(board.blocks()[0].is_resting());
        assert!(board.blocks()[1].is_resting());
    }

    #[test]
    fn test_settle_instantly_closes_holes() {
        let mut board = board_with(&[(3, 19), (3, 12), (3, 5)]);
        assert_eq!(settle_instantly(&mut board), 2);
        assert_eq!(rows_in_column(&board, 3), vec![17, 18, 19]);
        assert!(board.blocks().iter().all(|b| b.is_resting()));
    }
}
