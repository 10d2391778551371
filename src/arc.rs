//! Arc animation for blocks thrown out of a storm

use crate::block::{Block, Flight, Motion};
use crate::board::Board;
use crate::geometry::GridPos;

/// Progress per second
pub const ARC_SPEED: f64 = 4.0;
/// Peak lift in rows
pub const ARC_HEIGHT: f64 = 3.0;
pub const MIN_ARC_SCALE: f64 = 0.1;
/// Degrees turned over a whole flight
pub const MAX_ROTATION: f64 = 360.0;

/// Put a block in flight. Its logical cell becomes the target cell.
pub fn start_block_arc(
    block: &mut Block,
    start_col: f64,
    start_row: f64,
    target_col: i32,
    target_row: i32,
) {
    block.pos = GridPos::new(target_col, target_row);
    block.motion = Motion::Arcing(Flight {
        start_col,
        start_row,
        target_col: target_col as f64,
        target_row: target_row as f64,
        progress: 0.0,
        rotation: 0.0,
        scale: MIN_ARC_SCALE,
    });
}

impl Flight {
    /// Fractional (col, row) along the parabola
    pub fn position(&self) -> (f64, f64) {
        let t = self.progress.clamp(0.0, 1.0);
        let col = self.start_col + (self.target_col - self.start_col) * t;
        let row = self.start_row + (self.target_row - self.start_row) * t;
        let lift = ARC_HEIGHT * 4.0 * t * (1.0 - t);
        (col, row - lift)
    }
}

/// Lowest free row in a column, scanning up from the floor
fn lowest_free_row(board: &Board, col: i32) -> Option<i32> {
    (0..board.height())
        .rev()
        .find(|&row| !board.is_occupied(GridPos::new(col, row)))
}

/// Advance flights. Returns true if any block finished its flight.
///
/// A finished block rests at the lowest free row of its target column. If
/// that column has no room left the block is discarded.
pub fn update_arcing_blocks(board: &mut Board, dt: f64) -> bool {
    let mut finished = Vec::new();
    for (index, block) in board.blocks_mut().iter_mut().enumerate() {
        let Motion::Arcing(flight) = &mut block.motion else {
            continue;
        };

        flight.progress = (flight.progress + dt * ARC_SPEED).min(1.0);
        flight.rotation = MAX_ROTATION * flight.progress;
        flight.scale = MIN_ARC_SCALE + (1.0 - MIN_ARC_SCALE) * flight.progress;

        if flight.progress >= 1.0 {
            finished.push(index);
        }
    }

    if finished.is_empty() {
        return false;
    }

    let mut lost = Vec::new();
    for index in finished {
        let col = board.blocks()[index].pos.col;
        match lowest_free_row(board, col) {
            Some(row) => {
                if let Some(block) = board.block_mut(index) {
                    block.pos.row = row;
                    block.motion = Motion::Resting;
                }
            }
            None => lost.push(index),
        }
    }

    if !lost.is_empty() {
        tracing::debug!("Discarded {} storm blocks with no room to land", lost.len());
        board.remove_indices(&lost);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Charge;
    use crate::geometry::BoardGeometry;

    fn flying(board: &mut Board, target_col: i32) -> usize {
        let mut block = Block::new(GridPos::default(), Charge::Neutral);
        start_block_arc(&mut block, 2.0, 15.0, target_col, 0);
        board.insert(block)
    }

    #[test]
    fn test_arc_starts_small() {
        let mut board = Board::new(BoardGeometry::default());
        let index = flying(&mut board, 7);
        let block = board.blocks()[index];
        assert!(block.is_arcing());
        assert_eq!(block.pos, GridPos::new(7, 0));
        let Motion::Arcing(flight) = block.motion else {
            panic!("expected a flight");
        };
        assert_eq!(flight.scale, MIN_ARC_SCALE);
        assert_eq!(flight.position(), (2.0, 15.0));
    }

    #[test]
    fn test_flight_path_lifts_midway() {
        let flight = Flight {
            start_col: 0.0,
            start_row: 10.0,
            target_col: 4.0,
            target_row: 10.0,
            progress: 0.5,
            rotation: 180.0,
            scale: 0.55,
        };
        assert_eq!(flight.position(), (2.0, 7.0));
    }

    #[test]
    fn test_arc_lands_on_column_floor() {
        let mut board = Board::new(BoardGeometry::default());
        board.insert(Block::new(GridPos::new(7, 19), Charge::Positive));
        let index = flying(&mut board, 7);

        assert!(!update_arcing_blocks(&mut board, 0.1));
        assert!(update_arcing_blocks(&mut board, 0.2));

        let block = board.blocks()[index];
        assert!(block.is_resting());
        assert_eq!(block.pos, GridPos::new(7, 18));
    }

    #[test]
    fn test_arc_into_full_column_is_discarded() {
        let mut board = Board::new(BoardGeometry::default());
        for row in 0..20 {
            board.insert(Block::new(GridPos::new(3, row), Charge::Negative));
        }
        flying(&mut board, 3);
        assert!(update_arcing_blocks(&mut board, 1.0));
        assert_eq!(board.len(), 20);
        assert!(board.blocks().iter().all(|b| !b.charge.is_neutral()));
    }
}
