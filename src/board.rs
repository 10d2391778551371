//! Placed-block store and collision detection

use crate::block::{Block, Charge};
use crate::geometry::{BoardGeometry, GridPos};
use crate::piece::Piece;
use std::collections::{HashMap, HashSet};

/// The game board: every block that has left the active piece
#[derive(Debug, Clone, Default)]
pub struct Board {
    geometry: BoardGeometry,
    /// Insertion order carries no meaning. Indices are only stable until
    /// the next insert or removal.
    blocks: Vec<Block>,
}

impl Board {
    /// Create a new empty board
    pub fn new(geometry: BoardGeometry) -> Self {
        Self {
            geometry,
            blocks: Vec::new(),
        }
    }

    pub fn geometry(&self) -> &BoardGeometry {
        &self.geometry
    }

    pub fn width(&self) -> i32 {
        self.geometry.columns()
    }

    pub fn height(&self) -> i32 {
        self.geometry.rows()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub(crate) fn blocks_mut(&mut self) -> &mut [Block] {
        &mut self.blocks
    }

    pub fn block(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    pub(crate) fn block_mut(&mut self, index: usize) -> Option<&mut Block> {
        self.blocks.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Add a block and return its index
    pub fn insert(&mut self, block: Block) -> usize {
        self.blocks.push(block);
        self.blocks.len() - 1
    }

    /// Remove the blocks at the given indices, returning them in board order.
    /// Unknown and repeated indices are ignored.
    pub fn remove_indices(&mut self, indices: &[usize]) -> Vec<Block> {
        let doomed: HashSet<usize> = indices.iter().copied().collect();
        let mut removed = Vec::with_capacity(doomed.len());
        let mut kept = Vec::with_capacity(self.blocks.len());

        for (index, block) in self.blocks.drain(..).enumerate() {
            if doomed.contains(&index) {
                removed.push(block);
            } else {
                kept.push(block);
            }
        }

        self.blocks = kept;
        removed
    }

    /// Empty the store
    pub fn clear(&mut self) {
        self.blocks.clear();
    }

    /// Index of the block that holds (or is falling into) the cell.
    /// Blocks in flight from a storm hold no cell yet.
    pub fn block_at(&self, pos: GridPos) -> Option<usize> {
        self.occupancy().get(&pos).copied()
    }

    pub fn is_occupied(&self, pos: GridPos) -> bool {
        self.block_at(pos).is_some()
    }

    /// Cell -> index map for every block that holds a cell
    pub fn occupancy(&self) -> HashMap<GridPos, usize> {
        self.blocks
            .iter()
            .enumerate()
            .filter(|(_, b)| !b.is_arcing())
            .map(|(index, b)| (b.settled_pos(), index))
            .collect()
    }

    /// Check if the piece fits after moving it by the offset
    pub fn is_valid_position(&self, piece: &Piece, d_col: i32, d_row: i32) -> bool {
        self.fits(piece, d_col, d_row, false)
    }

    /// Like `is_valid_position`, but neutral blocks do not obstruct.
    /// Used for the game-over check so storm drops on row 0 don't end the game.
    pub fn is_valid_position_ignoring_neutral(&self, piece: &Piece, d_col: i32, d_row: i32) -> bool {
        self.fits(piece, d_col, d_row, true)
    }

    fn fits(&self, piece: &Piece, d_col: i32, d_row: i32, ignore_neutral: bool) -> bool {
        let occupancy = self.occupancy();
        piece.cells_offset(d_col, d_row).iter().all(|&pos| {
            self.geometry.accepts(pos)
                && occupancy
                    .get(&pos)
                    .and_then(|&index| self.blocks.get(index))
                    .is_none_or(|b| ignore_neutral && b.charge == Charge::Neutral)
        })
    }

    /// Move the piece only if the destination is valid
    pub fn try_move_piece(&self, piece: &mut Piece, d_col: i32, d_row: i32) -> bool {
        if !self.is_valid_position(piece, d_col, d_row) {
            return false;
        }
        piece.col += d_col;
        piece.row += d_row;
        true
    }

    /// Rotate in place, or leave the piece exactly as it was. No kicks.
    pub fn try_rotate_piece(&self, piece: &mut Piece) -> bool {
        let snapshot = (piece.rotation, piece.blocks);
        piece.rotate_unchecked();

        if self.is_valid_position(piece, 0, 0) {
            return true;
        }

        (piece.rotation, piece.blocks) = snapshot;
        false
    }

    /// Copy of the piece moved down as far as it can go
    pub fn calculate_drop_position(&self, piece: &Piece) -> Piece {
        let mut ghost = piece.clone();
        while self.is_valid_position(&ghost, 0, 1) {
            ghost.row += 1;
        }
        ghost
    }

    /// True if any resting charged block sits at or above the top row.
    /// Wobbling blocks are already on their way out and don't count.
    pub fn is_topped_out(&self) -> bool {
        self.blocks.iter().any(|b| {
            b.is_resting() && !b.is_wobbling() && !b.charge.is_neutral() && b.pos.row <= 0
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{Flight, Motion};
    use crate::tetromino::TetrominoType;

    const PLUS: [Charge; 4] = [Charge::Positive; 4];

    fn board() -> Board {
        Board::new(BoardGeometry::default())
    }

    #[test]
    fn test_new_board_is_empty() {
        let board = board();
        assert!(board.blocks().is_empty());
        assert_eq!(board.width(), 12);
        assert_eq!(board.height(), 20);
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut board = board();
        let index = board.insert(Block::new(GridPos::new(3, 19), Charge::Negative));
        assert_eq!(board.block_at(GridPos::new(3, 19)), Some(index));
        assert!(!board.is_occupied(GridPos::new(3, 18)));
    }

    #[test]
    fn test_remove_indices_keeps_the_rest() {
        let mut board = board();
        for col in 0..4 {
            board.insert(Block::new(GridPos::new(col, 19), Charge::Positive));
        }
        let removed = board.remove_indices(&[1, 3, 3, 99]);
        assert_eq!(removed.len(), 2);
        assert_eq!(board.len(), 2);
        assert!(board.is_occupied(GridPos::new(0, 19)));
        assert!(board.is_occupied(GridPos::new(2, 19)));
    }

    #[test]
    fn test_piece_outside_columns_is_invalid() {
        let board = board();
        let left = Piece::with_charges(TetrominoType::O, -5, 4, PLUS);
        let right = Piece::with_charges(TetrominoType::I, 20, 4, PLUS);
        assert!(!board.is_valid_position(&left, 0, 0));
        assert!(!board.is_valid_position(&right, 0, 0));
    }

    #[test]
    fn test_negative_rows_are_valid() {
        let board = board();
        let piece = Piece::with_charges(TetrominoType::T, 4, -2, PLUS);
        assert!(board.is_valid_position(&piece, 0, 0));
        let floor = Piece::with_charges(TetrominoType::T, 4, 19, PLUS);
        assert!(!board.is_valid_position(&floor, 0, 0));
    }

    #[test]
    fn test_neutral_blocks_can_be_ignored() {
        let mut board = board();
        board.insert(Block::new(GridPos::new(6, 0), Charge::Neutral));
        let piece = Piece::with_charges(TetrominoType::I, 5, 0, PLUS);
        assert!(!board.is_valid_position(&piece, 0, 0));
        assert!(board.is_valid_position_ignoring_neutral(&piece, 0, 0));
    }

    #[test]
    fn test_arcing_blocks_do_not_obstruct() {
        let mut board = board();
        let mut block = Block::new(GridPos::new(6, 0), Charge::Neutral);
        block.motion = Motion::Arcing(Flight {
            start_col: 0.0,
            start_row: 10.0,
            target_col: 6.0,
            target_row: 0.0,
            progress: 0.2,
            rotation: 0.0,
            scale: 0.1,
        });
        board.insert(block);
        let piece = Piece::with_charges(TetrominoType::I, 5, 0, PLUS);
        assert!(board.is_valid_position(&piece, 0, 0));
    }

    #[test]
    fn test_try_move_is_all_or_nothing() {
        let mut board = board();
        board.insert(Block::new(GridPos::new(0, 10), Charge::Positive));
        let mut piece = Piece::with_charges(TetrominoType::I, 1, 10, PLUS);
        assert!(!board.try_move_piece(&mut piece, -1, 0));
        assert_eq!((piece.col, piece.row), (1, 10));
        assert!(board.try_move_piece(&mut piece, 1, 1));
        assert_eq!((piece.col, piece.row), (2, 11));
    }

    #[test]
    fn test_failed_rotation_restores_piece() {
        let board = board();
        // Horizontal I on the floor cannot stand up
        let mut piece = Piece::with_charges(TetrominoType::I, 4, 19, PLUS);
        let before = piece.clone();
        assert!(!board.try_rotate_piece(&mut piece));
        assert_eq!(piece, before);
    }

    #[test]
    fn test_drop_position_stops_on_blocks() {
        let mut board = board();
        board.insert(Block::new(GridPos::new(5, 15), Charge::Negative));
        let piece = Piece::with_charges(TetrominoType::I, 3, 0, PLUS);
        let ghost = board.calculate_drop_position(&piece);
        assert_eq!(ghost.row, 14);

        let open = Piece::with_charges(TetrominoType::I, 6, 0, PLUS);
        assert_eq!(board.calculate_drop_position(&open).row, 19);
    }

    #[test]
    fn test_topped_out_ignores_neutral() {
        let mut board = board();
        board.insert(Block::new(GridPos::new(2, 0), Charge::Neutral));
        assert!(!board.is_topped_out());
        board.insert(Block::new(GridPos::new(3, 0), Charge::Positive));
        assert!(board.is_topped_out());
    }
}
