//! Active falling piece

use crate::block::Charge;
use crate::geometry::GridPos;
use crate::randomizer::Randomizer;
use crate::tetromino::{Rotation, TetrominoType};

/// One cell of a piece: an offset from the anchor and the charge it carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PieceBlock {
    /// (col, row) relative to the anchor
    pub offset: (i32, i32),
    pub charge: Charge,
}

/// A piece in flight: 4 charged blocks around an anchor cell
#[derive(Debug, Clone, PartialEq)]
pub struct Piece {
    pub kind: TetrominoType,
    pub blocks: [PieceBlock; 4],
    /// Anchor column
    pub col: i32,
    /// Anchor row, may be negative while spawning
    pub row: i32,
    pub rotation: Rotation,
}

impl Piece {
    /// Create a piece with freshly rolled charges
    pub fn new(kind: TetrominoType, col: i32, row: i32, rng: &mut Randomizer) -> Self {
        let charges = [rng.charge(), rng.charge(), rng.charge(), rng.charge()];
        Self::with_charges(kind, col, row, charges)
    }

    /// Create a piece with the given charges in catalog order
    pub fn with_charges(kind: TetrominoType, col: i32, row: i32, charges: [Charge; 4]) -> Self {
        let shape = kind.shape(Rotation::North);
        let blocks = std::array::from_fn(|i| PieceBlock {
            offset: shape[i],
            charge: charges[i],
        });

        Self {
            kind,
            blocks,
            col,
            row,
            rotation: Rotation::North,
        }
    }

    /// Absolute cells of all 4 blocks
    pub fn cells(&self) -> [GridPos; 4] {
        self.cells_offset(0, 0)
    }

    /// Absolute cells if the piece were moved by the offset
    pub fn cells_offset(&self, d_col: i32, d_row: i32) -> [GridPos; 4] {
        self.blocks.map(|b| {
            GridPos::new(
                self.col + b.offset.0 + d_col,
                self.row + b.offset.1 + d_row,
            )
        })
    }

    pub fn charges(&self) -> [Charge; 4] {
        self.blocks.map(|b| b.charge)
    }

    /// Rotate one step without any collision check.
    ///
    /// The O piece keeps its footprint and only moves its charges around the
    /// square. Every other piece turns about the centre of its bounding box,
    /// (col, row) -> (row, -col), snapped back to whole cells.
    pub fn rotate_unchecked(&mut self) {
        let next = self.rotation.cw();

        if self.kind == TetrominoType::O {
            let shape = self.kind.shape(next);
            for (block, offset) in self.blocks.iter_mut().zip(shape) {
                block.offset = offset;
            }
            self.rotation = next;
            return;
        }

        let (min_col, max_col, min_row, max_row) = self.bounds();
        let center_col = (min_col + max_col) as f64 / 2.0;
        let center_row = (min_row + max_row) as f64 / 2.0;

        for block in &mut self.blocks {
            let rel_col = block.offset.0 as f64 - center_col;
            let rel_row = block.offset.1 as f64 - center_row;
            let (new_col, new_row) = (rel_row, -rel_col);
            block.offset = (
                snap(new_col + center_col),
                snap(new_row + center_row),
            );
        }

        self.rotation = next;
    }

    /// Offsets shifted so the bounding box starts at (0, 0)
    pub fn normalized_offsets(&self) -> [(i32, i32); 4] {
        let (min_col, _, min_row, _) = self.bounds();
        self.blocks
            .map(|b| (b.offset.0 - min_col, b.offset.1 - min_row))
    }

    /// (min_col, max_col, min_row, max_row) of the offsets
    fn bounds(&self) -> (i32, i32, i32, i32) {
        self.blocks.iter().fold(
            (i32::MAX, i32::MIN, i32::MAX, i32::MIN),
            |(min_c, max_c, min_r, max_r), b| {
                (
                    min_c.min(b.offset.0),
                    max_c.max(b.offset.0),
                    min_r.min(b.offset.1),
                    max_r.max(b.offset.1),
                )
            },
        )
    }
}

/// Nearest whole cell, halves rounding up
fn snap(value: f64) -> i32 {
    (value + 0.5).floor() as i32
}
