//! Tetromino catalog
//!
//! All 7 piece kinds with a footprint table for each of the 4 rotation indices.
//! Offsets are (col, row) relative to the piece anchor, row increasing downward.

/// The 7 tetromino types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TetrominoType {
    I, // long bar
    O, // square
    T,
    S,
    Z,
    J,
    L,
}

impl TetrominoType {
    /// Get all tetromino types
    pub fn all() -> [TetrominoType; 7] {
        [
            TetrominoType::I,
            TetrominoType::O,
            TetrominoType::T,
            TetrominoType::S,
            TetrominoType::Z,
            TetrominoType::J,
            TetrominoType::L,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            TetrominoType::I => "I",
            TetrominoType::O => "O",
            TetrominoType::T => "T",
            TetrominoType::S => "S",
            TetrominoType::Z => "Z",
            TetrominoType::J => "J",
            TetrominoType::L => "L",
        }
    }

    /// Footprint of this kind at a rotation index, as (col, row) offsets.
    ///
    /// For the O piece the four entries always cover the same 2x2 square;
    /// the rotation only changes which entry sits in which cell.
    pub fn shape(&self, rotation: Rotation) -> [(i32, i32); 4] {
        match self {
            TetrominoType::I => match rotation {
                Rotation::North | Rotation::South => [(0, 0), (1, 0), (2, 0), (3, 0)],
                Rotation::East | Rotation::West => [(0, 0), (0, 1), (0, 2), (0, 3)],
            },
            TetrominoType::O => match rotation {
                Rotation::North => [(0, 0), (1, 0), (0, 1), (1, 1)],
                Rotation::East => [(1, 0), (1, 1), (0, 0), (0, 1)],
                Rotation::South => [(1, 1), (0, 1), (1, 0), (0, 0)],
                Rotation::West => [(0, 1), (0, 0), (1, 1), (1, 0)],
            },
            // North: .T.   East: T.   South: TTT   West: .T
            //        TTT         TT          .T.         TT
            //                    T.                      .T
            TetrominoType::T => match rotation {
                Rotation::North => [(1, 0), (0, 1), (1, 1), (2, 1)],
                Rotation::East => [(0, 0), (0, 1), (1, 1), (0, 2)],
                Rotation::South => [(0, 0), (1, 0), (2, 0), (1, 1)],
                Rotation::West => [(1, 0), (0, 1), (1, 1), (1, 2)],
            },
            TetrominoType::S => match rotation {
                Rotation::North | Rotation::South => [(1, 0), (2, 0), (0, 1), (1, 1)],
                Rotation::East | Rotation::West => [(0, 0), (0, 1), (1, 1), (1, 2)],
            },
            TetrominoType::Z => match rotation {
                Rotation::North | Rotation::South => [(0, 0), (1, 0), (1, 1), (2, 1)],
                Rotation::East | Rotation::West => [(1, 0), (0, 1), (1, 1), (0, 2)],
            },
            TetrominoType::J => match rotation {
                Rotation::North => [(0, 0), (0, 1), (1, 1), (2, 1)],
                Rotation::East => [(1, 0), (1, 1), (1, 2), (0, 2)],
                Rotation::South => [(0, 0), (1, 0), (2, 0), (2, 1)],
                Rotation::West => [(0, 0), (1, 0), (0, 1), (0, 2)],
            },
            TetrominoType::L => match rotation {
                Rotation::North => [(2, 0), (0, 1), (1, 1), (2, 1)],
                Rotation::East => [(0, 0), (0, 1), (0, 2), (1, 2)],
                Rotation::South => [(0, 0), (1, 0), (2, 0), (0, 1)],
                Rotation::West => [(0, 0), (1, 0), (1, 1), (1, 2)],
            },
        }
    }
}

/// Rotation index 0..=3
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    North, // Spawn state
    East,
    South,
    West,
}

impl Rotation {
    /// Advance one step: North → East → South → West → North
    pub fn cw(&self) -> Rotation {
        match self {
            Rotation::North => Rotation::East,
            Rotation::East => Rotation::South,
            Rotation::South => Rotation::West,
            Rotation::West => Rotation::North,
        }
    }
}
