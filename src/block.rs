//! Charged blocks and their animation state

use crate::geometry::GridPos;

/// Charge carried by every block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Charge {
    Positive,
    Negative,
    /// Contributes nothing and breaks clusters
    Neutral,
}

impl Charge {
    /// Contribution to a zero-sum run
    pub fn value(self) -> i32 {
        match self {
            Charge::Positive => 1,
            Charge::Negative => -1,
            Charge::Neutral => 0,
        }
    }

    pub fn is_neutral(self) -> bool {
        matches!(self, Charge::Neutral)
    }

    pub fn symbol(self) -> char {
        match self {
            Charge::Positive => '+',
            Charge::Negative => '-',
            Charge::Neutral => 'o',
        }
    }
}

/// Telegraph shown before a matched block is removed
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Wobble {
    /// Seconds spent wobbling
    pub elapsed: f64,
    /// Animation phase in radians
    pub phase: f64,
    /// Draw the "POW" marker over the block
    pub show_pow: bool,
}

/// Visual state of a block that is part of an electrical storm
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StormFx {
    pub elapsed: f64,
    pub phase: f64,
    pub spark_phase: f64,
}

/// Smooth fall from the block's logical row to a lower row
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fall {
    pub start_row: i32,
    pub target_row: i32,
    /// 0.0 to 1.0
    pub progress: f64,
}

impl Fall {
    /// Interpolated row for rendering
    pub fn current_row(&self) -> f64 {
        let span = (self.target_row - self.start_row) as f64;
        self.start_row as f64 + span * self.progress
    }
}

/// Parabolic flight of a block ejected by a storm
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Flight {
    pub start_col: f64,
    pub start_row: f64,
    pub target_col: f64,
    pub target_row: f64,
    /// 0.0 to 1.0
    pub progress: f64,
    /// Degrees
    pub rotation: f64,
    pub scale: f64,
}

/// Movement a block is going through. A block is never falling and arcing at once.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Motion {
    #[default]
    Resting,
    Falling(Fall),
    Arcing(Flight),
}

/// A single placed block
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Block {
    /// Logical cell. While falling this is still the start cell.
    pub pos: GridPos,
    pub charge: Charge,
    pub wobble: Option<Wobble>,
    pub storm: Option<StormFx>,
    pub motion: Motion,
}

impl Block {
    pub fn new(pos: GridPos, charge: Charge) -> Self {
        Self {
            pos,
            charge,
            wobble: None,
            storm: None,
            motion: Motion::Resting,
        }
    }

    pub fn is_wobbling(&self) -> bool {
        self.wobble.is_some()
    }

    pub fn is_in_storm(&self) -> bool {
        self.storm.is_some()
    }

    pub fn is_arcing(&self) -> bool {
        matches!(self.motion, Motion::Arcing(_))
    }

    /// Not moving anywhere
    pub fn is_resting(&self) -> bool {
        matches!(self.motion, Motion::Resting)
    }

    /// Cell this block occupies once its current fall completes
    pub fn settled_pos(&self) -> GridPos {
        match self.motion {
            Motion::Falling(fall) => GridPos::new(self.pos.col, fall.target_row),
            _ => self.pos,
        }
    }

    /// Mark for removal; the wobble timer starts from zero
    pub fn start_wobble(&mut self) {
        self.wobble = Some(Wobble {
            show_pow: true,
            ..Wobble::default()
        });
        // A block on its way out no longer feeds a storm
        self.storm = None;
    }

    /// Join a storm. Blocks already storming keep their phase.
    pub fn start_storm(&mut self) {
        if self.storm.is_none() {
            self.storm = Some(StormFx::default());
        }
    }

    pub fn clear_storm(&mut self) {
        self.storm = None;
    }
}
