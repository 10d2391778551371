//! Electrical storms
//!
//! Four or more same-charge blocks stacked in a column start a storm. Every
//! few seconds a storm column throws a neutral block somewhere on the board,
//! with a warning shown for the last second before the throw.

use crate::arc::start_block_arc;
use crate::block::{Block, Charge};
use crate::board::Board;
use crate::geometry::GridPos;
use crate::randomizer::Randomizer;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::f64::consts::TAU;

/// Storm flicker frequency in Hz
pub const STORM_FREQUENCY: f64 = 12.0;
/// Spark animation frequency in Hz
pub const SPARK_FREQUENCY: f64 = 15.0;
/// Seconds of warning before a drop
pub const WARNING_DURATION: f64 = 1.0;
/// Stack height needed for a storm
pub const MIN_STORM_RUN: usize = 4;

/// Drop timer for one storm column
#[derive(Debug, Clone, PartialEq)]
pub struct Storm {
    pub column: i32,
    /// Seconds since the last drop
    pub timer: f64,
    /// Seconds between the last drop and the next
    pub next_drop: f64,
    pub active: bool,
    pub warning: bool,
    /// Seconds the current warning has been showing
    pub warning_time: f64,
}

impl Storm {
    fn new(column: i32, rng: &mut Randomizer) -> Self {
        Self {
            column,
            timer: 0.0,
            next_drop: rng.storm_delay(),
            active: true,
            warning: false,
            warning_time: 0.0,
        }
    }

    fn reset(&mut self, rng: &mut Randomizer) {
        self.timer = 0.0;
        self.next_drop = rng.storm_delay();
        self.warning = false;
        self.warning_time = 0.0;
    }

    pub fn time_remaining(&self) -> f64 {
        (self.next_drop - self.timer).max(0.0)
    }
}

/// Hazard indicator for the presentation layer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StormWarning {
    pub column: i32,
    pub warning_time: f64,
    /// Row of the highest storm block in the column
    pub top_row: i32,
}

/// Blocks that belong in a storm: runs of 4+ same-charge blocks stacked in
/// consecutive rows of one column. Wobbling, neutral and arcing blocks never
/// count. A falling block counts at the cell it is falling into, so a storm
/// stack that drops as one keeps its storm.
pub fn find_vertical_electrical_storms(board: &Board) -> Vec<usize> {
    let mut columns: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
    for (index, block) in board.blocks().iter().enumerate() {
        if !block.is_arcing() && !block.is_wobbling() && !block.charge.is_neutral() {
            columns.entry(block.pos.col).or_default().push(index);
        }
    }

    let blocks = board.blocks();
    let row = |i: usize| blocks[i].settled_pos().row;
    let mut found = Vec::new();

    for (_, mut column) in columns {
        column.sort_by_key(|&i| row(i));

        let mut run: Vec<usize> = Vec::new();
        for index in column {
            let continues = run.last().is_some_and(|&prev| {
                row(prev) + 1 == row(index)
                    && blocks[prev].charge == blocks[index].charge
            });
            if !continues {
                if run.len() >= MIN_STORM_RUN {
                    found.extend_from_slice(&run);
                }
                run.clear();
            }
            run.push(index);
        }
        if run.len() >= MIN_STORM_RUN {
            found.extend_from_slice(&run);
        }
    }

    found
}

/// Put blocks into a storm. Blocks already storming keep animating undisturbed.
pub fn start_electrical_storm(board: &mut Board, indices: &[usize]) -> usize {
    let mut started = 0;
    for &index in indices {
        match board.block_mut(index) {
            Some(block) if !block.is_in_storm() => {
                block.start_storm();
                started += 1;
            }
            _ => {}
        }
    }
    if started > 0 {
        tracing::debug!("{} blocks joined a storm", started);
    }
    started
}

/// Clear the storm flag from blocks that no longer qualify. Returns how many were cleared.
pub fn clear_invalid_storms(board: &mut Board) -> usize {
    let valid: HashSet<usize> = find_vertical_electrical_storms(board).into_iter().collect();

    let mut cleared = 0;
    for (index, block) in board.blocks_mut().iter_mut().enumerate() {
        if block.is_in_storm() && !valid.contains(&index) {
            block.clear_storm();
            cleared += 1;
        }
    }

    // A column/charge group that lost members can no longer sustain a storm
    let mut groups: HashMap<(i32, Charge), usize> = HashMap::new();
    for block in board.blocks().iter().filter(|b| b.is_in_storm()) {
        *groups.entry((block.pos.col, block.charge)).or_default() += 1;
    }
    for block in board.blocks_mut() {
        if block.is_in_storm()
            && groups
                .get(&(block.pos.col, block.charge))
                .is_some_and(|&count| count < MIN_STORM_RUN)
        {
            block.clear_storm();
            cleared += 1;
        }
    }

    if cleared > 0 {
        tracing::debug!("Cleared storm from {} blocks", cleared);
    }
    cleared
}

/// Advance the flicker and spark phases of every storm block
pub fn update_electrical_storms(board: &mut Board, dt: f64) {
    for block in board.blocks_mut() {
        if let Some(storm) = &mut block.storm {
            storm.elapsed += dt;
            storm.phase += dt * STORM_FREQUENCY * TAU;
            storm.spark_phase += dt * SPARK_FREQUENCY * TAU;
        }
    }
}

/// Highest storm block in a column (smallest row)
fn storm_top(board: &Board, column: i32) -> Option<GridPos> {
    board
        .blocks()
        .iter()
        .filter(|b| b.is_in_storm() && b.pos.col == column)
        .map(|b| b.settled_pos())
        .min_by_key(|pos| pos.row)
}

/// Active storm columns and their drop timers
#[derive(Debug, Clone, Default)]
pub struct StormField {
    storms: BTreeMap<i32, Storm>,
}

impl StormField {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn storms(&self) -> impl Iterator<Item = &Storm> {
        self.storms.values()
    }

    pub fn clear(&mut self) {
        self.storms.clear();
    }

    /// Track exactly the columns that currently hold storm blocks
    pub fn update_active_storms(&mut self, board: &Board, rng: &mut Randomizer) {
        let columns: BTreeSet<i32> = board
            .blocks()
            .iter()
            .filter(|b| b.is_in_storm())
            .map(|b| b.pos.col)
            .collect();

        self.storms.retain(|column, _| columns.contains(column));
        for column in columns {
            self.storms.entry(column).or_insert_with(|| {
                tracing::debug!("Storm started in column {}", column);
                Storm::new(column, rng)
            });
        }
    }

    /// Run drop timers. Returns the neutral blocks thrown this step; they are
    /// already in flight and still need to be added to the board.
    ///
    /// A drop whose target column has no room on the top row is skipped, but
    /// the timer is still reset.
    pub fn update_storm_timers(
        &mut self,
        board: &Board,
        dt: f64,
        rng: &mut Randomizer,
    ) -> Vec<Block> {
        let mut thrown = Vec::new();

        for storm in self.storms.values_mut() {
            storm.timer += dt;

            if storm.next_drop - storm.timer <= WARNING_DURATION {
                storm.warning = true;
                storm.warning_time += dt;
            }

            if storm.timer < storm.next_drop {
                continue;
            }

            let Some(top) = storm_top(board, storm.column) else {
                storm.reset(rng);
                continue;
            };

            let target_col = rng.column(board.width());
            let landing = GridPos::new(target_col, 0);
            // A block already flying to the cell claims it
            let claimed = board
                .blocks()
                .iter()
                .chain(thrown.iter())
                .any(|b| b.is_arcing() && b.pos == landing);
            if board.is_occupied(landing) || claimed {
                tracing::trace!("Storm drop skipped, column {} is full", target_col);
            } else {
                let mut block = Block::new(landing, Charge::Neutral);
                start_block_arc(&mut block, top.col as f64, top.row as f64, target_col, 0);
                tracing::debug!("Storm in column {} threw a block to column {}", storm.column, target_col);
                thrown.push(block);
            }

            storm.reset(rng);
        }

        thrown
    }

    /// Columns currently counting down to a drop
    pub fn warnings(&self, board: &Board) -> Vec<StormWarning> {
        self.storms
            .values()
            .filter(|s| s.warning)
            .filter_map(|s| {
                storm_top(board, s.column).map(|top| StormWarning {
                    column: s.column,
                    warning_time: s.warning_time,
                    top_row: top.row,
                })
            })
            .collect()
    }
}
