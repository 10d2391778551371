//! Reaction resolver
//!
//! Rows are split into clusters of column-adjacent charged blocks. Inside each
//! cluster the longest contiguous run whose charges cancel out is matched.
//! Matched blocks either wobble for a moment before being removed, or are
//! removed on the spot, depending on the [`ReactionMode`].

use crate::block::Charge;
use crate::board::Board;
use crate::score::score_for;
use std::collections::BTreeMap;
use std::ops::Range;

/// Seconds a matched block wobbles before it is removed
pub const WOBBLE_DURATION: f64 = 0.8;
/// Wobble animation frequency in Hz
pub const WOBBLE_FREQUENCY: f64 = 8.0;
/// Shortest cluster worth scanning
pub const MIN_CLUSTER_LEN: usize = 3;

/// How matched blocks leave the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReactionMode {
    /// Matched blocks wobble, then get removed
    #[default]
    Telegraph,
    /// Resolve, remove and settle in a loop until nothing matches
    Immediate,
}

impl ReactionMode {
    pub fn name(&self) -> &'static str {
        match self {
            ReactionMode::Telegraph => "telegraph",
            ReactionMode::Immediate => "immediate",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "telegraph" | "wobble" => Some(ReactionMode::Telegraph),
            "immediate" | "instant" => Some(ReactionMode::Immediate),
            _ => None,
        }
    }
}

/// Result of one reaction check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReactionPass {
    /// Blocks matched (and scored) by this check
    pub matched: usize,
    pub score: i32,
    /// Blocks already taken off the board. Always 0 when telegraphing.
    pub removed: usize,
}

impl ReactionPass {
    pub fn merge(&mut self, other: ReactionPass) {
        self.matched += other.matched;
        self.score += other.score;
        self.removed += other.removed;
    }
}

/// Longest contiguous range of `charges` summing to zero, at least
/// `MIN_CLUSTER_LEN` long. Ties go to the leftmost start.
pub fn longest_zero_sum(charges: &[Charge]) -> Option<Range<usize>> {
    let n = charges.len();
    if n < MIN_CLUSTER_LEN {
        return None;
    }

    // prefix[i] = sum of charges[..i]
    let mut prefix = Vec::with_capacity(n + 1);
    prefix.push(0);
    for charge in charges {
        let last = prefix[prefix.len() - 1];
        prefix.push(last + charge.value());
    }

    for len in (MIN_CLUSTER_LEN..=n).rev() {
        for start in 0..=(n - len) {
            if prefix[start + len] == prefix[start] {
                return Some(start..start + len);
            }
        }
    }
    None
}

/// Indices of all blocks that a reaction pass would remove.
///
/// Only resting, non-wobbling blocks take part. Neutral blocks and column
/// gaps split clusters.
pub fn find_removable_blocks(board: &Board) -> Vec<usize> {
    let mut rows: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
    for (index, block) in board.blocks().iter().enumerate() {
        if block.is_resting() && !block.is_wobbling() {
            rows.entry(block.pos.row).or_default().push(index);
        }
    }

    let blocks = board.blocks();
    let mut removable = Vec::new();

    for (_, mut row) in rows {
        row.sort_by_key(|&i| blocks[i].pos.col);

        let mut cluster: Vec<usize> = Vec::new();
        for index in row {
            let block = &blocks[index];
            let adjacent = cluster
                .last()
                .is_some_and(|&prev| blocks[prev].pos.col + 1 == block.pos.col);

            if !adjacent {
                collect_matches(board, &cluster, &mut removable);
                cluster.clear();
            }

            if block.charge.is_neutral() {
                collect_matches(board, &cluster, &mut removable);
                cluster.clear();
            } else {
                cluster.push(index);
            }
        }
        collect_matches(board, &cluster, &mut removable);
    }

    removable
}

fn collect_matches(board: &Board, cluster: &[usize], out: &mut Vec<usize>) {
    if cluster.len() < MIN_CLUSTER_LEN {
        return;
    }
    let charges: Vec<Charge> = cluster
        .iter()
        .map(|&i| board.blocks()[i].charge)
        .collect();
    if let Some(range) = longest_zero_sum(&charges) {
        out.extend_from_slice(&cluster[range]);
    }
}

/// Find matches and start them wobbling
pub fn mark_reactions(board: &mut Board) -> ReactionPass {
    let matched = find_removable_blocks(board);
    for &index in &matched {
        if let Some(block) = board.block_mut(index) {
            block.start_wobble();
        }
    }

    let pass = ReactionPass {
        matched: matched.len(),
        score: score_for(matched.len()),
        removed: 0,
    };
    if pass.matched > 0 {
        tracing::debug!("Reaction matched {} blocks (+{})", pass.matched, pass.score);
    }
    pass
}

/// Advance every wobble. Returns true if any wobble has run its course.
pub fn update_wobbling_blocks(board: &mut Board, dt: f64) -> bool {
    let mut any_finished = false;
    for block in board.blocks_mut() {
        if let Some(wobble) = &mut block.wobble {
            wobble.elapsed += dt;
            wobble.phase += dt * WOBBLE_FREQUENCY * std::f64::consts::TAU;
            if wobble.elapsed >= WOBBLE_DURATION {
                any_finished = true;
            }
        }
    }
    any_finished
}

/// Indices of blocks whose wobble is done
pub fn finished_wobbling(board: &Board) -> Vec<usize> {
    board
        .blocks()
        .iter()
        .enumerate()
        .filter(|(_, b)| b.wobble.is_some_and(|w| w.elapsed >= WOBBLE_DURATION))
        .map(|(index, _)| index)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Block;
    use crate::geometry::{BoardGeometry, GridPos};
    use crate::block::Charge::{Negative as N, Neutral as O, Positive as P};

    fn row_board(row: i32, cells: &[(i32, Charge)]) -> Board {
        let mut board = Board::new(BoardGeometry::default());
        for &(col, charge) in cells {
            board.insert(Block::new(GridPos::new(col, row), charge));
        }
        board
    }

    fn removed_columns(board: &Board, indices: &[usize]) -> Vec<i32> {
        let mut cols: Vec<i32> = indices.iter().map(|&i| board.blocks()[i].pos.col).collect();
        cols.sort();
        cols
    }

    #[test]
    fn test_longest_zero_sum_prefers_length() {
        assert_eq!(longest_zero_sum(&[P, P, N, N, P]), Some(0..4));
        assert_eq!(longest_zero_sum(&[P, N, P, N]), Some(0..4));
    }

    #[test]
    fn test_longest_zero_sum_leftmost_tie() {
        // Both 0..4 and 1..5 cancel
        assert_eq!(longest_zero_sum(&[P, N, N, P, N]), Some(0..4));
        assert_eq!(longest_zero_sum(&[P, P, P, N, N, P]), Some(1..5));
    }

    #[test]
    fn test_longest_zero_sum_none() {
        assert_eq!(longest_zero_sum(&[P, P, P]), None);
        assert_eq!(longest_zero_sum(&[P, N]), None);
        assert_eq!(longest_zero_sum(&[]), None);
    }

    #[test]
    fn test_row_match_picks_longest_run() {
        let board = row_board(19, &[(0, P), (1, P), (2, N), (3, N), (4, P)]);
        let removable = find_removable_blocks(&board);
        assert_eq!(removed_columns(&board, &removable), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_neutral_breaks_cluster() {
        let board = row_board(19, &[(0, P), (1, N), (2, O), (3, P), (4, N)]);
        assert!(find_removable_blocks(&board).is_empty());
    }

    #[test]
    fn test_gap_breaks_cluster() {
        let board = row_board(19, &[(0, P), (1, P), (3, N), (4, N)]);
        assert!(find_removable_blocks(&board).is_empty());
    }

    #[test]
    fn test_matches_in_separate_clusters_and_rows() {
        let mut board = row_board(19, &[(0, P), (1, N), (2, N), (3, P), (5, O)]);
        board.insert(Block::new(GridPos::new(6, 18), N));
        board.insert(Block::new(GridPos::new(7, 18), P));
        board.insert(Block::new(GridPos::new(8, 18), P));
        board.insert(Block::new(GridPos::new(9, 18), N));
        let removable = find_removable_blocks(&board);
        assert_eq!(removable.len(), 8);
    }

    #[test]
    fn test_wobbling_blocks_are_skipped() {
        let mut board = row_board(19, &[(0, P), (1, P), (2, N), (3, N)]);
        if let Some(block) = board.block_mut(0) {
            block.start_wobble();
        }
        // Remaining cluster 1..=3 is [+, -, -] which never cancels
        assert!(find_removable_blocks(&board).is_empty());
    }

    #[test]
    fn test_mark_reactions_scores_and_wobbles() {
        let mut board = row_board(19, &[(0, P), (1, P), (2, N), (3, N)]);
        let pass = mark_reactions(&mut board);
        assert_eq!(
            pass,
            ReactionPass {
                matched: 4,
                score: 10,
                removed: 0
            }
        );
        assert!(board.blocks().iter().all(|b| b.is_wobbling()));
        // Already wobbling, nothing new
        assert_eq!(mark_reactions(&mut board).matched, 0);
    }

    #[test]
    fn test_wobble_finishes_after_duration() {
        let mut board = row_board(19, &[(0, P), (1, N), (2, P), (3, N)]);
        mark_reactions(&mut board);
        assert!(!update_wobbling_blocks(&mut board, 0.5));
        assert!(finished_wobbling(&board).is_empty());
        assert!(update_wobbling_blocks(&mut board, 0.4));
        assert_eq!(finished_wobbling(&board).len(), 4);
    }

    #[test]
    fn test_mode_names() {
        assert_eq!(ReactionMode::from_name("Immediate"), Some(ReactionMode::Immediate));
        assert_eq!(ReactionMode::from_name("telegraph"), Some(ReactionMode::Telegraph));
        assert_eq!(ReactionMode::from_name("sometimes"), None);
        assert_eq!(ReactionMode::default().name(), "telegraph");
    }
}
