//! Scoring for zero-sum reactions

/// Reactions smaller than this score nothing
pub const MIN_SCORING_BLOCKS: usize = 4;
/// Points for a minimal scoring reaction; each extra block doubles it
pub const BASE_REACTION_POINTS: i32 = 10;

/// Points for removing `blocks` blocks in a single pass.
/// 4 -> 10, 5 -> 20, 6 -> 40, 7 -> 80 ...
pub fn score_for(blocks: usize) -> i32 {
    if blocks < MIN_SCORING_BLOCKS {
        return 0;
    }
    // Saturate instead of overflowing on absurd board sizes
    let doublings = (blocks - MIN_SCORING_BLOCKS).min(30) as u32;
    BASE_REACTION_POINTS.saturating_mul(1 << doublings)
}

/// Running score and statistics for one game
#[derive(Debug, Clone, Default)]
pub struct Score {
    /// Current score
    pub points: u64,
    /// Blocks actually removed from the board
    pub blocks_cleared: u32,
    /// Reaction passes that matched anything
    pub reactions: u32,
    /// Most blocks matched in a single pass
    pub largest_reaction: u32,
}

impl Score {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a reaction pass of `matched` blocks worth `points`
    pub fn add_reaction(&mut self, matched: usize, points: i32) {
        if matched == 0 {
            return;
        }
        self.reactions += 1;
        self.largest_reaction = self.largest_reaction.max(matched as u32);
        self.points += points.max(0) as u64;
    }

    /// Record blocks leaving the board
    pub fn add_cleared(&mut self, count: usize) {
        self.blocks_cleared += count as u32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_table() {
        assert_eq!(score_for(0), 0);
        assert_eq!(score_for(3), 0);
        assert_eq!(score_for(4), 10);
        assert_eq!(score_for(5), 20);
        assert_eq!(score_for(6), 40);
        assert_eq!(score_for(7), 80);
        assert_eq!(score_for(12), 2560);
    }

    #[test]
    fn test_score_saturates() {
        assert_eq!(score_for(500), i32::MAX);
    }

    #[test]
    fn test_reaction_stats() {
        let mut score = Score::new();
        score.add_reaction(4, 10);
        score.add_reaction(6, 40);
        score.add_reaction(0, 0);
        assert_eq!(score.points, 50);
        assert_eq!(score.reactions, 2);
        assert_eq!(score.largest_reaction, 6);
    }

    #[test]
    fn test_cleared_blocks_accumulate() {
        let mut score = Score::new();
        score.add_cleared(4);
        score.add_cleared(2);
        assert_eq!(score.blocks_cleared, 6);
    }
}
