//! Seedable randomness for pieces, charges and storms
//!
//! Everything random in a game flows through one `Randomizer`, so a seed
//! reproduces the same sequence of pieces, charges and storm ejections.

use crate::block::Charge;
use crate::tetromino::TetrominoType;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Probability of a positive charge
const POSITIVE_CHANCE: f64 = 0.4;
/// Probability of a positive or negative charge (remainder is neutral)
const CHARGED_CHANCE: f64 = 0.8;

/// Storm drop delays are uniform in [MIN, MIN + SPREAD)
const STORM_DELAY_MIN: f64 = 3.0;
const STORM_DELAY_SPREAD: f64 = 2.0;

#[derive(Debug, Clone)]
pub struct Randomizer {
    rng: ChaCha8Rng,
}

impl Default for Randomizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Randomizer {
    /// Randomizer seeded from the OS
    pub fn new() -> Self {
        Self::with_seed(rand::random())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Uniformly chosen piece kind
    pub fn next_kind(&mut self) -> TetrominoType {
        *TetrominoType::all()
            .choose(&mut self.rng)
            .unwrap_or(&TetrominoType::I)
    }

    /// Positive 40%, Negative 40%, Neutral 20%
    pub fn charge(&mut self) -> Charge {
        let r: f64 = self.rng.r#gen();
        if r < POSITIVE_CHANCE {
            Charge::Positive
        } else if r < CHARGED_CHANCE {
            Charge::Negative
        } else {
            Charge::Neutral
        }
    }

    /// Seconds until a storm ejects its next neutral block
    pub fn storm_delay(&mut self) -> f64 {
        STORM_DELAY_MIN + self.rng.r#gen::<f64>() * STORM_DELAY_SPREAD
    }

    /// Uniformly chosen column in [0, columns)
    pub fn column(&mut self, columns: i32) -> i32 {
        if columns <= 0 {
            return 0;
        }
        self.rng.gen_range(0..columns)
    }

    /// Uniform float in [0, 1) for presentation jitter
    pub fn unit(&mut self) -> f64 {
        self.rng.r#gen()
    }
}
