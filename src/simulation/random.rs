//! Deterministic random sources.
//!
//! Replays and network peers must draw the same numbers in the same order. Projectiles do not
//! own a generator; they carry an index into a fixed table that every peer derives from the
//! same seed.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Number of entries in the fixed random table. Random stream indices wrap at this value.
pub const FIXED_RANDOM_LEN: i32 = 255;

/// A table of pre-generated samples in `[-1, 1)`, addressed by stream index.
#[derive(Debug, Clone)]
pub struct FixedRandom {
    table: Vec<f32>,
}

impl FixedRandom {
    /// Generates the table from a seed.
    pub fn new(seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let table = (0..FIXED_RANDOM_LEN)
            .map(|_| rng.random_range(-1.0..1.0))
            .collect();
        Self { table }
    }

    /// Sample for a stream index. Any integer is accepted and wrapped into the table.
    pub fn get(&self, index: i32) -> f32 {
        let slot = index.rem_euclid(FIXED_RANDOM_LEN) as usize;
        self.table[slot]
    }

    /// Advances a stream index by `steps`, wrapping at the table length.
    pub fn advance(index: i32, steps: i32) -> i32 {
        (index.rem_euclid(FIXED_RANDOM_LEN) + steps.rem_euclid(FIXED_RANDOM_LEN))
            .rem_euclid(FIXED_RANDOM_LEN)
    }

    /// Multiplies a stream index by `factor`, wrapping at the table length.
    pub fn scale(index: i32, factor: i32) -> i32 {
        (index.rem_euclid(FIXED_RANDOM_LEN) * factor.rem_euclid(FIXED_RANDOM_LEN))
            .rem_euclid(FIXED_RANDOM_LEN)
    }
}

/// Creates the generator used for non-replicated randomness such as initial sprite rotation.
pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}
