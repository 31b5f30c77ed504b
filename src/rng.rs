//! Seeded random source shared by placement and relocation.

use rand::seq::index;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::ops::Range;

/// Uniform random operations consumed by the engine.
///
/// Group assignment and relocation draw from `uniform_int`; initial
/// placement draws once from `sample_without_replacement`.
pub trait RandomSource {
    /// Uniform integer in `range`. The range must be non-empty.
    fn uniform_int(&mut self, range: Range<usize>) -> usize;

    /// `k` distinct indices drawn uniformly from `0..population`.
    fn sample_without_replacement(&mut self, population: usize, k: usize) -> Vec<usize>;
}

impl<R: Rng + ?Sized> RandomSource for R {
    #[inline]
    fn uniform_int(&mut self, range: Range<usize>) -> usize {
        self.gen_range(range)
    }

    fn sample_without_replacement(&mut self, population: usize, k: usize) -> Vec<usize> {
        index::sample(self, population, k).into_vec()
    }
}

/// Create a deterministic RNG from a seed.
pub fn create_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}
