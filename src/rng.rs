//! The single random stream behind every stochastic decision of a run.

use rand::prelude::*;
use rand_chacha::ChaCha12Rng;
use serde::{Deserialize, Serialize};

/// Seedable pseudo-random source.
///
/// Exactly one instance exists per run and it is passed by `&mut` to whatever
/// needs randomness, so a fixed seed fixes the whole trajectory. The generator
/// state is serializable, which lets a checkpointed run continue the same stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomSource {
    seed: u64,
    rng: ChaCha12Rng,
}

impl RandomSource {
    /// Create a source from an explicit seed.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: ChaCha12Rng::seed_from_u64(seed),
        }
    }

    /// Create a source from an optional seed, drawing one from the OS when absent.
    pub fn from_optional_seed(seed: Option<u64>) -> Self {
        let seed = seed.unwrap_or_else(rand::random);
        Self::new(seed)
    }

    /// Seed this source was created with.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Uniform float in `[0, 1)`.
    pub fn next_float(&mut self) -> f64 {
        self.rng.random()
    }

    /// Uniform integer in `[lo, hi)`.
    ///
    /// # Panics
    /// Panics if `lo >= hi`.
    pub fn range_int(&mut self, lo: usize, hi: usize) -> usize {
        self.rng.random_range(lo..hi)
    }

    /// Uniformly chosen element, or `None` for an empty slice.
    pub fn choice<'a, T>(&mut self, slice: &'a [T]) -> Option<&'a T> {
        slice.choose(&mut self.rng)
    }

    /// Shuffle a slice in place (Fisher-Yates).
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        slice.shuffle(&mut self.rng);
    }
}
