//! Randomized train/test partitioning.

use crate::error::{DataError, DataResult};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Tolerance for treating `n * p` as an exact integer before taking the
/// ceiling, so that e.g. `10 * 0.7` yields 7 rather than 8.
const CEIL_TOLERANCE: f64 = 1e-9;

/// Record indices of each fold, in shuffled order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// `ceil(num_records * train_percentage)` for a percentage in `(0, 1)`.
pub fn train_count(num_records: usize, train_percentage: f64) -> DataResult<usize> {
    if !train_percentage.is_finite() || train_percentage <= 0.0 || train_percentage >= 1.0 {
        return Err(DataError::Config(format!(
            "train percentage must be in (0, 1), got {train_percentage}"
        )));
    }
    let raw = num_records as f64 * train_percentage;
    let nearest = raw.round();
    let count = if (raw - nearest).abs() < CEIL_TOLERANCE { nearest } else { raw.ceil() };
    Ok(count as usize)
}

/// Produces train/test partitions. With a seed, every call yields the same
/// partition; without one, each call draws from OS entropy.
#[derive(Debug, Clone, Copy, Default)]
pub struct Splitter {
    seed: Option<u64>,
}

impl Splitter {
    #[must_use]
    pub fn new(seed: Option<u64>) -> Self {
        Self { seed }
    }

    #[must_use]
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    /// A uniformly random permutation of `0..num_records` (Fisher-Yates).
    #[must_use]
    pub fn shuffle(&self, num_records: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..num_records).collect();
        indices.shuffle(&mut self.rng());
        indices
    }

    pub fn split(&self, num_records: usize, train_percentage: f64) -> DataResult<SplitIndices> {
        let num_train = train_count(num_records, train_percentage)?;
        let mut permutation = self.shuffle(num_records);
        let test = permutation.split_off(num_train);
        Ok(SplitIndices { train: permutation, test })
    }
}
