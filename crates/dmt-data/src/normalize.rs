use crate::error::{DataError, DataResult};
use crate::fold::Fold;
use serde::{Deserialize, Serialize};

/// Per-column mean and sample standard deviation of the train fold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizationStats {
    pub mean: Vec<f32>,
    pub std: Vec<f32>,
}

impl NormalizationStats {
    /// Computes statistics over `rows` using the n-1 denominator.
    ///
    /// Fewer than two rows, or a constant column, leave the standard
    /// deviation undefined or zero; both are reported instead of producing
    /// NaN or infinite features.
    pub fn compute(rows: &[Vec<f32>], num_columns: usize) -> DataResult<Self> {
        let n = rows.len();
        if n < 2 {
            return Err(DataError::DegenerateStatistics(format!(
                "sample standard deviation needs at least 2 train records, got {n}"
            )));
        }

        let mut mean = vec![0f64; num_columns];
        for row in rows {
            for (acc, &v) in mean.iter_mut().zip(row) {
                *acc += f64::from(v);
            }
        }
        for m in &mut mean {
            *m /= n as f64;
        }

        let mut var = vec![0f64; num_columns];
        for row in rows {
            for ((acc, &v), m) in var.iter_mut().zip(row).zip(&mean) {
                *acc += (f64::from(v) - m).powi(2);
            }
        }

        let mut std = Vec::with_capacity(num_columns);
        for (col, v) in var.iter().enumerate() {
            let s = (v / (n - 1) as f64).sqrt();
            if s == 0.0 || !s.is_finite() {
                return Err(DataError::DegenerateStatistics(format!(
                    "numerical column {col} has zero variance in the train fold"
                )));
            }
            std.push(s as f32);
        }

        Ok(Self { mean: mean.into_iter().map(|m| m as f32).collect(), std })
    }

    /// Applies `(x - mean) / std` to every row in place.
    pub fn apply(&self, rows: &mut [Vec<f32>]) {
        for row in rows {
            for ((v, m), s) in row.iter_mut().zip(&self.mean).zip(&self.std) {
                *v = (*v - m) / s;
            }
        }
    }
}

/// Computes statistics from the train fold only and normalizes both folds.
pub fn normalize(train: &mut Fold, test: &mut Fold, num_numerical: usize) -> DataResult<NormalizationStats> {
    let stats = NormalizationStats::compute(&train.numerical, num_numerical)?;
    stats.apply(&mut train.numerical);
    stats.apply(&mut test.numerical);
    Ok(stats)
}
