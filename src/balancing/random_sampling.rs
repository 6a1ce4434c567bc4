//! Random oversampling of minority classes

use crate::balancing::{class_counts, class_indices, ResampleResult, Sampler};
use crate::error::{ClassifierError, Result};
use ndarray::{Array1, Array2};
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// Random oversampler (duplicates minority samples)
///
/// Runs only when the majority/minority count ratio exceeds the imbalance
/// threshold; every smaller class is then drawn with replacement up to the
/// majority count. Below the threshold the data passes through untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomOverSampler {
    /// Majority/minority ratio above which resampling kicks in
    imbalance_threshold: f64,
    /// Random seed
    seed: u64,
    /// Target counts, empty when no resampling is needed
    target_counts: Option<BTreeMap<usize, usize>>,
}

impl RandomOverSampler {
    /// Create new random oversampler
    pub fn new() -> Self {
        Self {
            imbalance_threshold: 2.0,
            seed: 42,
            target_counts: None,
        }
    }

    /// Set the imbalance ratio that triggers resampling
    pub fn with_imbalance_threshold(mut self, threshold: f64) -> Self {
        self.imbalance_threshold = threshold.max(1.0);
        self
    }

    /// Set random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn imbalance_threshold(&self) -> f64 {
        self.imbalance_threshold
    }
}

impl Default for RandomOverSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl Sampler for RandomOverSampler {
    fn fit(&mut self, _x: &Array2<f64>, y: &Array1<usize>) -> Result<()> {
        let counts = class_counts(y);
        let (Some(&max_count), Some(&min_count)) = (counts.values().max(), counts.values().min()) else {
            return Err(ClassifierError::DataError("cannot balance an empty label set".to_string()));
        };

        let ratio = max_count as f64 / min_count as f64;
        let targets = if ratio > self.imbalance_threshold {
            info!(max_count, min_count, ratio, "Class imbalance detected, oversampling minority classes");
            counts.keys().map(|&class| (class, max_count)).collect()
        } else {
            BTreeMap::new()
        };

        self.target_counts = Some(targets);
        Ok(())
    }

    fn resample(&self, x: &Array2<f64>, y: &Array1<usize>) -> Result<ResampleResult> {
        let targets = self.target_counts.as_ref().ok_or_else(|| {
            ClassifierError::PreprocessingError("sampler must be fitted before resample".to_string())
        })?;
        if x.nrows() != y.len() {
            return Err(ClassifierError::DimensionMismatch {
                expected: x.nrows(),
                actual: y.len(),
            });
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let indices = class_indices(y);
        let counts = class_counts(y);

        let mut rows: Vec<usize> = (0..y.len()).collect();
        let mut n_added = BTreeMap::new();

        for (&class, &target_count) in targets {
            let current_count = counts.get(&class).copied().unwrap_or(0);
            let n_to_add = target_count.saturating_sub(current_count);
            n_added.insert(class, n_to_add);

            let Some(class_idx) = indices.get(&class) else { continue };
            for _ in 0..n_to_add {
                rows.push(class_idx[rng.gen_range(0..class_idx.len())]);
            }
        }

        let mut result_x = Array2::zeros((rows.len(), x.ncols()));
        for (i, &src) in rows.iter().enumerate() {
            result_x.row_mut(i).assign(&x.row(src));
        }
        let result_y: Array1<usize> = rows.iter().map(|&src| y[src]).collect();

        Ok(ResampleResult {
            x: result_x,
            y: result_y,
            n_added,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn skewed() -> (Array2<f64>, Array1<usize>) {
        let y = array![0, 0, 0, 0, 0, 0, 1, 1, 2];
        let x = Array2::from_shape_fn((9, 2), |(i, j)| (i * 10 + j) as f64);
        (x, y)
    }

    #[test]
    fn test_oversamples_to_majority_count() {
        let (x, y) = skewed();
        let result = RandomOverSampler::new().fit_resample(&x, &y).unwrap();

        assert!(result.is_resampled());
        let counts = class_counts(&result.y);
        assert!(counts.values().all(|&c| c == 6));
        assert_eq!(result.x.nrows(), 18);

        // Every added row is a copy of an original row of the same class
        for (row, &label) in result.x.rows().into_iter().zip(result.y.iter()) {
            let src = (row[0] / 10.0) as usize;
            assert_eq!(y[src], label);
        }
    }

    #[test]
    fn test_below_threshold_is_unchanged() {
        let x = Array2::from_shape_fn((5, 1), |(i, _)| i as f64);
        let y = array![0, 0, 0, 1, 1];
        let result = RandomOverSampler::new().fit_resample(&x, &y).unwrap();

        assert!(!result.is_resampled());
        assert_eq!(result.x, x);
        assert_eq!(result.y, y);
    }

    #[test]
    fn test_threshold_one_balances_any_skew() {
        let x = Array2::from_shape_fn((5, 1), |(i, _)| i as f64);
        let y = array![0, 0, 0, 1, 1];
        let result = RandomOverSampler::new()
            .with_imbalance_threshold(1.0)
            .fit_resample(&x, &y)
            .unwrap();
        assert_eq!(class_counts(&result.y)[&1], 3);
    }

    #[test]
    fn test_seeded_resampling_is_deterministic() {
        let (x, y) = skewed();
        let a = RandomOverSampler::new().fit_resample(&x, &y).unwrap();
        let b = RandomOverSampler::new().fit_resample(&x, &y).unwrap();
        assert_eq!(a.x, b.x);
    }
}
