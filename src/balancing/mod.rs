//! Class balancing
//!
//! Corrects label-frequency skew in the training rows by random oversampling.
//! Held-out and inference data never pass through here.

mod random_sampling;

pub use random_sampling::RandomOverSampler;

use crate::error::Result;
use ndarray::{Array1, Array2};
use std::collections::BTreeMap;

/// Result of resampling
#[derive(Debug, Clone)]
pub struct ResampleResult {
    /// Resampled features
    pub x: Array2<f64>,
    /// Resampled labels
    pub y: Array1<usize>,
    /// Number of duplicated samples added per class, in class order
    pub n_added: BTreeMap<usize, usize>,
}

impl ResampleResult {
    /// Whether any rows were added
    pub fn is_resampled(&self) -> bool {
        self.n_added.values().any(|&n| n > 0)
    }
}

/// Trait for samplers
pub trait Sampler: Send + Sync {
    /// Fit the sampler on data
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<usize>) -> Result<()>;

    /// Resample data
    fn resample(&self, x: &Array2<f64>, y: &Array1<usize>) -> Result<ResampleResult>;

    /// Fit and resample in one step
    fn fit_resample(&mut self, x: &Array2<f64>, y: &Array1<usize>) -> Result<ResampleResult> {
        self.fit(x, y)?;
        self.resample(x, y)
    }
}

/// Get class distribution
pub fn class_counts(y: &Array1<usize>) -> BTreeMap<usize, usize> {
    let mut counts = BTreeMap::new();
    for &label in y.iter() {
        *counts.entry(label).or_insert(0) += 1;
    }
    counts
}

/// Get indices for each class
pub fn class_indices(y: &Array1<usize>) -> BTreeMap<usize, Vec<usize>> {
    let mut indices = BTreeMap::new();
    for (i, &label) in y.iter().enumerate() {
        indices.entry(label).or_insert_with(Vec::new).push(i);
    }
    indices
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_class_counts_and_indices() {
        let y = array![2, 0, 2, 1, 2];
        let counts = class_counts(&y);
        assert_eq!(counts.into_iter().collect::<Vec<_>>(), vec![(0, 1), (1, 1), (2, 3)]);

        let indices = class_indices(&y);
        assert_eq!(indices[&2], vec![0, 2, 4]);
    }
}
