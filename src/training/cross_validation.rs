//! Stratified splitting and cross-validated accuracy

use crate::error::{ClassifierError, Result};
use super::config::ModelSpec;
use super::models::{Predictor, Trainable};
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// A single train/test split
#[derive(Debug, Clone)]
pub struct CvSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// Stratified k-fold splitter: each fold keeps the class proportions of the whole
#[derive(Debug, Clone)]
pub struct StratifiedKFold {
    n_splits: usize,
    random_state: u64,
}

impl StratifiedKFold {
    pub fn new(n_splits: usize) -> Self {
        Self { n_splits, random_state: 42 }
    }

    /// Set random state for reproducibility
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn n_splits(&self) -> usize {
        self.n_splits
    }

    pub fn split(&self, y: &Array1<usize>) -> Result<Vec<CvSplit>> {
        let n_splits = self.n_splits;
        if n_splits < 2 {
            return Err(ClassifierError::InvalidParameter {
                name: "n_splits".to_string(),
                value: n_splits.to_string(),
                reason: "must be at least 2".to_string(),
            });
        }
        if y.len() < n_splits {
            return Err(ClassifierError::DataError(format!(
                "n_samples ({}) must be >= n_splits ({})",
                y.len(),
                n_splits
            )));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);
        let mut folds: Vec<Vec<usize>> = vec![Vec::new(); n_splits];

        // Round-robin over each shuffled class, continuing the rotation across
        // classes so fold sizes stay within one of each other
        let mut slot = 0;
        for mut indices in group_by_class(y).into_values() {
            indices.shuffle(&mut rng);
            for idx in indices {
                folds[slot % n_splits].push(idx);
                slot += 1;
            }
        }

        let splits = (0..n_splits)
            .map(|fold_idx| {
                let mut test_indices = folds[fold_idx].clone();
                test_indices.sort_unstable();
                let mut train_indices: Vec<usize> = folds
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != fold_idx)
                    .flat_map(|(_, f)| f.iter().copied())
                    .collect();
                train_indices.sort_unstable();
                CvSplit { train_indices, test_indices, fold_idx }
            })
            .collect();
        Ok(splits)
    }
}

/// Stratified holdout split, returning `(train_indices, test_indices)`
///
/// Every class with at least two rows contributes at least one row to each
/// side. Singleton classes stay in the training set.
pub fn train_test_split(y: &Array1<usize>, test_size: f64, seed: u64) -> Result<(Vec<usize>, Vec<usize>)> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(ClassifierError::InvalidParameter {
            name: "test_size".to_string(),
            value: test_size.to_string(),
            reason: "must be in (0, 1)".to_string(),
        });
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut test = Vec::new();

    for mut indices in group_by_class(y).into_values() {
        indices.shuffle(&mut rng);
        let n = indices.len();
        let n_test = if n < 2 {
            0
        } else {
            ((n as f64 * test_size).round() as usize).clamp(1, n - 1)
        };
        test.extend_from_slice(&indices[..n_test]);
        train.extend_from_slice(&indices[n_test..]);
    }

    if test.is_empty() {
        return Err(ClassifierError::DataError(
            "not enough rows per class for a holdout split".to_string(),
        ));
    }

    train.sort_unstable();
    test.sort_unstable();
    Ok((train, test))
}

fn group_by_class(y: &Array1<usize>) -> BTreeMap<usize, Vec<usize>> {
    let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (idx, &class) in y.iter().enumerate() {
        groups.entry(class).or_default().push(idx);
    }
    groups
}

/// Cross-validation accuracy summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CvScores {
    pub mean: f64,
    /// Population standard deviation of the fold scores
    pub std: f64,
    pub scores: Vec<f64>,
}

impl CvScores {
    pub fn from_scores(scores: Vec<f64>) -> Self {
        let n = scores.len().max(1) as f64;
        let mean = scores.iter().sum::<f64>() / n;
        let variance = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
        Self { mean, std: variance.sqrt(), scores }
    }
}

/// Fraction of matching labels
pub fn accuracy(y_true: &Array1<usize>, y_pred: &Array1<usize>) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let correct = y_true.iter().zip(y_pred.iter()).filter(|(t, p)| t == p).count();
    correct as f64 / y_true.len() as f64
}

/// Fit a fresh model from `spec` on every fold and score it on the held-out part
pub fn cross_val_score(
    spec: &ModelSpec,
    x: &Array2<f64>,
    y: &Array1<usize>,
    n_classes: usize,
    splitter: &StratifiedKFold,
) -> Result<CvScores> {
    let splits = splitter.split(y)?;
    let mut scores = Vec::with_capacity(splits.len());

    for split in &splits {
        let x_train = x.select(Axis(0), &split.train_indices);
        let y_train = y.select(Axis(0), &split.train_indices);
        let x_test = x.select(Axis(0), &split.test_indices);
        let y_test = y.select(Axis(0), &split.test_indices);

        let mut model = spec.build();
        model.fit(&x_train, &y_train, n_classes)?;
        let score = accuracy(&y_test, &model.predict(&x_test)?);
        debug!(fold = split.fold_idx, score, "Cross-validation fold scored");
        scores.push(score);
    }

    Ok(CvScores::from_scores(scores))
}
