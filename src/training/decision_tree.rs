//! CART classification tree (Gini impurity)

use crate::error::{ClassifierError, Result};
use super::models::{argmax_rows, check_n_features, validate_training_input, Predictor, Trainable};
use ndarray::{Array1, Array2, ArrayView1};
use rand::seq::index;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node holding the class distribution of its training samples
    Leaf {
        distribution: Vec<f64>,
        n_samples: usize,
    },
    /// Internal node with split
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
    },
}

impl TreeNode {
    fn distribution(&self, sample: ArrayView1<f64>) -> &[f64] {
        match self {
            TreeNode::Leaf { distribution, .. } => distribution,
            TreeNode::Split { feature_idx, threshold, left, right, .. } => {
                if sample[*feature_idx] <= *threshold {
                    left.distribution(sample)
                } else {
                    right.distribution(sample)
                }
            }
        }
    }

    fn depth(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 0,
            TreeNode::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }
}

/// Decision tree classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    /// Tree root
    root: Option<TreeNode>,
    /// Maximum depth
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Features considered per split; all when `None`
    pub max_features: Option<usize>,
    /// Seed for the per-split feature subset
    pub seed: u64,
    n_features: usize,
    n_classes: usize,
    feature_importances: Option<Array1<f64>>,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionTree {
    pub fn new() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            seed: 42,
            n_features: 0,
            n_classes: 0,
            feature_importances: None,
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set minimum samples to split
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples.max(2);
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples.max(1);
        self
    }

    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features.max(1));
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Fit on a subset of rows (bootstrap samples may repeat indices)
    pub fn fit_indices(
        &mut self,
        x: &Array2<f64>,
        y: &Array1<usize>,
        n_classes: usize,
        indices: &[usize],
    ) -> Result<()> {
        validate_training_input(x, y, n_classes)?;
        if indices.is_empty() {
            return Err(ClassifierError::TrainingError("cannot grow a tree on zero samples".to_string()));
        }

        self.n_features = x.ncols();
        self.n_classes = n_classes;

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut importances = vec![0.0; self.n_features];
        self.root = Some(self.build_tree(x, y, indices, 0, &mut rng, &mut importances));

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }
        self.feature_importances = Some(Array1::from_vec(importances));
        Ok(())
    }

    fn build_tree(
        &self,
        x: &Array2<f64>,
        y: &Array1<usize>,
        indices: &[usize],
        depth: usize,
        rng: &mut ChaCha8Rng,
        importances: &mut [f64],
    ) -> TreeNode {
        let n_samples = indices.len();
        let counts = self.class_counts(y, indices);
        let parent_impurity = gini(&counts, n_samples);

        let should_stop = n_samples < self.min_samples_split
            || n_samples < 2 * self.min_samples_leaf
            || self.max_depth.map_or(false, |d| depth >= d)
            || parent_impurity <= f64::EPSILON;

        if should_stop {
            return self.leaf(&counts, n_samples);
        }

        let features = self.candidate_features(rng);
        let Some((feature_idx, threshold, gain)) =
            self.find_best_split(x, y, indices, &features, parent_impurity)
        else {
            return self.leaf(&counts, n_samples);
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| x[[i, feature_idx]] <= threshold);

        importances[feature_idx] += n_samples as f64 * gain;

        let left = Box::new(self.build_tree(x, y, &left_indices, depth + 1, rng, importances));
        let right = Box::new(self.build_tree(x, y, &right_indices, depth + 1, rng, importances));

        TreeNode::Split {
            feature_idx,
            threshold,
            left,
            right,
            n_samples,
        }
    }

    fn candidate_features(&self, rng: &mut ChaCha8Rng) -> Vec<usize> {
        match self.max_features {
            Some(k) if k < self.n_features => {
                let mut chosen = index::sample(rng, self.n_features, k).into_vec();
                chosen.sort_unstable();
                chosen
            }
            _ => (0..self.n_features).collect(),
        }
    }

    /// Best (feature, threshold, gain) over the candidate features.
    /// Ties keep the lowest feature index.
    fn find_best_split(
        &self,
        x: &Array2<f64>,
        y: &Array1<usize>,
        indices: &[usize],
        features: &[usize],
        parent_impurity: f64,
    ) -> Option<(usize, f64, f64)> {
        let n = indices.len();
        let min_leaf = self.min_samples_leaf;
        let n_classes = self.n_classes;

        let feature_results: Vec<Option<(usize, f64, f64)>> = features
            .par_iter()
            .map(|&feature_idx| {
                let mut pairs: Vec<(f64, usize)> =
                    indices.iter().map(|&i| (x[[i, feature_idx]], y[i])).collect();
                pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

                let mut left = vec![0usize; n_classes];
                let mut right = vec![0usize; n_classes];
                for &(_, c) in &pairs {
                    right[c] += 1;
                }

                let mut best: Option<(f64, f64)> = None;
                for pos in 0..n - 1 {
                    let (value, class) = pairs[pos];
                    left[class] += 1;
                    right[class] -= 1;

                    let next = pairs[pos + 1].0;
                    if next <= value {
                        continue;
                    }
                    let n_left = pos + 1;
                    let n_right = n - n_left;
                    if n_left < min_leaf || n_right < min_leaf {
                        continue;
                    }

                    let weighted = (n_left as f64 * gini(&left, n_left)
                        + n_right as f64 * gini(&right, n_right))
                        / n as f64;
                    let gain = parent_impurity - weighted;
                    if gain > best.map_or(1e-12, |b| b.1) {
                        best = Some(((value + next) / 2.0, gain));
                    }
                }

                best.map(|(threshold, gain)| (feature_idx, threshold, gain))
            })
            .collect();

        feature_results
            .into_iter()
            .flatten()
            .fold(None, |acc: Option<(usize, f64, f64)>, cand| match acc {
                Some(a) if a.2 >= cand.2 => Some(a),
                _ => Some(cand),
            })
    }

    fn class_counts(&self, y: &Array1<usize>, indices: &[usize]) -> Vec<usize> {
        let mut counts = vec![0usize; self.n_classes];
        for &i in indices {
            counts[y[i]] += 1;
        }
        counts
    }

    fn leaf(&self, counts: &[usize], n_samples: usize) -> TreeNode {
        let total = n_samples.max(1) as f64;
        TreeNode::Leaf {
            distribution: counts.iter().map(|&c| c as f64 / total).collect(),
            n_samples,
        }
    }

    /// Class distribution of the leaf each sample falls into
    pub(crate) fn leaf_distributions(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let root = self.root.as_ref().ok_or(ClassifierError::NotTrained)?;
        check_n_features(self.n_features, x)?;

        let mut out = Array2::zeros((x.nrows(), self.n_classes));
        for (i, row) in x.rows().into_iter().enumerate() {
            for (j, &p) in root.distribution(row).iter().enumerate() {
                out[[i, j]] = p;
            }
        }
        Ok(out)
    }

    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    pub fn get_depth(&self) -> usize {
        self.root.as_ref().map_or(0, TreeNode::depth)
    }
}

impl Trainable for DecisionTree {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<usize>, n_classes: usize) -> Result<()> {
        let indices: Vec<usize> = (0..x.nrows()).collect();
        self.fit_indices(x, y, n_classes, &indices)
    }
}

impl Predictor for DecisionTree {
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>> {
        Ok(argmax_rows(&self.leaf_distributions(x)?))
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Option<Array2<f64>>> {
        self.leaf_distributions(x).map(Some)
    }

    fn n_classes(&self) -> usize {
        self.n_classes
    }

    fn is_fitted(&self) -> bool {
        self.root.is_some()
    }
}

fn gini(counts: &[usize], n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let n = n as f64;
    1.0 - counts.iter().map(|&c| (c as f64 / n).powi(2)).sum::<f64>()
}
