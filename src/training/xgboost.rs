//! XGBoost-style gradient boosting with second-order approximation
//!
//! Multiclass softmax objective: every boosting round grows one regression
//! tree per class on that class's gradient/hessian pair.
//! - Regularized leaf weights: w* = -T(G) / (H + lambda), T = L1 soft-threshold
//! - Gain-based split scoring: Gain = 0.5 * [S(GL,HL) + S(GR,HR) - S(G,H)], split only if Gain > γ
//! - Minimum child weight constraint
//! - Row subsampling per round, column subsampling per tree

use crate::error::{ClassifierError, Result};
use super::models::{argmax_rows, check_n_features, validate_training_input, Predictor, Trainable};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// XGBoost configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XGBoostConfig {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_child_weight: f64,
    /// L2 regularization on leaf weights
    pub reg_lambda: f64,
    /// L1 regularization on leaf weights
    pub reg_alpha: f64,
    /// Minimum loss reduction to make a split (gamma)
    pub gamma: f64,
    pub subsample: f64,
    pub colsample_bytree: f64,
    pub random_state: u64,
}

impl Default for XGBoostConfig {
    fn default() -> Self {
        Self {
            n_estimators: 200,
            learning_rate: 0.1,
            max_depth: 6,
            min_child_weight: 1.0,
            reg_lambda: 1.0,
            reg_alpha: 0.0,
            gamma: 0.0,
            subsample: 0.8,
            colsample_bytree: 0.8,
            random_state: 42,
        }
    }
}

/// A single node in the XGBoost tree
#[derive(Debug, Clone, Serialize, Deserialize)]
enum XGBNode {
    Leaf { weight: f64 },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<XGBNode>,
        right: Box<XGBNode>,
    },
}

impl XGBNode {
    fn predict(&self, sample: ArrayView1<f64>) -> f64 {
        match self {
            XGBNode::Leaf { weight } => *weight,
            XGBNode::Split { feature, threshold, left, right } => {
                if sample[*feature] <= *threshold {
                    left.predict(sample)
                } else {
                    right.predict(sample)
                }
            }
        }
    }
}

/// Build an XGBoost tree using exact greedy split finding
fn build_xgb_tree(
    x: &Array2<f64>,
    grad: &Array1<f64>,
    hess: &Array1<f64>,
    indices: &[usize],
    feature_indices: &[usize],
    depth: usize,
    config: &XGBoostConfig,
) -> XGBNode {
    let n = indices.len();

    let g_sum: f64 = indices.iter().map(|&i| grad[i]).sum();
    let h_sum: f64 = indices.iter().map(|&i| hess[i]).sum();
    let leaf_weight = compute_leaf_weight(g_sum, h_sum, config.reg_lambda, config.reg_alpha);

    if depth >= config.max_depth || n < 2 || h_sum < 2.0 * config.min_child_weight {
        return XGBNode::Leaf { weight: leaf_weight };
    }

    // Parallel over features; ties keep the lowest feature index
    let candidates: Vec<(usize, f64, f64)> = feature_indices
        .par_iter()
        .filter_map(|&f| find_best_split_for_feature(x, grad, hess, indices, f, config))
        .collect();
    let best_split = candidates
        .into_iter()
        .fold(None, |acc: Option<(usize, f64, f64)>, cand| match acc {
            Some(a) if a.2 >= cand.2 => Some(a),
            _ => Some(cand),
        });

    match best_split {
        Some((feature, threshold, gain)) if gain > config.gamma => {
            let (left_idx, right_idx): (Vec<usize>, Vec<usize>) =
                indices.iter().partition(|&&i| x[[i, feature]] <= threshold);

            if left_idx.is_empty() || right_idx.is_empty() {
                return XGBNode::Leaf { weight: leaf_weight };
            }

            let left = build_xgb_tree(x, grad, hess, &left_idx, feature_indices, depth + 1, config);
            let right = build_xgb_tree(x, grad, hess, &right_idx, feature_indices, depth + 1, config);

            XGBNode::Split {
                feature,
                threshold,
                left: Box::new(left),
                right: Box::new(right),
            }
        }
        _ => XGBNode::Leaf { weight: leaf_weight },
    }
}

/// L1 soft-threshold of the gradient sum
fn threshold_l1(g: f64, alpha: f64) -> f64 {
    if g > alpha {
        g - alpha
    } else if g < -alpha {
        g + alpha
    } else {
        0.0
    }
}

/// Optimal leaf weight with L1 (alpha) and L2 (lambda) regularization
fn compute_leaf_weight(g_sum: f64, h_sum: f64, lambda: f64, alpha: f64) -> f64 {
    -threshold_l1(g_sum, alpha) / (h_sum + lambda)
}

fn structure_score(g: f64, h: f64, lambda: f64, alpha: f64) -> f64 {
    let t = threshold_l1(g, alpha);
    t * t / (h + lambda)
}

/// Find best split for a single feature using exact greedy method
fn find_best_split_for_feature(
    x: &Array2<f64>,
    grad: &Array1<f64>,
    hess: &Array1<f64>,
    indices: &[usize],
    feature: usize,
    config: &XGBoostConfig,
) -> Option<(usize, f64, f64)> {
    let mut sorted_indices: Vec<usize> = indices.to_vec();
    sorted_indices.sort_by(|&a, &b| x[[a, feature]].total_cmp(&x[[b, feature]]));

    let g_total: f64 = sorted_indices.iter().map(|&i| grad[i]).sum();
    let h_total: f64 = sorted_indices.iter().map(|&i| hess[i]).sum();
    let (lambda, alpha) = (config.reg_lambda, config.reg_alpha);
    let parent_score = structure_score(g_total, h_total, lambda, alpha);

    let mut g_left = 0.0;
    let mut h_left = 0.0;
    let mut best: Option<(f64, f64)> = None;

    for pos in 0..sorted_indices.len().saturating_sub(1) {
        let idx = sorted_indices[pos];
        let next_idx = sorted_indices[pos + 1];
        g_left += grad[idx];
        h_left += hess[idx];

        // Skip if next sample has same feature value (avoid identical split)
        if x[[next_idx, feature]] - x[[idx, feature]] < 1e-12 {
            continue;
        }

        let g_right = g_total - g_left;
        let h_right = h_total - h_left;
        if h_left < config.min_child_weight || h_right < config.min_child_weight {
            continue;
        }

        let gain = 0.5
            * (structure_score(g_left, h_left, lambda, alpha)
                + structure_score(g_right, h_right, lambda, alpha)
                - parent_score);

        if best.map_or(true, |(_, g)| gain > g) {
            let threshold = (x[[idx, feature]] + x[[next_idx, feature]]) / 2.0;
            best = Some((threshold, gain));
        }
    }

    best.map(|(threshold, gain)| (feature, threshold, gain))
}

// ─── XGBoost Classifier ────────────────────────────────────────────────────

/// XGBoost Classifier (softmax loss with second-order approximation)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XGBoostClassifier {
    config: XGBoostConfig,
    /// One tree per class for every boosting round
    rounds: Vec<Vec<XGBNode>>,
    n_features: usize,
    n_classes: usize,
}

impl XGBoostClassifier {
    pub fn new(config: XGBoostConfig) -> Self {
        Self {
            config,
            rounds: Vec::new(),
            n_features: 0,
            n_classes: 0,
        }
    }

    pub fn config(&self) -> &XGBoostConfig {
        &self.config
    }

    /// Input width seen at fit; 0 before
    pub fn n_features_in(&self) -> usize {
        self.n_features
    }

    pub fn n_rounds(&self) -> usize {
        self.rounds.len()
    }

    /// Raw additive scores, one column per class
    fn raw_scores(&self, x: &Array2<f64>) -> Array2<f64> {
        let lr = self.config.learning_rate;
        let mut raw = Array2::zeros((x.nrows(), self.n_classes));
        for (i, sample) in x.axis_iter(Axis(0)).enumerate() {
            for round in &self.rounds {
                for (k, tree) in round.iter().enumerate() {
                    raw[[i, k]] += lr * tree.predict(sample);
                }
            }
        }
        raw
    }

    /// Compute feature importances by counting splits across all trees
    pub fn feature_importances(&self) -> Option<Array1<f64>> {
        if self.n_features == 0 {
            return None;
        }
        let mut counts = vec![0.0f64; self.n_features];
        for tree in self.rounds.iter().flatten() {
            xgb_count_splits(tree, &mut counts);
        }
        let total: f64 = counts.iter().sum();
        if total > 0.0 {
            for c in counts.iter_mut() {
                *c /= total;
            }
        }
        Some(Array1::from_vec(counts))
    }
}

impl Trainable for XGBoostClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<usize>, n_classes: usize) -> Result<()> {
        validate_training_input(x, y, n_classes)?;
        if self.config.n_estimators == 0 {
            return Err(ClassifierError::InvalidParameter {
                name: "n_estimators".to_string(),
                value: "0".to_string(),
                reason: "boosting needs at least one round".to_string(),
            });
        }

        let n_samples = x.nrows();
        let n_features = x.ncols();
        self.n_features = n_features;
        self.n_classes = n_classes;
        self.rounds.clear();

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.config.random_state);
        let mut raw = Array2::<f64>::zeros((n_samples, n_classes));

        for _ in 0..self.config.n_estimators {
            let probs = softmax_rows(&raw);

            let row_indices = subsample(&mut rng, n_samples, self.config.subsample);
            let col_sets: Vec<Vec<usize>> = (0..n_classes)
                .map(|_| subsample(&mut rng, n_features, self.config.colsample_bytree))
                .collect();

            let config = &self.config;
            let round: Vec<XGBNode> = (0..n_classes)
                .into_par_iter()
                .map(|k| {
                    let p = probs.column(k);
                    let grad: Array1<f64> = p
                        .iter()
                        .zip(y.iter())
                        .map(|(&pk, &yi)| pk - if yi == k { 1.0 } else { 0.0 })
                        .collect();
                    let hess: Array1<f64> = p.mapv(|pk| (2.0 * pk * (1.0 - pk)).max(1e-6));
                    build_xgb_tree(x, &grad, &hess, &row_indices, &col_sets[k], 0, config)
                })
                .collect();

            // Update every row, not only the sampled ones
            for (i, sample) in x.axis_iter(Axis(0)).enumerate() {
                for (k, tree) in round.iter().enumerate() {
                    raw[[i, k]] += self.config.learning_rate * tree.predict(sample);
                }
            }

            self.rounds.push(round);
        }

        Ok(())
    }
}

impl Predictor for XGBoostClassifier {
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>> {
        let proba = self.predict_proba(x)?.ok_or(ClassifierError::NotTrained)?;
        Ok(argmax_rows(&proba))
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Option<Array2<f64>>> {
        if self.rounds.is_empty() {
            return Err(ClassifierError::NotTrained);
        }
        check_n_features(self.n_features, x)?;
        Ok(Some(softmax_rows(&self.raw_scores(x))))
    }

    fn n_classes(&self) -> usize {
        self.n_classes
    }

    fn is_fitted(&self) -> bool {
        !self.rounds.is_empty()
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────────

fn xgb_count_splits(node: &XGBNode, counts: &mut [f64]) {
    match node {
        XGBNode::Leaf { .. } => {}
        XGBNode::Split { feature, left, right, .. } => {
            if *feature < counts.len() {
                counts[*feature] += 1.0;
            }
            xgb_count_splits(left, counts);
            xgb_count_splits(right, counts);
        }
    }
}

/// Numerically stable row-wise softmax
pub(crate) fn softmax_rows(raw: &Array2<f64>) -> Array2<f64> {
    let mut out = raw.clone();
    for mut row in out.rows_mut() {
        let max = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        row.mapv_inplace(|v| (v - max).exp());
        let sum = row.sum();
        row.mapv_inplace(|v| v / sum);
    }
    out
}

fn subsample(rng: &mut Xoshiro256PlusPlus, n: usize, ratio: f64) -> Vec<usize> {
    if ratio >= 1.0 {
        return (0..n).collect();
    }
    let k = ((n as f64) * ratio).ceil().max(1.0) as usize;
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);
    indices.truncate(k);
    indices.sort_unstable();
    indices
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn classification_data() -> (Array2<f64>, Array1<usize>) {
        let n = 90;
        let y: Array1<usize> = (0..n).map(|i| i % 3).collect();
        let x = Array2::from_shape_fn((n, 2), |(i, j)| {
            let c = (i % 3) as f64;
            if j == 0 {
                c * 3.0 + ((i * 7) % 10) as f64 * 0.1
            } else {
                ((i * 11) % 13) as f64
            }
        });
        (x, y)
    }

    fn small_config() -> XGBoostConfig {
        XGBoostConfig {
            n_estimators: 20,
            learning_rate: 0.3,
            max_depth: 3,
            ..Default::default()
        }
    }

    #[test]
    fn test_xgboost_classifier() {
        let (x, y) = classification_data();
        let mut model = XGBoostClassifier::new(small_config());
        model.fit(&x, &y, 3).unwrap();

        assert_eq!(model.n_rounds(), 20);
        let preds = model.predict(&x).unwrap();
        let acc = preds.iter().zip(y.iter()).filter(|(p, t)| p == t).count() as f64 / y.len() as f64;
        assert!(acc > 0.9, "accuracy {}", acc);
    }

    #[test]
    fn test_xgboost_predict_proba() {
        let (x, y) = classification_data();
        let mut model = XGBoostClassifier::new(small_config());
        model.fit(&x, &y, 3).unwrap();

        let proba = model.predict_proba(&x).unwrap().unwrap();
        assert_eq!(proba.dim(), (90, 3));
        for row in proba.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-6);
            assert!(row.iter().all(|&p| (0.0..=1.0).contains(&p)));
        }
    }

    #[test]
    fn test_xgboost_regularization() {
        assert_eq!(compute_leaf_weight(0.5, 10.0, 1.0, 1.0), 0.0);
        assert!((compute_leaf_weight(-3.0, 1.0, 1.0, 1.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_softmax_rows() {
        let p = softmax_rows(&array![[0.0, 0.0], [1000.0, 0.0]]);
        assert!((p[[0, 0]] - 0.5).abs() < 1e-12);
        assert!((p[[1, 0]] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_unfitted() {
        let model = XGBoostClassifier::new(small_config());
        assert!(matches!(
            model.predict(&array![[1.0, 2.0]]),
            Err(ClassifierError::NotTrained)
        ));
    }
}
