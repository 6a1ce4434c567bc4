//! Random Forest classifier

use crate::error::{ClassifierError, Result};
use super::decision_tree::DecisionTree;
use super::models::{argmax_rows, check_n_features, validate_training_input, Predictor, Trainable};
use ndarray::{Array1, Array2};
use rand::RngCore;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Strategy for max features
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MaxFeatures {
    /// Square root of n_features, rounded down
    Sqrt,
    /// Fixed number
    Fixed(usize),
    /// All features
    All,
}

/// Random forest hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestConfig {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub bootstrap: bool,
    pub random_state: u64,
}

impl Default for RandomForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 200,
            max_depth: Some(10),
            min_samples_split: 5,
            min_samples_leaf: 2,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            random_state: 42,
        }
    }
}

/// Random Forest model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    config: RandomForestConfig,
    trees: Vec<DecisionTree>,
    n_features: usize,
    n_classes: usize,
    feature_importances: Option<Array1<f64>>,
}

impl Default for RandomForest {
    fn default() -> Self {
        Self::new(RandomForestConfig::default())
    }
}

impl RandomForest {
    pub fn new(config: RandomForestConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            n_features: 0,
            n_classes: 0,
            feature_importances: None,
        }
    }

    pub fn config(&self) -> &RandomForestConfig {
        &self.config
    }

    pub fn n_features_in(&self) -> usize {
        self.n_features
    }

    fn compute_max_features(&self, n_features: usize) -> usize {
        match self.config.max_features {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().floor() as usize,
            MaxFeatures::Fixed(n) => n.min(n_features),
            MaxFeatures::All => n_features,
        }
        .max(1)
    }

    fn compute_feature_importances(&mut self) {
        if self.trees.is_empty() {
            return;
        }

        let mut total_importances = vec![0.0; self.n_features];
        for tree in &self.trees {
            if let Some(imp) = tree.feature_importances() {
                for (i, &val) in imp.iter().enumerate().take(self.n_features) {
                    total_importances[i] += val;
                }
            }
        }

        let total: f64 = total_importances.iter().sum();
        if total > 0.0 {
            for imp in &mut total_importances {
                *imp /= total;
            }
        }
        self.feature_importances = Some(Array1::from_vec(total_importances));
    }

    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl Trainable for RandomForest {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<usize>, n_classes: usize) -> Result<()> {
        validate_training_input(x, y, n_classes)?;
        if self.config.n_estimators == 0 {
            return Err(ClassifierError::InvalidParameter {
                name: "n_estimators".to_string(),
                value: "0".to_string(),
                reason: "a forest needs at least one tree".to_string(),
            });
        }

        let n_samples = x.nrows();
        self.n_features = x.ncols();
        self.n_classes = n_classes;
        let max_features = self.compute_max_features(self.n_features);
        let base_seed = self.config.random_state;
        let config = &self.config;

        // Build trees in parallel, one independent stream per tree
        let trees: Vec<DecisionTree> = (0..config.n_estimators)
            .into_par_iter()
            .map(|tree_idx| -> Result<DecisionTree> {
                let mut rng = ChaCha8Rng::seed_from_u64(base_seed.wrapping_add(tree_idx as u64));

                let sample_indices: Vec<usize> = if config.bootstrap {
                    (0..n_samples)
                        .map(|_| (rng.next_u64() as usize) % n_samples)
                        .collect()
                } else {
                    (0..n_samples).collect()
                };

                let mut tree = DecisionTree::new()
                    .with_min_samples_split(config.min_samples_split)
                    .with_min_samples_leaf(config.min_samples_leaf)
                    .with_max_features(max_features)
                    .with_seed(rng.next_u64());
                if let Some(d) = config.max_depth {
                    tree = tree.with_max_depth(d);
                }

                tree.fit_indices(x, y, n_classes, &sample_indices)?;
                Ok(tree)
            })
            .collect::<Result<Vec<_>>>()?;

        self.trees = trees;
        self.compute_feature_importances();
        Ok(())
    }
}

impl Predictor for RandomForest {
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>> {
        let proba = self.predict_proba(x)?.ok_or(ClassifierError::NotTrained)?;
        Ok(argmax_rows(&proba))
    }

    /// Mean of the leaf class distributions across trees
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Option<Array2<f64>>> {
        if self.trees.is_empty() {
            return Err(ClassifierError::NotTrained);
        }
        check_n_features(self.n_features, x)?;

        let per_tree: Vec<Array2<f64>> = self
            .trees
            .par_iter()
            .map(|tree| tree.leaf_distributions(x))
            .collect::<Result<Vec<_>>>()?;

        let mut sum = Array2::zeros((x.nrows(), self.n_classes));
        for proba in &per_tree {
            sum += proba;
        }
        Ok(Some(sum / per_tree.len() as f64))
    }

    fn n_classes(&self) -> usize {
        self.n_classes
    }

    fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }
}
