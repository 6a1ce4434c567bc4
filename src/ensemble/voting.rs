//! Soft-voting ensemble

use crate::error::{ClassifierError, Result};
use crate::training::linear_models::{LogisticConfig, LogisticRegression};
use crate::training::models::{argmax_rows, check_n_features, validate_training_input, Predictor, Trainable};
use crate::training::random_forest::{RandomForest, RandomForestConfig};
use crate::training::xgboost::{XGBoostClassifier, XGBoostConfig};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Weighted mean of the members' class probabilities
///
/// Members that cannot produce probabilities contribute a one-hot of their
/// hard prediction. Weights are normalized to sum to one; equal weights are
/// used when none are given.
pub fn soft_vote(members: &[&dyn Predictor], weights: Option<&[f64]>, x: &Array2<f64>) -> Result<Array2<f64>> {
    let Some(first) = members.first() else {
        return Err(ClassifierError::TrainingError("no models to vote with".to_string()));
    };
    let n_classes = first.n_classes();

    let weights: Vec<f64> = match weights {
        Some(w) if w.len() == members.len() => w.to_vec(),
        Some(w) => {
            return Err(ClassifierError::InvalidParameter {
                name: "weights".to_string(),
                value: format!("{:?}", w),
                reason: format!("expected {} weights", members.len()),
            })
        }
        None => vec![1.0; members.len()],
    };
    let weight_sum: f64 = weights.iter().sum();
    if !(weight_sum > 0.0) {
        return Err(ClassifierError::InvalidParameter {
            name: "weights".to_string(),
            value: format!("{:?}", weights),
            reason: "weights must sum to a positive value".to_string(),
        });
    }

    let mut averaged = Array2::zeros((x.nrows(), n_classes));
    for (member, &w) in members.iter().zip(&weights) {
        if member.n_classes() != n_classes {
            return Err(ClassifierError::TrainingError(format!(
                "ensemble members disagree on class count: {} vs {}",
                member.n_classes(),
                n_classes
            )));
        }
        let proba = member.probabilities(x)?;
        averaged.scaled_add(w / weight_sum, &proba);
    }
    Ok(averaged)
}

/// Boosted trees + random forest + logistic regression, combined by soft voting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoftVotingEnsemble {
    boosted: XGBoostClassifier,
    bagged: RandomForest,
    linear: LogisticRegression,
    /// Member weights in (boosted, bagged, linear) order; unweighted when `None`
    weights: Option<Vec<f64>>,
    n_features: usize,
    n_classes: usize,
    is_fitted: bool,
}

impl SoftVotingEnsemble {
    pub fn new(
        boosted: XGBoostConfig,
        bagged: RandomForestConfig,
        linear: LogisticConfig,
        weights: Option<Vec<f64>>,
    ) -> Self {
        Self {
            boosted: XGBoostClassifier::new(boosted),
            bagged: RandomForest::new(bagged),
            linear: LogisticRegression::new(linear),
            weights,
            n_features: 0,
            n_classes: 0,
            is_fitted: false,
        }
    }

    pub fn weights(&self) -> Option<&[f64]> {
        self.weights.as_deref()
    }

    pub fn n_features_in(&self) -> usize {
        self.n_features
    }

    fn members(&self) -> [&dyn Predictor; 3] {
        [&self.boosted, &self.bagged, &self.linear]
    }

    /// Per-member probabilities, for inspection
    pub fn member_probabilities(&self, x: &Array2<f64>) -> Result<Vec<Array2<f64>>> {
        if !self.is_fitted {
            return Err(ClassifierError::NotTrained);
        }
        self.members().iter().map(|m| m.probabilities(x)).collect()
    }
}

impl Trainable for SoftVotingEnsemble {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<usize>, n_classes: usize) -> Result<()> {
        validate_training_input(x, y, n_classes)?;

        let Self { boosted, bagged, linear, .. } = self;
        let (boosted_result, (bagged_result, linear_result)) = rayon::join(
            || boosted.fit(x, y, n_classes),
            || rayon::join(|| bagged.fit(x, y, n_classes), || linear.fit(x, y, n_classes)),
        );
        boosted_result?;
        bagged_result?;
        linear_result?;

        self.n_features = x.ncols();
        self.n_classes = n_classes;
        self.is_fitted = true;
        debug!(n_classes, n_features = self.n_features, "Soft-voting ensemble fitted");
        Ok(())
    }
}

impl Predictor for SoftVotingEnsemble {
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>> {
        let proba = self.predict_proba(x)?.ok_or(ClassifierError::NotTrained)?;
        Ok(argmax_rows(&proba))
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Option<Array2<f64>>> {
        if !self.is_fitted {
            return Err(ClassifierError::NotTrained);
        }
        check_n_features(self.n_features, x)?;
        soft_vote(&self.members(), self.weights.as_deref(), x).map(Some)
    }

    fn n_classes(&self) -> usize {
        self.n_classes
    }

    fn is_fitted(&self) -> bool {
        self.is_fitted
    }
}
