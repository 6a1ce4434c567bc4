//! Model kinds, per-variant hyperparameter sets and request overrides

use crate::error::{ClassifierError, Result};
use super::classifier::Classifier;
use super::linear_models::LogisticConfig;
use super::random_forest::RandomForestConfig;
use super::xgboost::XGBoostConfig;
use crate::ensemble::SoftVotingEnsemble;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of trainable model families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelKind {
    /// Gradient-boosted trees
    #[serde(rename = "xgboost")]
    Boosted,
    /// Random forest
    #[serde(rename = "random_forest")]
    Bagged,
    /// Multinomial logistic regression
    #[serde(rename = "logistic")]
    Linear,
    /// Soft vote over all three
    #[serde(rename = "ensemble")]
    Ensemble,
}

impl ModelKind {
    /// Wire name accepted by the `model_type` field
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Boosted => "xgboost",
            ModelKind::Bagged => "random_forest",
            ModelKind::Linear => "logistic",
            ModelKind::Ensemble => "ensemble",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelKind {
    type Err = ClassifierError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "xgboost" => Ok(ModelKind::Boosted),
            "random_forest" => Ok(ModelKind::Bagged),
            "logistic" => Ok(ModelKind::Linear),
            "ensemble" => Ok(ModelKind::Ensemble),
            other => Err(ClassifierError::InvalidParameter {
                name: "model_type".to_string(),
                value: other.to_string(),
                reason: "expected one of xgboost, random_forest, logistic, ensemble".to_string(),
            }),
        }
    }
}

/// Hyperparameters for every model family plus the chosen kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub kind: ModelKind,
    pub xgboost: XGBoostConfig,
    pub random_forest: RandomForestConfig,
    pub logistic: LogisticConfig,
    /// Soft-vote weights in (boosted, bagged, linear) order
    pub weights: Option<Vec<f64>>,
}

impl ModelSpec {
    /// Schema-agnostic defaults: moderate trees, unweighted vote
    ///
    /// A standalone learner regularizes through row/column subsampling and
    /// larger leaves; as ensemble members the trees run unsubsampled with
    /// split 2 / leaf 1.
    pub fn custom(kind: ModelKind) -> Self {
        let (xgboost, random_forest) = match kind {
            ModelKind::Ensemble => (
                XGBoostConfig {
                    subsample: 1.0,
                    colsample_bytree: 1.0,
                    ..XGBoostConfig::default()
                },
                RandomForestConfig {
                    min_samples_split: 2,
                    min_samples_leaf: 1,
                    ..RandomForestConfig::default()
                },
            ),
            _ => (XGBoostConfig::default(), RandomForestConfig::default()),
        };

        Self {
            kind,
            xgboost,
            random_forest,
            logistic: LogisticConfig::default(),
            weights: None,
        }
    }

    /// Fixed-schema mission defaults: deeper boosting, weighted vote
    pub fn mission() -> Self {
        Self {
            kind: ModelKind::Ensemble,
            xgboost: XGBoostConfig {
                n_estimators: 500,
                max_depth: 8,
                reg_alpha: 0.1,
                reg_lambda: 0.1,
                ..XGBoostConfig::default()
            },
            random_forest: RandomForestConfig {
                n_estimators: 300,
                ..RandomForestConfig::default()
            },
            logistic: LogisticConfig::default(),
            weights: Some(vec![3.0, 2.0, 1.0]),
        }
    }

    pub fn with_kind(mut self, kind: ModelKind) -> Self {
        self.kind = kind;
        self
    }

    /// Untrained model with these settings
    pub fn build(&self) -> Classifier {
        match self.kind {
            ModelKind::Boosted => Classifier::boosted(self.xgboost.clone()),
            ModelKind::Bagged => Classifier::bagged(self.random_forest.clone()),
            ModelKind::Linear => Classifier::linear(self.logistic.clone()),
            ModelKind::Ensemble => Classifier::Ensemble(SoftVotingEnsemble::new(
                self.xgboost.clone(),
                self.random_forest.clone(),
                self.logistic.clone(),
                self.weights.clone(),
            )),
        }
    }

    /// Hyperparameters of the chosen kind, for reporting
    pub fn parameters(&self) -> serde_json::Value {
        match self.kind {
            ModelKind::Boosted => serde_json::json!({ "xgboost": self.xgboost }),
            ModelKind::Bagged => serde_json::json!({ "random_forest": self.random_forest }),
            ModelKind::Linear => serde_json::json!({ "logistic": self.logistic }),
            ModelKind::Ensemble => serde_json::json!({
                "xgboost": self.xgboost,
                "random_forest": self.random_forest,
                "logistic": self.logistic,
                "weights": self.weights,
            }),
        }
    }
}

/// Caller-supplied hyperparameter overrides
///
/// Parsed from strict JSON: unknown keys are rejected, and every present value
/// is range-checked before it is applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrainingParams {
    /// Trees for the boosted and bagged learners
    pub n_estimators: Option<usize>,
    pub learning_rate: Option<f64>,
    /// Depth limit for the boosted and bagged learners
    pub max_depth: Option<usize>,
    pub subsample: Option<f64>,
    pub colsample_bytree: Option<f64>,
    pub reg_alpha: Option<f64>,
    pub reg_lambda: Option<f64>,
    pub gamma: Option<f64>,
    pub min_child_weight: Option<f64>,
    pub min_samples_split: Option<usize>,
    pub min_samples_leaf: Option<usize>,
    #[serde(rename = "C", alias = "c")]
    pub c: Option<f64>,
    pub max_iter: Option<usize>,
    pub random_state: Option<u64>,
    pub weights: Option<Vec<f64>>,
}

impl TrainingParams {
    /// Parse and validate a JSON object
    pub fn from_json(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(Self::default());
        }
        let params: Self = serde_json::from_str(trimmed).map_err(|e| ClassifierError::InvalidParameter {
            name: "training_params".to_string(),
            value: truncate(trimmed, 200),
            reason: e.to_string(),
        })?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        check_range("n_estimators", self.n_estimators.map(|v| v as f64), 1.0, 5000.0)?;
        check_open_closed("learning_rate", self.learning_rate, 0.0, 1.0)?;
        check_range("max_depth", self.max_depth.map(|v| v as f64), 1.0, 32.0)?;
        check_open_closed("subsample", self.subsample, 0.0, 1.0)?;
        check_open_closed("colsample_bytree", self.colsample_bytree, 0.0, 1.0)?;
        check_range("reg_alpha", self.reg_alpha, 0.0, f64::MAX)?;
        check_range("reg_lambda", self.reg_lambda, 0.0, f64::MAX)?;
        check_range("gamma", self.gamma, 0.0, f64::MAX)?;
        check_range("min_child_weight", self.min_child_weight, 0.0, f64::MAX)?;
        check_range("min_samples_split", self.min_samples_split.map(|v| v as f64), 2.0, f64::MAX)?;
        check_range("min_samples_leaf", self.min_samples_leaf.map(|v| v as f64), 1.0, f64::MAX)?;
        check_open_closed("C", self.c, 0.0, f64::MAX)?;
        check_range("max_iter", self.max_iter.map(|v| v as f64), 1.0, 100_000.0)?;

        if let Some(weights) = &self.weights {
            let valid = weights.len() == 3
                && weights.iter().all(|w| w.is_finite() && *w >= 0.0)
                && weights.iter().sum::<f64>() > 0.0;
            if !valid {
                return Err(ClassifierError::InvalidParameter {
                    name: "weights".to_string(),
                    value: format!("{:?}", weights),
                    reason: "expected 3 non-negative weights with a positive sum".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Overlay the present values onto a `ModelSpec`
    pub fn apply(&self, spec: &mut ModelSpec) {
        if let Some(n) = self.n_estimators {
            spec.xgboost.n_estimators = n;
            spec.random_forest.n_estimators = n;
        }
        if let Some(d) = self.max_depth {
            spec.xgboost.max_depth = d;
            spec.random_forest.max_depth = Some(d);
        }
        if let Some(v) = self.learning_rate {
            spec.xgboost.learning_rate = v;
        }
        if let Some(v) = self.subsample {
            spec.xgboost.subsample = v;
        }
        if let Some(v) = self.colsample_bytree {
            spec.xgboost.colsample_bytree = v;
        }
        if let Some(v) = self.reg_alpha {
            spec.xgboost.reg_alpha = v;
        }
        if let Some(v) = self.reg_lambda {
            spec.xgboost.reg_lambda = v;
        }
        if let Some(v) = self.gamma {
            spec.xgboost.gamma = v;
        }
        if let Some(v) = self.min_child_weight {
            spec.xgboost.min_child_weight = v;
        }
        if let Some(v) = self.min_samples_split {
            spec.random_forest.min_samples_split = v;
        }
        if let Some(v) = self.min_samples_leaf {
            spec.random_forest.min_samples_leaf = v;
        }
        if let Some(v) = self.c {
            spec.logistic.c = v;
        }
        if let Some(v) = self.max_iter {
            spec.logistic.max_iter = v;
        }
        if let Some(seed) = self.random_state {
            spec.xgboost.random_state = seed;
            spec.random_forest.random_state = seed;
        }
        if let Some(w) = &self.weights {
            spec.weights = Some(w.clone());
        }
    }
}

fn check_range(name: &str, value: Option<f64>, min: f64, max: f64) -> Result<()> {
    match value {
        Some(v) if !(v.is_finite() && v >= min && v <= max) => Err(ClassifierError::InvalidParameter {
            name: name.to_string(),
            value: v.to_string(),
            reason: format!("must be within [{}, {}]", min, max),
        }),
        _ => Ok(()),
    }
}

fn check_open_closed(name: &str, value: Option<f64>, min: f64, max: f64) -> Result<()> {
    match value {
        Some(v) if !(v.is_finite() && v > min && v <= max) => Err(ClassifierError::InvalidParameter {
            name: name.to_string(),
            value: v.to_string(),
            reason: format!("must be within ({}, {}]", min, max),
        }),
        _ => Ok(()),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
