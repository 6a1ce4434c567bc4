//! Closed set of trained model variants

use crate::ensemble::SoftVotingEnsemble;
use crate::error::Result;
use super::config::ModelKind;
use super::linear_models::{LogisticConfig, LogisticRegression};
use super::models::{Predictor, Trainable};
use super::random_forest::{RandomForest, RandomForestConfig};
use super::xgboost::{XGBoostClassifier, XGBoostConfig};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// A classifier of any supported kind
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Classifier {
    Boosted(XGBoostClassifier),
    Bagged(RandomForest),
    Linear(LogisticRegression),
    Ensemble(SoftVotingEnsemble),
}

impl Classifier {
    pub fn boosted(config: XGBoostConfig) -> Self {
        Classifier::Boosted(XGBoostClassifier::new(config))
    }

    pub fn bagged(config: RandomForestConfig) -> Self {
        Classifier::Bagged(RandomForest::new(config))
    }

    pub fn linear(config: LogisticConfig) -> Self {
        Classifier::Linear(LogisticRegression::new(config))
    }

    pub fn kind(&self) -> ModelKind {
        match self {
            Classifier::Boosted(_) => ModelKind::Boosted,
            Classifier::Bagged(_) => ModelKind::Bagged,
            Classifier::Linear(_) => ModelKind::Linear,
            Classifier::Ensemble(_) => ModelKind::Ensemble,
        }
    }

    /// Input width the fitted model expects
    pub fn n_features_in(&self) -> usize {
        match self {
            Classifier::Boosted(m) => m.n_features_in(),
            Classifier::Bagged(m) => m.n_features_in(),
            Classifier::Linear(m) => m.n_features_in(),
            Classifier::Ensemble(m) => m.n_features_in(),
        }
    }

    fn as_predictor(&self) -> &dyn Predictor {
        match self {
            Classifier::Boosted(m) => m,
            Classifier::Bagged(m) => m,
            Classifier::Linear(m) => m,
            Classifier::Ensemble(m) => m,
        }
    }

    /// Hard labels and full probability rows in one pass
    pub fn predict_with_proba(&self, x: &Array2<f64>) -> Result<(Array1<usize>, Array2<f64>)> {
        let proba = self.probabilities(x)?;
        let labels = super::models::argmax_rows(&proba);
        Ok((labels, proba))
    }
}

impl Trainable for Classifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<usize>, n_classes: usize) -> Result<()> {
        match self {
            Classifier::Boosted(m) => m.fit(x, y, n_classes),
            Classifier::Bagged(m) => m.fit(x, y, n_classes),
            Classifier::Linear(m) => m.fit(x, y, n_classes),
            Classifier::Ensemble(m) => m.fit(x, y, n_classes),
        }
    }
}

impl Predictor for Classifier {
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>> {
        self.as_predictor().predict(x)
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Option<Array2<f64>>> {
        self.as_predictor().predict_proba(x)
    }

    fn n_classes(&self) -> usize {
        self.as_predictor().n_classes()
    }

    fn is_fitted(&self) -> bool {
        self.as_predictor().is_fitted()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClassifierError;
    use ndarray::array;

    #[test]
    fn test_delegates_to_inner_model() {
        let x = array![[0.0], [0.2], [1.0], [1.2]];
        let y = array![0, 0, 1, 1];

        let mut model = Classifier::linear(LogisticConfig::default());
        assert!(!model.is_fitted());
        model.fit(&x, &y, 2).unwrap();
        assert!(model.is_fitted());
        assert_eq!(model.n_features_in(), 1);

        let (labels, proba) = model.predict_with_proba(&x).unwrap();
        assert_eq!(labels, y);
        assert_eq!(proba.dim(), (4, 2));
    }

    #[test]
    fn test_unfitted_reports_not_trained() {
        let model = Classifier::bagged(RandomForestConfig::default());
        assert!(matches!(model.predict(&array![[1.0]]), Err(ClassifierError::NotTrained)));
    }

    #[test]
    fn test_serde_round_trip_keeps_kind() {
        let model = Classifier::boosted(XGBoostConfig::default());
        let json = serde_json::to_string(&model).unwrap();
        let back: Classifier = serde_json::from_str(&json).unwrap();
        assert_eq!(back.kind(), ModelKind::Boosted);
    }
}
