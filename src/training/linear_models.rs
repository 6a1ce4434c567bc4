//! Regularized linear classifier

use crate::error::{ClassifierError, Result};
use super::models::{argmax_rows, check_n_features, one_hot, validate_training_input, Predictor, Trainable};
use super::xgboost::softmax_rows;
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Logistic regression hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticConfig {
    /// Inverse L2 regularization strength
    pub c: f64,
    /// Maximum iterations
    pub max_iter: usize,
    /// Convergence tolerance on the gradient norm
    pub tol: f64,
    /// Learning rate
    pub learning_rate: f64,
}

impl Default for LogisticConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 1000,
            tol: 1e-6,
            learning_rate: 0.5,
        }
    }
}

/// Multinomial logistic regression fitted by full-batch gradient descent
///
/// Minimizes mean cross-entropy plus `||W||² / (2·C·n)`, which puts the
/// penalty on the same footing as an unscaled `1/C` objective.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    config: LogisticConfig,
    /// Fitted coefficients, n_features × n_classes
    coefficients: Option<Array2<f64>>,
    /// Fitted intercept per class
    intercept: Option<Array1<f64>>,
    n_classes: usize,
    n_iter: usize,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new(LogisticConfig::default())
    }
}

impl LogisticRegression {
    pub fn new(config: LogisticConfig) -> Self {
        Self {
            config,
            coefficients: None,
            intercept: None,
            n_classes: 0,
            n_iter: 0,
        }
    }

    pub fn config(&self) -> &LogisticConfig {
        &self.config
    }

    pub fn n_features_in(&self) -> usize {
        self.coefficients.as_ref().map_or(0, |w| w.nrows())
    }

    /// Iterations run by the last fit
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    pub fn coefficients(&self) -> Option<&Array2<f64>> {
        self.coefficients.as_ref()
    }
}

impl Trainable for LogisticRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<usize>, n_classes: usize) -> Result<()> {
        validate_training_input(x, y, n_classes)?;
        if !(self.config.c > 0.0) {
            return Err(ClassifierError::InvalidParameter {
                name: "C".to_string(),
                value: self.config.c.to_string(),
                reason: "must be positive".to_string(),
            });
        }

        let n_samples = x.nrows() as f64;
        let n_features = x.ncols();
        let targets = one_hot(y, n_classes);
        let alpha = 1.0 / (self.config.c * n_samples);
        let lr = self.config.learning_rate;

        let mut weights = Array2::<f64>::zeros((n_features, n_classes));
        let mut bias = Array1::<f64>::zeros(n_classes);
        let mut n_iter = 0;

        for _ in 0..self.config.max_iter {
            n_iter += 1;
            let logits = x.dot(&weights) + &bias;
            let errors = softmax_rows(&logits) - &targets;

            let dw = x.t().dot(&errors) / n_samples + alpha * &weights;
            let db = errors.sum_axis(Axis(0)) / n_samples;

            let grad_norm = (dw.mapv(|v| v * v).sum() + db.mapv(|v| v * v).sum()).sqrt();
            if grad_norm < self.config.tol {
                break;
            }

            weights = weights - lr * dw;
            bias = bias - lr * db;
        }

        debug!(n_iter, "Logistic regression converged");
        self.coefficients = Some(weights);
        self.intercept = Some(bias);
        self.n_classes = n_classes;
        self.n_iter = n_iter;
        Ok(())
    }
}

impl Predictor for LogisticRegression {
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>> {
        let proba = self.predict_proba(x)?.ok_or(ClassifierError::NotTrained)?;
        Ok(argmax_rows(&proba))
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Option<Array2<f64>>> {
        let (Some(weights), Some(bias)) = (&self.coefficients, &self.intercept) else {
            return Err(ClassifierError::NotTrained);
        };
        check_n_features(weights.nrows(), x)?;
        Ok(Some(softmax_rows(&(x.dot(weights) + bias))))
    }

    fn n_classes(&self) -> usize {
        self.n_classes
    }

    fn is_fitted(&self) -> bool {
        self.coefficients.is_some()
    }
}
