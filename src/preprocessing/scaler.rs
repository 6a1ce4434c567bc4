//! Feature scaling

use crate::error::{ClassifierError, Result};
use serde::{Deserialize, Serialize};

/// Parameters for one fitted column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    pub center: f64,
    pub scale: f64,
}

/// Standard scaling (z-score normalization): (x - mean) / std
///
/// Uses the population standard deviation. Constant columns get a scale of 1
/// so they transform to zero instead of dividing by zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scaler {
    params: Vec<ScalerParams>,
    is_fitted: bool,
}

impl Scaler {
    /// Create a new scaler
    pub fn new() -> Self {
        Self::default()
    }

    /// Fit the scaler to imputed (fully finite) columns
    pub fn fit(&mut self, columns: &[Vec<f64>]) -> &mut Self {
        self.params = columns.iter().map(|col| compute_params(col)).collect();
        self.is_fitted = true;
        self
    }

    pub fn transform(&self, columns: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        if !self.is_fitted {
            return Err(ClassifierError::PreprocessingError(
                "scaler must be fitted before transform".to_string(),
            ));
        }
        if columns.len() != self.params.len() {
            return Err(ClassifierError::DimensionMismatch {
                expected: self.params.len(),
                actual: columns.len(),
            });
        }

        Ok(columns
            .iter()
            .zip(&self.params)
            .map(|(col, p)| col.iter().map(|&x| (x - p.center) / p.scale).collect())
            .collect())
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, columns: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        self.fit(columns);
        self.transform(columns)
    }

    pub fn params(&self) -> &[ScalerParams] {
        &self.params
    }
}

fn compute_params(values: &[f64]) -> ScalerParams {
    if values.is_empty() {
        return ScalerParams { center: 0.0, scale: 1.0 };
    }

    // Running mean over pre-divided terms stays finite for any finite input
    let mut mean = 0.0;
    for (i, &v) in values.iter().enumerate() {
        let k = (i + 1) as f64;
        mean += v / k - mean / k;
    }

    // Halved deviations, normalized by the largest, so squaring cannot overflow
    let n = values.len() as f64;
    let half: Vec<f64> = values.iter().map(|&v| v / 2.0 - mean / 2.0).collect();
    let peak = half.iter().fold(0.0f64, |m, d| m.max(d.abs()));
    let std = if peak > 0.0 {
        let mean_square = half.iter().map(|d| (d / peak).powi(2)).sum::<f64>() / n;
        2.0 * peak * mean_square.sqrt()
    } else {
        0.0
    };

    ScalerParams {
        center: mean,
        scale: if std > 0.0 && std.is_finite() { std } else { 1.0 },
    }
}
