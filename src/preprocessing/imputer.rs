//! Missing value imputation strategies

use crate::error::{ClassifierError, Result};
use serde::{Deserialize, Serialize};

/// Sentinel category substituted for missing categorical values
pub const MISSING_CATEGORY: &str = "missing";

/// Strategy for imputing missing values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ImputeStrategy {
    /// Replace with the training median of the finite values (numeric only)
    Median,
    /// Replace with a constant category (categorical only)
    ConstantString(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum ImputeValue {
    Numeric(f64),
    String(String),
}

/// Imputer for handling missing values, one fill value per column
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Imputer {
    strategy: ImputeStrategy,
    fill_values: Vec<ImputeValue>,
    is_fitted: bool,
}

impl Imputer {
    /// Create a new imputer with the specified strategy
    pub fn new(strategy: ImputeStrategy) -> Self {
        Self {
            strategy,
            fill_values: Vec::new(),
            is_fitted: false,
        }
    }

    pub fn median() -> Self {
        Self::new(ImputeStrategy::Median)
    }

    pub fn missing_category() -> Self {
        Self::new(ImputeStrategy::ConstantString(MISSING_CATEGORY.to_string()))
    }

    pub fn strategy(&self) -> &ImputeStrategy {
        &self.strategy
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    /// Fit on numeric columns (`NaN` = missing)
    pub fn fit_numeric(&mut self, columns: &[Vec<f64>]) -> Result<&mut Self> {
        self.fill_values = match &self.strategy {
            ImputeStrategy::Median => columns
                .iter()
                .map(|col| ImputeValue::Numeric(finite_median(col).unwrap_or(0.0)))
                .collect(),
            ImputeStrategy::ConstantString(_) => {
                return Err(ClassifierError::PreprocessingError(
                    "constant string imputation cannot fill numeric columns".to_string(),
                ))
            }
        };
        self.is_fitted = true;
        Ok(self)
    }

    /// Fit on categorical columns (`None` = missing)
    pub fn fit_categorical(&mut self, columns: &[Vec<Option<String>>]) -> Result<&mut Self> {
        self.fill_values = match &self.strategy {
            ImputeStrategy::ConstantString(fill) => columns
                .iter()
                .map(|_| ImputeValue::String(fill.clone()))
                .collect(),
            ImputeStrategy::Median => {
                return Err(ClassifierError::PreprocessingError(
                    "median imputation cannot fill categorical columns".to_string(),
                ))
            }
        };
        self.is_fitted = true;
        Ok(self)
    }

    /// Replace missing and non-finite values with the fitted fill values
    pub fn transform_numeric(&self, columns: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        self.check_width(columns.len())?;

        columns
            .iter()
            .zip(&self.fill_values)
            .map(|(col, fill)| match fill {
                ImputeValue::Numeric(v) => Ok(col
                    .iter()
                    .map(|&x| if x.is_finite() { x } else { *v })
                    .collect()),
                ImputeValue::String(_) => Err(ClassifierError::PreprocessingError(
                    "imputer was fitted on categorical columns".to_string(),
                )),
            })
            .collect()
    }

    pub fn transform_categorical(&self, columns: &[Vec<Option<String>>]) -> Result<Vec<Vec<String>>> {
        self.check_width(columns.len())?;

        columns
            .iter()
            .zip(&self.fill_values)
            .map(|(col, fill)| match fill {
                ImputeValue::String(s) => Ok(col
                    .iter()
                    .map(|v| v.clone().unwrap_or_else(|| s.clone()))
                    .collect()),
                ImputeValue::Numeric(_) => Err(ClassifierError::PreprocessingError(
                    "imputer was fitted on numeric columns".to_string(),
                )),
            })
            .collect()
    }

    /// Fitted numeric fill values, in column order
    pub fn statistics(&self) -> Vec<f64> {
        self.fill_values
            .iter()
            .filter_map(|v| match v {
                ImputeValue::Numeric(x) => Some(*x),
                ImputeValue::String(_) => None,
            })
            .collect()
    }

    fn check_width(&self, n_columns: usize) -> Result<()> {
        if !self.is_fitted {
            return Err(ClassifierError::PreprocessingError(
                "imputer must be fitted before transform".to_string(),
            ));
        }
        if n_columns != self.fill_values.len() {
            return Err(ClassifierError::DimensionMismatch {
                expected: self.fill_values.len(),
                actual: n_columns,
            });
        }
        Ok(())
    }
}

/// Median of the finite values, averaging the two middle elements for even counts
pub fn finite_median(values: &[f64]) -> Option<f64> {
    let mut finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return None;
    }
    finite.sort_by(|a, b| a.total_cmp(b));

    let mid = finite.len() / 2;
    if finite.len() % 2 == 0 {
        Some((finite[mid - 1] + finite[mid]) / 2.0)
    } else {
        Some(finite[mid])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_ignores_missing() {
        assert_eq!(finite_median(&[3.0, f64::NAN, 1.0, 2.0]), Some(2.0));
        assert_eq!(finite_median(&[4.0, 1.0, f64::INFINITY, 3.0, 2.0]), Some(2.5));
        assert_eq!(finite_median(&[f64::NAN]), None);
    }

    #[test]
    fn test_numeric_imputation() {
        let mut imputer = Imputer::median();
        imputer
            .fit_numeric(&[vec![1.0, f64::NAN, 5.0], vec![f64::NAN, f64::NAN, f64::NAN]])
            .unwrap();
        assert_eq!(imputer.statistics(), vec![3.0, 0.0]);

        let out = imputer
            .transform_numeric(&[vec![f64::NAN, 2.0], vec![f64::NEG_INFINITY, 7.0]])
            .unwrap();
        assert_eq!(out, vec![vec![3.0, 2.0], vec![0.0, 7.0]]);
    }

    #[test]
    fn test_categorical_imputation() {
        let mut imputer = Imputer::missing_category();
        let columns = vec![vec![Some("a".to_string()), None]];
        imputer.fit_categorical(&columns).unwrap();

        let out = imputer.transform_categorical(&columns).unwrap();
        assert_eq!(out, vec![vec!["a".to_string(), MISSING_CATEGORY.to_string()]]);
    }

    #[test]
    fn test_transform_before_fit() {
        let imputer = Imputer::median();
        let err = imputer.transform_numeric(&[vec![1.0]]).unwrap_err();
        assert!(matches!(err, ClassifierError::PreprocessingError(_)));
    }

    #[test]
    fn test_strategy_mismatch() {
        let mut imputer = Imputer::median();
        assert!(imputer.fit_categorical(&[vec![None]]).is_err());
    }
}
