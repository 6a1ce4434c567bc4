//! Schema detection: target column resolution and feature type partitioning

use crate::error::{ClassifierError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::table::{is_numeric_dtype, parse_number, string_values};

/// Conventional target column names, probed in order
pub const DEFAULT_TARGET_CANDIDATES: &[&str] = &[
    "target",
    "class",
    "label",
    "disposition",
    "tfopwg_disp",
    "koi_disposition",
];

/// Column type as seen by the preprocessing pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Numeric,
    Categorical,
}

/// Detected layout of a training dataset. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub target_column: String,
    pub numeric_features: Vec<String>,
    pub categorical_features: Vec<String>,
    /// All features in dataset column order
    pub feature_columns: Vec<String>,
}

impl Schema {
    pub fn new(
        target_column: impl Into<String>,
        numeric_features: Vec<String>,
        categorical_features: Vec<String>,
        feature_columns: Vec<String>,
    ) -> Self {
        Self {
            target_column: target_column.into(),
            numeric_features,
            categorical_features,
            feature_columns,
        }
    }

    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        if self.numeric_features.iter().any(|c| c == name) {
            Some(ColumnType::Numeric)
        } else if self.categorical_features.iter().any(|c| c == name) {
            Some(ColumnType::Categorical)
        } else {
            None
        }
    }

    pub fn n_features(&self) -> usize {
        self.feature_columns.len()
    }
}

/// Inspects a raw dataset and produces its [`Schema`]
#[derive(Debug, Clone)]
pub struct SchemaAnalyzer {
    target_candidates: Vec<String>,
    allowed_features: Option<Vec<String>>,
}

impl Default for SchemaAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaAnalyzer {
    /// Analyzer with the conventional target candidates and no feature restriction
    pub fn new() -> Self {
        Self {
            target_candidates: DEFAULT_TARGET_CANDIDATES.iter().map(|s| s.to_string()).collect(),
            allowed_features: None,
        }
    }

    /// Replace the target candidates probed when no target is given
    pub fn with_target_candidates(mut self, candidates: &[&str]) -> Self {
        self.target_candidates = candidates.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Restrict features to a fixed list; listed columns absent from the data are skipped
    pub fn with_allowed_features(mut self, features: &[&str]) -> Self {
        self.allowed_features = Some(features.iter().map(|s| s.to_string()).collect());
        self
    }

    /// Resolve the target column and partition the remaining columns by type
    pub fn analyze(&self, df: &DataFrame, target_column: Option<&str>) -> Result<Schema> {
        let columns: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
        if columns.is_empty() {
            return Err(ClassifierError::SchemaError("dataset has no columns".to_string()));
        }

        let target = self.resolve_target(&columns, target_column)?;

        let target_values = string_values(df.column(&target)?.as_materialized_series())?;
        let usable_rows = target_values.iter().filter(|v| v.is_some()).count();
        if usable_rows == 0 {
            return Err(ClassifierError::SchemaError(format!(
                "target column '{}' has no non-missing values",
                target
            )));
        }

        let mut numeric_features = Vec::new();
        let mut categorical_features = Vec::new();
        let mut feature_columns = Vec::new();

        for name in columns.iter().filter(|c| **c != target) {
            if let Some(allowed) = &self.allowed_features {
                if !allowed.contains(name) {
                    continue;
                }
            }

            let series = df.column(name)?.as_materialized_series();
            match detect_column_type(series)? {
                ColumnType::Numeric => numeric_features.push(name.clone()),
                ColumnType::Categorical => categorical_features.push(name.clone()),
            }
            feature_columns.push(name.clone());
        }

        if feature_columns.is_empty() {
            return Err(ClassifierError::SchemaError(match &self.allowed_features {
                Some(allowed) => format!(
                    "none of the expected feature columns are present: {}",
                    allowed.join(", ")
                ),
                None => "dataset has no feature columns besides the target".to_string(),
            }));
        }

        debug!(
            target = %target,
            numeric = numeric_features.len(),
            categorical = categorical_features.len(),
            usable_rows,
            "Schema detected"
        );

        Ok(Schema {
            target_column: target,
            numeric_features,
            categorical_features,
            feature_columns,
        })
    }

    fn resolve_target(&self, columns: &[String], explicit: Option<&str>) -> Result<String> {
        if let Some(name) = explicit.map(str::trim).filter(|s| !s.is_empty()) {
            return if columns.iter().any(|c| c == name) {
                Ok(name.to_string())
            } else {
                Err(ClassifierError::SchemaError(format!(
                    "target column '{}' not found in dataset",
                    name
                )))
            };
        }

        if let Some(found) = self
            .target_candidates
            .iter()
            .find(|candidate| columns.contains(candidate))
        {
            return Ok(found.clone());
        }

        // Fixed-schema variants name their targets explicitly; only open schemas fall back
        if self.allowed_features.is_some() {
            return Err(ClassifierError::SchemaError(format!(
                "no target column found, expected one of: {}",
                self.target_candidates.join(", ")
            )));
        }

        columns
            .last()
            .cloned()
            .ok_or_else(|| ClassifierError::SchemaError("dataset has no columns".to_string()))
    }
}

/// A column is numeric when every non-missing value is a number
pub fn detect_column_type(series: &Series) -> Result<ColumnType> {
    let dtype = series.dtype();
    if is_numeric_dtype(dtype) || matches!(dtype, DataType::Null) {
        return Ok(ColumnType::Numeric);
    }

    if matches!(dtype, DataType::String) {
        let all_numeric = series
            .str()?
            .into_iter()
            .flatten()
            .filter(|s| !s.trim().is_empty())
            .all(|s| parse_number(s).is_some());
        if all_numeric {
            return Ok(ColumnType::Numeric);
        }
    }

    Ok(ColumnType::Categorical)
}
