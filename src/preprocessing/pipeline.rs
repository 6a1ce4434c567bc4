//! Feature pipeline: imputation, scaling and encoding fitted once and replayed per record

use crate::error::{ClassifierError, Result};
use super::{
    encoder::OneHotEncoder,
    imputer::Imputer,
    scaler::Scaler,
    schema::Schema,
    table::{RawTable, Record},
};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

/// Fitted transform from raw schema columns to a dense matrix of width D
///
/// Output layout is every numeric feature in schema order, followed by the
/// one-hot block of each categorical feature in schema order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturePipeline {
    numeric_columns: Vec<String>,
    categorical_columns: Vec<String>,
    numeric_imputer: Imputer,
    categorical_imputer: Imputer,
    scaler: Scaler,
    encoder: OneHotEncoder,
    feature_names: Vec<String>,
    is_fitted: bool,
}

impl Default for FeaturePipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl FeaturePipeline {
    pub fn new() -> Self {
        Self {
            numeric_columns: Vec::new(),
            categorical_columns: Vec::new(),
            numeric_imputer: Imputer::median(),
            categorical_imputer: Imputer::missing_category(),
            scaler: Scaler::new(),
            encoder: OneHotEncoder::new(),
            feature_names: Vec::new(),
            is_fitted: false,
        }
    }

    /// Fit every stage on the training table and return the transformed matrix
    pub fn fit_transform(&mut self, table: &RawTable, schema: &Schema) -> Result<Array2<f64>> {
        let start = Instant::now();

        if table.numeric.len() != schema.numeric_features.len()
            || table.categorical.len() != schema.categorical_features.len()
        {
            return Err(ClassifierError::PreprocessingError(
                "raw table does not match the schema layout".to_string(),
            ));
        }

        self.numeric_columns = schema.numeric_features.clone();
        self.categorical_columns = schema.categorical_features.clone();

        self.numeric_imputer.fit_numeric(&table.numeric)?;
        let imputed = self.numeric_imputer.transform_numeric(&table.numeric)?;
        self.scaler.fit(&imputed);

        self.categorical_imputer.fit_categorical(&table.categorical)?;
        let filled = self.categorical_imputer.transform_categorical(&table.categorical)?;
        self.encoder.fit(&filled);

        self.feature_names = self
            .numeric_columns
            .iter()
            .cloned()
            .chain(self.encoder.feature_names(&self.categorical_columns))
            .collect();
        self.is_fitted = true;

        let matrix = self.transform(table)?;
        debug!(
            rows = table.n_rows(),
            features_out = self.n_features_out(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Feature pipeline fitted"
        );
        Ok(matrix)
    }

    /// Apply the fitted stages to a raw table
    pub fn transform(&self, table: &RawTable) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(ClassifierError::PreprocessingError(
                "feature pipeline must be fitted before transform".to_string(),
            ));
        }

        let numeric = self
            .scaler
            .transform(&self.numeric_imputer.transform_numeric(&table.numeric)?)?;
        let encoded = self
            .encoder
            .transform(&self.categorical_imputer.transform_categorical(&table.categorical)?)?;

        let n_rows = table.n_rows();
        let columns: Vec<&Vec<f64>> = numeric.iter().chain(encoded.iter()).collect();
        let mut matrix = Array2::zeros((n_rows, columns.len()));
        for (j, col) in columns.into_iter().enumerate() {
            for (i, &v) in col.iter().enumerate() {
                matrix[[i, j]] = v;
            }
        }
        Ok(matrix)
    }

    /// Transform one JSON record into a 1 × D matrix
    pub fn transform_record(&self, record: &Record, schema: &Schema) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(ClassifierError::PreprocessingError(
                "feature pipeline must be fitted before transform".to_string(),
            ));
        }
        let table = RawTable::from_record(record, schema)?;
        self.transform(&table)
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn n_features_out(&self) -> usize {
        self.feature_names.len()
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    /// Per-numeric-column training medians
    pub fn medians(&self) -> Vec<f64> {
        self.numeric_imputer.statistics()
    }

    pub fn vocabularies(&self) -> &[Vec<String>] {
        self.encoder.vocabularies()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::new(
            "label",
            vec!["period".to_string(), "depth".to_string()],
            vec!["band".to_string()],
            vec!["period".to_string(), "depth".to_string(), "band".to_string()],
        )
    }

    fn table() -> RawTable {
        RawTable::from_columns(
            vec![vec![1.0, 2.0, f64::NAN, 5.0], vec![100.0, 100.0, 100.0, 100.0]],
            vec![vec![
                Some("r".to_string()),
                Some("g".to_string()),
                None,
                Some("r".to_string()),
            ]],
        )
        .unwrap()
    }

    fn record(value: serde_json::Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_fit_transform_layout() {
        let mut pipeline = FeaturePipeline::new();
        let x = pipeline.fit_transform(&table(), &schema()).unwrap();

        assert_eq!(x.dim(), (4, 5));
        assert_eq!(
            pipeline.feature_names(),
            &["period", "depth", "band_g", "band_missing", "band_r"]
        );
        assert_eq!(pipeline.medians(), vec![2.0, 100.0]);

        // Constant column scales to zero
        assert!(x.column(1).iter().all(|&v| v == 0.0));
        // Missing period imputed with the median (2.0)
        assert!((x[[2, 0]] - x[[1, 0]]).abs() < 1e-12);
        assert_eq!(x[[2, 3]], 1.0);
    }

    #[test]
    fn test_record_missing_field_keeps_width() {
        let mut pipeline = FeaturePipeline::new();
        pipeline.fit_transform(&table(), &schema()).unwrap();

        let full = pipeline
            .transform_record(&record(json!({"period": 2.0, "depth": 90.0, "band": "r"})), &schema())
            .unwrap();
        let partial = pipeline
            .transform_record(&record(json!({"band": "r"})), &schema())
            .unwrap();

        assert_eq!(full.dim(), (1, 5));
        assert_eq!(partial.dim(), (1, 5));
        // Missing period falls back to the median, which is what full carries
        assert_eq!(full[[0, 0]], partial[[0, 0]]);
    }

    #[test]
    fn test_unseen_category_and_idempotence() {
        let mut pipeline = FeaturePipeline::new();
        pipeline.fit_transform(&table(), &schema()).unwrap();

        let rec = record(json!({"band": "ultraviolet", "period": 3.0}));
        let a = pipeline.transform_record(&rec, &schema()).unwrap();
        let b = pipeline.transform_record(&rec, &schema()).unwrap();

        assert_eq!(a, b);
        assert_eq!(a.row(0).slice(ndarray::s![2..]).sum(), 0.0);
    }

    #[test]
    fn test_transform_before_fit() {
        let pipeline = FeaturePipeline::new();
        let err = pipeline.transform(&table()).unwrap_err();
        assert!(matches!(err, ClassifierError::PreprocessingError(_)));
    }

    #[test]
    fn test_wrong_typed_numeric_is_invalid_value() {
        let mut pipeline = FeaturePipeline::new();
        pipeline.fit_transform(&table(), &schema()).unwrap();

        let err = pipeline
            .transform_record(&record(json!({"period": [1, 2]})), &schema())
            .unwrap_err();
        assert!(matches!(err, ClassifierError::InvalidValue { .. }));
    }
}
