//! One-hot encoding of categorical columns

use crate::error::{ClassifierError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One-hot encoder over a sorted per-column vocabulary
///
/// A category that was not observed during fit encodes to an all-zero block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OneHotEncoder {
    // Sorted categories per column
    vocabularies: Vec<Vec<String>>,
    is_fitted: bool,
}

impl OneHotEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fit the encoder to imputed categorical columns
    pub fn fit(&mut self, columns: &[Vec<String>]) -> &mut Self {
        self.vocabularies = columns
            .iter()
            .map(|col| {
                col.iter()
                    .cloned()
                    .collect::<BTreeSet<String>>()
                    .into_iter()
                    .collect()
            })
            .collect();
        self.is_fitted = true;
        self
    }

    /// Encode columns into indicator columns, block by block in column order
    pub fn transform(&self, columns: &[Vec<String>]) -> Result<Vec<Vec<f64>>> {
        if !self.is_fitted {
            return Err(ClassifierError::PreprocessingError(
                "encoder must be fitted before transform".to_string(),
            ));
        }
        if columns.len() != self.vocabularies.len() {
            return Err(ClassifierError::DimensionMismatch {
                expected: self.vocabularies.len(),
                actual: columns.len(),
            });
        }

        let mut out = Vec::with_capacity(self.n_outputs());
        for (col, vocab) in columns.iter().zip(&self.vocabularies) {
            let mut block = vec![vec![0.0; col.len()]; vocab.len()];
            for (row, value) in col.iter().enumerate() {
                if let Ok(pos) = vocab.binary_search(value) {
                    block[pos][row] = 1.0;
                }
            }
            out.extend(block);
        }
        Ok(out)
    }

    pub fn fit_transform(&mut self, columns: &[Vec<String>]) -> Result<Vec<Vec<f64>>> {
        self.fit(columns);
        self.transform(columns)
    }

    /// Output column names: `<column>_<category>`
    pub fn feature_names(&self, columns: &[String]) -> Vec<String> {
        columns
            .iter()
            .zip(&self.vocabularies)
            .flat_map(|(name, vocab)| vocab.iter().map(move |cat| format!("{}_{}", name, cat)))
            .collect()
    }

    pub fn vocabularies(&self) -> &[Vec<String>] {
        &self.vocabularies
    }

    pub fn n_outputs(&self) -> usize {
        self.vocabularies.iter().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_onehot_encoding() {
        let mut encoder = OneHotEncoder::new();
        let out = encoder.fit_transform(&[strings(&["red", "blue", "red"])]).unwrap();

        // Sorted vocabulary: blue, red
        assert_eq!(encoder.vocabularies()[0], strings(&["blue", "red"]));
        assert_eq!(out, vec![vec![0.0, 1.0, 0.0], vec![1.0, 0.0, 1.0]]);
        assert_eq!(
            encoder.feature_names(&strings(&["color"])),
            strings(&["color_blue", "color_red"])
        );
    }

    #[test]
    fn test_unseen_category_is_zero_block() {
        let mut encoder = OneHotEncoder::new();
        encoder.fit(&[strings(&["a", "b"]), strings(&["x", "x"])]);

        let out = encoder.transform(&[strings(&["c"]), strings(&["x"])]).unwrap();
        assert_eq!(out, vec![vec![0.0], vec![0.0], vec![1.0]]);
    }

    #[test]
    fn test_transform_requires_fit() {
        let encoder = OneHotEncoder::new();
        assert!(encoder.transform(&[]).is_err());
    }
}
