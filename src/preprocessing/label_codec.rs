//! Bijection between class names and dense integer codes

use crate::error::{ClassifierError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Label encoder with lexicographically sorted classes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelCodec {
    classes: Vec<String>,
}

impl LabelCodec {
    /// Fit on the observed labels. At least two distinct classes are required.
    pub fn fit<S: AsRef<str>>(labels: &[S]) -> Result<Self> {
        let classes: Vec<String> = labels
            .iter()
            .map(|l| l.as_ref().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        if classes.len() < 2 {
            return Err(ClassifierError::SchemaError(format!(
                "at least 2 target classes are required, found {}",
                classes.len()
            )));
        }
        Ok(Self { classes })
    }

    pub fn encode(&self, label: &str) -> Result<usize> {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(label))
            .map_err(|_| ClassifierError::UnknownLabel(label.to_string()))
    }

    pub fn encode_all<S: AsRef<str>>(&self, labels: &[S]) -> Result<Array1<usize>> {
        labels
            .iter()
            .map(|l| self.encode(l.as_ref()))
            .collect::<Result<Vec<_>>>()
            .map(Array1::from)
    }

    pub fn decode(&self, code: usize) -> Result<&str> {
        self.classes
            .get(code)
            .map(String::as_str)
            .ok_or(ClassifierError::LabelIndexOutOfRange {
                index: code,
                n_classes: self.classes.len(),
            })
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorted_classes_round_trip() {
        let codec = LabelCodec::fit(&["PC", "FP", "KP", "PC"]).unwrap();
        assert_eq!(codec.classes(), &["FP", "KP", "PC"]);

        for class in codec.classes() {
            let code = codec.encode(class).unwrap();
            assert_eq!(codec.decode(code).unwrap(), class);
        }
        assert_eq!(codec.encode_all(&["PC", "FP"]).unwrap().to_vec(), vec![2, 0]);
    }

    #[test]
    fn test_unknown_label() {
        let codec = LabelCodec::fit(&["a", "b"]).unwrap();
        assert!(matches!(codec.encode("c"), Err(ClassifierError::UnknownLabel(_))));
    }

    #[test]
    fn test_code_out_of_range() {
        let codec = LabelCodec::fit(&["a", "b"]).unwrap();
        assert!(matches!(
            codec.decode(2),
            Err(ClassifierError::LabelIndexOutOfRange { index: 2, n_classes: 2 })
        ));
    }

    #[test]
    fn test_single_class_rejected() {
        let err = LabelCodec::fit(&["only", "only"]).unwrap_err();
        assert!(matches!(err, ClassifierError::SchemaError(_)));
    }
}
