//! Learner traits and shared helpers

use crate::error::{ClassifierError, Result};
use ndarray::{Array1, Array2, ArrayView1};

/// A learner that can be fitted on encoded labels `0..n_classes`
pub trait Trainable {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<usize>, n_classes: usize) -> Result<()>;
}

/// A fitted classifier
pub trait Predictor: Send + Sync {
    /// Hard class predictions
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>>;

    /// Class probabilities, one row per sample, when the learner provides them
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Option<Array2<f64>>>;

    fn n_classes(&self) -> usize;

    fn is_fitted(&self) -> bool;

    /// Probabilities, falling back to a one-hot of the hard prediction
    fn probabilities(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        match self.predict_proba(x)? {
            Some(proba) => Ok(proba),
            None => Ok(one_hot(&self.predict(x)?, self.n_classes())),
        }
    }
}

/// Reject malformed training input before any learner touches it
pub fn validate_training_input(x: &Array2<f64>, y: &Array1<usize>, n_classes: usize) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(ClassifierError::DimensionMismatch {
            expected: x.nrows(),
            actual: y.len(),
        });
    }
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(ClassifierError::TrainingError("training matrix is empty".to_string()));
    }
    if n_classes < 2 {
        return Err(ClassifierError::TrainingError(format!(
            "at least 2 classes are required, got {}",
            n_classes
        )));
    }
    if let Some(&bad) = y.iter().find(|&&c| c >= n_classes) {
        return Err(ClassifierError::LabelIndexOutOfRange { index: bad, n_classes });
    }
    Ok(())
}

/// Check the input width against the width seen at fit time
pub fn check_n_features(expected: usize, x: &Array2<f64>) -> Result<()> {
    if x.ncols() != expected {
        return Err(ClassifierError::DimensionMismatch {
            expected,
            actual: x.ncols(),
        });
    }
    Ok(())
}

/// Index of the largest value, lowest index on ties
pub fn argmax(row: ArrayView1<f64>) -> usize {
    let mut best = 0;
    for (i, &v) in row.iter().enumerate() {
        if v > row[best] {
            best = i;
        }
    }
    best
}

/// Row-wise argmax of a probability matrix
pub fn argmax_rows(proba: &Array2<f64>) -> Array1<usize> {
    proba.rows().into_iter().map(argmax).collect()
}

pub fn one_hot(labels: &Array1<usize>, n_classes: usize) -> Array2<f64> {
    let mut out = Array2::zeros((labels.len(), n_classes));
    for (i, &c) in labels.iter().enumerate() {
        if c < n_classes {
            out[[i, c]] = 1.0;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    struct Constant;

    impl Predictor for Constant {
        fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>> {
            Ok(Array1::from_elem(x.nrows(), 1))
        }
        fn predict_proba(&self, _x: &Array2<f64>) -> Result<Option<Array2<f64>>> {
            Ok(None)
        }
        fn n_classes(&self) -> usize {
            3
        }
        fn is_fitted(&self) -> bool {
            true
        }
    }

    #[test]
    fn test_probabilities_fall_back_to_one_hot() {
        let proba = Constant.probabilities(&array![[0.0], [1.0]]).unwrap();
        assert_eq!(proba, array![[0.0, 1.0, 0.0], [0.0, 1.0, 0.0]]);
    }

    #[test]
    fn test_argmax_prefers_lowest_index() {
        assert_eq!(argmax(array![0.4, 0.4, 0.2].view()), 0);
        assert_eq!(argmax(array![0.1, 0.2, 0.7].view()), 2);
    }

    #[test]
    fn test_validate_training_input() {
        let x = array![[1.0], [2.0]];
        assert!(validate_training_input(&x, &array![0, 1], 2).is_ok());
        assert!(validate_training_input(&x, &array![0], 2).is_err());
        assert!(validate_training_input(&x, &array![0, 2], 2).is_err());
        assert!(validate_training_input(&x, &array![0, 0], 1).is_err());
    }
}
