//! Classification evaluation report

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Precision, recall, F1 and support for one class or one average
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

/// Held-out evaluation of a trained classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub accuracy: f64,
    /// Keyed by class name
    pub per_class: BTreeMap<String, ClassMetrics>,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
    /// Rows are true classes, columns predicted classes, in class order
    pub confusion_matrix: Vec<Vec<usize>>,
    pub class_names: Vec<String>,
}

impl Evaluation {
    /// Build the report from encoded labels
    pub fn compute(y_true: &[usize], y_pred: &[usize], class_names: &[String]) -> Self {
        let n_classes = class_names.len();
        let mut confusion = vec![vec![0usize; n_classes]; n_classes];
        for (&t, &p) in y_true.iter().zip(y_pred) {
            if t < n_classes && p < n_classes {
                confusion[t][p] += 1;
            }
        }

        let total = y_true.len();
        let correct: usize = (0..n_classes).map(|k| confusion[k][k]).sum();
        let accuracy = if total > 0 { correct as f64 / total as f64 } else { 0.0 };

        let per_class_vec: Vec<ClassMetrics> = (0..n_classes)
            .map(|k| {
                let tp = confusion[k][k] as f64;
                let support: usize = confusion[k].iter().sum();
                let predicted: usize = confusion.iter().map(|row| row[k]).sum();

                let precision = safe_div(tp, predicted as f64);
                let recall = safe_div(tp, support as f64);
                let f1_score = safe_div(2.0 * precision * recall, precision + recall);
                ClassMetrics { precision, recall, f1_score, support }
            })
            .collect();

        let macro_avg = average(&per_class_vec, |_| 1.0, total);
        let weighted_avg = average(&per_class_vec, |m| m.support as f64, total);

        Self {
            accuracy,
            per_class: class_names.iter().cloned().zip(per_class_vec).collect(),
            macro_avg,
            weighted_avg,
            confusion_matrix: confusion,
            class_names: class_names.to_vec(),
        }
    }
}

fn safe_div(num: f64, den: f64) -> f64 {
    if den > 0.0 {
        num / den
    } else {
        0.0
    }
}

fn average(metrics: &[ClassMetrics], weight: impl Fn(&ClassMetrics) -> f64, total: usize) -> ClassMetrics {
    let weight_sum: f64 = metrics.iter().map(&weight).sum();
    let mean = |f: fn(&ClassMetrics) -> f64| {
        safe_div(metrics.iter().map(|m| weight(m) * f(m)).sum::<f64>(), weight_sum)
    };
    ClassMetrics {
        precision: mean(|m| m.precision),
        recall: mean(|m| m.recall),
        f1_score: mean(|m| m.f1_score),
        support: total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> Vec<String> {
        vec!["a".to_string(), "b".to_string()]
    }

    #[test]
    fn test_perfect_predictions() {
        let eval = Evaluation::compute(&[0, 1, 1, 0], &[0, 1, 1, 0], &names());
        assert_eq!(eval.accuracy, 1.0);
        assert_eq!(eval.macro_avg.f1_score, 1.0);
        assert_eq!(eval.confusion_matrix, vec![vec![2, 0], vec![0, 2]]);
    }

    #[test]
    fn test_per_class_and_averages() {
        // a: 3 true, b: 1 true; one a predicted as b
        let eval = Evaluation::compute(&[0, 0, 0, 1], &[0, 0, 1, 1], &names());
        assert_eq!(eval.accuracy, 0.75);

        let a = &eval.per_class["a"];
        assert_eq!(a.precision, 1.0);
        assert!((a.recall - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(a.support, 3);

        let b = &eval.per_class["b"];
        assert_eq!(b.precision, 0.5);
        assert_eq!(b.recall, 1.0);

        assert!((eval.macro_avg.precision - 0.75).abs() < 1e-12);
        assert!((eval.weighted_avg.recall - 0.75).abs() < 1e-12);
        assert_eq!(eval.weighted_avg.support, 4);
    }

    #[test]
    fn test_absent_class_scores_zero() {
        let eval = Evaluation::compute(&[0, 0], &[0, 0], &names());
        assert_eq!(eval.per_class["b"].precision, 0.0);
        assert_eq!(eval.per_class["b"].support, 0);
    }
}
