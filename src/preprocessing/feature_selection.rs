//! Univariate feature selection
//!
//! Ranks transformed features by their one-way ANOVA F statistic against the
//! encoded label and keeps the best k. An optional redundancy pass removes
//! constant and highly correlated features before ranking.

use crate::error::{ClassifierError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

/// Feature selection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Maximum number of features kept
    pub k: usize,
    /// Selection only runs when more than this many candidates remain
    pub min_features_to_select: usize,
    /// Drop zero-variance features before ranking
    pub drop_constant: bool,
    /// Drop the later feature of any pair with |r| above this value
    pub correlation_threshold: Option<f64>,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            k: 15,
            min_features_to_select: 10,
            drop_constant: false,
            correlation_threshold: None,
        }
    }
}

impl SelectionConfig {
    /// Redundancy pruning followed by an unconditional top-10
    pub fn pruned(k: usize) -> Self {
        Self {
            k,
            min_features_to_select: 0,
            drop_constant: true,
            correlation_threshold: Some(0.95),
        }
    }
}

/// Feature selector for dimensionality reduction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSelector {
    config: SelectionConfig,
    selected_features: Option<Vec<usize>>,
    selected_names: Vec<String>,
    /// Not persisted: constant columns score NaN, which JSON cannot carry
    #[serde(skip)]
    feature_scores: Option<Vec<f64>>,
    n_features_in: Option<usize>,
}

impl Default for FeatureSelector {
    fn default() -> Self {
        Self::new(SelectionConfig::default())
    }
}

impl FeatureSelector {
    pub fn new(config: SelectionConfig) -> Self {
        Self {
            config,
            selected_features: None,
            selected_names: Vec::new(),
            feature_scores: None,
            n_features_in: None,
        }
    }

    /// Fit on the training matrix and labels
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<usize>, names: &[String]) -> Result<()> {
        let n_features = x.ncols();
        if names.len() != n_features {
            return Err(ClassifierError::DimensionMismatch {
                expected: n_features,
                actual: names.len(),
            });
        }
        if x.nrows() != y.len() {
            return Err(ClassifierError::DimensionMismatch {
                expected: x.nrows(),
                actual: y.len(),
            });
        }

        let mut candidates: Vec<usize> = (0..n_features).collect();

        if self.config.drop_constant {
            candidates.retain(|&j| population_variance(x.column(j)) > 1e-12);
        }
        if let Some(threshold) = self.config.correlation_threshold {
            candidates = drop_correlated(x, &candidates, threshold);
        }
        if candidates.is_empty() {
            // Everything was redundant; keep the original set rather than nothing
            candidates = (0..n_features).collect();
        }

        let scores: Vec<f64> = (0..n_features)
            .map(|j| anova_f_score(x.column(j), y))
            .collect();

        let mut selected = if candidates.len() > self.config.min_features_to_select {
            let k = self.config.k.min(candidates.len());
            let mut ranked = candidates.clone();
            ranked.sort_by(|&a, &b| compare_scores(scores[b], scores[a]).then(a.cmp(&b)));
            ranked.truncate(k);
            ranked
        } else {
            candidates
        };
        selected.sort_unstable();

        debug!(
            features_in = n_features,
            selected = selected.len(),
            "Feature selection fitted"
        );

        self.selected_names = selected.iter().map(|&j| names[j].clone()).collect();
        self.selected_features = Some(selected);
        self.feature_scores = Some(scores);
        self.n_features_in = Some(n_features);
        Ok(())
    }

    /// Project a matrix onto the selected columns
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let selected = self.selected_features.as_ref().ok_or_else(|| {
            ClassifierError::PreprocessingError("feature selector must be fitted before transform".to_string())
        })?;
        let expected = self.n_features_in.unwrap_or(0);
        if x.ncols() != expected {
            return Err(ClassifierError::DimensionMismatch {
                expected,
                actual: x.ncols(),
            });
        }

        let mut result = Array2::zeros((x.nrows(), selected.len()));
        for (new_idx, &old_idx) in selected.iter().enumerate() {
            result.column_mut(new_idx).assign(&x.column(old_idx));
        }
        Ok(result)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, x: &Array2<f64>, y: &Array1<usize>, names: &[String]) -> Result<Array2<f64>> {
        self.fit(x, y, names)?;
        self.transform(x)
    }

    pub fn selected_indices(&self) -> Option<&[usize]> {
        self.selected_features.as_deref()
    }

    pub fn selected_names(&self) -> &[String] {
        &self.selected_names
    }

    pub fn scores(&self) -> Option<&[f64]> {
        self.feature_scores.as_deref()
    }

    pub fn n_features_in(&self) -> Option<usize> {
        self.n_features_in
    }
}

/// Descending-friendly comparison where NaN ranks below every number
fn compare_scores(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

/// One-way ANOVA F statistic of a feature grouped by class label
pub fn anova_f_score(feature: ArrayView1<f64>, y: &Array1<usize>) -> f64 {
    let n = feature.len();
    let n_classes = y.iter().copied().max().map_or(0, |m| m + 1);
    if n == 0 || n_classes == 0 {
        return f64::NAN;
    }

    let mut sums = vec![0.0; n_classes];
    let mut counts = vec![0usize; n_classes];
    for (&v, &c) in feature.iter().zip(y.iter()) {
        sums[c] += v;
        counts[c] += 1;
    }

    let present = counts.iter().filter(|&&c| c > 0).count();
    if present < 2 || n <= present {
        return f64::NAN;
    }

    let grand_mean = sums.iter().sum::<f64>() / n as f64;
    let means: Vec<f64> = sums
        .iter()
        .zip(&counts)
        .map(|(&s, &c)| if c > 0 { s / c as f64 } else { 0.0 })
        .collect();

    let ss_between: f64 = means
        .iter()
        .zip(&counts)
        .map(|(&m, &c)| c as f64 * (m - grand_mean).powi(2))
        .sum();
    let ss_within: f64 = feature
        .iter()
        .zip(y.iter())
        .map(|(&v, &c)| (v - means[c]).powi(2))
        .sum();

    let df_between = (present - 1) as f64;
    let df_within = (n - present) as f64;

    if ss_within <= f64::EPSILON {
        return if ss_between > f64::EPSILON { f64::INFINITY } else { f64::NAN };
    }
    (ss_between / df_between) / (ss_within / df_within)
}

fn population_variance(col: ArrayView1<f64>) -> f64 {
    let n = col.len();
    if n == 0 {
        return 0.0;
    }
    let mean = col.sum() / n as f64;
    col.iter().map(|&v| (v - mean).powi(2)).sum::<f64>() / n as f64
}

fn pearson(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    let n = a.len() as f64;
    if n == 0.0 {
        return 0.0;
    }
    let mean_a = a.sum() / n;
    let mean_b = b.sum() / n;

    let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
    for (&x, &y) in a.iter().zip(b.iter()) {
        let (da, db) = (x - mean_a, y - mean_b);
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }

    let denom = (var_a * var_b).sqrt();
    if denom > 0.0 {
        cov / denom
    } else {
        0.0
    }
}

fn drop_correlated(x: &Array2<f64>, candidates: &[usize], threshold: f64) -> Vec<usize> {
    let mut kept: Vec<usize> = Vec::with_capacity(candidates.len());
    for &j in candidates {
        let redundant = kept
            .iter()
            .any(|&i| pearson(x.column(i), x.column(j)).abs() > threshold);
        if !redundant {
            kept.push(j);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("f{}", i)).collect()
    }

    /// 12 features: feature j separates the classes with strength j, except f0 (pure noise)
    fn wide_data() -> (Array2<f64>, Array1<usize>) {
        let n = 40;
        let y: Array1<usize> = (0..n).map(|i| i % 2).collect();
        let x = Array2::from_shape_fn((n, 12), |(i, j)| {
            let noise = ((i * 7 + j * 3) % 5) as f64 * 0.1;
            if j == 0 {
                noise
            } else {
                y[i] as f64 * j as f64 + noise
            }
        });
        (x, y)
    }

    #[test]
    fn test_anova_separates_informative_feature() {
        let y = array![0, 0, 1, 1];
        let informative = array![0.0, 0.1, 5.0, 5.1];
        let noise = array![1.0, 2.0, 1.0, 2.0];
        assert!(anova_f_score(informative.view(), &y) > 100.0);
        assert!(anova_f_score(noise.view(), &y) < 1e-9);
    }

    #[test]
    fn test_constant_feature_scores_nan() {
        let y = array![0, 1, 0, 1];
        let constant = array![3.0, 3.0, 3.0, 3.0];
        assert!(anova_f_score(constant.view(), &y).is_nan());
    }

    #[test]
    fn test_passes_through_narrow_input() {
        let x = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];
        let y = array![0, 1, 0];
        let mut selector = FeatureSelector::default();
        let out = selector.fit_transform(&x, &y, &names(2)).unwrap();
        assert_eq!(out, x);
        assert_eq!(selector.selected_indices().unwrap(), &[0, 1]);
    }

    #[test]
    fn test_selects_top_k_in_ascending_order() {
        let (x, y) = wide_data();
        let mut selector = FeatureSelector::new(SelectionConfig { k: 3, ..Default::default() });
        let out = selector.fit_transform(&x, &y, &names(12)).unwrap();

        assert_eq!(out.ncols(), 3);
        let selected = selector.selected_indices().unwrap();
        assert!(selected.windows(2).all(|w| w[0] < w[1]));
        assert!(!selected.contains(&0));
        assert_eq!(selector.selected_names().len(), 3);
    }

    #[test]
    fn test_default_keeps_at_most_fifteen() {
        let x = Array2::from_shape_fn((30, 20), |(i, j)| ((i * (j + 1)) % 11) as f64);
        let y: Array1<usize> = (0..30).map(|i| i % 3).collect();
        let mut selector = FeatureSelector::default();
        selector.fit(&x, &y, &names(20)).unwrap();
        assert_eq!(selector.selected_indices().unwrap().len(), 15);
        assert!(selector.selected_indices().unwrap().iter().all(|&j| j < 20));
    }

    #[test]
    fn test_pruning_drops_constant_and_correlated() {
        let x = array![
            [1.0, 2.0, 5.0, 0.3],
            [2.0, 4.0, 5.0, 0.1],
            [3.0, 6.0, 5.0, 0.4],
            [4.0, 8.0, 5.0, 0.2]
        ];
        let y = array![0, 0, 1, 1];
        let mut selector = FeatureSelector::new(SelectionConfig::pruned(10));
        selector.fit(&x, &y, &names(4)).unwrap();
        // f1 duplicates f0, f2 is constant
        assert_eq!(selector.selected_indices().unwrap(), &[0, 3]);
    }

    #[test]
    fn test_transform_errors() {
        let selector = FeatureSelector::default();
        assert!(matches!(
            selector.transform(&array![[1.0]]),
            Err(ClassifierError::PreprocessingError(_))
        ));

        let (x, y) = wide_data();
        let mut selector = FeatureSelector::default();
        selector.fit(&x, &y, &names(12)).unwrap();
        assert!(matches!(
            selector.transform(&array![[1.0, 2.0]]),
            Err(ClassifierError::DimensionMismatch { expected: 12, actual: 2 })
        ));
    }
}
