//! Training engine: raw table in, immutable model bundle out

use crate::balancing::{class_counts, RandomOverSampler, Sampler};
use crate::error::{ClassifierError, Result};
use crate::preprocessing::{
    FeaturePipeline, FeatureSelector, LabelCodec, RawTable, SchemaAnalyzer, SelectionConfig,
};
use crate::preprocessing::table::string_values;
use super::bundle::{BundleMetadata, ModelBundle};
use super::config::{ModelKind, ModelSpec};
use super::cross_validation::{cross_val_score, train_test_split, StratifiedKFold};
use super::metrics::Evaluation;
use super::models::{Predictor, Trainable};
use chrono::Utc;
use ndarray::Axis;
use polars::prelude::*;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Label values that mean "no disposition" once normalized
const UNUSABLE_LABELS: &[&str] = &["NAN", "UNKNOWN"];

/// Everything a training run needs to know besides the data
#[derive(Debug, Clone)]
pub struct TrainingPlan {
    /// Explicit target; probed from `target_candidates` when absent
    pub target_column: Option<String>,
    pub target_candidates: Option<Vec<String>>,
    /// Fixed feature list; every non-target column is used when absent
    pub allowed_features: Option<Vec<String>>,
    /// Trim and uppercase labels, dropping unusable ones
    pub normalize_target: bool,
    pub selection: SelectionConfig,
    pub balance_threshold: f64,
    pub model: ModelSpec,
    /// Fraction of rows held out for evaluation
    pub holdout: Option<f64>,
    pub cv_folds: Option<usize>,
    pub seed: u64,
}

impl TrainingPlan {
    /// Schema-agnostic plan: train on everything, cross-validate
    pub fn custom(kind: ModelKind) -> Self {
        Self {
            target_column: None,
            target_candidates: None,
            allowed_features: None,
            normalize_target: false,
            selection: SelectionConfig::default(),
            balance_threshold: 2.0,
            model: ModelSpec::custom(kind),
            holdout: None,
            cv_folds: Some(5),
            seed: 42,
        }
    }

    pub fn with_target(mut self, target: Option<String>) -> Self {
        self.target_column = target;
        self
    }

    pub fn with_model(mut self, model: ModelSpec) -> Self {
        self.model = model;
        self
    }

    fn analyzer(&self) -> SchemaAnalyzer {
        let mut analyzer = SchemaAnalyzer::new();
        if let Some(candidates) = &self.target_candidates {
            let names: Vec<&str> = candidates.iter().map(String::as_str).collect();
            analyzer = analyzer.with_target_candidates(&names);
        }
        if let Some(features) = &self.allowed_features {
            let names: Vec<&str> = features.iter().map(String::as_str).collect();
            analyzer = analyzer.with_allowed_features(&names);
        }
        analyzer
    }
}

/// A trained bundle plus the non-fatal problems met on the way
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub bundle: ModelBundle,
    pub warnings: Vec<String>,
}

/// Runs a [`TrainingPlan`] against a data frame
#[derive(Debug, Clone)]
pub struct TrainEngine {
    plan: TrainingPlan,
}

impl TrainEngine {
    pub fn new(plan: TrainingPlan) -> Self {
        Self { plan }
    }

    pub fn plan(&self) -> &TrainingPlan {
        &self.plan
    }

    /// Analyze, preprocess, balance, fit and evaluate
    pub fn train(&self, df: &DataFrame) -> Result<TrainingOutcome> {
        let start = Instant::now();
        let plan = &self.plan;
        let mut warnings = Vec::new();

        let schema = plan.analyzer().analyze(df, plan.target_column.as_deref())?;
        info!(
            target = %schema.target_column,
            numeric = schema.numeric_features.len(),
            categorical = schema.categorical_features.len(),
            "Schema detected"
        );

        let (rows, labels) = self.extract_labels(df, &schema.target_column)?;
        let codec = LabelCodec::fit(&labels)?;
        let y_all = codec.encode_all(&labels)?;
        let class_distribution: BTreeMap<String, usize> = class_counts(&y_all)
            .into_iter()
            .map(|(code, n)| (codec.classes()[code].clone(), n))
            .collect();
        info!(samples = labels.len(), classes = ?class_distribution, "Label distribution");

        let table = RawTable::from_frame(df, &schema)?.take(&rows);

        let (train_rows, test_rows) = match plan.holdout {
            Some(test_size) => {
                let (train, test) = train_test_split(&y_all, test_size, plan.seed)?;
                (train, Some(test))
            }
            None => ((0..y_all.len()).collect(), None),
        };
        let train_table = table.take(&train_rows);
        let y_train = y_all.select(Axis(0), &train_rows);

        let mut pipeline = FeaturePipeline::new();
        let x_train = pipeline.fit_transform(&train_table, &schema)?;

        let mut selector = FeatureSelector::new(plan.selection.clone());
        let x_train = selector.fit_transform(&x_train, &y_train, pipeline.feature_names())?;
        info!(
            features_in = pipeline.n_features_out(),
            selected = ?selector.selected_names(),
            "Features selected"
        );

        let mut sampler = RandomOverSampler::new()
            .with_imbalance_threshold(plan.balance_threshold)
            .with_seed(plan.seed);
        let balanced = sampler.fit_resample(&x_train, &y_train)?;
        if balanced.is_resampled() {
            info!(rows = balanced.y.len(), added = ?balanced.n_added, "Training rows balanced");
        }

        let n_classes = codec.n_classes();
        let mut classifier = plan.model.build();
        classifier.fit(&balanced.x, &balanced.y, n_classes)?;

        let cross_validation = match plan.cv_folds {
            Some(folds) => {
                let splitter = StratifiedKFold::new(folds).with_random_state(plan.seed);
                match cross_val_score(&plan.model, &balanced.x, &balanced.y, n_classes, &splitter) {
                    Ok(scores) => {
                        info!(mean = scores.mean, std = scores.std, "Cross-validation complete");
                        Some(scores)
                    }
                    Err(e) => {
                        warn!(error = %e, "Cross-validation failed");
                        warnings.push(format!("Cross-validation failed: {}", e));
                        None
                    }
                }
            }
            None => None,
        };

        let evaluation = match &test_rows {
            Some(test_rows) => {
                let x_test = selector.transform(&pipeline.transform(&table.take(test_rows))?)?;
                let y_test = y_all.select(Axis(0), test_rows);
                let y_pred = classifier.predict(&x_test)?;
                let evaluation = Evaluation::compute(&y_test.to_vec(), &y_pred.to_vec(), codec.classes());
                info!(accuracy = evaluation.accuracy, test_rows = test_rows.len(), "Holdout evaluation");
                Some(evaluation)
            }
            None => None,
        };

        let metadata = BundleMetadata {
            created_at: Utc::now(),
            sample_count: labels.len(),
            class_distribution,
            model_type: classifier.kind(),
            parameters: plan.model.parameters(),
            num_features: selector.selected_names().len(),
            cross_validation,
            evaluation,
        };

        debug!(elapsed_ms = start.elapsed().as_millis() as u64, "Training finished");
        Ok(TrainingOutcome {
            bundle: ModelBundle {
                schema,
                pipeline,
                selector,
                codec,
                classifier,
                metadata,
            },
            warnings,
        })
    }

    /// Row indices with a usable label, and those labels
    fn extract_labels(&self, df: &DataFrame, target: &str) -> Result<(Vec<usize>, Vec<String>)> {
        let raw = string_values(df.column(target)?.as_materialized_series())?;
        let mut rows = Vec::new();
        let mut labels = Vec::new();

        for (i, value) in raw.into_iter().enumerate() {
            let Some(value) = value else { continue };
            let label = if self.plan.normalize_target {
                let normalized = value.trim().to_uppercase();
                if normalized.is_empty() || UNUSABLE_LABELS.contains(&normalized.as_str()) {
                    continue;
                }
                normalized
            } else {
                value
            };
            rows.push(i);
            labels.push(label);
        }

        if labels.is_empty() {
            return Err(ClassifierError::SchemaError(format!(
                "target column '{}' has no usable labels",
                target
            )));
        }
        Ok((rows, labels))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::linear_models::LogisticConfig;

    fn frame(n: usize) -> DataFrame {
        let labels: Vec<&str> = (0..n).map(|i| ["a", "b", "c"][i % 3]).collect();
        let x1: Vec<f64> = (0..n).map(|i| (i % 3) as f64 * 5.0 + (i % 7) as f64 * 0.1).collect();
        let x2: Vec<f64> = (0..n).map(|i| (i % 5) as f64).collect();
        let color: Vec<&str> = (0..n).map(|i| if i % 2 == 0 { "red" } else { "blue" }).collect();
        df!("x1" => x1, "x2" => x2, "color" => color, "label" => labels).unwrap()
    }

    fn fast_plan() -> TrainingPlan {
        let spec = ModelSpec {
            logistic: LogisticConfig { max_iter: 300, ..Default::default() },
            ..ModelSpec::custom(ModelKind::Linear)
        };
        TrainingPlan::custom(ModelKind::Linear).with_model(spec)
    }

    #[test]
    fn test_train_produces_bundle() {
        let outcome = TrainEngine::new(fast_plan()).train(&frame(60)).unwrap();
        let bundle = outcome.bundle;

        assert_eq!(bundle.schema.target_column, "label");
        assert_eq!(bundle.class_names(), &["a", "b", "c"]);
        assert_eq!(bundle.metadata.sample_count, 60);
        assert_eq!(bundle.metadata.class_distribution["a"], 20);
        assert_eq!(bundle.metadata.model_type, ModelKind::Linear);
        assert!(bundle.metadata.cross_validation.is_some());
        assert!(bundle.metadata.evaluation.is_none());
    }

    #[test]
    fn test_holdout_produces_evaluation() {
        let plan = TrainingPlan { holdout: Some(0.2), cv_folds: None, ..fast_plan() };
        let bundle = TrainEngine::new(plan).train(&frame(60)).unwrap().bundle;
        let evaluation = bundle.metadata.evaluation.unwrap();
        assert_eq!(evaluation.weighted_avg.support, 12);
        assert!(bundle.metadata.cross_validation.is_none());
    }

    #[test]
    fn test_normalized_target_drops_unusable_labels() {
        let df = df!(
            "x" => [1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            "disp" => ["confirmed ", "CANDIDATE", "unknown", "NaN", "Candidate", "CONFIRMED"]
        )
        .unwrap();
        let plan = TrainingPlan {
            normalize_target: true,
            target_column: Some("disp".to_string()),
            cv_folds: None,
            ..fast_plan()
        };
        let bundle = TrainEngine::new(plan).train(&df).unwrap().bundle;
        assert_eq!(bundle.class_names(), &["CANDIDATE", "CONFIRMED"]);
        assert_eq!(bundle.metadata.sample_count, 4);
    }

    #[test]
    fn test_single_class_is_schema_error() {
        let df = df!("x" => [1.0, 2.0, 3.0], "label" => ["a", "a", "a"]).unwrap();
        let err = TrainEngine::new(fast_plan()).train(&df).unwrap_err();
        assert!(matches!(err, ClassifierError::SchemaError(_)));
    }

    #[test]
    fn test_cv_failure_becomes_warning() {
        // 4 rows cannot fill 5 folds
        let df = df!("x" => [0.0, 0.1, 5.0, 5.1], "label" => ["a", "a", "b", "b"]).unwrap();
        let outcome = TrainEngine::new(fast_plan()).train(&df).unwrap();
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.bundle.metadata.cross_validation.is_none());
    }

    #[test]
    fn test_explicit_missing_target() {
        let plan = fast_plan().with_target(Some("nope".to_string()));
        let err = TrainEngine::new(plan).train(&frame(30)).unwrap_err();
        assert!(matches!(err, ClassifierError::SchemaError(_)));
    }
}
