//! The immutable artifact a training run produces

use crate::error::Result;
use crate::preprocessing::{FeaturePipeline, FeatureSelector, LabelCodec, Record, Schema};
use super::classifier::Classifier;
use super::config::ModelKind;
use super::cross_validation::CvScores;
use super::metrics::Evaluation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Facts about how a bundle was trained
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleMetadata {
    pub created_at: DateTime<Utc>,
    /// Labelled rows used for training, before any holdout or balancing
    pub sample_count: usize,
    pub class_distribution: BTreeMap<String, usize>,
    pub model_type: ModelKind,
    pub parameters: serde_json::Value,
    /// Width of the matrix the classifier sees
    pub num_features: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cross_validation: Option<CvScores>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<Evaluation>,
}

/// One decoded prediction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub predicted_class: String,
    /// Probability of the predicted class
    pub confidence: f64,
    pub probabilities: BTreeMap<String, f64>,
}

/// Everything needed to replay training-time preprocessing and predict
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelBundle {
    pub schema: Schema,
    pub pipeline: FeaturePipeline,
    pub selector: FeatureSelector,
    pub codec: LabelCodec,
    pub classifier: Classifier,
    pub metadata: BundleMetadata,
}

impl ModelBundle {
    /// Raw record → pipeline → selector → classifier → decoded class
    pub fn predict_record(&self, record: &Record) -> Result<Prediction> {
        let features = self.pipeline.transform_record(record, &self.schema)?;
        let features = self.selector.transform(&features)?;
        let (labels, proba) = self.classifier.predict_with_proba(&features)?;

        let code = labels[0];
        let row = proba.row(0);
        let predicted_class = self.codec.decode(code)?.to_string();
        let probabilities = self
            .codec
            .classes()
            .iter()
            .cloned()
            .zip(row.iter().copied())
            .collect();

        Ok(Prediction {
            predicted_class,
            confidence: row[code],
            probabilities,
        })
    }

    pub fn class_names(&self) -> &[String] {
        self.codec.classes()
    }

    pub fn selected_features(&self) -> &[String] {
        self.selector.selected_names()
    }

    pub fn model_type(&self) -> ModelKind {
        self.classifier.kind()
    }
}
