//! Live model registry
//!
//! Binds at most one trained [`ModelBundle`] to each [`Identity`]. Bundles are
//! immutable and handed out as `Arc`s, so a reader holds either the old
//! bundle or the new one in full while a retrain swaps the slot.

mod store;

pub use store::{ArtifactStore, MODEL_FILE, PREPROCESSOR_FILE};

use crate::training::{BundleMetadata, ModelBundle, ModelKind};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Who a model belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identity {
    /// Per-user slot of the schema-agnostic variant
    Tenant(String),
    /// Process-wide slot of a fixed-schema variant
    Global,
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Tenant(id) => write!(f, "tenant:{}", id),
            Identity::Global => f.write_str("global"),
        }
    }
}

/// Read-only summary of a live bundle
#[derive(Debug, Clone, Serialize)]
pub struct BundleInfo {
    pub model_type: ModelKind,
    pub target_column: String,
    pub feature_columns: Vec<String>,
    pub numeric_features: Vec<String>,
    pub categorical_features: Vec<String>,
    pub selected_features: Vec<String>,
    pub class_names: Vec<String>,
    pub metadata: BundleMetadata,
}

impl From<&ModelBundle> for BundleInfo {
    fn from(bundle: &ModelBundle) -> Self {
        Self {
            model_type: bundle.model_type(),
            target_column: bundle.schema.target_column.clone(),
            feature_columns: bundle.schema.feature_columns.clone(),
            numeric_features: bundle.schema.numeric_features.clone(),
            categorical_features: bundle.schema.categorical_features.clone(),
            selected_features: bundle.selected_features().to_vec(),
            class_names: bundle.class_names().to_vec(),
            metadata: bundle.metadata.clone(),
        }
    }
}

/// Identity → bundle map behind a single lock
#[derive(Debug, Default)]
pub struct ModelRegistry {
    models: RwLock<HashMap<Identity, Arc<ModelBundle>>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a bundle, replacing any previous one for the identity
    pub fn set(&self, identity: Identity, bundle: ModelBundle) -> Arc<ModelBundle> {
        let bundle = Arc::new(bundle);
        let replaced = self.models.write().insert(identity.clone(), Arc::clone(&bundle));
        info!(identity = %identity, replaced = replaced.is_some(), "Model installed");
        bundle
    }

    pub fn get(&self, identity: &Identity) -> Option<Arc<ModelBundle>> {
        self.models.read().get(identity).cloned()
    }

    /// Drop the identity's bundle. Returns whether one existed.
    pub fn delete(&self, identity: &Identity) -> bool {
        let removed = self.models.write().remove(identity).is_some();
        if removed {
            info!(identity = %identity, "Model deleted");
        }
        removed
    }

    pub fn info(&self, identity: &Identity) -> Option<BundleInfo> {
        self.get(identity).map(|bundle| BundleInfo::from(bundle.as_ref()))
    }

    /// Number of identities with a live model
    pub fn len(&self) -> usize {
        self.models.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::{ModelSpec, TrainEngine, TrainingPlan};
    use polars::prelude::*;

    pub(crate) fn tiny_bundle(classes: [&str; 2]) -> ModelBundle {
        let df = df!(
            "x" => [0.0, 0.1, 0.2, 5.0, 5.1, 5.2],
            "label" => [classes[0], classes[0], classes[0], classes[1], classes[1], classes[1]]
        )
        .unwrap();
        let plan = TrainingPlan {
            cv_folds: None,
            ..TrainingPlan::custom(ModelKind::Linear)
        }
        .with_model(ModelSpec::custom(ModelKind::Linear));
        TrainEngine::new(plan).train(&df).unwrap().bundle
    }

    #[test]
    fn test_set_get_delete() {
        let registry = ModelRegistry::new();
        let alice = Identity::Tenant("alice".to_string());
        assert!(registry.get(&alice).is_none());

        registry.set(alice.clone(), tiny_bundle(["a", "b"]));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.info(&alice).unwrap().class_names, vec!["a", "b"]);

        assert!(registry.delete(&alice));
        assert!(!registry.delete(&alice));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_replace_is_wholesale() {
        let registry = ModelRegistry::new();
        let old = registry.set(Identity::Global, tiny_bundle(["a", "b"]));
        registry.set(Identity::Global, tiny_bundle(["x", "y"]));

        // A reader holding the old Arc still sees the old bundle in full
        assert_eq!(old.class_names(), &["a", "b"]);
        let current = registry.get(&Identity::Global).unwrap();
        assert_eq!(current.class_names(), &["x", "y"]);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_readers_see_whole_bundles_during_swaps() {
        let registry = ModelRegistry::new();
        let first = tiny_bundle(["a", "b"]);
        let second = tiny_bundle(["c", "d"]);
        registry.set(Identity::Global, first.clone());

        let record = serde_json::json!({ "x": 5.1 }).as_object().unwrap().clone();
        let registry = &registry;
        let record = &record;

        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(move || {
                    for _ in 0..200 {
                        let bundle = registry.get(&Identity::Global).unwrap();
                        let classes = bundle.class_names().to_vec();
                        assert!(classes == ["a", "b"] || classes == ["c", "d"]);

                        let prediction = bundle.predict_record(record).unwrap();
                        assert_eq!(prediction.predicted_class, classes[1]);
                        assert_eq!(prediction.probabilities.len(), 2);
                        assert!(classes.iter().all(|c| prediction.probabilities.contains_key(c)));
                    }
                });
            }

            s.spawn(move || {
                for i in 0..100 {
                    let next = if i % 2 == 0 { second.clone() } else { first.clone() };
                    registry.set(Identity::Global, next);
                }
            });
        });

        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_tenants_are_isolated() {
        let registry = ModelRegistry::new();
        registry.set(Identity::Tenant("a".to_string()), tiny_bundle(["a", "b"]));
        registry.set(Identity::Tenant("b".to_string()), tiny_bundle(["x", "y"]));
        assert_eq!(registry.len(), 2);
        assert!(registry.get(&Identity::Global).is_none());
    }
}
