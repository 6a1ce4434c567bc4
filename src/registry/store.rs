//! On-disk artifacts for a fixed-schema variant's global model
//!
//! Each file is written to a temp name in the store directory, synced, then
//! renamed into place. Saves and loads on one store (and its clones) are
//! serialized, and both files carry the bundle's `created_at` so a load
//! never pairs a classifier with another bundle's preprocessing.

use crate::error::{ClassifierError, Result};
use crate::preprocessing::{FeaturePipeline, FeatureSelector, LabelCodec, Schema};
use crate::training::{BundleMetadata, Classifier, ModelBundle, Predictor};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// The serialized classifier
pub const MODEL_FILE: &str = "model.json";
/// Schema, pipeline, selector, codec and metadata
pub const PREPROCESSOR_FILE: &str = "preprocessor.json";

#[derive(Serialize)]
struct PreprocessorRef<'a> {
    schema: &'a Schema,
    pipeline: &'a FeaturePipeline,
    selector: &'a FeatureSelector,
    codec: &'a LabelCodec,
    metadata: &'a BundleMetadata,
}

#[derive(Deserialize)]
struct Preprocessor {
    schema: Schema,
    pipeline: FeaturePipeline,
    selector: FeatureSelector,
    codec: LabelCodec,
    metadata: BundleMetadata,
}

#[derive(Serialize)]
struct ModelRef<'a> {
    created_at: &'a DateTime<Utc>,
    classifier: &'a Classifier,
}

#[derive(Deserialize)]
struct ModelFile {
    created_at: DateTime<Utc>,
    classifier: Classifier,
}

/// A directory holding one bundle as two JSON files
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl ArtifactStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn model_path(&self) -> PathBuf {
        self.dir.join(MODEL_FILE)
    }

    pub fn preprocessor_path(&self) -> PathBuf {
        self.dir.join(PREPROCESSOR_FILE)
    }

    /// Both artifacts are present
    pub fn exists(&self) -> bool {
        self.model_path().is_file() && self.preprocessor_path().is_file()
    }

    pub fn save(&self, bundle: &ModelBundle) -> Result<()> {
        check_consistent(bundle)?;

        let _guard = self.lock.lock();
        fs::create_dir_all(&self.dir)?;

        let preprocessor = PreprocessorRef {
            schema: &bundle.schema,
            pipeline: &bundle.pipeline,
            selector: &bundle.selector,
            codec: &bundle.codec,
            metadata: &bundle.metadata,
        };
        let model = ModelRef {
            created_at: &bundle.metadata.created_at,
            classifier: &bundle.classifier,
        };
        write_json(&self.dir, &self.preprocessor_path(), &preprocessor)?;
        write_json(&self.dir, &self.model_path(), &model)?;

        info!(dir = %self.dir.display(), "Model artifacts saved");
        Ok(())
    }

    /// Load the bundle, or `None` unless both artifacts exist
    pub fn load(&self) -> Result<Option<ModelBundle>> {
        let _guard = self.lock.lock();
        if !self.exists() {
            return Ok(None);
        }

        let model: ModelFile = read_json(&self.model_path())?;
        let preprocessor: Preprocessor = read_json(&self.preprocessor_path())?;

        if model.created_at != preprocessor.metadata.created_at {
            warn!(
                dir = %self.dir.display(),
                model = %model.created_at,
                preprocessor = %preprocessor.metadata.created_at,
                "Artifacts come from different training runs"
            );
            return Err(mismatched(format!(
                "model.json is from {} but preprocessor.json is from {}",
                model.created_at, preprocessor.metadata.created_at
            )));
        }

        let bundle = ModelBundle {
            schema: preprocessor.schema,
            pipeline: preprocessor.pipeline,
            selector: preprocessor.selector,
            codec: preprocessor.codec,
            classifier: model.classifier,
            metadata: preprocessor.metadata,
        };
        check_consistent(&bundle)?;

        info!(dir = %self.dir.display(), "Model artifacts loaded");
        Ok(Some(bundle))
    }
}

/// The classifier agrees with the codec's classes and the selector's width
fn check_consistent(bundle: &ModelBundle) -> Result<()> {
    let classifier = &bundle.classifier;
    if !classifier.is_fitted() {
        return Err(mismatched("classifier is not fitted".to_string()));
    }
    if bundle.codec.n_classes() != classifier.n_classes() {
        return Err(mismatched(format!(
            "label codec has {} classes, classifier has {}",
            bundle.codec.n_classes(),
            classifier.n_classes()
        )));
    }

    let selected = bundle.selector.selected_indices().map_or(0, <[usize]>::len);
    if selected != classifier.n_features_in() {
        return Err(mismatched(format!(
            "selector keeps {} features, classifier expects {}",
            selected,
            classifier.n_features_in()
        )));
    }
    if bundle.selector.n_features_in() != Some(bundle.pipeline.n_features_out()) {
        return Err(mismatched(format!(
            "pipeline emits {} features, selector was fitted on {:?}",
            bundle.pipeline.n_features_out(),
            bundle.selector.n_features_in()
        )));
    }
    Ok(())
}

fn mismatched(reason: String) -> ClassifierError {
    ClassifierError::SerializationError(format!("artifacts do not belong together: {}", reason))
}

/// Write to a temp file next to `path`, sync it, then rename over `path`
fn write_json<T: Serialize + ?Sized>(dir: &Path, path: &Path, value: &T) -> Result<()> {
    let prefix = format!(
        ".{}.",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("artifact")
    );
    let mut tmp = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(".tmp")
        .tempfile_in(dir)?;

    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        serialize_into(&mut writer, value, path)?;
        writer.get_ref().sync_all()?;
    }

    // An unpersisted temp file is removed on drop
    tmp.persist(path).map_err(|e| ClassifierError::IoError(e.error))?;
    Ok(())
}

fn serialize_into<W: Write, T: Serialize + ?Sized>(
    writer: &mut BufWriter<W>,
    value: &T,
    path: &Path,
) -> Result<()> {
    serde_json::to_writer(&mut *writer, value).map_err(|e| {
        ClassifierError::SerializationError(format!("Failed to write {}: {}", path.display(), e))
    })?;
    writer.flush()?;
    Ok(())
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let file = File::open(path)?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| {
        ClassifierError::SerializationError(format!("Failed to read {}: {}", path.display(), e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::tests::tiny_bundle;
    use crate::training::{ModelKind, ModelSpec, TrainEngine, TrainingPlan};
    use polars::prelude::*;
    use serde_json::json;
    use std::io;
    use std::thread;

    fn two_bundles() -> (ModelBundle, ModelBundle) {
        let a = tiny_bundle(["a", "b"]);
        let mut b = tiny_bundle(["c", "d"]);
        b.metadata.created_at = a.metadata.created_at + chrono::Duration::seconds(1);
        (a, b)
    }

    fn three_class_bundle() -> ModelBundle {
        let df = df!(
            "x" => [0.0, 0.1, 5.0, 5.1, 9.0, 9.1],
            "label" => ["p", "p", "q", "q", "r", "r"]
        )
        .unwrap();
        let plan = TrainingPlan {
            cv_folds: None,
            ..TrainingPlan::custom(ModelKind::Linear)
        }
        .with_model(ModelSpec::custom(ModelKind::Linear));
        TrainEngine::new(plan).train(&df).unwrap().bundle
    }

    fn assert_matches_one_of(loaded: &ModelBundle, a: &ModelBundle, b: &ModelBundle) {
        let source = if loaded.metadata.created_at == a.metadata.created_at { a } else { b };
        assert_eq!(loaded.metadata.created_at, source.metadata.created_at);
        assert_eq!(loaded.class_names(), source.class_names());

        let record = json!({ "x": 5.1 }).as_object().unwrap().clone();
        let prediction = loaded.predict_record(&record).unwrap();
        assert_eq!(prediction.predicted_class, source.class_names()[1]);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("koi"));
        assert!(store.load().unwrap().is_none());

        let bundle = tiny_bundle(["CANDIDATE", "CONFIRMED"]);
        store.save(&bundle).unwrap();
        assert!(store.exists());

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.class_names(), bundle.class_names());
        assert_eq!(loaded.schema, bundle.schema);

        let record = json!({ "x": 5.1 }).as_object().unwrap().clone();
        let before = bundle.predict_record(&record).unwrap();
        let after = loaded.predict_record(&record).unwrap();
        assert_eq!(after.predicted_class, before.predicted_class);
        assert!((after.confidence - before.confidence).abs() < 1e-9);
    }

    #[test]
    fn test_half_written_store_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        fs::write(store.model_path(), "{}").unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_save_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        store.save(&tiny_bundle(["a", "b"])).unwrap();
        store.save(&tiny_bundle(["c", "d"])).unwrap();

        let mut names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec![MODEL_FILE, PREPROCESSOR_FILE]);
    }

    struct BrokenDisk;

    impl Write for BrokenDisk {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "no space left on device"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_buffered_write_failure_is_reported() {
        // Small enough to sit in the buffer until flush
        let mut writer = BufWriter::new(BrokenDisk);
        let result = serialize_into(&mut writer, &json!({ "k": 1 }), Path::new("model.json"));
        assert!(matches!(result, Err(ClassifierError::IoError(_))));
    }

    #[test]
    fn test_concurrent_saves_leave_one_whole_bundle() {
        let bundles = two_bundles();
        let (a, b) = (&bundles.0, &bundles.1);
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());

        for _ in 0..10 {
            thread::scope(|s| {
                for bundle in [a, b] {
                    let store = store.clone();
                    s.spawn(move || store.save(bundle).unwrap());
                }
                let reader = store.clone();
                s.spawn(move || {
                    for _ in 0..5 {
                        if let Some(loaded) = reader.load().unwrap() {
                            assert_matches_one_of(&loaded, a, b);
                        }
                    }
                });
            });

            let loaded = store.load().unwrap().unwrap();
            assert_matches_one_of(&loaded, a, b);
        }
    }

    #[test]
    fn test_files_from_different_runs_are_rejected() {
        let (a, b) = two_bundles();
        let dir = tempfile::tempdir().unwrap();
        let first = ArtifactStore::new(dir.path().join("first"));
        let second = ArtifactStore::new(dir.path().join("second"));
        first.save(&a).unwrap();
        second.save(&b).unwrap();

        fs::copy(second.model_path(), first.model_path()).unwrap();
        let err = first.load().unwrap_err();
        assert!(err.to_string().contains("do not belong together"));
    }

    #[test]
    fn test_class_count_mismatch_is_rejected() {
        let bundle = tiny_bundle(["a", "b"]);
        let other = three_class_bundle();

        let mut mixed = bundle.clone();
        mixed.classifier = other.classifier.clone();
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        assert!(store.save(&mixed).is_err());
        assert!(!store.exists());

        // Out-of-band model file carrying the right timestamp
        store.save(&bundle).unwrap();
        let model = ModelRef {
            created_at: &bundle.metadata.created_at,
            classifier: &other.classifier,
        };
        write_json(dir.path(), &store.model_path(), &model).unwrap();

        let err = store.load().unwrap_err();
        assert!(err.to_string().contains("classes"));
    }

    #[test]
    fn test_width_mismatch_is_rejected() {
        let mut bundle = tiny_bundle(["a", "b"]);
        assert!(check_consistent(&bundle).is_ok());

        let df = df!(
            "x" => [0.0, 0.1, 0.2, 5.0, 5.1, 5.2],
            "y" => [1.0, 1.5, 1.2, 7.0, 7.5, 7.2],
            "label" => ["a", "a", "a", "b", "b", "b"]
        )
        .unwrap();
        let plan = TrainingPlan {
            cv_folds: None,
            ..TrainingPlan::custom(ModelKind::Linear)
        }
        .with_model(ModelSpec::custom(ModelKind::Linear));
        let wider = TrainEngine::new(plan).train(&df).unwrap().bundle;

        bundle.classifier = wider.classifier;
        let err = check_consistent(&bundle).unwrap_err();
        assert!(err.to_string().contains("selector keeps 1 features, classifier expects 2"));
    }
}
