//! Model training
//!
//! Three base learners (boosted trees, a random forest and multinomial
//! logistic regression), the closed [`Classifier`] enum over them, evaluation
//! and cross-validation, and the [`TrainEngine`] that turns a raw table into
//! an immutable [`ModelBundle`].

mod bundle;
mod classifier;
mod config;
mod engine;
mod metrics;
pub mod cross_validation;
pub mod decision_tree;
pub mod linear_models;
pub mod models;
pub mod random_forest;
pub mod xgboost;

pub use bundle::{BundleMetadata, ModelBundle, Prediction};
pub use classifier::Classifier;
pub use config::{ModelKind, ModelSpec, TrainingParams};
pub use cross_validation::{cross_val_score, train_test_split, CvScores, StratifiedKFold};
pub use decision_tree::DecisionTree;
pub use engine::{TrainEngine, TrainingOutcome, TrainingPlan};
pub use linear_models::{LogisticConfig, LogisticRegression};
pub use metrics::{ClassMetrics, Evaluation};
pub use models::{Predictor, Trainable};
pub use random_forest::{MaxFeatures, RandomForest, RandomForestConfig};
pub use xgboost::{XGBoostClassifier, XGBoostConfig};
