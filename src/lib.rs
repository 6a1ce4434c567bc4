//! Exoplanet disposition classifier
//!
//! Tabular classification of transit-survey candidates into dispositions
//! such as CONFIRMED, CANDIDATE and FALSE POSITIVE.
//!
//! # Modules
//!
//! - [`preprocessing`] - Schema analysis, imputation, scaling, one-hot encoding,
//!   feature selection and label encoding
//! - [`balancing`] - Random oversampling of minority classes
//! - [`training`] - Boosted trees, random forest, logistic regression, the
//!   training engine and evaluation
//! - [`ensemble`] - Soft-voting ensemble over the three base learners
//! - [`registry`] - Live models per tenant or per mission, plus on-disk artifacts
//! - [`missions`] - TOI, KOI, K2 and custom variant profiles and explanations
//! - [`server`] - HTTP service
//! - [`cli`] - Command-line interface
//! - [`utils`] - CSV and Excel loading

pub mod error;

pub mod preprocessing;
pub mod balancing;
pub mod training;
pub mod ensemble;

pub mod registry;
pub mod missions;

pub mod server;
pub mod cli;
pub mod utils;

pub use error::{ClassifierError, Result};

/// Common imports
pub mod prelude {
    pub use crate::error::{ClassifierError, Result};
    pub use crate::missions::Variant;
    pub use crate::preprocessing::{FeaturePipeline, LabelCodec, Schema, SchemaAnalyzer};
    pub use crate::registry::{Identity, ModelRegistry};
    pub use crate::training::{
        ModelBundle, ModelKind, ModelSpec, Prediction, TrainEngine, TrainingParams, TrainingPlan,
    };
    pub use crate::utils::DataLoader;
}
