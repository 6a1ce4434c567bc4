//! Data preprocessing module
//!
//! Turns raw uploads and single records into dense feature matrices:
//! - Schema detection (target resolution, numeric/categorical partition)
//! - Missing value imputation
//! - Standard scaling
//! - One-hot encoding
//! - ANOVA-based feature selection
//! - Label encoding

mod encoder;
mod imputer;
mod label_codec;
mod pipeline;
mod scaler;
pub mod feature_selection;
pub mod schema;
pub mod table;

pub use encoder::OneHotEncoder;
pub use feature_selection::{FeatureSelector, SelectionConfig};
pub use imputer::{finite_median, ImputeStrategy, Imputer, MISSING_CATEGORY};
pub use label_codec::LabelCodec;
pub use pipeline::FeaturePipeline;
pub use scaler::{Scaler, ScalerParams};
pub use schema::{ColumnType, Schema, SchemaAnalyzer, DEFAULT_TARGET_CANDIDATES};
pub use table::{RawTable, Record};
