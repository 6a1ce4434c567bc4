//! Application state management

use crate::error::Result;
use crate::missions::Variant;
use crate::registry::{ArtifactStore, Identity, ModelRegistry};
use crate::utils::DataLoader;
use chrono::{DateTime, Utc};
use std::path::Path;
use tracing::{info, warn};

use super::ServerConfig;

/// Application state shared across handlers
pub struct AppState {
    pub config: ServerConfig,
    pub registry: ModelRegistry,
    /// Artifact directory of a fixed-schema variant; custom models live in memory only
    pub store: Option<ArtifactStore>,
    pub loader: DataLoader,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let store = if config.variant.is_custom() {
            None
        } else {
            Some(ArtifactStore::new(Path::new(&config.models_dir).join(config.variant.as_str())))
        };

        Self {
            config,
            registry: ModelRegistry::new(),
            store,
            loader: DataLoader::new(),
            started_at: Utc::now(),
        }
    }

    pub fn variant(&self) -> Variant {
        self.config.variant
    }

    /// Install previously saved artifacts, if both are present
    pub fn load_artifacts(&self) -> Result<bool> {
        let Some(store) = &self.store else {
            return Ok(false);
        };
        match store.load()? {
            Some(bundle) => {
                info!(variant = %self.variant(), dir = %store.dir().display(), "Loaded saved model");
                self.registry.set(Identity::Global, bundle);
                Ok(true)
            }
            None => {
                warn!(variant = %self.variant(), "No saved model found, train via /train");
                Ok(false)
            }
        }
    }
}
