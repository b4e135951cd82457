//! Viewer configuration
//!
//! Loaded from an optional JSON file; every field has a default so an empty
//! object (or no file at all) is a valid configuration.

use crate::utils::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding the default store directory
pub const STORE_DIR_ENV: &str = "SCREENSTUDIO_VIEWER_DIR";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewerConfig {
    /// Directory holding the shared store
    pub store_dir: PathBuf,

    /// Database name inside `store_dir`
    pub database: String,

    /// Collection holding the recordings
    pub collection: String,

    /// Media type assumed for bare base64 payloads
    pub default_media_type: String,

    /// Origin component of minted handle URLs
    pub handle_origin: String,

    /// Upper bound on simultaneously live local handles
    pub max_live_handles: Option<usize>,

    /// Password unlocking the library; `None` leaves it open
    pub password: Option<String>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            store_dir: default_store_dir(),
            database: "screenstudio".to_string(),
            collection: "recordings".to_string(),
            default_media_type: "video/webm".to_string(),
            handle_origin: "screenstudio".to_string(),
            max_live_handles: None,
            password: None,
        }
    }
}

impl ViewerConfig {
    /// Read a configuration file
    pub fn load(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ViewerConfig = serde_json::from_str(&content)?;
        config.validate()?;
        tracing::debug!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.database.trim().is_empty() {
            return Err(AppError::Config("database must not be empty".to_string()));
        }
        if self.collection.trim().is_empty() {
            return Err(AppError::Config("collection must not be empty".to_string()));
        }
        if !self.default_media_type.contains('/') {
            return Err(AppError::Config(format!(
                "invalid default media type '{}'",
                self.default_media_type
            )));
        }
        if self.max_live_handles == Some(0) {
            return Err(AppError::Config("maxLiveHandles must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Store directory from the environment, or `./recording-store`
pub fn default_store_dir() -> PathBuf {
    std::env::var_os(STORE_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("recording-store"))
}
