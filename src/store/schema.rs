//! Record store schema definitions
//!
//! These types match the records the capture application writes into the
//! shared store, plus the marker file describing the store layout.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current on-disk store format
pub const STORE_FORMAT: &str = "recording-store-v1";

/// Primary key of the recordings collection
pub const KEY_PATH: &str = "id";

// =============================================================================
// Recording
// =============================================================================

/// A recording persisted by the capture application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recording {
    /// Unique key within the collection
    pub id: String,

    /// When the capture application stored the recording
    pub created_at: DateTime<Utc>,

    /// Duration in seconds
    #[serde(default)]
    pub duration: u64,

    /// Size of the media in bytes
    #[serde(default)]
    pub size: u64,

    /// Free-form label of the capturing platform
    #[serde(default)]
    pub platform: String,

    /// Remote reference playable without local decoding
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,

    /// Base64 media (or a `data:` URL) stored inline
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedded_payload: Option<String>,
}

impl Recording {
    /// Remote URL if present and non-empty
    pub fn remote_url(&self) -> Option<&str> {
        self.public_url.as_deref().filter(|url| !url.trim().is_empty())
    }
}

// =============================================================================
// Store Meta
// =============================================================================

/// Marker written when a store is first initialized
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreMeta {
    pub format: String,
    pub collection: String,
    pub key_path: String,
    pub created_at: DateTime<Utc>,
}

impl StoreMeta {
    pub fn new(collection: &str) -> Self {
        Self {
            format: STORE_FORMAT.to_string(),
            collection: collection.to_string(),
            key_path: KEY_PATH.to_string(),
            created_at: Utc::now(),
        }
    }
}
