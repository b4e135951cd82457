//! Local handle registry
//!
//! Mints short-lived `blob:` URLs for decoded media and keeps the bytes
//! reachable until the URL is revoked. Nothing here is released implicitly.

use super::payload::{DecodeError, DecodedMedia};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// A minted, revocable reference to in-memory media
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalHandle {
    /// Dereferenceable URL, e.g. `blob:screenstudio/6f1c...`
    pub url: String,

    /// Media type of the stored bytes
    pub media_type: String,

    /// Stored size in bytes
    pub size: usize,
}

/// Media kept alive by a live handle
#[derive(Debug)]
pub struct StoredMedia {
    pub media_type: String,
    pub bytes: Vec<u8>,
}

/// Counters over the registry's lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryStats {
    pub minted: u64,
    pub revoked: u64,
    pub outstanding: usize,
}

#[derive(Default)]
struct RegistryInner {
    live: HashMap<String, Arc<StoredMedia>>,
    minted: u64,
    revoked: u64,
}

/// Registry of live local handles
pub struct BlobRegistry {
    origin: String,
    max_live: Option<usize>,
    inner: Mutex<RegistryInner>,
}

impl BlobRegistry {
    /// Create a registry minting URLs under `origin`
    pub fn new(origin: impl Into<String>, max_live: Option<usize>) -> Self {
        Self {
            origin: origin.into(),
            max_live,
            inner: Mutex::new(RegistryInner::default()),
        }
    }

    /// Register decoded media and mint a URL for it
    pub fn mint(&self, media: DecodedMedia) -> Result<LocalHandle, DecodeError> {
        let mut inner = self.inner.lock();
        if let Some(max) = self.max_live {
            if inner.live.len() >= max {
                return Err(DecodeError::RegistryFull(max));
            }
        }

        let url = format!("blob:{}/{}", self.origin, Uuid::new_v4());
        let handle = LocalHandle {
            url: url.clone(),
            media_type: media.media_type.clone(),
            size: media.bytes.len(),
        };
        inner.live.insert(
            url,
            Arc::new(StoredMedia {
                media_type: media.media_type,
                bytes: media.bytes,
            }),
        );
        inner.minted += 1;

        Ok(handle)
    }

    /// Dereference a live URL
    pub fn get(&self, url: &str) -> Option<Arc<StoredMedia>> {
        self.inner.lock().live.get(url).cloned()
    }

    pub fn is_live(&self, url: &str) -> bool {
        self.inner.lock().live.contains_key(url)
    }

    /// Revoke a URL. Returns `false` if it was not live.
    pub(crate) fn revoke(&self, url: &str) -> bool {
        let mut inner = self.inner.lock();
        if inner.live.remove(url).is_some() {
            inner.revoked += 1;
            true
        } else {
            false
        }
    }

    /// Number of handles not yet revoked
    pub fn outstanding(&self) -> usize {
        self.inner.lock().live.len()
    }

    pub fn stats(&self) -> RegistryStats {
        let inner = self.inner.lock();
        RegistryStats {
            minted: inner.minted,
            revoked: inner.revoked,
            outstanding: inner.live.len(),
        }
    }
}
