//! Media resolution
//!
//! Turns a batch of recordings into playable references. Every record is
//! resolved independently; a bad payload only affects its own entry.

use super::payload::{decode_payload, DecodeError};
use super::registry::{BlobRegistry, LocalHandle};
use crate::store::Recording;
use futures::future::join_all;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Playable reference for one recording
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ResolvedReference {
    /// Remote URL used as stored; nothing to release
    Remote { url: String },
    /// Locally materialized media; must be released
    Local(LocalHandle),
    /// No playable media
    Unavailable,
}

impl ResolvedReference {
    /// URL a player can load, if any
    pub fn url(&self) -> Option<&str> {
        match self {
            ResolvedReference::Remote { url } => Some(url),
            ResolvedReference::Local(handle) => Some(&handle.url),
            ResolvedReference::Unavailable => None,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, ResolvedReference::Local(_))
    }
}

/// Recording id to playable reference
pub type ReferenceMap = HashMap<String, ResolvedReference>;

/// Resolves recordings and owns the handles it mints
pub struct MediaResolver {
    registry: Arc<BlobRegistry>,
    default_media_type: String,
}

impl MediaResolver {
    pub fn new(registry: Arc<BlobRegistry>, default_media_type: impl Into<String>) -> Self {
        Self {
            registry,
            default_media_type: default_media_type.into(),
        }
    }

    /// Registry backing the local handles
    pub fn registry(&self) -> &Arc<BlobRegistry> {
        &self.registry
    }

    /// Resolve every recording concurrently.
    ///
    /// Always returns one entry per distinct id. A repeated id keeps its
    /// first occurrence; later ones are not resolved.
    pub async fn resolve_all(&self, recordings: &[Recording]) -> ReferenceMap {
        let mut seen = HashSet::new();
        let unique: Vec<&Recording> = recordings
            .iter()
            .filter(|recording| seen.insert(recording.id.as_str()))
            .collect();
        if unique.len() < recordings.len() {
            tracing::warn!("Ignoring {} duplicate recording ids", recordings.len() - unique.len());
        }

        let resolutions = unique.into_iter().map(|recording| async move {
            (recording.id.clone(), self.resolve(recording).await)
        });
        let references: ReferenceMap = join_all(resolutions).await.into_iter().collect();

        let local = references.values().filter(|r| r.is_local()).count();
        let unavailable = references
            .values()
            .filter(|r| matches!(r, ResolvedReference::Unavailable))
            .count();
        tracing::debug!(
            "Resolved {} recordings: {} local, {} unavailable",
            references.len(),
            local,
            unavailable
        );

        references
    }

    /// Resolve a single recording
    pub async fn resolve(&self, recording: &Recording) -> ResolvedReference {
        if let Some(url) = recording.remote_url() {
            return ResolvedReference::Remote { url: url.to_string() };
        }

        let Some(payload) = recording.embedded_payload.clone() else {
            tracing::debug!("Recording {} has no playable media", recording.id);
            return ResolvedReference::Unavailable;
        };

        match self.materialize(payload).await {
            Ok(handle) => {
                tracing::debug!(
                    "Materialized {} ({} bytes, {}) as {}",
                    recording.id,
                    handle.size,
                    handle.media_type,
                    handle.url
                );
                ResolvedReference::Local(handle)
            }
            Err(e) => {
                tracing::warn!("Recording {} is unavailable: {}", recording.id, e);
                ResolvedReference::Unavailable
            }
        }
    }

    async fn materialize(&self, payload: String) -> Result<LocalHandle, DecodeError> {
        let default_media_type = self.default_media_type.clone();
        let media = tokio::task::spawn_blocking(move || decode_payload(&payload, &default_media_type))
            .await
            .map_err(|e| DecodeError::TaskFailed(e.to_string()))??;
        self.registry.mint(media)
    }

    /// Revoke one reference. Returns `true` if a live handle was revoked.
    pub fn release(&self, reference: &ResolvedReference) -> bool {
        match reference {
            ResolvedReference::Local(handle) => self.registry.revoke(&handle.url),
            _ => false,
        }
    }

    /// Revoke every local handle in `references`; returns how many were live
    pub fn release_all(&self, references: &ReferenceMap) -> usize {
        let revoked = references
            .values()
            .filter(|reference| self.release(reference))
            .count();
        if revoked > 0 {
            tracing::debug!("Revoked {} local handles", revoked);
        }
        revoked
    }
}
