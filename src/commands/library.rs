//! Library commands
//!
//! The interface the presentation layer calls: refresh, delete, teardown,
//! plus import and export helpers used by the CLI.

use super::session::PasswordGate;
use crate::config::ViewerConfig;
use crate::library::{Library, Snapshot};
use crate::media::ResolvedReference;
use crate::store::Recording;
use crate::utils::{AppError, ErrorResponse};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Application state for the recording library
pub struct LibraryState {
    pub library: Arc<Library>,
    pub gate: PasswordGate,
}

impl LibraryState {
    pub fn new(library: Library, gate: PasswordGate) -> Self {
        Self {
            library: Arc::new(library),
            gate,
        }
    }

    pub fn from_config(config: &ViewerConfig) -> Self {
        Self::new(
            Library::from_config(config),
            PasswordGate::new(config.password.clone()),
        )
    }
}

/// Result of exporting a recording's media
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ExportOutcome {
    /// Local media written to disk
    Written { path: PathBuf, bytes: usize, media_type: String },
    /// Recording is hosted remotely
    Remote { url: String },
}

/// Load every recording ready for playback
pub async fn request_refresh(state: &LibraryState) -> Result<Snapshot, ErrorResponse> {
    state.gate.ensure_unlocked()?;
    state.library.refresh().await.map_err(|e| {
        tracing::error!("Failed to load recordings: {}", e);
        ErrorResponse::from(e)
    })
}

/// Delete a recording; returns whether it existed
pub async fn request_delete(state: &LibraryState, id: &str) -> Result<bool, ErrorResponse> {
    state.gate.ensure_unlocked()?;
    state.library.delete(id).await.map_err(|e| {
        tracing::error!("Failed to delete recording {}: {}", id, e);
        ErrorResponse::from(e)
    })
}

/// Release every held handle
pub async fn teardown(state: &LibraryState) -> usize {
    state.library.teardown()
}

/// Upsert recordings into the store; returns how many were written
pub async fn import_recordings(
    state: &LibraryState,
    recordings: Vec<Recording>,
) -> Result<usize, ErrorResponse> {
    state.gate.ensure_unlocked()?;
    for recording in &recordings {
        state.library.store().put(recording).await?;
    }
    tracing::info!("Imported {} recordings", recordings.len());
    Ok(recordings.len())
}

/// Write a recording's playable media to `output`
pub async fn export_recording(
    state: &LibraryState,
    id: &str,
    output: &Path,
) -> Result<ExportOutcome, ErrorResponse> {
    let snapshot = request_refresh(state).await?;

    match snapshot.reference(id) {
        None => Err(AppError::NotFound(id.to_string()).into()),
        Some(ResolvedReference::Unavailable) => Err(AppError::Unplayable(id.to_string()).into()),
        Some(ResolvedReference::Remote { url }) => Ok(ExportOutcome::Remote { url: url.clone() }),
        Some(ResolvedReference::Local(_)) => {
            let media = state
                .library
                .media(id)
                .ok_or_else(|| AppError::Unplayable(id.to_string()))?;
            tokio::fs::write(output, &media.bytes)
                .await
                .map_err(AppError::from)?;
            tracing::info!("Exported {} ({} bytes) to {:?}", id, media.bytes.len(), output);
            Ok(ExportOutcome::Written {
                path: output.to_path_buf(),
                bytes: media.bytes.len(),
                media_type: media.media_type.clone(),
            })
        }
    }
}
