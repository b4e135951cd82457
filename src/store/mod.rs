//! Local recording store
//!
//! This module owns access to the store the capture application writes into:
//! - RecordingBackend trait for the storage engine
//! - DirectoryBackend (on disk, shared between processes) and MemoryBackend
//! - RecordStore, which opens lazily and orders listings by recency

pub mod backend;
pub mod directory;
pub mod memory;
pub mod schema;

pub use backend::{RecordingBackend, StoreError, StoreResult};
pub use directory::DirectoryBackend;
pub use memory::MemoryBackend;
pub use schema::{Recording, StoreMeta};

use std::sync::Arc;
use tokio::sync::OnceCell;

/// Ordered access to the recordings collection
pub struct RecordStore {
    backend: Arc<dyn RecordingBackend>,
    opened: OnceCell<()>,
}

impl RecordStore {
    /// Create a store over `backend`. Nothing is touched until first use.
    pub fn new(backend: Arc<dyn RecordingBackend>) -> Self {
        Self {
            backend,
            opened: OnceCell::new(),
        }
    }

    /// Open the database, initializing it on first use.
    ///
    /// A failed open is not remembered; the next call tries again.
    pub async fn open(&self) -> StoreResult<()> {
        self.opened
            .get_or_try_init(|| async {
                self.backend.open().await?;
                tracing::info!("Opened {} record store", self.backend.name());
                Ok::<(), StoreError>(())
            })
            .await
            .map(|_| ())
    }

    /// All recordings, most recent first
    pub async fn list_all(&self) -> StoreResult<Vec<Recording>> {
        self.open().await?;
        let mut recordings = self.backend.list().await?;
        // Stable: equal timestamps keep key order
        recordings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        tracing::debug!("Listed {} recordings", recordings.len());
        Ok(recordings)
    }

    /// Delete a recording. Deleting an absent id succeeds with `false`.
    pub async fn delete_by_id(&self, id: &str) -> StoreResult<bool> {
        self.open().await?;
        let removed = self.backend.delete(id).await?;
        if removed {
            tracing::info!("Deleted recording {}", id);
        } else {
            tracing::debug!("Recording {} already absent", id);
        }
        Ok(removed)
    }

    /// Insert or replace a recording by id
    pub async fn put(&self, recording: &Recording) -> StoreResult<()> {
        self.open().await?;
        self.backend.put(recording).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{recording_at, remote_recording};

    #[tokio::test]
    async fn test_list_all_most_recent_first() {
        let backend = MemoryBackend::with_records(vec![
            recording_at("a", 10),
            recording_at("b", 30),
            recording_at("c", 20),
            recording_at("d", 5),
        ]);
        let store = RecordStore::new(Arc::new(backend));

        let ids: Vec<String> = store.list_all().await.unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["b", "c", "a", "d"]);
    }

    #[tokio::test]
    async fn test_equal_timestamps_keep_key_order() {
        let backend = MemoryBackend::with_records(vec![
            recording_at("z", 10),
            recording_at("m", 10),
            recording_at("a", 10),
        ]);
        let store = RecordStore::new(Arc::new(backend));

        let ids: Vec<String> = store.list_all().await.unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["a", "m", "z"]);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let backend = MemoryBackend::with_records(vec![
            remote_recording("a", 1, "https://cdn.example/a.webm"),
            recording_at("b", 2),
        ]);
        let store = RecordStore::new(Arc::new(backend));

        assert!(store.delete_by_id("b").await.unwrap());
        assert!(!store.delete_by_id("b").await.unwrap());

        let ids: Vec<String> = store.list_all().await.unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["a"]);
    }

    #[tokio::test]
    async fn test_open_failure_is_retried() {
        let backend = Arc::new(MemoryBackend::new());
        backend.set_unavailable(true);
        let store = RecordStore::new(backend.clone());

        assert!(matches!(store.list_all().await, Err(StoreError::Unavailable(_))));

        backend.set_unavailable(false);
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_read_and_write_failures() {
        let backend = Arc::new(MemoryBackend::with_records(vec![recording_at("a", 1)]));
        let store = RecordStore::new(backend.clone());

        backend.set_fail_reads(true);
        assert!(matches!(store.list_all().await, Err(StoreError::Read(_))));

        backend.set_fail_writes(true);
        assert!(matches!(store.delete_by_id("a").await, Err(StoreError::Write(_))));
        assert_eq!(backend.len(), 1);
    }

    #[tokio::test]
    async fn test_directory_store_orders_by_recency() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::new(Arc::new(DirectoryBackend::new(dir.path(), "db", "recordings")));

        for (id, secs) in [("first", 1), ("third", 3), ("second", 2)] {
            store.put(&recording_at(id, secs)).await.unwrap();
        }

        let ids: Vec<String> = store.list_all().await.unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["third", "second", "first"]);
    }
}
