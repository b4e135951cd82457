//! In-process record store
//!
//! Holds records in key order and can be switched into failure modes to
//! exercise the error paths of everything built on top of a store.

use super::backend::{RecordingBackend, StoreError, StoreResult};
use super::schema::Recording;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// Record store kept in memory
#[derive(Debug, Default)]
pub struct MemoryBackend {
    records: RwLock<BTreeMap<String, Recording>>,
    unavailable: AtomicBool,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend pre-populated with `recordings`
    pub fn with_records(recordings: impl IntoIterator<Item = Recording>) -> Self {
        let backend = Self::new();
        {
            let mut records = backend.records.write();
            for recording in recordings {
                records.insert(recording.id.clone(), recording);
            }
        }
        backend
    }

    /// Make `open` fail as if storage were disabled
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make `list` fail
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make `delete` and `put` fail
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl RecordingBackend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    async fn open(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("storage is disabled".to_string()));
        }
        Ok(())
    }

    async fn list(&self) -> StoreResult<Vec<Recording>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Read("transaction aborted".to_string()));
        }
        Ok(self.records.read().values().cloned().collect())
    }

    async fn delete(&self, id: &str) -> StoreResult<bool> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Write("transaction aborted".to_string()));
        }
        Ok(self.records.write().remove(id).is_some())
    }

    async fn put(&self, recording: &Recording) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Write("transaction aborted".to_string()));
        }
        self.records
            .write()
            .insert(recording.id.clone(), recording.clone());
        Ok(())
    }
}
