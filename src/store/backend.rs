//! Storage backend trait
//!
//! Each call is one self-contained transaction; backends never hold state
//! between calls that another process could observe half-applied.

use super::schema::Recording;
use async_trait::async_trait;
use thiserror::Error;

/// Record store errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store read failed: {0}")]
    Read(String),

    #[error("Store write failed: {0}")]
    Write(String),
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Backend for the recordings collection
#[async_trait]
pub trait RecordingBackend: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Open the database, creating the collection on first use.
    ///
    /// Must be safe to call more than once.
    async fn open(&self) -> StoreResult<()>;

    /// Every record, in key order.
    async fn list(&self) -> StoreResult<Vec<Recording>>;

    /// Remove a record. Returns `false` if no record had that key.
    async fn delete(&self, id: &str) -> StoreResult<bool>;

    /// Insert or replace a record by key.
    async fn put(&self, recording: &Recording) -> StoreResult<()>;
}
