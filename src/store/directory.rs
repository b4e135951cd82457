//! On-disk record store
//!
//! A store is a directory containing:
//! - meta.json: format marker and key path
//! - <collection>/: one JSON file per recording, named by its encoded id
//!
//! Records are written to a temp file inside the collection and renamed into
//! place, so a concurrent reader sees either the old or the new record. Temp
//! files orphaned by an interrupted write are removed on open once they are
//! old enough that no writer can still own them.

use super::backend::{RecordingBackend, StoreError, StoreResult};
use super::schema::{Recording, StoreMeta, KEY_PATH, STORE_FORMAT};
use async_trait::async_trait;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

const META_FILE: &str = "meta.json";
const RECORD_EXTENSION: &str = "json";
const TEMP_PREFIX: &str = ".tmp";
const STALE_TEMP_AGE: Duration = Duration::from_secs(10 * 60);

/// Record store backed by a directory shared between processes
#[derive(Debug, Clone)]
pub struct DirectoryBackend {
    root: PathBuf,
    collection: String,
}

impl DirectoryBackend {
    /// Create a backend for `<store_dir>/<database>/<collection>`
    pub fn new(store_dir: impl AsRef<Path>, database: &str, collection: &str) -> Self {
        Self {
            root: store_dir.as_ref().join(database),
            collection: collection.to_string(),
        }
    }

    /// Database directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn collection_dir(&self) -> PathBuf {
        self.root.join(&self.collection)
    }

    fn record_path(&self, id: &str) -> PathBuf {
        let file_name = format!("{}.{}", urlencoding::encode(id), RECORD_EXTENSION);
        self.collection_dir().join(file_name)
    }

    async fn check_meta(&self, meta_path: &Path) -> StoreResult<()> {
        let content = tokio::fs::read_to_string(meta_path)
            .await
            .map_err(|e| StoreError::Unavailable(format!("failed to read {}: {}", META_FILE, e)))?;
        let meta: StoreMeta = serde_json::from_str(&content)
            .map_err(|e| StoreError::Unavailable(format!("invalid {}: {}", META_FILE, e)))?;

        if meta.collection != self.collection {
            return Err(StoreError::Unavailable(format!(
                "store holds collection '{}', expected '{}'",
                meta.collection, self.collection
            )));
        }
        if meta.key_path != KEY_PATH {
            return Err(StoreError::Unavailable(format!(
                "collection keyed by '{}', expected '{}'",
                meta.key_path, KEY_PATH
            )));
        }
        if meta.format != STORE_FORMAT {
            tracing::warn!("Store format '{}' differs from '{}'", meta.format, STORE_FORMAT);
        }
        Ok(())
    }

    async fn remove_stale_temp_files(&self) {
        for dir in [self.root.clone(), self.collection_dir()] {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!("Cannot scan {:?} for temp files: {}", dir, e);
                    continue;
                }
            };

            while let Ok(Some(entry)) = entries.next_entry().await {
                if !entry.file_name().to_string_lossy().starts_with(TEMP_PREFIX) {
                    continue;
                }
                let stale = match entry.metadata().await.and_then(|meta| meta.modified()) {
                    Ok(modified) => modified
                        .elapsed()
                        .map(|age| age >= STALE_TEMP_AGE)
                        .unwrap_or(false),
                    Err(_) => false,
                };
                if !stale {
                    continue;
                }

                let path = entry.path();
                match tokio::fs::remove_file(&path).await {
                    Ok(()) => tracing::info!("Removed stale temp file {:?}", path),
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => tracing::warn!("Failed to remove stale temp file {:?}: {}", path, e),
                }
            }
        }
    }
}

#[async_trait]
impl RecordingBackend for DirectoryBackend {
    fn name(&self) -> &str {
        "directory"
    }

    async fn open(&self) -> StoreResult<()> {
        tokio::fs::create_dir_all(self.collection_dir())
            .await
            .map_err(|e| StoreError::Unavailable(format!("{:?}: {}", self.root, e)))?;

        let meta_path = self.root.join(META_FILE);
        match tokio::fs::try_exists(&meta_path).await {
            Ok(true) => self.check_meta(&meta_path).await?,
            Ok(false) => {
                let meta = StoreMeta::new(&self.collection);
                let content = serde_json::to_vec_pretty(&meta)
                    .map_err(|e| StoreError::Unavailable(e.to_string()))?;
                write_atomic(self.root.clone(), meta_path, content)
                    .await
                    .map_err(|e| StoreError::Unavailable(format!("failed to initialize store: {}", e)))?;
                tracing::info!("Initialized record store at {:?}", self.root);
            }
            Err(e) => return Err(StoreError::Unavailable(format!("{:?}: {}", meta_path, e))),
        }

        self.remove_stale_temp_files().await;
        Ok(())
    }

    async fn list(&self) -> StoreResult<Vec<Recording>> {
        let mut entries = tokio::fs::read_dir(self.collection_dir())
            .await
            .map_err(|e| StoreError::Read(e.to_string()))?;

        let mut paths = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::Read(e.to_string()))?
        {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) == Some(RECORD_EXTENSION) {
                paths.push(path);
            }
        }

        let mut recordings = Vec::with_capacity(paths.len());
        for path in paths {
            let content = match tokio::fs::read_to_string(&path).await {
                Ok(content) => content,
                // Deleted by another process since the directory was read
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(StoreError::Read(format!("{:?}: {}", path, e))),
            };
            let recording: Recording = serde_json::from_str(&content)
                .map_err(|e| StoreError::Read(format!("{:?}: {}", path, e)))?;

            // Only the file named after the id is reachable by delete
            let stem = path.file_stem().and_then(|stem| stem.to_str());
            if stem != Some(urlencoding::encode(&recording.id).as_ref()) {
                tracing::warn!("Skipping {:?}: holds recording '{}'", path, recording.id);
                continue;
            }
            recordings.push(recording);
        }
        recordings.sort_by(|a, b| a.id.cmp(&b.id));

        Ok(recordings)
    }

    async fn delete(&self, id: &str) -> StoreResult<bool> {
        match tokio::fs::remove_file(self.record_path(id)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::Write(e.to_string())),
        }
    }

    async fn put(&self, recording: &Recording) -> StoreResult<()> {
        let content =
            serde_json::to_vec_pretty(recording).map_err(|e| StoreError::Write(e.to_string()))?;
        write_atomic(self.collection_dir(), self.record_path(&recording.id), content)
            .await
            .map_err(|e| StoreError::Write(e.to_string()))
    }
}

/// Write `content` to `target` through a temp file in `dir`
async fn write_atomic(dir: PathBuf, target: PathBuf, content: Vec<u8>) -> std::io::Result<()> {
    tokio::task::spawn_blocking(move || {
        let mut file = tempfile::Builder::new().prefix(TEMP_PREFIX).tempfile_in(&dir)?;
        file.write_all(&content)?;
        file.as_file().sync_all()?;
        file.persist(&target).map_err(|e| e.error)?;
        Ok::<(), std::io::Error>(())
    })
    .await
    .map_err(std::io::Error::other)?
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    fn recording(id: &str) -> Recording {
        Recording {
            id: id.to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
            duration: 12,
            size: 2048,
            platform: "web".to_string(),
            public_url: None,
            embedded_payload: Some("AAAA".to_string()),
        }
    }

    #[tokio::test]
    async fn test_open_creates_layout() {
        let dir = tempdir().unwrap();
        let backend = DirectoryBackend::new(dir.path(), "screenstudio", "recordings");

        backend.open().await.unwrap();
        backend.open().await.unwrap();

        assert!(dir.path().join("screenstudio/meta.json").exists());
        assert!(dir.path().join("screenstudio/recordings").is_dir());
    }

    #[tokio::test]
    async fn test_open_rejects_foreign_key_path() {
        let dir = tempdir().unwrap();
        let backend = DirectoryBackend::new(dir.path(), "db", "recordings");
        std::fs::create_dir_all(backend.root()).unwrap();
        std::fs::write(
            backend.root().join("meta.json"),
            r#"{"format":"recording-store-v1","collection":"recordings","keyPath":"uuid","createdAt":"2024-01-01T00:00:00Z"}"#,
        )
        .unwrap();

        let err = backend.open().await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_put_list_delete() {
        let dir = tempdir().unwrap();
        let backend = DirectoryBackend::new(dir.path(), "db", "recordings");
        backend.open().await.unwrap();

        backend.put(&recording("b")).await.unwrap();
        backend.put(&recording("a/with slash")).await.unwrap();

        let ids: Vec<String> = backend.list().await.unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&"a/with slash".to_string()));

        assert!(backend.delete("a/with slash").await.unwrap());
        assert!(!backend.delete("a/with slash").await.unwrap());
        assert_eq!(backend.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_put_replaces_existing_key() {
        let dir = tempdir().unwrap();
        let backend = DirectoryBackend::new(dir.path(), "db", "recordings");
        backend.open().await.unwrap();

        backend.put(&recording("a")).await.unwrap();
        let mut updated = recording("a");
        updated.duration = 99;
        backend.put(&updated).await.unwrap();

        let all = backend.list().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].duration, 99);
    }

    #[tokio::test]
    async fn test_corrupt_record_fails_whole_list() {
        let dir = tempdir().unwrap();
        let backend = DirectoryBackend::new(dir.path(), "db", "recordings");
        backend.open().await.unwrap();
        backend.put(&recording("good")).await.unwrap();
        std::fs::write(backend.root().join("recordings/bad.json"), "{not json").unwrap();

        let err = backend.list().await.unwrap_err();
        assert!(matches!(err, StoreError::Read(_)));
    }

    #[tokio::test]
    async fn test_ignores_non_record_files() {
        let dir = tempdir().unwrap();
        let backend = DirectoryBackend::new(dir.path(), "db", "recordings");
        backend.open().await.unwrap();
        backend.put(&recording("a")).await.unwrap();
        std::fs::write(backend.root().join("recordings/.tmpXYZ"), "partial").unwrap();

        assert_eq!(backend.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_open_rejects_other_collection() {
        let dir = tempdir().unwrap();
        DirectoryBackend::new(dir.path(), "db", "recordings").open().await.unwrap();

        let other = DirectoryBackend::new(dir.path(), "db", "clips");
        let err = other.open().await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(msg) if msg.contains("clips")));
    }

    #[tokio::test]
    async fn test_open_removes_stale_temp_files() {
        let dir = tempdir().unwrap();
        let backend = DirectoryBackend::new(dir.path(), "db", "recordings");
        backend.open().await.unwrap();

        let stale = backend.root().join("recordings/.tmpOLD");
        let fresh = backend.root().join("recordings/.tmpNEW");
        std::fs::write(&stale, "partial").unwrap();
        std::fs::write(&fresh, "partial").unwrap();
        std::fs::File::options()
            .write(true)
            .open(&stale)
            .unwrap()
            .set_modified(std::time::SystemTime::now() - Duration::from_secs(60 * 60))
            .unwrap();

        backend.open().await.unwrap();
        assert!(!stale.exists());
        assert!(fresh.exists());
    }

    #[tokio::test]
    async fn test_skips_record_under_foreign_name() {
        let dir = tempdir().unwrap();
        let backend = DirectoryBackend::new(dir.path(), "db", "recordings");
        backend.open().await.unwrap();
        backend.put(&recording("x")).await.unwrap();

        let mut copy = recording("x");
        copy.duration = 99;
        std::fs::write(
            backend.root().join("recordings/other.json"),
            serde_json::to_string(&copy).unwrap(),
        )
        .unwrap();

        let all = backend.list().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].duration, 12);

        assert!(backend.delete("x").await.unwrap());
        assert!(backend.list().await.unwrap().is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_vanished_record_file_is_skipped() {
        let dir = tempdir().unwrap();
        let backend = DirectoryBackend::new(dir.path(), "db", "recordings");
        backend.open().await.unwrap();
        backend.put(&recording("a")).await.unwrap();
        std::os::unix::fs::symlink(
            dir.path().join("nowhere.json"),
            backend.root().join("recordings/gone.json"),
        )
        .unwrap();

        let ids: Vec<String> = backend.list().await.unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["a"]);
    }

    #[tokio::test]
    async fn test_lists_in_id_order() {
        let dir = tempdir().unwrap();
        let backend = DirectoryBackend::new(dir.path(), "db", "recordings");
        backend.open().await.unwrap();
        for id in ["a/b", "a", "a-b", "B"] {
            backend.put(&recording(id)).await.unwrap();
        }

        let ids: Vec<String> = backend.list().await.unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["B", "a", "a-b", "a/b"]);

        let memory = crate::store::MemoryBackend::with_records(
            ["a/b", "a", "a-b", "B"].into_iter().map(recording),
        );
        let memory_ids: Vec<String> = memory.list().await.unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, memory_ids);
    }
}
