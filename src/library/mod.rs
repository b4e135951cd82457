//! Recording library
//!
//! Composes the record store and the media resolver into the operations the
//! viewer calls: refresh, delete and teardown. The library holds the
//! installed snapshot and is the only place handles are superseded.

use crate::config::ViewerConfig;
use crate::media::{BlobRegistry, MediaResolver, ReferenceMap, ResolvedReference, StoredMedia};
use crate::store::{DirectoryBackend, RecordStore, Recording, StoreResult};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Recordings ready for playback
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Most recent first
    pub records: Vec<Recording>,
    pub references: ReferenceMap,
}

impl Snapshot {
    pub fn reference(&self, id: &str) -> Option<&ResolvedReference> {
        self.references.get(id)
    }
}

#[derive(Default)]
struct Installed {
    generation: u64,
    snapshot: Snapshot,
    /// Deleted id to the newest generation that may have listed it
    deleted: HashMap<String, u64>,
}

impl Installed {
    fn is_deleted(&self, id: &str, generation: u64) -> bool {
        self.deleted
            .get(id)
            .is_some_and(|&horizon| horizon >= generation)
    }
}

/// Store plus resolver, with the currently installed snapshot
pub struct Library {
    store: RecordStore,
    resolver: MediaResolver,
    next_generation: AtomicU64,
    installed: Mutex<Installed>,
}

impl Library {
    pub fn new(store: RecordStore, resolver: MediaResolver) -> Self {
        Self {
            store,
            resolver,
            next_generation: AtomicU64::new(0),
            installed: Mutex::new(Installed::default()),
        }
    }

    /// Library over the on-disk store described by `config`
    pub fn from_config(config: &ViewerConfig) -> Self {
        let backend = DirectoryBackend::new(&config.store_dir, &config.database, &config.collection);
        let registry = BlobRegistry::new(config.handle_origin.clone(), config.max_live_handles);
        Self::new(
            RecordStore::new(Arc::new(backend)),
            MediaResolver::new(Arc::new(registry), config.default_media_type.clone()),
        )
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn registry(&self) -> &Arc<BlobRegistry> {
        self.resolver.registry()
    }

    /// List and resolve every recording, replacing the installed snapshot.
    ///
    /// The previous snapshot's handles are revoked once the new batch is
    /// installed. A batch overtaken by a newer refresh (or a teardown) is
    /// released instead and the installed snapshot is returned.
    pub async fn refresh(&self) -> StoreResult<Snapshot> {
        let generation = self.begin();
        tracing::info!("Refreshing library (generation {})", generation);

        let records = self.store.list_all().await?;
        let references = self.resolver.resolve_all(&records).await;

        Ok(self.install(generation, Snapshot { records, references }))
    }

    fn begin(&self) -> u64 {
        self.next_generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn install(&self, generation: u64, mut snapshot: Snapshot) -> Snapshot {
        let mut installed = self.installed.lock();

        if installed.generation > generation {
            let released = self.resolver.release_all(&snapshot.references);
            tracing::warn!(
                "Refresh {} superseded by {}; released {} handles",
                generation,
                installed.generation,
                released
            );
            return installed.snapshot.clone();
        }

        // Records deleted after this batch was listed
        snapshot
            .records
            .retain(|recording| !installed.is_deleted(&recording.id, generation));
        let mut dropped = 0;
        snapshot.references.retain(|id, reference| {
            if installed.is_deleted(id, generation) {
                self.resolver.release(reference);
                dropped += 1;
                false
            } else {
                true
            }
        });
        if dropped > 0 {
            tracing::debug!("Dropped {} recordings deleted during refresh {}", dropped, generation);
        }

        let previous = std::mem::replace(&mut installed.snapshot, snapshot);
        installed.generation = generation;
        installed.deleted.retain(|_, horizon| *horizon > generation);
        let revoked = self.resolver.release_all(&previous.references);

        tracing::info!(
            "Installed {} recordings (generation {}, {} handles revoked)",
            installed.snapshot.records.len(),
            generation,
            revoked
        );
        installed.snapshot.clone()
    }

    /// Delete a recording and revoke its handle.
    ///
    /// Refreshes still in flight will not install the record. Returns whether
    /// the store still had the record.
    pub async fn delete(&self, id: &str) -> StoreResult<bool> {
        let removed = self.store.delete_by_id(id).await?;

        let mut installed = self.installed.lock();
        let horizon = self.next_generation.load(Ordering::SeqCst);
        if horizon > installed.generation {
            installed.deleted.insert(id.to_string(), horizon);
        }
        installed.snapshot.records.retain(|recording| recording.id != id);
        if let Some(reference) = installed.snapshot.references.remove(id) {
            if self.resolver.release(&reference) {
                tracing::debug!("Revoked handle of deleted recording {}", id);
            }
        }

        Ok(removed)
    }

    /// Revoke every held handle and clear the installed snapshot.
    ///
    /// Refreshes still in flight are treated as superseded.
    pub fn teardown(&self) -> usize {
        let generation = self.begin();
        let mut installed = self.installed.lock();
        let previous = std::mem::take(&mut installed.snapshot);
        installed.generation = generation;
        installed.deleted.clear();

        let revoked = self.resolver.release_all(&previous.references);
        tracing::info!("Library torn down, {} handles revoked", revoked);
        revoked
    }

    /// The installed snapshot
    pub fn snapshot(&self) -> Snapshot {
        self.installed.lock().snapshot.clone()
    }

    /// Materialized media of an installed recording
    pub fn media(&self, id: &str) -> Option<Arc<StoredMedia>> {
        let installed = self.installed.lock();
        match installed.snapshot.references.get(id)? {
            ResolvedReference::Local(handle) => self.resolver.registry().get(&handle.url),
            _ => None,
        }
    }
}
