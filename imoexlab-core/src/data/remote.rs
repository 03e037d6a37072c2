//! Remote object-store tier.
//!
//! The remote tier is the durable source of truth: origin backfills land here
//! first and the local tier is a derived cache of it. Object-store failures
//! are never retried; they surface as [`DataError::Storage`] and end the run.

use super::codec;
use super::provider::DataError;
use crate::domain::{ArtifactKind, DateKey, RawArtifact};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Minimal object-store contract: flat keys, whole-object reads and writes.
pub trait ObjectStore: Send + Sync {
    /// Store `payload` under `key`, replacing any existing object.
    fn put(&self, key: &str, payload: &[u8]) -> Result<(), DataError>;

    /// Fetch the object under `key`. Missing keys are [`DataError::NotFound`].
    fn get(&self, key: &str) -> Result<Vec<u8>, DataError>;

    /// Every key starting with `prefix`, in one round trip.
    fn list(&self, prefix: &str) -> Result<Vec<String>, DataError>;
}

/// Bucket mounted as a local directory; keys map to relative paths.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

impl ObjectStore for FsObjectStore {
    fn put(&self, key: &str, payload: &[u8]) -> Result<(), DataError> {
        let path = self.object_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| DataError::Storage(format!("create {}: {e}", parent.display())))?;
        }
        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, payload)
            .map_err(|e| DataError::Storage(format!("put {key}: {e}")))?;
        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            DataError::Storage(format!("put {key}: {e}"))
        })
    }

    fn get(&self, key: &str) -> Result<Vec<u8>, DataError> {
        fs::read(self.object_path(key)).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DataError::NotFound {
                    key: key.to_string(),
                }
            } else {
                DataError::Storage(format!("get {key}: {e}"))
            }
        })
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>, DataError> {
        // Keys are flat within a kind, so listing the prefix's directory suffices.
        let dir_part = match prefix.rfind('/') {
            Some(i) => &prefix[..=i],
            None => "",
        };
        let dir = self.root.join(dir_part);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&dir)
            .map_err(|e| DataError::Storage(format!("list {prefix}: {e}")))?;

        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| DataError::Storage(format!("list {prefix}: {e}")))?;
            if !entry.path().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if name.ends_with(".tmp") {
                continue;
            }
            let key = format!("{dir_part}{name}");
            if key.starts_with(prefix) {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }
}

/// In-process object store that counts calls; used by tests.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
    puts: AtomicUsize,
    gets: AtomicUsize,
    lists: AtomicUsize,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_calls(&self) -> usize {
        self.puts.load(Ordering::Relaxed)
    }

    pub fn get_calls(&self) -> usize {
        self.gets.load(Ordering::Relaxed)
    }

    pub fn list_calls(&self) -> usize {
        self.lists.load(Ordering::Relaxed)
    }

    /// Snapshot of every stored object.
    pub fn snapshot(&self) -> BTreeMap<String, Vec<u8>> {
        self.objects
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl ObjectStore for MemoryObjectStore {
    fn put(&self, key: &str, payload: &[u8]) -> Result<(), DataError> {
        self.puts.fetch_add(1, Ordering::Relaxed);
        self.objects
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), payload.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Vec<u8>, DataError> {
        self.gets.fetch_add(1, Ordering::Relaxed);
        self.objects
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
            .ok_or_else(|| DataError::NotFound {
                key: key.to_string(),
            })
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>, DataError> {
        self.lists.fetch_add(1, Ordering::Relaxed);
        Ok(self
            .objects
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

/// Artifact-aware view over an [`ObjectStore`].
#[derive(Clone)]
pub struct RemoteTier {
    store: Arc<dyn ObjectStore>,
}

impl RemoteTier {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Dates that have an artifact of `kind`, from a single listing call.
    pub fn available_dates(&self, kind: ArtifactKind) -> Result<BTreeSet<DateKey>, DataError> {
        let keys = self.store.list(kind.prefix())?;
        let dates: BTreeSet<DateKey> = keys.iter().filter_map(|k| kind.date_from_key(k)).collect();
        debug!(kind = kind.as_str(), objects = keys.len(), dates = dates.len(), "listed remote tier");
        Ok(dates)
    }

    /// Encode and upload an artifact in the current format.
    pub fn put_artifact(&self, date: DateKey, artifact: &RawArtifact) -> Result<(), DataError> {
        let bytes = codec::encode(date, artifact)?;
        self.store.put(&artifact.kind().key(date), &bytes)
    }

    /// Raw stored bytes for `kind` on `date`, whatever their encoding.
    pub fn get(&self, kind: ArtifactKind, date: DateKey) -> Result<Vec<u8>, DataError> {
        self.store.get(&kind.key(date))
    }
}

impl std::fmt::Debug for RemoteTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteTier").finish_non_exhaustive()
    }
}
