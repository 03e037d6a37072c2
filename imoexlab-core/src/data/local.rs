//! Local filesystem tier.
//!
//! Layout: `{data_dir}/raw-data/news-data-daily/rbc_{date}.json` and
//! `{data_dir}/raw-data/imoex-data-daily/candles_{date}.json`.
//!
//! Writes are atomic (write to `.tmp`, rename into place), so an interrupted
//! run never leaves a half-written artifact that later counts as present.

use super::codec;
use super::provider::DataError;
use crate::domain::{ArtifactKind, DateKey, RawArtifact};
use std::fs;
use std::path::{Path, PathBuf};

/// The local artifact cache.
#[derive(Debug, Clone)]
pub struct LocalTier {
    data_dir: PathBuf,
}

impl LocalTier {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Root data directory.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Directory holding every artifact of `kind`.
    pub fn kind_dir(&self, kind: ArtifactKind) -> PathBuf {
        self.data_dir.join(kind.prefix())
    }

    /// Path of the artifact for `kind` on `date`.
    pub fn path(&self, kind: ArtifactKind, date: DateKey) -> PathBuf {
        self.kind_dir(kind).join(kind.file_name(date))
    }

    pub fn exists(&self, kind: ArtifactKind, date: DateKey) -> bool {
        self.path(kind, date).is_file()
    }

    /// Write raw bytes for an artifact, creating directories as needed.
    pub fn write(&self, kind: ArtifactKind, date: DateKey, bytes: &[u8]) -> Result<(), DataError> {
        let dir = self.kind_dir(kind);
        fs::create_dir_all(&dir)
            .map_err(|e| DataError::Storage(format!("create {}: {e}", dir.display())))?;

        let path = self.path(kind, date);
        let tmp_path = path.with_extension("json.tmp");

        fs::write(&tmp_path, bytes)
            .map_err(|e| DataError::Storage(format!("write {}: {e}", tmp_path.display())))?;

        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            DataError::Storage(format!("atomic rename {}: {e}", path.display()))
        })
    }

    /// Encode an artifact in the current format and write it.
    pub fn write_artifact(&self, date: DateKey, artifact: &RawArtifact) -> Result<(), DataError> {
        let bytes = codec::encode(date, artifact)?;
        self.write(artifact.kind(), date, &bytes)
    }

    pub fn read(&self, kind: ArtifactKind, date: DateKey) -> Result<Vec<u8>, DataError> {
        let path = self.path(kind, date);
        fs::read(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DataError::NotFound {
                    key: path.display().to_string(),
                }
            } else {
                DataError::Storage(format!("read {}: {e}", path.display()))
            }
        })
    }

    /// Read and decode the artifact for `kind` on `date`.
    pub fn read_artifact(&self, kind: ArtifactKind, date: DateKey) -> Result<RawArtifact, DataError> {
        let bytes = self.read(kind, date)?;
        Ok(codec::decode(kind, &bytes)?.artifact)
    }

    /// Every artifact file of `kind`, sorted by path.
    ///
    /// Files that do not follow the naming template (temp files, strays) are
    /// skipped. A missing directory is an empty tier, not an error.
    pub fn list_files(&self, kind: ArtifactKind) -> Result<Vec<PathBuf>, DataError> {
        let dir = self.kind_dir(kind);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&dir)
            .map_err(|e| DataError::Storage(format!("read dir {}: {e}", dir.display())))?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| DataError::Storage(format!("dir entry: {e}")))?;
            let path = entry.path();
            let is_artifact = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| kind.date_from_key(n))
                .is_some();
            if is_artifact && path.is_file() {
                files.push(path);
            }
        }

        files.sort();
        Ok(files)
    }
}
