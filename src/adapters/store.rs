//! Snapshot storage adapters.
//!
//! Implements [`SnapshotStore`] two ways:
//!
//! - [`FileSnapshotStore`] keeps one `<key>.snap` file per blob in a
//!   directory.  Writes go to a temp file that is renamed into place, so
//!   readers see either the old blob or the new one.
//! - [`MemorySnapshotStore`] is the simulation backend.

use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::app::ports::SnapshotStore;
use crate::error::StorageError;

const EXTENSION: &str = "snap";

// ───────────────────────────────────────────────────────────────
// File backend
// ───────────────────────────────────────────────────────────────

pub struct FileSnapshotStore {
    dir: PathBuf,
}

impl FileSnapshotStore {
    /// Open (creating if needed) a snapshot directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| {
            warn!("Snapshot dir {} unavailable: {e}", dir.display());
            StorageError::IoError
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(key).with_extension(EXTENSION)
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn read(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        match fs::read(self.path(key)) {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::NotFound),
            Err(e) => {
                warn!("Snapshot read '{key}' failed: {e}");
                Err(StorageError::IoError)
            }
        }
    }

    fn write(&mut self, key: &str, data: &[u8]) -> Result<(), StorageError> {
        let target = self.path(key);
        let tmp = target.with_extension("tmp");
        let result = fs::File::create(&tmp)
            .and_then(|mut f| {
                f.write_all(data)?;
                f.sync_all()
            })
            .and_then(|()| fs::rename(&tmp, &target));
        match result {
            Ok(()) => {
                debug!("Snapshot '{key}' written ({} bytes)", data.len());
                Ok(())
            }
            Err(e) => {
                warn!("Snapshot write '{key}' failed: {e}");
                let _ = fs::remove_file(&tmp);
                Err(StorageError::IoError)
            }
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Memory backend
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone)]
pub struct MemorySnapshotStore {
    blobs: HashMap<String, Vec<u8>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.blobs.contains_key(key)
    }

    /// Mutable access to a stored blob, for corruption tests.
    pub fn blob_mut(&mut self, key: &str) -> Option<&mut Vec<u8>> {
        self.blobs.get_mut(key)
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn read(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        self.blobs.get(key).cloned().ok_or(StorageError::NotFound)
    }

    fn write(&mut self, key: &str, data: &[u8]) -> Result<(), StorageError> {
        self.blobs.insert(key.to_owned(), data.to_vec());
        Ok(())
    }
}
