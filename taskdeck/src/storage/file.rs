//! File-backed local store.
//!
//! Persists the whole collection as a JSON array in a single file —
//! the on-disk equivalent of the single storage key. Written whole on
//! every local-path mutation and on every received remote snapshot
//! (offline cache mirror).

use std::io::ErrorKind;
use std::path::PathBuf;

use taskdeck_model::{StoredRecord, Task};

use super::{LocalStore, StorageError};

/// Whole-collection JSON file store.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Creates a store backed by the given snapshot file path.
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Returns the snapshot file path.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl LocalStore for JsonFileStore {
    async fn read_all(&self) -> Result<Vec<StoredRecord>, StorageError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        Ok(serde_json::from_str(&contents)?)
    }

    async fn write_all(&self, tasks: &[Task]) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string(tasks)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}
