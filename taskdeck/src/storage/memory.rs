//! In-memory local store with failure injection.
//!
//! Test and demo double for [`JsonFileStore`](super::JsonFileStore),
//! mirroring how the persisted snapshot behaves without touching the
//! filesystem. Read and write failures can be injected to exercise
//! the engine's logged-and-dropped error handling.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use taskdeck_model::{StoredRecord, Task};

use super::{LocalStore, StorageError};

/// In-process whole-collection store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Vec<StoredRecord>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populates the store with raw records, as if a previous run
    /// had persisted them.
    pub fn seed(&self, records: Vec<StoredRecord>) {
        *self.records.lock() = records;
    }

    /// Makes subsequent reads fail with [`StorageError::Injected`].
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Makes subsequent writes fail with [`StorageError::Injected`].
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Returns a copy of the currently persisted records.
    #[must_use]
    pub fn persisted(&self) -> Vec<StoredRecord> {
        self.records.lock().clone()
    }
}

impl LocalStore for MemoryStore {
    async fn read_all(&self) -> Result<Vec<StoredRecord>, StorageError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::Injected);
        }
        Ok(self.records.lock().clone())
    }

    async fn write_all(&self, tasks: &[Task]) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Injected);
        }
        *self.records.lock() = tasks.iter().cloned().map(StoredRecord::from).collect();
        Ok(())
    }
}
