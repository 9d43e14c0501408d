//! Local on-device persistence of the task collection.
//!
//! Defines the [`LocalStore`] trait the reconciliation engine writes
//! through. The store holds one whole-collection snapshot under a
//! single key — there is no per-record access. Concrete
//! implementations:
//! - [`file::JsonFileStore`] — one JSON file under the data directory
//! - [`memory::MemoryStore`] — in-process store with failure injection
//!   for testing

pub mod file;
pub mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

use taskdeck_model::{StoredRecord, Task};

/// Errors that can occur at the local persistence boundary.
///
/// The engine never propagates these to mutation callers: read
/// failures yield an empty collection, write failures are logged and
/// dropped.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// An underlying I/O error occurred.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The snapshot could not be encoded or decoded.
    #[error("snapshot serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Failure injected by a test double.
    #[error("injected storage failure")]
    Injected,
}

/// Async whole-collection persistence.
///
/// # Invariant
///
/// `write_all` replaces the entire snapshot atomically from the
/// caller's point of view; a subsequent `read_all` returns either the
/// previous snapshot or the new one, never a mixture.
pub trait LocalStore: Send + Sync {
    /// Reads the entire persisted collection as raw stored records.
    ///
    /// A missing snapshot is not an error — it reads as an empty
    /// collection.
    fn read_all(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<StoredRecord>, StorageError>> + Send;

    /// Replaces the entire persisted collection.
    fn write_all(
        &self,
        tasks: &[Task],
    ) -> impl std::future::Future<Output = Result<(), StorageError>> + Send;
}
