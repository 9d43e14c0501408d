//! Task entity model for `taskdeck`.
//!
//! Defines the [`Task`] entity and its satellite types, the
//! explicit-field [`TaskPatch`] used for partial updates, and the
//! stored-record schema migration that upgrades older persisted
//! records to the current shape. This crate is pure data: no I/O,
//! no async.

pub mod migrate;
pub mod patch;
pub mod task;

pub use migrate::{StoredRecord, migrate};
pub use patch::TaskPatch;
pub use task::{Attachment, AttachmentKind, NewTaskOptions, Priority, Task};
