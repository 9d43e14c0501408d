//! Local/remote state reconciliation.
//!
//! The [`SyncEngine`] is the single authority for "what is the
//! current task list" and "where does a mutation go". It selects
//! between local-only and remote-synced modes, keeps the two
//! persistence backends eventually consistent, and publishes one
//! unified collection through the task feed. [`reducer`] holds the
//! pure mutation logic shared by the local fallback path.

pub mod engine;
pub mod reducer;

pub use engine::{SyncEngine, SyncMode};
pub use reducer::{Mutation, apply, sort_tasks};
