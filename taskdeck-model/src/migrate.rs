//! Stored-record schema migration.
//!
//! Earlier schema versions of the local snapshot carried fewer fields
//! (no priority, no schedule, no attachments). [`migrate`] upgrades
//! any previously-persisted record to the current [`Task`] shape with
//! safe defaults. It is invoked at every local ingestion boundary —
//! startup read and subscription-failure fallback read — and nowhere
//! else, so the defaulting rules live in exactly one place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::task::{Attachment, Priority, Task};

/// The on-disk shape of a persisted task record, tolerant of fields
/// introduced after the record was written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoredRecord {
    /// Record identifier; carried through unchanged.
    pub id: String,
    /// Task text; carried through unchanged.
    pub text: String,
    /// Completion flag; absent in no known version, defaulted anyway.
    pub completed: bool,
    /// Absent before timestamps were added to the schema.
    pub created_at: Option<DateTime<Utc>>,
    /// Absent before completion tracking was added.
    pub completed_at: Option<DateTime<Utc>>,
    /// Absent before scheduling was added.
    pub due_date: Option<String>,
    /// Absent before scheduling was added.
    pub due_time: Option<String>,
    /// Absent before priorities were added.
    pub priority: Option<Priority>,
    /// Absent before sync freshness tracking was added.
    pub last_modified: Option<DateTime<Utc>>,
    /// Absent before attachments were added.
    pub attachments: Option<Vec<Attachment>>,
}

impl From<Task> for StoredRecord {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            text: task.text,
            completed: task.completed,
            created_at: Some(task.created_at),
            completed_at: task.completed_at,
            due_date: task.due_date,
            due_time: task.due_time,
            priority: Some(task.priority),
            last_modified: Some(task.last_modified),
            attachments: Some(task.attachments),
        }
    }
}

/// Upgrades a stored record to a fully-populated [`Task`].
///
/// Missing timestamps are filled with `now`, missing nullable fields
/// with `None`, missing priority with medium, missing attachments with
/// an empty list. Idempotent: migrating an already-current record
/// returns it unchanged.
#[must_use]
pub fn migrate(record: StoredRecord, now: DateTime<Utc>) -> Task {
    Task {
        id: record.id,
        text: record.text,
        completed: record.completed,
        created_at: record.created_at.unwrap_or(now),
        completed_at: record.completed_at,
        due_date: record.due_date,
        due_time: record.due_time,
        priority: record.priority.unwrap_or_default(),
        last_modified: record.last_modified.unwrap_or(now),
        attachments: record.attachments.unwrap_or_default(),
    }
}
