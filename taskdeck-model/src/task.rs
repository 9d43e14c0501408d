//! The task entity and its satellite types.
//!
//! Field names serialize in the persisted camelCase schema
//! (`createdAt`, `dueDate`, ...) so the local snapshot and export
//! files stay field-identical across schema versions. Nullable
//! fields always serialize as explicit `null` — the remote backend
//! rejects documents with undefined values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Task priority level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Can wait.
    Low,
    /// The default for new and imported tasks.
    #[default]
    Medium,
    /// Needs attention first.
    High,
}

impl Priority {
    /// Lenient conversion used at import boundaries.
    ///
    /// Anything that is not a known level (including `None`) maps to
    /// [`Priority::Medium`].
    #[must_use]
    pub fn coerce(value: Option<&str>) -> Self {
        match value {
            Some("low") => Self::Low,
            Some("high") => Self::High,
            _ => Self::Medium,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// What kind of payload an attachment points at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    /// An image the UI can preview inline.
    Image,
    /// Any other file.
    #[default]
    File,
}

/// An attachment descriptor. Opaque to the sync core — it is only
/// persisted and serialized, never dereferenced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Unique identifier within the owning task.
    pub id: String,
    /// Where the payload lives (device URI or remote URL).
    pub uri: String,
    /// Display name shown by the UI.
    pub name: String,
    /// Image or file.
    #[serde(rename = "type", default)]
    pub kind: AttachmentKind,
    /// Byte size, when known. Serialized as explicit `null` when absent.
    #[serde(default)]
    pub size: Option<u64>,
}

impl Attachment {
    /// Returns the storage-safe shape of this attachment: empty display
    /// names are replaced with a placeholder so every persisted record
    /// has all fields populated.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if self.name.trim().is_empty() {
            self.name = "Untitled".to_string();
        }
        self
    }
}

/// Options accepted when creating a task, beyond its text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTaskOptions {
    /// Optional due date (ISO-8601 date string).
    pub due_date: Option<String>,
    /// Optional due time (`HH:MM`), independent of `due_date`.
    pub due_time: Option<String>,
    /// Priority; `None` means [`Priority::Medium`].
    pub priority: Option<Priority>,
    /// Attachments, normalized on creation.
    pub attachments: Vec<Attachment>,
}

/// The core task entity.
///
/// # Invariants
///
/// - `id` is unique within any published collection.
/// - `completed == false` implies `completed_at == None`.
/// - `created_at` is immutable after creation; `last_modified` is
///   bumped on every mutation (freshness hint only, never used for
///   conflict resolution).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Opaque unique identifier. Locally created tasks use a
    /// time-ordered UUID v7; remotely created tasks use the
    /// store-assigned document id.
    pub id: String,
    /// Rich content payload (HTML-ish markup), non-empty after trimming.
    pub text: String,
    /// Whether the task is done.
    pub completed: bool,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Set on the false→true completion transition, cleared on true→false.
    pub completed_at: Option<DateTime<Utc>>,
    /// Optional schedule date (ISO-8601 date string).
    pub due_date: Option<String>,
    /// Optional schedule time (`HH:MM`).
    pub due_time: Option<String>,
    /// Priority, medium by default.
    pub priority: Priority,
    /// Bumped on every mutation.
    pub last_modified: DateTime<Utc>,
    /// Ordered attachment descriptors.
    pub attachments: Vec<Attachment>,
}

impl Task {
    /// Builds a locally-created task with a fresh UUID v7 id and both
    /// timestamps set to `now`.
    ///
    /// The caller is responsible for rejecting empty trimmed text
    /// before constructing the task.
    #[must_use]
    pub fn new_local(text: &str, options: NewTaskOptions, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            text: text.trim().to_string(),
            completed: false,
            created_at: now,
            completed_at: None,
            due_date: options.due_date,
            due_time: options.due_time,
            priority: options.priority.unwrap_or_default(),
            last_modified: now,
            attachments: options
                .attachments
                .into_iter()
                .map(Attachment::normalized)
                .collect(),
        }
    }
}
