//! Remote document-store adapter.
//!
//! Defines the [`RemoteStore`] capability set the reconciliation
//! engine depends on — a live per-user subscription plus per-record
//! CRUD — without committing to a concrete backend. Concrete
//! implementations:
//! - [`NullRemote`] — the not-configured backend; every operation
//!   fails with [`RemoteError::Unavailable`]
//! - [`memory::MemoryRemote`] — in-process backend with failure
//!   injection for testing
//!
//! Timestamps on the wire are [`WriteInstant`] on the way out (the
//! caller may pass the server-time sentinel, resolved backend-side)
//! and [`RemoteInstant`] on the way in (a just-written document may
//! carry a not-yet-resolved server timestamp). [`map_document`]
//! coerces both representations into concrete instants for the
//! published read model.

pub mod memory;

pub use memory::MemoryRemote;

use chrono::{DateTime, Utc};
use taskdeck_model::{Attachment, NewTaskOptions, Priority, Task, TaskPatch};
use tokio::sync::mpsc;

/// User identity keying the remote task collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserId(String);

impl UserId {
    /// Creates a user identity from its string representation.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the string representation of this identity.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors that can occur at the remote persistence boundary.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// No backend is configured or no identity is signed in. The
    /// engine treats this identically to a thrown write error.
    #[error("remote backend not configured")]
    Unavailable,

    /// A create/update/delete call failed.
    #[error("remote write failed: {0}")]
    Write(String),

    /// The live subscription could not be established.
    #[error("remote subscription failed: {0}")]
    Subscription(String),
}

/// A server-resolved timestamp as it appears in a document read.
///
/// A document observed immediately after its own write may carry a
/// timestamp the server has not resolved yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteInstant {
    /// The server has committed a concrete instant.
    Resolved(DateTime<Utc>),
    /// The write is acknowledged but the instant is still pending.
    Pending,
}

/// Timestamp representation accepted on writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteInstant {
    /// Sentinel resolved server-side at commit time.
    ServerTime,
    /// A concrete client-supplied instant.
    At(DateTime<Utc>),
}

/// A raw task document as the backend returns it. Fields beyond the
/// id may be missing on documents written by older clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteDocument {
    /// Store-assigned document identifier.
    pub id: String,
    /// Task text.
    pub text: String,
    /// Completion flag.
    pub completed: bool,
    /// Creation timestamp, possibly unresolved.
    pub created_at: Option<RemoteInstant>,
    /// Completion timestamp, possibly unresolved.
    pub completed_at: Option<RemoteInstant>,
    /// Optional schedule date.
    pub due_date: Option<String>,
    /// Optional schedule time.
    pub due_time: Option<String>,
    /// Priority, absent on older documents.
    pub priority: Option<Priority>,
    /// Freshness hint, possibly unresolved.
    pub last_modified: Option<RemoteInstant>,
    /// Attachment descriptors.
    pub attachments: Vec<Attachment>,
}

/// Maps a remote document into the unified read model.
///
/// This is the remote-to-task path, distinct from local schema
/// migration: pending or missing timestamps coerce to `now`, missing
/// priority to medium. Both resolved and not-yet-resolved server
/// timestamps end up as concrete instants.
#[must_use]
pub fn map_document(doc: RemoteDocument, now: DateTime<Utc>) -> Task {
    let coerce = |instant: Option<RemoteInstant>| match instant {
        Some(RemoteInstant::Resolved(at)) => at,
        Some(RemoteInstant::Pending) | None => now,
    };
    Task {
        id: doc.id,
        text: doc.text,
        completed: doc.completed,
        created_at: coerce(doc.created_at),
        completed_at: match doc.completed_at {
            Some(RemoteInstant::Resolved(at)) => Some(at),
            Some(RemoteInstant::Pending) => Some(now),
            None => None,
        },
        due_date: doc.due_date,
        due_time: doc.due_time,
        priority: doc.priority.unwrap_or_default(),
        last_modified: coerce(doc.last_modified),
        attachments: doc
            .attachments
            .into_iter()
            .map(Attachment::normalized)
            .collect(),
    }
}

/// Create payload: a task without an id, timestamps carried as the
/// server-time sentinel. Attachments are normalized to the
/// storage-safe shape (explicit null byte size — the backend rejects
/// undefined values).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    /// Trimmed task text.
    pub text: String,
    /// Always `false` on creation.
    pub completed: bool,
    /// Server-resolved at commit.
    pub created_at: WriteInstant,
    /// Always `None` on creation.
    pub completed_at: Option<WriteInstant>,
    /// Optional schedule date.
    pub due_date: Option<String>,
    /// Optional schedule time.
    pub due_time: Option<String>,
    /// Priority, medium by default.
    pub priority: Priority,
    /// Server-resolved at commit.
    pub last_modified: WriteInstant,
    /// Normalized attachment descriptors.
    pub attachments: Vec<Attachment>,
}

impl TaskDraft {
    /// Builds a create payload from task text and creation options.
    #[must_use]
    pub fn new(text: &str, options: NewTaskOptions) -> Self {
        Self {
            text: text.trim().to_string(),
            completed: false,
            created_at: WriteInstant::ServerTime,
            completed_at: None,
            due_date: options.due_date,
            due_time: options.due_time,
            priority: options.priority.unwrap_or_default(),
            last_modified: WriteInstant::ServerTime,
            attachments: options
                .attachments
                .into_iter()
                .map(Attachment::normalized)
                .collect(),
        }
    }
}

/// Partial update payload. Omitted fields (`None`) are left untouched
/// by the backend; the nested options distinguish "clear this field"
/// from "leave it alone".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentPatch {
    /// Replacement text.
    pub text: Option<String>,
    /// Replacement completion flag.
    pub completed: Option<bool>,
    /// Present-and-`None` clears the completion timestamp.
    pub completed_at: Option<Option<WriteInstant>>,
    /// Present-and-`None` clears the schedule date.
    pub due_date: Option<Option<String>>,
    /// Present-and-`None` clears the schedule time.
    pub due_time: Option<Option<String>>,
    /// Replacement priority.
    pub priority: Option<Priority>,
    /// Replacement attachment list, normalized.
    pub attachments: Option<Vec<Attachment>>,
    /// Always bumped; defaults to the server-time sentinel.
    pub last_modified: WriteInstant,
}

impl Default for DocumentPatch {
    fn default() -> Self {
        Self {
            text: None,
            completed: None,
            completed_at: None,
            due_date: None,
            due_time: None,
            priority: None,
            attachments: None,
            last_modified: WriteInstant::ServerTime,
        }
    }
}

impl DocumentPatch {
    /// Converts an engine-level [`TaskPatch`] into a write payload.
    #[must_use]
    pub fn from_task_patch(patch: &TaskPatch) -> Self {
        Self {
            text: patch.text.as_ref().map(|t| t.trim().to_string()),
            due_date: patch.due_date.clone(),
            due_time: patch.due_time.clone(),
            priority: patch.priority,
            attachments: patch.attachments.as_ref().map(|atts| {
                atts.iter()
                    .cloned()
                    .map(Attachment::normalized)
                    .collect()
            }),
            ..Default::default()
        }
    }

    /// Builds the completion-flip payload: sets the flag, stamps or
    /// clears `completed_at` accordingly.
    #[must_use]
    pub fn toggle(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            completed_at: Some(completed.then_some(WriteInstant::ServerTime)),
            ..Default::default()
        }
    }
}

/// One emission from the live subscription.
#[derive(Debug)]
pub enum SnapshotEvent {
    /// A complete replacement view of the remote collection, ordered
    /// by `created_at` descending.
    Snapshot(Vec<RemoteDocument>),
    /// The feed errored unrecoverably; no further snapshots follow.
    Failed(String),
}

/// A live subscription handle. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    events: mpsc::Receiver<SnapshotEvent>,
}

impl Subscription {
    /// Wraps a snapshot event receiver.
    #[must_use]
    pub const fn new(events: mpsc::Receiver<SnapshotEvent>) -> Self {
        Self { events }
    }

    /// Waits for the next snapshot or failure. Returns `None` once the
    /// backend closes the feed.
    pub async fn recv(&mut self) -> Option<SnapshotEvent> {
        self.events.recv().await
    }
}

/// Async remote document-store capability set.
///
/// # Invariant
///
/// At most one subscription is active per user identity; callers must
/// drop the previous subscription before opening a new one for the
/// same identity.
pub trait RemoteStore: Send + Sync {
    /// Whether a backend is configured at all. `false` pins the engine
    /// to local-only mode without attempting any remote call.
    fn is_configured(&self) -> bool;

    /// Opens the live snapshot feed for a user's collection.
    fn subscribe(
        &self,
        user: &UserId,
    ) -> impl std::future::Future<Output = Result<Subscription, RemoteError>> + Send;

    /// Creates a document and returns its store-assigned id.
    fn create(
        &self,
        user: &UserId,
        draft: TaskDraft,
    ) -> impl std::future::Future<Output = Result<String, RemoteError>> + Send;

    /// Applies a partial update to one document.
    fn update(
        &self,
        user: &UserId,
        id: &str,
        patch: DocumentPatch,
    ) -> impl std::future::Future<Output = Result<(), RemoteError>> + Send;

    /// Deletes one document.
    fn delete(
        &self,
        user: &UserId,
        id: &str,
    ) -> impl std::future::Future<Output = Result<(), RemoteError>> + Send;
}

/// The not-configured backend. Every operation fails with
/// [`RemoteError::Unavailable`], which the engine treats as an
/// immediate local fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRemote;

impl RemoteStore for NullRemote {
    fn is_configured(&self) -> bool {
        false
    }

    async fn subscribe(&self, _user: &UserId) -> Result<Subscription, RemoteError> {
        Err(RemoteError::Unavailable)
    }

    async fn create(&self, _user: &UserId, _draft: TaskDraft) -> Result<String, RemoteError> {
        Err(RemoteError::Unavailable)
    }

    async fn update(
        &self,
        _user: &UserId,
        _id: &str,
        _patch: DocumentPatch,
    ) -> Result<(), RemoteError> {
        Err(RemoteError::Unavailable)
    }

    async fn delete(&self, _user: &UserId, _id: &str) -> Result<(), RemoteError> {
        Err(RemoteError::Unavailable)
    }
}
