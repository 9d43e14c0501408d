//! In-memory remote backend.
//!
//! An in-process document store with live snapshot feeds, used for
//! tests and the offline demo. Behaves like the real backend at the
//! interface level: store-assigned ids, server-side resolution of the
//! server-time sentinel, a full ordered snapshot re-emitted to every
//! subscriber after each mutation, and injectable write/subscription
//! failures.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::{
    DocumentPatch, RemoteDocument, RemoteError, RemoteInstant, RemoteStore, SnapshotEvent,
    Subscription, TaskDraft, UserId, WriteInstant,
};

/// Snapshot channel capacity per subscriber.
const SNAPSHOT_BUFFER: usize = 32;

#[derive(Default)]
struct Inner {
    /// User id -> (document id -> document).
    collections: HashMap<String, BTreeMap<String, RemoteDocument>>,
    /// User id -> live snapshot senders.
    subscribers: HashMap<String, Vec<mpsc::Sender<SnapshotEvent>>>,
}

/// In-process remote document store.
#[derive(Default)]
pub struct MemoryRemote {
    inner: Mutex<Inner>,
    next_id: AtomicU64,
    fail_writes: AtomicBool,
    fail_subscribe: AtomicBool,
}

impl MemoryRemote {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent create/update/delete calls fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Makes subsequent subscribe calls fail.
    pub fn set_fail_subscribe(&self, fail: bool) {
        self.fail_subscribe.store(fail, Ordering::SeqCst);
    }

    /// Delivers an unrecoverable error to every active subscriber of
    /// `user` and drops them, simulating a dead feed.
    pub fn fail_active_subscriptions(&self, user: &UserId, reason: &str) {
        let senders = self
            .inner
            .lock()
            .subscribers
            .remove(user.as_str())
            .unwrap_or_default();
        for sender in senders {
            let _ = sender.try_send(SnapshotEvent::Failed(reason.to_string()));
        }
    }

    /// Returns the documents currently stored for `user`, in snapshot
    /// order (`created_at` descending).
    #[must_use]
    pub fn documents(&self, user: &UserId) -> Vec<RemoteDocument> {
        Self::ordered_snapshot(&self.inner.lock(), user.as_str())
    }

    fn resolve(instant: WriteInstant) -> RemoteInstant {
        match instant {
            WriteInstant::ServerTime => RemoteInstant::Resolved(Utc::now()),
            WriteInstant::At(at) => RemoteInstant::Resolved(at),
        }
    }

    fn ordered_snapshot(inner: &Inner, user: &str) -> Vec<RemoteDocument> {
        let mut docs: Vec<RemoteDocument> = inner
            .collections
            .get(user)
            .map(|c| c.values().cloned().collect())
            .unwrap_or_default();
        docs.sort_by(|a, b| {
            let key = |d: &RemoteDocument| match d.created_at {
                Some(RemoteInstant::Resolved(at)) => Some(at),
                _ => None,
            };
            key(b).cmp(&key(a)).then_with(|| b.id.cmp(&a.id))
        });
        docs
    }

    /// Re-emits the full ordered snapshot to every live subscriber of
    /// `user`, dropping subscribers whose channel has closed.
    fn broadcast(&self, user: &str) {
        let mut inner = self.inner.lock();
        let docs = Self::ordered_snapshot(&inner, user);
        if let Some(senders) = inner.subscribers.get_mut(user) {
            senders.retain(|sender| {
                sender
                    .try_send(SnapshotEvent::Snapshot(docs.clone()))
                    .is_ok()
            });
        }
    }

    fn check_writes(&self) -> Result<(), RemoteError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RemoteError::Write("injected write failure".to_string()));
        }
        Ok(())
    }
}

impl RemoteStore for MemoryRemote {
    fn is_configured(&self) -> bool {
        true
    }

    async fn subscribe(&self, user: &UserId) -> Result<Subscription, RemoteError> {
        if self.fail_subscribe.load(Ordering::SeqCst) {
            return Err(RemoteError::Subscription(
                "injected subscription failure".to_string(),
            ));
        }
        let (tx, rx) = mpsc::channel(SNAPSHOT_BUFFER);
        {
            let mut inner = self.inner.lock();
            let docs = Self::ordered_snapshot(&inner, user.as_str());
            // Initial snapshot is delivered on the new channel only.
            let _ = tx.try_send(SnapshotEvent::Snapshot(docs));
            inner
                .subscribers
                .entry(user.as_str().to_string())
                .or_default()
                .push(tx);
        }
        Ok(Subscription::new(rx))
    }

    async fn create(&self, user: &UserId, draft: TaskDraft) -> Result<String, RemoteError> {
        self.check_writes()?;
        let id = format!("doc-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let doc = RemoteDocument {
            id: id.clone(),
            text: draft.text,
            completed: draft.completed,
            created_at: Some(Self::resolve(draft.created_at)),
            completed_at: draft.completed_at.map(Self::resolve),
            due_date: draft.due_date,
            due_time: draft.due_time,
            priority: Some(draft.priority),
            last_modified: Some(Self::resolve(draft.last_modified)),
            attachments: draft.attachments,
        };
        self.inner
            .lock()
            .collections
            .entry(user.as_str().to_string())
            .or_default()
            .insert(id.clone(), doc);
        self.broadcast(user.as_str());
        Ok(id)
    }

    async fn update(
        &self,
        user: &UserId,
        id: &str,
        patch: DocumentPatch,
    ) -> Result<(), RemoteError> {
        self.check_writes()?;
        {
            let mut inner = self.inner.lock();
            let doc = inner
                .collections
                .get_mut(user.as_str())
                .and_then(|c| c.get_mut(id))
                .ok_or_else(|| RemoteError::Write(format!("document not found: {id}")))?;

            if let Some(text) = patch.text {
                doc.text = text;
            }
            if let Some(completed) = patch.completed {
                doc.completed = completed;
            }
            if let Some(completed_at) = patch.completed_at {
                doc.completed_at = completed_at.map(Self::resolve);
            }
            if let Some(due_date) = patch.due_date {
                doc.due_date = due_date;
            }
            if let Some(due_time) = patch.due_time {
                doc.due_time = due_time;
            }
            if let Some(priority) = patch.priority {
                doc.priority = Some(priority);
            }
            if let Some(attachments) = patch.attachments {
                doc.attachments = attachments;
            }
            doc.last_modified = Some(Self::resolve(patch.last_modified));
        }
        self.broadcast(user.as_str());
        Ok(())
    }

    async fn delete(&self, user: &UserId, id: &str) -> Result<(), RemoteError> {
        self.check_writes()?;
        // Deleting an absent document succeeds, matching backend
        // delete semantics.
        self.inner
            .lock()
            .collections
            .get_mut(user.as_str())
            .map(|c| c.remove(id));
        self.broadcast(user.as_str());
        Ok(())
    }
}
