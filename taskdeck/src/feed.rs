//! The published read model.
//!
//! [`TaskFeed`] holds the one authoritative in-memory task collection
//! plus a loading flag, and notifies observers through a
//! [`tokio::sync::watch`] channel. Every UI surface (list view,
//! statistics, filters) derives from this single source; the feed
//! itself does no filtering or sorting — derived views are pure
//! functions over the published `tasks` array.

use taskdeck_model::Task;
use tokio::sync::watch;

/// The read model observed by all consumers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskList {
    /// The authoritative task collection, ordered by `created_at`
    /// descending.
    pub tasks: Vec<Task>,
    /// `false` until the first load (local read or remote snapshot)
    /// completes.
    pub is_loaded: bool,
}

/// Observable holder of the authoritative task collection.
///
/// Only the reconciliation engine publishes; everything else holds a
/// [`watch::Receiver`] and reacts to changes.
#[derive(Debug)]
pub struct TaskFeed {
    tx: watch::Sender<TaskList>,
}

impl TaskFeed {
    /// Creates a feed holding an empty, not-yet-loaded collection.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(TaskList::default());
        Self { tx }
    }

    /// Replaces the published collection and marks the feed loaded.
    pub fn publish(&self, tasks: Vec<Task>) {
        self.tx.send_replace(TaskList {
            tasks,
            is_loaded: true,
        });
    }

    /// Returns a copy of the current read model.
    #[must_use]
    pub fn snapshot(&self) -> TaskList {
        self.tx.borrow().clone()
    }

    /// Registers a new observer.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<TaskList> {
        self.tx.subscribe()
    }
}

impl Default for TaskFeed {
    fn default() -> Self {
        Self::new()
    }
}
