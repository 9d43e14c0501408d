//! The reconciliation engine.
//!
//! Single authority for the published task collection and for routing
//! mutations. Two modes, re-evaluated on identity change:
//!
//! - [`SyncMode::LocalOnly`] — no backend or no identity; reads and
//!   writes go to the local store.
//! - [`SyncMode::RemoteSynced`] — a live remote subscription replaces
//!   the published collection on every snapshot; writes attempt
//!   remote first and fall back to a local optimistic mutation on
//!   failure.
//!
//! Persistence errors never propagate to mutation callers; the
//! in-memory state is always left valid and failures are only logged.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::future;
use parking_lot::Mutex;
use taskdeck_model::{NewTaskOptions, Task, TaskPatch, migrate};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::feed::{TaskFeed, TaskList};
use crate::remote::{
    DocumentPatch, RemoteStore, SnapshotEvent, Subscription, TaskDraft, UserId, map_document,
};
use crate::storage::LocalStore;
use crate::sync::reducer::{self, Mutation, sort_tasks};
use crate::transfer::{self, ImportBatch, TransferError};

/// The engine's current source-of-truth strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Remote unavailable or no identity; local store is authoritative.
    LocalOnly,
    /// Live remote subscription is authoritative; local store is an
    /// offline cache mirror.
    RemoteSynced,
}

/// Per-identity session state. Mode switches fully tear down the
/// previous mode's effects (subscription pump) before activating the
/// next, so two snapshot streams never race to publish.
struct Session {
    mode: SyncMode,
    user: Option<UserId>,
    pump: Option<JoinHandle<()>>,
    /// Bumped on every identity change; a pump whose epoch is stale
    /// must not publish.
    epoch: u64,
}

/// Reconciliation engine over a remote adapter and a local store.
pub struct SyncEngine<R, L> {
    remote: Arc<R>,
    local: Arc<L>,
    feed: Arc<TaskFeed>,
    session: Arc<Mutex<Session>>,
    /// Serializes every publish-and-persist pair — local mutations and
    /// subscription snapshots alike — so a publication and its mirror
    /// write land together, in order.
    commit: Arc<tokio::sync::Mutex<()>>,
}

impl<R, L> SyncEngine<R, L>
where
    R: RemoteStore,
    L: LocalStore + 'static,
{
    /// Creates an engine in local-only mode with an empty, unloaded
    /// feed. Call [`set_user`](Self::set_user) to load the initial
    /// collection.
    #[must_use]
    pub fn new(remote: Arc<R>, local: Arc<L>) -> Self {
        Self {
            remote,
            local,
            feed: Arc::new(TaskFeed::new()),
            session: Arc::new(Mutex::new(Session {
                mode: SyncMode::LocalOnly,
                user: None,
                pump: None,
                epoch: 0,
            })),
            commit: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// Returns the current mode.
    #[must_use]
    pub fn mode(&self) -> SyncMode {
        self.session.lock().mode
    }

    /// Returns a copy of the current read model.
    #[must_use]
    pub fn snapshot(&self) -> TaskList {
        self.feed.snapshot()
    }

    /// Registers a read-model observer.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<TaskList> {
        self.feed.subscribe()
    }

    /// Re-evaluates the sync mode for a (possibly absent) identity.
    ///
    /// Tears down the previous subscription before establishing a new
    /// one. With a configured backend and an identity the engine goes
    /// remote-synced and the live feed takes over publication;
    /// otherwise it loads the local snapshot once, migrates every
    /// record, and publishes.
    pub async fn set_user(&self, user: Option<UserId>) {
        let epoch = {
            let mut session = self.session.lock();
            session.epoch += 1;
            if let Some(pump) = session.pump.take() {
                pump.abort();
            }
            session.mode = SyncMode::LocalOnly;
            session.user.clone_from(&user);
            session.epoch
        };

        if let Some(user) = user {
            if self.remote.is_configured() {
                match self.remote.subscribe(&user).await {
                    Ok(subscription) => {
                        let mut session = self.session.lock();
                        // A racing identity change wins; drop this
                        // subscription unopened.
                        if session.epoch == epoch {
                            session.mode = SyncMode::RemoteSynced;
                            session.pump = Some(self.spawn_pump(subscription, epoch));
                        }
                        return;
                    }
                    Err(err) => {
                        tracing::info!(
                            error = %err,
                            user = %user,
                            "remote subscription unavailable, falling back to local-only"
                        );
                    }
                }
            }
        }

        let tasks = load_local(self.local.as_ref()).await;
        let session = self.session.lock();
        if session.epoch == epoch {
            self.feed.publish(tasks);
        }
    }

    /// Adds a task. No-op if `text` is empty after trimming.
    ///
    /// Remote-synced: attempts a remote create and lets the
    /// subscription republish (no optimistic local apply, avoiding
    /// double-apply). On remote failure, or in local-only mode, the
    /// task is created locally with a client id and persisted.
    pub async fn add_task(&self, text: &str, options: NewTaskOptions) {
        if text.trim().is_empty() {
            return;
        }
        if let Some(user) = self.remote_user() {
            match self
                .remote
                .create(&user, TaskDraft::new(text, options.clone()))
                .await
            {
                Ok(_) => return,
                Err(err) => {
                    tracing::warn!(error = %err, "remote create failed, applying local fallback");
                }
            }
        }
        let now = Utc::now();
        let task = Task::new_local(text, options, now);
        self.apply_local(&Mutation::Add(task), now).await;
    }

    /// Flips a task's completion flag, stamping or clearing
    /// `completed_at`. No-op if the id is unknown.
    pub async fn toggle_task(&self, id: &str) {
        let Some(current) = self.feed.snapshot().tasks.into_iter().find(|t| t.id == id) else {
            return;
        };
        if let Some(user) = self.remote_user() {
            match self
                .remote
                .update(&user, id, DocumentPatch::toggle(!current.completed))
                .await
            {
                Ok(()) => return,
                Err(err) => {
                    tracing::warn!(error = %err, "remote toggle failed, applying local fallback");
                }
            }
        }
        self.apply_local(&Mutation::Toggle { id: id.to_string() }, Utc::now())
            .await;
    }

    /// Applies a partial update. Omitted fields are left untouched;
    /// explicitly-null schedule fields are cleared. Bumps
    /// `last_modified`. A patch with no fields present is a no-op.
    pub async fn update_task(&self, id: &str, patch: TaskPatch) {
        if patch.is_empty() {
            return;
        }
        if let Some(user) = self.remote_user() {
            match self
                .remote
                .update(&user, id, DocumentPatch::from_task_patch(&patch))
                .await
            {
                Ok(()) => return,
                Err(err) => {
                    tracing::warn!(error = %err, "remote update failed, applying local fallback");
                }
            }
        }
        self.apply_local(
            &Mutation::Update {
                id: id.to_string(),
                patch,
            },
            Utc::now(),
        )
        .await;
    }

    /// Deletes a task. No-op if the id is unknown.
    pub async fn delete_task(&self, id: &str) {
        if let Some(user) = self.remote_user() {
            match self.remote.delete(&user, id).await {
                Ok(()) => return,
                Err(err) => {
                    tracing::warn!(error = %err, "remote delete failed, applying local fallback");
                }
            }
        }
        self.apply_local(&Mutation::Delete { id: id.to_string() }, Utc::now())
            .await;
    }

    /// Removes every completed task in one batch.
    ///
    /// Remote-synced: one delete per record, issued concurrently and
    /// awaited together. A partial failure is tolerated — the
    /// subscription reflects whatever state the backend ends up in
    /// and no compensating reducer runs. Only when every delete fails
    /// does the batch fall back to the local reducer.
    pub async fn clear_completed(&self) {
        let completed: Vec<String> = self
            .feed
            .snapshot()
            .tasks
            .into_iter()
            .filter(|t| t.completed)
            .map(|t| t.id)
            .collect();
        if completed.is_empty() {
            return;
        }

        if let Some(user) = self.remote_user() {
            let deletes = completed.iter().map(|id| self.remote.delete(&user, id));
            let results = future::join_all(deletes).await;
            let failed = results.iter().filter(|r| r.is_err()).count();
            if failed == 0 {
                return;
            }
            if failed < results.len() {
                // Accepted inconsistency window: the next snapshot
                // shows whichever deletes went through.
                tracing::warn!(
                    failed,
                    total = results.len(),
                    "partial clear-completed failure, awaiting subscription state"
                );
                return;
            }
            tracing::warn!(
                total = results.len(),
                "clear-completed failed entirely, applying local fallback"
            );
        }
        self.apply_local(&Mutation::ClearCompleted, Utc::now()).await;
    }

    /// Adds every entry of a confirmed import batch through the normal
    /// mutation path. Returns the number of tasks added.
    pub async fn import_batch(&self, batch: ImportBatch) -> usize {
        let count = batch.entries.len();
        for entry in batch.entries {
            let (text, options) = entry.into_task_options();
            self.add_task(&text, options).await;
        }
        count
    }

    /// Serializes the current collection as indented JSON.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError`] if serialization fails.
    pub fn export_json(&self) -> Result<String, TransferError> {
        transfer::export_json(&self.feed.snapshot().tasks)
    }

    /// Returns the identity to write through, if remote-synced.
    fn remote_user(&self) -> Option<UserId> {
        let session = self.session.lock();
        match session.mode {
            SyncMode::RemoteSynced => session.user.clone(),
            SyncMode::LocalOnly => None,
        }
    }

    /// Applies a mutation via the pure reducer, publishes, and
    /// persists the full collection. The commit gate covers the whole
    /// snapshot-read → reduce → publish → persist sequence, so
    /// concurrent local mutations apply in call order and the
    /// persisted snapshot never lags behind a later publication.
    /// Local write failures are logged, never surfaced — the in-memory
    /// state is already updated.
    async fn apply_local(&self, mutation: &Mutation, now: DateTime<Utc>) {
        let _commit = self.commit.lock().await;
        let tasks = reducer::apply(self.feed.snapshot().tasks, mutation, now);
        self.feed.publish(tasks.clone());
        if let Err(err) = self.local.write_all(&tasks).await {
            tracing::warn!(error = %err, "local snapshot write failed");
        }
    }

    /// Spawns the subscription pump: every snapshot replaces the
    /// published collection and is mirrored into the local store
    /// best-effort; a feed failure falls back to the cached local
    /// snapshot once and drops the session to local-only.
    fn spawn_pump(&self, mut subscription: Subscription, epoch: u64) -> JoinHandle<()> {
        let local = Arc::clone(&self.local);
        let feed = Arc::clone(&self.feed);
        let session = Arc::clone(&self.session);
        let commit = Arc::clone(&self.commit);
        tokio::spawn(async move {
            while let Some(event) = subscription.recv().await {
                match event {
                    SnapshotEvent::Snapshot(docs) => {
                        let now = Utc::now();
                        let mut tasks: Vec<Task> =
                            docs.into_iter().map(|doc| map_document(doc, now)).collect();
                        sort_tasks(&mut tasks);
                        let _commit = commit.lock().await;
                        {
                            let guard = session.lock();
                            if guard.epoch != epoch {
                                return;
                            }
                            feed.publish(tasks.clone());
                        }
                        if let Err(err) = local.write_all(&tasks).await {
                            tracing::warn!(error = %err, "offline cache mirror write failed");
                        }
                    }
                    SnapshotEvent::Failed(reason) => {
                        tracing::warn!(
                            reason,
                            "subscription failed, falling back to local snapshot"
                        );
                        let _commit = commit.lock().await;
                        let tasks = load_local(local.as_ref()).await;
                        let mut guard = session.lock();
                        if guard.epoch != epoch {
                            return;
                        }
                        guard.mode = SyncMode::LocalOnly;
                        guard.pump = None;
                        feed.publish(tasks);
                        return;
                    }
                }
            }
        })
    }
}

/// Reads the local snapshot, migrates every record, and returns the
/// collection in publication order. A read failure yields an empty
/// collection rather than blocking the caller.
async fn load_local<L: LocalStore>(local: &L) -> Vec<Task> {
    let now = Utc::now();
    match local.read_all().await {
        Ok(records) => {
            let mut tasks: Vec<Task> = records
                .into_iter()
                .map(|record| migrate(record, now))
                .collect();
            sort_tasks(&mut tasks);
            tasks
        }
        Err(err) => {
            tracing::error!(error = %err, "local snapshot read failed, starting empty");
            Vec::new()
        }
    }
}
