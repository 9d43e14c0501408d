//! Integration tests for remote-synced mode.
//!
//! With a configured backend and a signed-in identity, the live
//! subscription takes over publication: every snapshot replaces the
//! collection, writes go remote-first, and the local store becomes an
//! offline cache mirror.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use taskdeck::feed::TaskList;
use taskdeck::remote::{MemoryRemote, RemoteStore, TaskDraft, UserId};
use taskdeck::storage::MemoryStore;
use taskdeck::sync::{SyncEngine, SyncMode};
use taskdeck_model::{NewTaskOptions, Priority, StoredRecord, TaskPatch};
use tokio::sync::watch;

async fn wait_for(
    rx: &mut watch::Receiver<TaskList>,
    predicate: impl FnMut(&TaskList) -> bool,
) -> TaskList {
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(predicate))
        .await
        .expect("timed out waiting for publication")
        .expect("feed closed")
        .clone()
}

fn alice() -> UserId {
    UserId::new("alice")
}

#[tokio::test]
async fn sign_in_switches_to_remote_and_publishes_remote_state() {
    let remote = Arc::new(MemoryRemote::new());
    remote
        .create(&alice(), TaskDraft::new("already in cloud", NewTaskOptions::default()))
        .await
        .unwrap();

    let store = Arc::new(MemoryStore::new());
    // Stale local state that the remote snapshot must replace.
    store.seed(vec![StoredRecord {
        id: "stale-local".to_string(),
        text: "outdated".to_string(),
        ..Default::default()
    }]);

    let engine = SyncEngine::new(remote, Arc::clone(&store));
    let mut rx = engine.subscribe();
    engine.set_user(Some(alice())).await;

    assert_eq!(engine.mode(), SyncMode::RemoteSynced);
    let state = wait_for(&mut rx, |s| s.is_loaded).await;
    assert_eq!(state.tasks.len(), 1);
    assert_eq!(state.tasks[0].text, "already in cloud");

    // The mirror write replaces the stale local snapshot.
    let persisted = wait_mirror(&store, 1).await;
    assert_eq!(persisted[0].text, "already in cloud");
}

/// The mirror write happens after publication; poll briefly.
async fn wait_mirror(store: &MemoryStore, len: usize) -> Vec<StoredRecord> {
    for _ in 0..100 {
        let persisted = store.persisted();
        if persisted.len() == len {
            return persisted;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("local mirror never reached {len} record(s)");
}

#[tokio::test]
async fn create_round_trips_through_the_subscription() {
    let remote = Arc::new(MemoryRemote::new());
    let engine = SyncEngine::new(Arc::clone(&remote), Arc::new(MemoryStore::new()));
    let mut rx = engine.subscribe();
    engine.set_user(Some(alice())).await;
    wait_for(&mut rx, |s| s.is_loaded).await;

    engine
        .add_task("remote first", NewTaskOptions::default())
        .await;

    let state = wait_for(&mut rx, |s| s.tasks.len() == 1).await;
    // The id is store-assigned, not a client id.
    assert!(state.tasks[0].id.starts_with("doc-"));
    assert_eq!(state.tasks[0].text, "remote first");
    assert_eq!(remote.documents(&alice()).len(), 1);
}

#[tokio::test]
async fn toggle_and_update_apply_remotely() {
    let remote = Arc::new(MemoryRemote::new());
    let engine = SyncEngine::new(Arc::clone(&remote), Arc::new(MemoryStore::new()));
    let mut rx = engine.subscribe();
    engine.set_user(Some(alice())).await;
    wait_for(&mut rx, |s| s.is_loaded).await;

    engine.add_task("evolving", NewTaskOptions::default()).await;
    let state = wait_for(&mut rx, |s| s.tasks.len() == 1).await;
    let id = state.tasks[0].id.clone();

    engine.toggle_task(&id).await;
    let state = wait_for(&mut rx, |s| s.tasks.first().is_some_and(|t| t.completed)).await;
    assert!(state.tasks[0].completed_at.is_some());

    engine
        .update_task(
            &id,
            TaskPatch {
                priority: Some(Priority::High),
                due_date: Some(Some("2026-09-01".to_string())),
                ..Default::default()
            },
        )
        .await;
    let state = wait_for(&mut rx, |s| {
        s.tasks.first().is_some_and(|t| t.priority == Priority::High)
    })
    .await;
    assert_eq!(state.tasks[0].due_date.as_deref(), Some("2026-09-01"));
    // Toggled state untouched by the field patch.
    assert!(state.tasks[0].completed);
}

#[tokio::test]
async fn sign_out_returns_to_local_only() {
    let remote = Arc::new(MemoryRemote::new());
    let store = Arc::new(MemoryStore::new());
    let engine = SyncEngine::new(Arc::clone(&remote), Arc::clone(&store));
    let mut rx = engine.subscribe();
    engine.set_user(Some(alice())).await;
    wait_for(&mut rx, |s| s.is_loaded).await;

    engine.add_task("cloud task", NewTaskOptions::default()).await;
    wait_for(&mut rx, |s| s.tasks.len() == 1).await;
    // Let the mirror write land before tearing the subscription down.
    wait_mirror(&store, 1).await;

    engine.set_user(None).await;
    assert_eq!(engine.mode(), SyncMode::LocalOnly);

    // The mirrored cache remains readable after sign-out.
    let state = engine.snapshot();
    assert!(state.is_loaded);
    assert_eq!(state.tasks.len(), 1);
    assert_eq!(state.tasks[0].text, "cloud task");

    // Remote mutations no longer reach the feed.
    remote
        .create(&alice(), TaskDraft::new("after sign-out", NewTaskOptions::default()))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(engine.snapshot().tasks.len(), 1);
}

#[tokio::test]
async fn switching_identities_switches_collections() {
    let remote = Arc::new(MemoryRemote::new());
    remote
        .create(&alice(), TaskDraft::new("hers", NewTaskOptions::default()))
        .await
        .unwrap();
    remote
        .create(
            &UserId::new("bob"),
            TaskDraft::new("his", NewTaskOptions::default()),
        )
        .await
        .unwrap();

    let engine = SyncEngine::new(remote, Arc::new(MemoryStore::new()));
    let mut rx = engine.subscribe();

    engine.set_user(Some(alice())).await;
    let state = wait_for(&mut rx, |s| s.is_loaded && !s.tasks.is_empty()).await;
    assert_eq!(state.tasks[0].text, "hers");

    engine.set_user(Some(UserId::new("bob"))).await;
    let state = wait_for(&mut rx, |s| {
        s.tasks.first().is_some_and(|t| t.text == "his")
    })
    .await;
    assert_eq!(state.tasks.len(), 1);
}
