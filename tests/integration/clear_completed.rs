//! Integration tests for the clear-completed batch.
//!
//! One delete per completed record, issued concurrently while
//! remote-synced. A total failure falls back to the local reducer; in
//! local-only mode the reducer runs directly.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use taskdeck::feed::TaskList;
use taskdeck::remote::{MemoryRemote, NullRemote, UserId};
use taskdeck::storage::MemoryStore;
use taskdeck::sync::SyncEngine;
use taskdeck_model::NewTaskOptions;
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
async fn local_only_clear_removes_completed_tasks() {
    let store = Arc::new(MemoryStore::new());
    let engine = SyncEngine::new(Arc::new(NullRemote), Arc::clone(&store));
    engine.set_user(None).await;

    for text in ["keep", "done-a", "done-b"] {
        engine.add_task(text, NewTaskOptions::default()).await;
    }
    let done_ids: Vec<String> = engine
        .snapshot()
        .tasks
        .into_iter()
        .filter(|t| t.text.starts_with("done"))
        .map(|t| t.id)
        .collect();
    for id in done_ids {
        engine.toggle_task(&id).await;
    }

    engine.clear_completed().await;

    let state = engine.snapshot();
    assert_eq!(state.tasks.len(), 1);
    assert_eq!(state.tasks[0].text, "keep");
    assert_eq!(store.persisted().len(), 1);
}

#[tokio::test]
async fn clear_with_no_completed_tasks_is_noop() {
    let store = Arc::new(MemoryStore::new());
    let engine = SyncEngine::new(Arc::new(NullRemote), Arc::clone(&store));
    engine.set_user(None).await;
    engine.add_task("still open", NewTaskOptions::default()).await;

    engine.clear_completed().await;

    assert_eq!(engine.snapshot().tasks.len(), 1);
}

#[tokio::test]
async fn remote_clear_deletes_each_completed_document() {
    let remote = Arc::new(MemoryRemote::new());
    let engine = SyncEngine::new(Arc::clone(&remote), Arc::new(MemoryStore::new()));
    let mut rx = engine.subscribe();
    engine.set_user(Some(alice())).await;
    wait_for(&mut rx, |s| s.is_loaded).await;

    for text in ["open", "done-a", "done-b"] {
        engine.add_task(text, NewTaskOptions::default()).await;
    }
    let state = wait_for(&mut rx, |s| s.tasks.len() == 3).await;
    for task in state.tasks.iter().filter(|t| t.text.starts_with("done")) {
        engine.toggle_task(&task.id).await;
    }
    wait_for(&mut rx, |s| s.tasks.iter().filter(|t| t.completed).count() == 2).await;

    engine.clear_completed().await;

    let state = wait_for(&mut rx, |s| s.tasks.len() == 1).await;
    assert_eq!(state.tasks[0].text, "open");
    assert_eq!(remote.documents(&alice()).len(), 1);
}

#[tokio::test]
async fn total_remote_failure_falls_back_to_local_reducer() {
    let remote = Arc::new(MemoryRemote::new());
    let store = Arc::new(MemoryStore::new());
    let engine = SyncEngine::new(Arc::clone(&remote), Arc::clone(&store));
    let mut rx = engine.subscribe();
    engine.set_user(Some(alice())).await;
    wait_for(&mut rx, |s| s.is_loaded).await;

    engine.add_task("open", NewTaskOptions::default()).await;
    engine.add_task("done", NewTaskOptions::default()).await;
    let state = wait_for(&mut rx, |s| s.tasks.len() == 2).await;
    let done_id = state
        .tasks
        .iter()
        .find(|t| t.text == "done")
        .map(|t| t.id.clone())
        .unwrap();
    engine.toggle_task(&done_id).await;
    wait_for(&mut rx, |s| s.tasks.iter().any(|t| t.completed)).await;

    remote.set_fail_writes(true);
    engine.clear_completed().await;

    // Locally cleared; the backend still holds both documents.
    let state = wait_for(&mut rx, |s| s.tasks.len() == 1).await;
    assert_eq!(state.tasks[0].text, "open");
    assert_eq!(remote.documents(&alice()).len(), 2);
}
