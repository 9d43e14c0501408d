//! Pure mutation reducer over the task collection.
//!
//! The local fallback path applies every mutation through [`apply`],
//! keeping the optimistic-mutation logic in one testable place.
//! Output is always ordered `created_at` descending, independent of
//! the order mutations were issued.

use chrono::{DateTime, Utc};
use taskdeck_model::{Task, TaskPatch};

/// A single local mutation against the published collection.
#[derive(Debug, Clone)]
pub enum Mutation {
    /// Insert a fully-built task. Skipped if the id already exists.
    Add(Task),
    /// Apply a partial update to one task; no-op if not found.
    Update {
        /// Target task id.
        id: String,
        /// Present-only field updates.
        patch: TaskPatch,
    },
    /// Flip the completion flag; no-op if not found.
    Toggle {
        /// Target task id.
        id: String,
    },
    /// Remove one task; no-op if not found.
    Delete {
        /// Target task id.
        id: String,
    },
    /// Remove every completed task in one batch.
    ClearCompleted,
}

/// Sorts a collection into publication order: `created_at` descending,
/// ties broken by id descending so the order is total.
pub fn sort_tasks(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}

/// Applies one mutation and returns the re-ordered collection.
#[must_use]
pub fn apply(mut tasks: Vec<Task>, mutation: &Mutation, now: DateTime<Utc>) -> Vec<Task> {
    match mutation {
        Mutation::Add(task) => {
            // Uniqueness invariant: never two tasks with the same id.
            if !tasks.iter().any(|t| t.id == task.id) {
                tasks.push(task.clone());
            }
        }
        Mutation::Update { id, patch } => {
            if let Some(task) = tasks.iter_mut().find(|t| t.id == *id) {
                patch.apply(task, now);
            }
        }
        Mutation::Toggle { id } => {
            if let Some(task) = tasks.iter_mut().find(|t| t.id == *id) {
                task.completed = !task.completed;
                task.completed_at = task.completed.then_some(now);
                task.last_modified = now;
            }
        }
        Mutation::Delete { id } => {
            tasks.retain(|t| t.id != *id);
        }
        Mutation::ClearCompleted => {
            tasks.retain(|t| !t.completed);
        }
    }
    sort_tasks(&mut tasks);
    tasks
}
