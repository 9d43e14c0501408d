//! Explicit-field partial updates.
//!
//! [`TaskPatch`] distinguishes "field omitted" from "field set to
//! null": an omitted field (`None`) is left untouched, a present field
//! overwrites, and for the nullable schedule fields a present-but-null
//! value (`Some(None)`) clears them.

use chrono::{DateTime, Utc};

use crate::task::{Attachment, Priority, Task};

/// A partial update to a task. Only fields that are `Some` are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    /// Replacement text (trimmed on apply).
    pub text: Option<String>,
    /// Replacement priority.
    pub priority: Option<Priority>,
    /// Outer `Some` means the field is present; inner `None` clears it.
    pub due_date: Option<Option<String>>,
    /// Outer `Some` means the field is present; inner `None` clears it.
    pub due_time: Option<Option<String>>,
    /// Replacement attachment list (normalized on apply).
    pub attachments: Option<Vec<Attachment>>,
}

impl TaskPatch {
    /// Returns `true` if no field is present.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.text.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
            && self.due_time.is_none()
            && self.attachments.is_none()
    }

    /// Applies the present fields to `task` and bumps `last_modified`.
    pub fn apply(&self, task: &mut Task, now: DateTime<Utc>) {
        if let Some(text) = &self.text {
            task.text = text.trim().to_string();
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(due_date) = &self.due_date {
            task.due_date = due_date.clone();
        }
        if let Some(due_time) = &self.due_time {
            task.due_time = due_time.clone();
        }
        if let Some(attachments) = &self.attachments {
            task.attachments = attachments
                .iter()
                .cloned()
                .map(Attachment::normalized)
                .collect();
        }
        task.last_modified = now;
    }
}
