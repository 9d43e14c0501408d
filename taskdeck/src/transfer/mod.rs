//! JSON import and export of the task collection.
//!
//! Import is a two-phase flow: [`parse_import`] validates and filters
//! the payload into an [`ImportBatch`] without touching any store, the
//! caller confirms (showing the "N of M" summary), and only then does
//! [`crate::sync::SyncEngine::import_batch`] add the entries through
//! the normal mutation path. There is no partial commit at the parse
//! stage.

use chrono::{DateTime, NaiveDate};
use serde_json::Value;
use taskdeck_model::{NewTaskOptions, Priority, Task};
use thiserror::Error;

/// Import/export failures surfaced to the caller.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The payload is not well-formed JSON, or a collection failed to
    /// serialize on export.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// The payload parsed, but its root is not an array.
    #[error("import payload must be a JSON array of tasks")]
    NotAnArray,
    /// The array parsed, but no entry carried a usable task.
    #[error("no valid tasks found in import payload")]
    NoValidTasks,
}

/// One importable task, already validated and coerced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportEntry {
    /// Trimmed, non-empty task text.
    pub text: String,
    /// Coerced priority; invalid or absent input becomes medium.
    pub priority: Priority,
    /// Schedule date, passed through only when string-typed.
    pub due_date: Option<String>,
    /// Schedule time, passed through only when string-typed.
    pub due_time: Option<String>,
}

impl ImportEntry {
    /// Converts the entry into creation options. A due date that does
    /// not parse as a calendar date is dropped rather than imported
    /// broken.
    #[must_use]
    pub fn into_task_options(self) -> (String, NewTaskOptions) {
        let due_date = self.due_date.filter(|date| is_valid_due_date(date));
        let options = NewTaskOptions {
            due_date,
            due_time: self.due_time,
            priority: Some(self.priority),
            attachments: Vec::new(),
        };
        (self.text, options)
    }
}

/// A parsed, filtered import payload awaiting confirmation.
#[derive(Debug, Clone)]
pub struct ImportBatch {
    /// The entries that survived validation.
    pub entries: Vec<ImportEntry>,
    /// How many entries the payload contained before filtering.
    pub total: usize,
}

impl ImportBatch {
    /// Human-readable "N of M" line for the confirmation prompt.
    #[must_use]
    pub fn summary(&self) -> String {
        format!("{} of {} tasks will be imported", self.entries.len(), self.total)
    }
}

/// Parses an import payload.
///
/// Entries without a non-empty string `text` are silently skipped;
/// `priority` is coerced; `dueDate`/`dueTime` pass through only when
/// string-typed. Attachments are never imported.
///
/// # Errors
///
/// Returns [`TransferError`] for malformed JSON, a non-array root, or
/// a payload with zero valid entries.
pub fn parse_import(input: &str) -> Result<ImportBatch, TransferError> {
    let payload: Value = serde_json::from_str(input)?;
    let Some(items) = payload.as_array() else {
        return Err(TransferError::NotAnArray);
    };
    let total = items.len();
    let entries: Vec<ImportEntry> = items.iter().filter_map(entry_from_value).collect();
    if entries.is_empty() {
        return Err(TransferError::NoValidTasks);
    }
    Ok(ImportBatch { entries, total })
}

fn entry_from_value(value: &Value) -> Option<ImportEntry> {
    let object = value.as_object()?;
    let text = object.get("text")?.as_str()?.trim();
    if text.is_empty() {
        return None;
    }
    Some(ImportEntry {
        text: text.to_string(),
        priority: Priority::coerce(object.get("priority").and_then(Value::as_str)),
        due_date: object
            .get("dueDate")
            .and_then(Value::as_str)
            .map(str::to_string),
        due_time: object
            .get("dueTime")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

fn is_valid_due_date(date: &str) -> bool {
    NaiveDate::parse_from_str(date, "%Y-%m-%d").is_ok() || DateTime::parse_from_rfc3339(date).is_ok()
}

/// Serializes a collection as indented JSON, suitable for re-import.
///
/// # Errors
///
/// Returns [`TransferError::Json`] if serialization fails.
pub fn export_json(tasks: &[Task]) -> Result<String, TransferError> {
    Ok(serde_json::to_string_pretty(tasks)?)
}

/// Counts shown alongside an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportStats {
    /// All tasks in the collection.
    pub total: usize,
    /// Tasks with the completion flag set.
    pub completed: usize,
    /// Tasks still open.
    pub active: usize,
}

/// Computes export statistics over a collection.
#[must_use]
pub fn export_stats(tasks: &[Task]) -> ExportStats {
    let completed = tasks.iter().filter(|t| t.completed).count();
    ExportStats {
        total: tasks.len(),
        completed,
        active: tasks.len() - completed,
    }
}
