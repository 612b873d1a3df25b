//! Task identity, lifecycle state and queue message types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Fallback object name when an upload carries no usable filename
const DEFAULT_OBJECT_NAME: &str = "upload.bin";

/// Opaque task identifier (random 128-bit UUID v4)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Allocate a fresh random task id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a client-supplied id.
    ///
    /// Anything that is not a syntactically valid UUID is `InvalidInput`,
    /// never `NotFound`.
    pub fn parse(raw: &str) -> Result<Self> {
        Uuid::parse_str(raw.trim())
            .map(Self)
            .map_err(|_| Error::invalid_input("Invalid task ID format."))
    }

    /// Underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for TaskId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl FromStr for TaskId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Always the canonical hyphenated form, so cache keys are stable
        // regardless of how the client spelled the id.
        write!(f, "{}", self.0.hyphenated())
    }
}

/// Stored lifecycle state of a task.
///
/// `unknown` is not a variant: it is the absence of a status record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Processing,
    Completed,
    Failed,
}

impl TaskState {
    /// Value written to the status record
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Processing => "processing",
            TaskState::Completed => "completed",
            TaskState::Failed => "failed",
        }
    }

    /// Parse a stored status value, `None` for anything unrecognised
    pub fn from_stored(value: &str) -> Option<Self> {
        match value.trim() {
            "processing" => Some(TaskState::Processing),
            "completed" => Some(TaskState::Completed),
            "failed" => Some(TaskState::Failed),
            _ => None,
        }
    }

    /// Completed and failed tasks never transition again
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Message handed from the dispatcher to the worker pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskMessage {
    pub task_id: TaskId,
    pub object_path: String,
    /// When the dispatcher enqueued the message
    #[serde(default = "Utc::now")]
    pub submitted_at: DateTime<Utc>,
}

impl TaskMessage {
    pub fn new(task_id: TaskId, object_path: impl Into<String>) -> Self {
        Self {
            task_id,
            object_path: object_path.into(),
            submitted_at: Utc::now(),
        }
    }

    /// Time spent waiting in the queue so far
    pub fn queued_for(&self) -> chrono::Duration {
        Utc::now() - self.submitted_at
    }
}

/// Externally observable status of a task, as reconciled by the query service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    /// A result record exists
    Completed { summary: String },
    /// Status record says the worker picked the task up
    Processing,
    /// Status record says the pipeline failed
    Failed,
    /// No status and no result record
    NotFound,
}

/// Blob path for an upload: `{task_id}/{filename}`.
///
/// Only the final path component of `filename` is kept so a client cannot
/// address objects outside the task's prefix.
pub fn object_path(task_id: &TaskId, filename: &str) -> String {
    let name = filename
        .rsplit(['/', '\\'])
        .next()
        .map(str::trim)
        .filter(|n| !n.is_empty() && *n != "." && *n != "..")
        .unwrap_or(DEFAULT_OBJECT_NAME);
    format!("{}/{}", task_id, name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rejects_malformed_ids() {
        assert!(matches!(TaskId::parse("not-a-uuid"), Err(Error::InvalidInput(_))));
        assert!(matches!(TaskId::parse(""), Err(Error::InvalidInput(_))));
        assert!(TaskId::parse("8c1f3a52-0b7e-4a4e-9d43-2f6f1f0d8a11").is_ok());
    }

    #[test]
    fn test_display_is_canonical() {
        let id = TaskId::parse("8C1F3A520B7E4A4E9D432F6F1F0D8A11").unwrap();
        assert_eq!(id.to_string(), "8c1f3a52-0b7e-4a4e-9d43-2f6f1f0d8a11");
    }

    #[test]
    fn test_fresh_ids_are_unique() {
        let a = TaskId::new();
        let b = TaskId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_state_round_trips_stored_value() {
        for state in [TaskState::Processing, TaskState::Completed, TaskState::Failed] {
            assert_eq!(TaskState::from_stored(state.as_str()), Some(state));
        }
        assert_eq!(TaskState::from_stored("queued"), None);
        assert!(!TaskState::Processing.is_terminal());
        assert!(TaskState::Failed.is_terminal());
    }

    #[test]
    fn test_message_without_timestamp_still_decodes() {
        let raw = r#"{"task_id":"8c1f3a52-0b7e-4a4e-9d43-2f6f1f0d8a11","object_path":"8c1f3a52-0b7e-4a4e-9d43-2f6f1f0d8a11/x.tif"}"#;
        let message: TaskMessage = serde_json::from_str(raw).unwrap();
        assert_eq!(message.task_id.to_string(), "8c1f3a52-0b7e-4a4e-9d43-2f6f1f0d8a11");
        assert!(message.queued_for() >= chrono::Duration::zero());
    }

    #[test]
    fn test_object_path() {
        let id = TaskId::parse("8c1f3a52-0b7e-4a4e-9d43-2f6f1f0d8a11").unwrap();
        assert_eq!(
            object_path(&id, "x.tif"),
            "8c1f3a52-0b7e-4a4e-9d43-2f6f1f0d8a11/x.tif"
        );
        assert_eq!(
            object_path(&id, "../../etc/passwd"),
            "8c1f3a52-0b7e-4a4e-9d43-2f6f1f0d8a11/passwd"
        );
        assert_eq!(
            object_path(&id, ""),
            "8c1f3a52-0b7e-4a4e-9d43-2f6f1f0d8a11/upload.bin"
        );
        // Deterministic for the same inputs
        assert_eq!(object_path(&id, "a.tif"), object_path(&id, "a.tif"));
    }
}
