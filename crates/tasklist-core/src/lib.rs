//! Domain types and projection rules for tasklist.

/// Identifier types.
pub mod id;
/// Derived active/completed views of the task list.
pub mod projection;
/// Millisecond timestamps.
pub mod stamp;
/// Completion state classification.
pub mod state;
/// Case-insensitive text search.
pub mod text_matcher;

pub use crate::id::TaskId;
pub use crate::projection::{CompletionFilter, Projection, Summary, ViewCriteria};
pub use crate::stamp::Timestamp;
pub use crate::state::TaskState;
pub use crate::text_matcher::TextMatcher;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation failures for task records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    /// Task text is empty after trimming.
    #[error("task text must not be empty")]
    EmptyText,
    /// Task identifier is empty after trimming.
    #[error("task id must not be empty")]
    EmptyId,
}

/// A single entry of the task list.
///
/// `id`, `text` and `created_at` never change once the record exists.
/// `completed_at` moves from `None` to `Some` at most once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TaskRecord", into = "TaskRecord")]
pub struct Task {
    id: TaskId,
    text: String,
    created_at: Timestamp,
    completed_at: Option<Timestamp>,
}

impl Task {
    /// Create an active task. The text is trimmed.
    ///
    /// # Errors
    /// Returns [`TaskError::EmptyText`] when the text is blank.
    pub fn new(id: TaskId, text: &str, created_at: Timestamp) -> Result<Self, TaskError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(TaskError::EmptyText);
        }
        Ok(Self {
            id,
            text: text.to_owned(),
            created_at,
            completed_at: None,
        })
    }

    /// Rebuild a task that may already be completed.
    ///
    /// # Errors
    /// Returns [`TaskError::EmptyText`] when the text is blank.
    pub fn restore(
        id: TaskId,
        text: &str,
        created_at: Timestamp,
        completed_at: Option<Timestamp>,
    ) -> Result<Self, TaskError> {
        let mut task = Self::new(id, text, created_at)?;
        task.completed_at = completed_at;
        Ok(task)
    }

    /// Identifier of the task.
    #[must_use]
    pub const fn id(&self) -> &TaskId {
        &self.id
    }

    /// Trimmed task text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Creation time.
    #[must_use]
    pub const fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Completion time, if the task is done.
    #[must_use]
    pub const fn completed_at(&self) -> Option<Timestamp> {
        self.completed_at
    }

    /// Returns true once the task has been completed.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Completion state of the task.
    #[must_use]
    pub const fn state(&self) -> TaskState {
        if self.is_completed() {
            TaskState::Completed
        } else {
            TaskState::Active
        }
    }

    /// Mark the task completed at `at`.
    ///
    /// Returns false without touching the record when it is already completed.
    pub const fn complete(&mut self, at: Timestamp) -> bool {
        if self.completed_at.is_some() {
            return false;
        }
        self.completed_at = Some(at);
        true
    }
}

/// Wire shape of a task, shared by the local snapshot format.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskRecord {
    id: TaskId,
    text: String,
    created_at: Timestamp,
    #[serde(default)]
    completed_at: Option<Timestamp>,
}

impl TryFrom<TaskRecord> for Task {
    type Error = TaskError;

    fn try_from(record: TaskRecord) -> Result<Self, Self::Error> {
        Self::restore(record.id, &record.text, record.created_at, record.completed_at)
    }
}

impl From<Task> for TaskRecord {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            text: task.text,
            created_at: task.created_at,
            completed_at: task.completed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: &str) -> TaskId {
        raw.parse().unwrap_or_else(|err| panic!("must parse task id: {err}"))
    }

    #[test]
    fn new_trims_text_and_starts_active() {
        let task = Task::new(id("a"), "  Buy milk \n", Timestamp::from_unix_millis(10))
            .unwrap_or_else(|err| panic!("must create task: {err}"));
        assert_eq!(task.text(), "Buy milk");
        assert_eq!(task.completed_at(), None);
        assert_eq!(task.state(), TaskState::Active);
    }

    #[test]
    fn blank_text_is_rejected() {
        assert_eq!(
            Task::new(id("a"), "   ", Timestamp::from_unix_millis(0)),
            Err(TaskError::EmptyText)
        );
    }

    #[test]
    fn completion_happens_once() {
        let mut task = Task::new(id("a"), "Walk", Timestamp::from_unix_millis(10))
            .unwrap_or_else(|err| panic!("must create task: {err}"));
        assert!(task.complete(Timestamp::from_unix_millis(20)));
        assert!(!task.complete(Timestamp::from_unix_millis(30)));
        assert_eq!(task.completed_at(), Some(Timestamp::from_unix_millis(20)));
        assert_eq!(task.state(), TaskState::Completed);
    }

    #[test]
    fn serializes_in_camel_case() {
        let task = Task::restore(
            id("a"),
            "Walk",
            Timestamp::from_unix_millis(10),
            Some(Timestamp::from_unix_millis(20)),
        )
        .unwrap_or_else(|err| panic!("must restore task: {err}"));
        let value = serde_json::to_value(&task).unwrap_or_else(|err| panic!("must serialize: {err}"));
        assert_eq!(
            value,
            serde_json::json!({"id": "a", "text": "Walk", "createdAt": 10, "completedAt": 20})
        );
    }

    #[test]
    fn deserialization_validates_text() {
        let parsed = serde_json::from_str::<Task>(r#"{"id":"a","text":"  ","createdAt":1}"#);
        assert!(parsed.is_err());

        let parsed: Task = serde_json::from_str(r#"{"id":"a","text":" ok ","createdAt":1,"completedAt":null}"#)
            .unwrap_or_else(|err| panic!("must parse: {err}"));
        assert_eq!(parsed.text(), "ok");
        assert!(!parsed.is_completed());
    }
}
