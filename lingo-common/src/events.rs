//! Task types and task lifecycle events
//!
//! The task registry broadcasts a `TaskEvent` for every lifecycle change.
//! Each event carries a full task snapshot so subscribers (e.g. the push
//! notification gateway) never need to read the registry directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Task lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl TaskStatus {
    /// A terminal task is immutable and eligible for eviction
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

/// A tracked background task
///
/// Owned exclusively by the task registry; callers only ever see clones.
/// Progress and status are the only fields mutated during the task's life.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub status: TaskStatus,
    /// Completion percentage, clamped to 0..=100
    pub progress: u8,
    pub description: String,
    /// Final result payload, set on completion
    pub result: Option<serde_json::Value>,
    /// Human-readable failure message, set on failure
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Create a new pending task
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            status: TaskStatus::Pending,
            progress: 0,
            description: description.into(),
            result: None,
            error: None,
            started_at: Utc::now(),
            ended_at: None,
        }
    }
}

/// Task lifecycle events broadcast to subscribers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TaskEvent {
    /// A new task was created
    TaskCreated { task: Task },

    /// Task status or progress changed
    TaskUpdated { task: Task },

    /// Task finished successfully
    TaskCompleted { task: Task },

    /// Task failed with an error
    TaskFailed { task: Task },
}

impl TaskEvent {
    /// The task snapshot carried by this event
    pub fn task(&self) -> &Task {
        match self {
            TaskEvent::TaskCreated { task }
            | TaskEvent::TaskUpdated { task }
            | TaskEvent::TaskCompleted { task }
            | TaskEvent::TaskFailed { task } => task,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_task_is_pending_with_zero_progress() {
        let task = Task::new("sync project abc");
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.progress, 0);
        assert!(task.ended_at.is_none());
        assert!(!task.status.is_terminal());
    }

    #[test]
    fn event_serializes_with_type_tag() {
        let event = TaskEvent::TaskCreated {
            task: Task::new("test"),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "TaskCreated");
        assert_eq!(json["task"]["status"], "pending");
    }
}
