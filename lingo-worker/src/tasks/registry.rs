//! In-memory task registry
//!
//! Owns the task map exclusively; every mutation goes through a registry
//! method so the map is never touched concurrently. Lifecycle events fan out
//! through a `tokio::sync::broadcast` channel, structurally decoupling
//! subscribers from the mutation path.

use chrono::Utc;
use lingo_common::events::{Task, TaskEvent, TaskStatus};
use lingo_common::{Error, Result};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info};
use uuid::Uuid;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// In-memory store of background tasks.
///
/// Constructed once at process startup and injected wherever task tracking is
/// needed. There is no persistence; a restart loses all task history.
pub struct TaskRegistry {
    tasks: Mutex<HashMap<Uuid, Task>>,
    event_tx: broadcast::Sender<TaskEvent>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            tasks: Mutex::new(HashMap::new()),
            event_tx,
        }
    }

    /// Subscribe to task lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<TaskEvent> {
        self.event_tx.subscribe()
    }

    /// Create a new pending task and emit `TaskCreated`
    pub fn create(&self, description: impl Into<String>) -> Uuid {
        let task = Task::new(description);
        let id = task.id;

        self.tasks
            .lock()
            .expect("task map lock poisoned")
            .insert(id, task.clone());

        debug!(task_id = %id, description = %task.description, "Task created");
        self.emit(TaskEvent::TaskCreated { task });
        id
    }

    /// Read-only snapshot of a task
    pub fn get(&self, id: Uuid) -> Option<Task> {
        self.tasks
            .lock()
            .expect("task map lock poisoned")
            .get(&id)
            .cloned()
    }

    /// Snapshots of all tracked tasks (no pagination; eviction keeps this small)
    pub fn list(&self) -> Vec<Task> {
        self.tasks
            .lock()
            .expect("task map lock poisoned")
            .values()
            .cloned()
            .collect()
    }

    /// Remove terminal tasks whose end time is older than `max_age`.
    ///
    /// Returns the number of evicted tasks.
    pub fn evict_older_than(&self, max_age: Duration) -> usize {
        let now = Utc::now();
        let mut tasks = self.tasks.lock().expect("task map lock poisoned");
        let before = tasks.len();

        tasks.retain(|_, task| {
            if !task.status.is_terminal() {
                return true;
            }
            match task.ended_at {
                Some(ended_at) => {
                    let age = now.signed_duration_since(ended_at);
                    age.to_std().map(|age| age <= max_age).unwrap_or(true)
                }
                None => true,
            }
        });

        let evicted = before - tasks.len();
        if evicted > 0 {
            info!(evicted, "Evicted old terminal tasks");
        }
        evicted
    }

    /// Transition a task to `Running` and emit `TaskUpdated`
    pub(crate) fn mark_running(&self, id: Uuid) -> Result<()> {
        let task = self.mutate(id, |task| {
            task.status = TaskStatus::Running;
        })?;
        self.emit(TaskEvent::TaskUpdated { task });
        Ok(())
    }

    /// Update progress (clamped to 0..=100) and emit `TaskUpdated`
    pub(crate) fn update_progress(&self, id: Uuid, progress: u8) {
        let clamped = progress.min(100);
        if let Ok(task) = self.mutate(id, |task| {
            task.progress = clamped;
        }) {
            self.emit(TaskEvent::TaskUpdated { task });
        }
    }

    /// Mark a task completed with its result payload
    pub(crate) fn mark_completed(&self, id: Uuid, result: serde_json::Value) -> Result<()> {
        let task = self.mutate(id, |task| {
            task.status = TaskStatus::Completed;
            task.progress = 100;
            task.result = Some(result);
            task.ended_at = Some(Utc::now());
        })?;
        self.emit(TaskEvent::TaskUpdated { task: task.clone() });
        self.emit(TaskEvent::TaskCompleted { task });
        Ok(())
    }

    /// Mark a task failed with a human-readable message
    pub(crate) fn mark_failed(&self, id: Uuid, error: String) -> Result<()> {
        let task = self.mutate(id, |task| {
            task.status = TaskStatus::Failed;
            task.error = Some(error.clone());
            task.ended_at = Some(Utc::now());
        })?;
        self.emit(TaskEvent::TaskUpdated { task: task.clone() });
        self.emit(TaskEvent::TaskFailed { task });
        Ok(())
    }

    fn mutate(&self, id: Uuid, f: impl FnOnce(&mut Task)) -> Result<Task> {
        let mut tasks = self.tasks.lock().expect("task map lock poisoned");
        let task = tasks
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("task {}", id)))?;
        f(task);
        Ok(task.clone())
    }

    fn emit(&self, event: TaskEvent) {
        // No receivers is fine; subscribers come and go
        let _ = self.event_tx.send(event);
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}
