//! Task execution with progress tracking
//!
//! `run` executes one unit of work under an existing task; `run_batch`
//! creates its own task and processes many sub-items with bounded
//! concurrency. A batch never has more than `chunk_size` items in flight and
//! the next chunk only starts after the previous one fully settled.

use crate::tasks::TaskRegistry;
use futures::future::join_all;
use lingo_common::Result;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Progress reporter handed to work functions.
///
/// Each `report` call clamps to 0..=100, updates the task, and publishes a
/// `TaskUpdated` event.
#[derive(Clone)]
pub struct ProgressHandle {
    registry: Arc<TaskRegistry>,
    task_id: Uuid,
}

impl ProgressHandle {
    /// Report completion percentage (values above 100 are clamped)
    pub fn report(&self, percent: u8) {
        self.registry.update_progress(self.task_id, percent);
    }

    /// Report progress as processed/total
    pub fn report_ratio(&self, processed: usize, total: usize) {
        if total == 0 {
            self.report(100);
            return;
        }
        let percent = (processed as f64 / total as f64 * 100.0).floor() as u8;
        self.report(percent);
    }

    /// Id of the task this handle reports into
    pub fn task_id(&self) -> Uuid {
        self.task_id
    }
}

/// Executes work functions under registry-tracked tasks
#[derive(Clone)]
pub struct TaskRunner {
    registry: Arc<TaskRegistry>,
}

impl TaskRunner {
    pub fn new(registry: Arc<TaskRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }

    /// Execute `work` under the given task.
    ///
    /// On success the task is marked completed with the serialized result and
    /// progress 100. On failure the task is marked failed with the error's
    /// display string, and the error is returned to the caller. Fire-and-forget
    /// callers must log rather than propagate (the task already records it).
    pub async fn run<T, F, Fut>(&self, task_id: Uuid, work: F) -> Result<T>
    where
        T: Serialize,
        F: FnOnce(ProgressHandle) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.registry.mark_running(task_id)?;

        let handle = ProgressHandle {
            registry: Arc::clone(&self.registry),
            task_id,
        };

        match work(handle).await {
            Ok(value) => {
                let payload = serde_json::to_value(&value)?;
                self.registry.mark_completed(task_id, payload)?;
                debug!(task_id = %task_id, "Task completed");
                Ok(value)
            }
            Err(e) => {
                warn!(task_id = %task_id, error = %e, "Task failed");
                self.registry.mark_failed(task_id, e.to_string())?;
                Err(e)
            }
        }
    }

    /// Process `items` in chunks of `chunk_size` under a new task.
    ///
    /// Items within a chunk run concurrently; chunks run strictly one after
    /// another. Overall progress is processed/total after each chunk. A
    /// single item failure fails the whole batch task; callers wanting
    /// partial tolerance wrap each item in their own error capture.
    pub async fn run_batch<T, R, F, Fut>(
        &self,
        items: Vec<T>,
        description: &str,
        per_item: F,
        chunk_size: usize,
    ) -> Result<Vec<R>>
    where
        R: Serialize,
        F: Fn(T) -> Fut,
        Fut: Future<Output = Result<R>>,
    {
        let task_id = self.registry.create(description);
        let chunk_size = chunk_size.max(1);

        self.run(task_id, |progress| async move {
            let total = items.len();
            let mut results = Vec::with_capacity(total);
            let mut processed = 0usize;

            let mut iter = items.into_iter();
            loop {
                let chunk: Vec<T> = iter.by_ref().take(chunk_size).collect();
                if chunk.is_empty() {
                    break;
                }

                let chunk_len = chunk.len();
                let chunk_results = join_all(chunk.into_iter().map(&per_item)).await;

                for result in chunk_results {
                    results.push(result?);
                }

                processed += chunk_len;
                progress.report_ratio(processed, total);
            }

            Ok(results)
        })
        .await
    }
}
