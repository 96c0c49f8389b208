//! Integration tests for the task registry and runner
//!
//! Covers the task lifecycle (create, run, complete/fail), progress
//! clamping, event fan-out over the broadcast channel, eviction of old
//! terminal tasks, and the bounded-concurrency batch runner.

use lingo_common::events::{TaskEvent, TaskStatus};
use lingo_common::Error;
use lingo_worker::tasks::{TaskRegistry, TaskRunner};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn make_runner() -> (Arc<TaskRegistry>, TaskRunner) {
    let registry = Arc::new(TaskRegistry::new());
    let runner = TaskRunner::new(Arc::clone(&registry));
    (registry, runner)
}

#[test]
fn create_and_get_task() {
    let registry = TaskRegistry::new();
    let id = registry.create("Importing something");

    let task = registry.get(id).unwrap();
    assert_eq!(task.id, id);
    assert_eq!(task.status, TaskStatus::Pending);
    assert_eq!(task.progress, 0);
    assert_eq!(task.description, "Importing something");
    assert!(task.result.is_none());
    assert!(task.error.is_none());
    assert!(task.ended_at.is_none());
}

#[test]
fn list_returns_all_tasks() {
    let registry = TaskRegistry::new();
    let a = registry.create("a");
    let b = registry.create("b");

    let listed = registry.list();
    assert_eq!(listed.len(), 2);
    assert!(listed.iter().any(|t| t.id == a));
    assert!(listed.iter().any(|t| t.id == b));
}

#[tokio::test]
async fn run_success_records_result_and_full_progress() {
    let (registry, runner) = make_runner();
    let id = registry.create("compute");

    let value = runner
        .run(id, |progress| async move {
            progress.report(30);
            Ok(serde_json::json!({"answer": 42}))
        })
        .await
        .unwrap();
    assert_eq!(value["answer"], 42);

    let task = registry.get(id).unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.progress, 100);
    assert_eq!(task.result.unwrap()["answer"], 42);
    assert!(task.ended_at.is_some());
}

#[tokio::test]
async fn run_failure_marks_task_failed_and_returns_error() {
    let (registry, runner) = make_runner();
    let id = registry.create("doomed");

    let result: Result<(), _> = runner
        .run(id, |_progress| async {
            Err(Error::InvalidInput("bad data".to_string()))
        })
        .await;
    assert!(result.is_err());

    let task = registry.get(id).unwrap();
    assert_eq!(task.status, TaskStatus::Failed);
    assert_eq!(task.error.as_deref(), Some("Invalid input: bad data"));
    assert!(task.ended_at.is_some());
}

#[tokio::test]
async fn progress_reports_clamp_to_one_hundred() {
    let (registry, runner) = make_runner();
    let id = registry.create("noisy");

    runner
        .run(id, |progress| async move {
            progress.report(250);
            let snapshot = progress.task_id();
            Ok(serde_json::json!({"task": snapshot}))
        })
        .await
        .unwrap();

    // Final state is completed at exactly 100 even after an over-range report
    let task = registry.get(id).unwrap();
    assert_eq!(task.progress, 100);
}

#[tokio::test]
async fn lifecycle_events_arrive_in_order() {
    let (registry, runner) = make_runner();
    let mut events = registry.subscribe();

    let id = registry.create("observed");
    runner
        .run(id, |progress| async move {
            progress.report(50);
            Ok(1u32)
        })
        .await
        .unwrap();

    let first = events.recv().await.unwrap();
    assert!(matches!(first, TaskEvent::TaskCreated { .. }));
    assert_eq!(first.task().id, id);

    // Running transition
    let second = events.recv().await.unwrap();
    assert!(matches!(second, TaskEvent::TaskUpdated { .. }));
    assert_eq!(second.task().status, TaskStatus::Running);

    // Progress report
    let third = events.recv().await.unwrap();
    assert_eq!(third.task().progress, 50);

    // Completion snapshot then terminal event
    let fourth = events.recv().await.unwrap();
    assert_eq!(fourth.task().status, TaskStatus::Completed);
    let fifth = events.recv().await.unwrap();
    assert!(matches!(fifth, TaskEvent::TaskCompleted { .. }));
    assert_eq!(fifth.task().progress, 100);
}

#[tokio::test]
async fn failed_task_emits_failed_event() {
    let (registry, runner) = make_runner();
    let mut events = registry.subscribe();

    let id = registry.create("observed failure");
    let _ = runner
        .run(id, |_p| async { Err::<(), _>(Error::Internal("boom".to_string())) })
        .await;

    let mut saw_failed = false;
    while let Ok(event) = events.try_recv() {
        if let TaskEvent::TaskFailed { task } = event {
            assert_eq!(task.id, id);
            assert_eq!(task.status, TaskStatus::Failed);
            saw_failed = true;
        }
    }
    assert!(saw_failed);
}

#[tokio::test]
async fn eviction_removes_only_old_terminal_tasks() {
    let (registry, runner) = make_runner();

    let finished = registry.create("finished");
    runner
        .run(finished, |_p| async { Ok(serde_json::Value::Null) })
        .await
        .unwrap();

    let pending = registry.create("still pending");

    // Zero max age makes any terminal task stale
    let evicted = registry.evict_older_than(Duration::ZERO);
    assert_eq!(evicted, 1);
    assert!(registry.get(finished).is_none());
    assert!(registry.get(pending).is_some());

    // Generous max age keeps fresh terminal tasks around
    let kept = registry.create("kept");
    runner
        .run(kept, |_p| async { Ok(serde_json::Value::Null) })
        .await
        .unwrap();
    assert_eq!(registry.evict_older_than(Duration::from_secs(3600)), 0);
    assert!(registry.get(kept).is_some());
}

#[tokio::test]
async fn run_batch_processes_everything_in_order() {
    let (registry, runner) = make_runner();

    let results = runner
        .run_batch(
            vec![1u32, 2, 3, 4, 5, 6, 7],
            "squaring",
            |n| async move { Ok(n * n) },
            3,
        )
        .await
        .unwrap();

    assert_eq!(results, vec![1, 4, 9, 16, 25, 36, 49]);

    // The batch created its own task and completed it
    let tasks = registry.list();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].status, TaskStatus::Completed);
    assert_eq!(tasks[0].progress, 100);
}

#[tokio::test]
async fn run_batch_never_exceeds_chunk_concurrency() {
    let (_registry, runner) = make_runner();

    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let chunk_size = 2;
    let results = runner
        .run_batch(
            (0..10u32).collect(),
            "bounded",
            |n| {
                let in_flight = Arc::clone(&in_flight);
                let peak = Arc::clone(&peak);
                async move {
                    let current = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(current, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok(n)
                }
            },
            chunk_size,
        )
        .await
        .unwrap();

    assert_eq!(results.len(), 10);
    assert!(peak.load(Ordering::SeqCst) <= chunk_size);
}

#[tokio::test]
async fn run_batch_single_failure_fails_the_whole_task() {
    let (registry, runner) = make_runner();

    let result = runner
        .run_batch(
            vec![1u32, 2, 3],
            "fragile",
            |n| async move {
                if n == 2 {
                    Err(Error::Internal("item 2 exploded".to_string()))
                } else {
                    Ok(n)
                }
            },
            5,
        )
        .await;

    assert!(result.is_err());
    let tasks = registry.list();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].status, TaskStatus::Failed);
    assert!(tasks[0].error.as_deref().unwrap().contains("item 2 exploded"));
}

#[tokio::test]
async fn run_batch_with_no_items_completes_immediately() {
    let (registry, runner) = make_runner();

    let results: Vec<u32> = runner
        .run_batch(Vec::new(), "empty", |n: u32| async move { Ok(n) }, 3)
        .await
        .unwrap();

    assert!(results.is_empty());
    assert_eq!(registry.list()[0].status, TaskStatus::Completed);
}
