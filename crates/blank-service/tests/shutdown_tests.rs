//! Shutdown sequence tests.
//!
//! Uses tokio's paused clock so timeout races are deterministic.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod support;

use blank_service::config::MonitoringConfig;
use blank_service::errors::StorageError;
use blank_service::monitoring;
use blank_service::shutdown::{Orchestrator, Phase, ShutdownOutcome, EXIT_FORCED};
use blank_service::status::{Status, StatusRegistry};
use blank_service::storage;
use common::{CancellationRoot, TaskError, TaskGroup};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use support::FakeDatabase;
use thiserror::Error;
use tokio::time::Instant;

#[derive(Debug, Error)]
#[error("drain exceeded {0:?}")]
struct DrainTimeout(Duration);

/// Teardown that needs `takes` to drain, bounded by its own `budget`.
fn spawn_drain(
    tasks: &TaskGroup,
    root: &CancellationRoot,
    takes: Duration,
    budget: Duration,
    done: Arc<AtomicBool>,
) {
    let token = root.child_token();
    tasks.spawn("drain", async move {
        token.cancelled().await;
        tokio::time::timeout(budget, tokio::time::sleep(takes))
            .await
            .map_err(|_| DrainTimeout(budget))?;
        done.store(true, Ordering::SeqCst);
        Ok::<(), DrainTimeout>(())
    });
}

#[tokio::test(start_paused = true)]
async fn test_slow_storage_teardown_forces_exit_at_deadline() {
    let root = CancellationRoot::new();
    let tasks = TaskGroup::new();
    let status = StatusRegistry::new();

    let drained = Arc::new(AtomicBool::new(false));
    spawn_drain(
        &tasks,
        &root,
        Duration::from_secs(1),
        Duration::from_secs(5),
        Arc::clone(&drained),
    );

    let storage = storage::initialize_with(
        FakeDatabase::slow_close(Duration::from_secs(10)),
        status.clone(),
        &tasks,
        root.child_token(),
    )
    .await
    .unwrap();

    let orchestrator = Orchestrator::new(root, tasks, Duration::from_secs(3));
    let phase = orchestrator.subscribe_phase();

    let started = Instant::now();
    let outcome = orchestrator.shutdown().await;
    let elapsed = started.elapsed();

    assert!(outcome.is_forced());
    assert_eq!(outcome.exit_code(), EXIT_FORCED);
    assert_eq!(*phase.borrow(), Phase::ForcedExit);
    assert!(elapsed >= Duration::from_secs(3));
    assert!(elapsed < Duration::from_millis(3100));

    assert!(drained.load(Ordering::SeqCst), "1s drain finished within its budget");
    assert_eq!(storage.database().close_calls(), 1, "close was started");
    assert!(!storage.database().is_closed(), "close was abandoned, not awaited");
}

#[tokio::test(start_paused = true)]
async fn test_fast_teardown_exits_cleanly_before_deadline() {
    let root = CancellationRoot::new();
    let tasks = TaskGroup::new();

    let drained = Arc::new(AtomicBool::new(false));
    spawn_drain(
        &tasks,
        &root,
        Duration::from_secs(1),
        Duration::from_secs(5),
        Arc::clone(&drained),
    );

    let storage = storage::initialize_with(
        FakeDatabase::slow_close(Duration::from_millis(500)),
        StatusRegistry::new(),
        &tasks,
        root.child_token(),
    )
    .await
    .unwrap();

    let started = Instant::now();
    let outcome = Orchestrator::new(root, tasks, Duration::from_secs(30))
        .shutdown()
        .await;

    assert!(matches!(outcome, ShutdownOutcome::Clean(Ok(()))));
    assert!(started.elapsed() < Duration::from_secs(2), "does not wait the full timeout");
    assert!(drained.load(Ordering::SeqCst));
    assert!(storage.database().is_closed());
}

#[tokio::test(start_paused = true)]
async fn test_drain_over_budget_is_reported_but_does_not_block() {
    let root = CancellationRoot::new();
    let tasks = TaskGroup::new();

    let drained = Arc::new(AtomicBool::new(false));
    spawn_drain(
        &tasks,
        &root,
        Duration::from_secs(60),
        Duration::from_secs(2),
        Arc::clone(&drained),
    );

    let outcome = Orchestrator::new(root, tasks, Duration::from_secs(30))
        .shutdown()
        .await;

    match outcome {
        ShutdownOutcome::Clean(Err(e)) => assert_eq!(e.task(), "drain"),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(!drained.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_two_failing_teardowns_report_first_and_both_close() {
    let root = CancellationRoot::new();
    let tasks = TaskGroup::new();
    let status = StatusRegistry::new();

    let first = storage::initialize_with(
        FakeDatabase {
            close_delay: Duration::from_millis(50),
            ..FakeDatabase::failing_close("first close failed")
        },
        status.clone(),
        &tasks,
        root.child_token(),
    )
    .await
    .unwrap();

    let second = storage::initialize_with(
        FakeDatabase::failing_close("second close failed"),
        status.clone(),
        &tasks,
        root.child_token(),
    )
    .await
    .unwrap();

    let outcome = Orchestrator::new(root, tasks, Duration::from_secs(5))
        .shutdown()
        .await;

    let ShutdownOutcome::Clean(Err(err)) = outcome else {
        panic!("expected a clean shutdown carrying an error");
    };

    match err {
        TaskError::Failed { source, .. } => {
            let source = source.downcast_ref::<StorageError>().unwrap();
            assert!(
                matches!(source, StorageError::Close(msg) if msg == "first close failed"),
                "got {source:?}"
            );
        }
        other => panic!("unexpected error: {other:?}"),
    }

    assert_eq!(first.database().close_calls(), 1);
    assert_eq!(second.database().close_calls(), 1);
    assert_eq!(status.get(), Status::Error);
}

#[tokio::test]
async fn test_full_stack_shutdown_is_clean() {
    let root = CancellationRoot::new();
    let tasks = TaskGroup::new();
    let status = StatusRegistry::new();

    let cfg = MonitoringConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        timeout_seconds: 5,
    };
    let monitoring = monitoring::initialize(&cfg, status.clone(), &tasks, root.child_token())
        .await
        .unwrap();
    let storage = storage::initialize_with(
        FakeDatabase::healthy(),
        status.clone(),
        &tasks,
        root.child_token(),
    )
    .await
    .unwrap();

    assert_eq!(tasks.len(), 3);

    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let orchestrator = Orchestrator::new(root, tasks, Duration::from_secs(5));
    let phase = orchestrator.subscribe_phase();
    let run = tokio::spawn(orchestrator.run(async move {
        let _ = rx.await;
    }));

    let response = reqwest::get(format!("http://{}/", monitoring.local_addr()))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), r#"{"status":"ok"}"#);
    assert_eq!(*phase.borrow(), Phase::Running);

    tx.send(()).unwrap();
    let outcome = run.await.unwrap();

    assert!(matches!(outcome, ShutdownOutcome::Clean(Ok(()))));
    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(*phase.borrow(), Phase::CleanExit);
    assert!(storage.database().is_closed());
    assert_eq!(status.get(), Status::Ok);
}
