//! Task group for subsystem background work.
//!
//! Subsystems register named, fallible tasks with a shared [`TaskGroup`]. The
//! shutdown path then calls [`TaskGroup::join`] once to wait for all of them.
//!
//! # Semantics
//!
//! - Tasks run on the Tokio runtime as soon as they are spawned.
//! - The group never cancels tasks. A failing task does not stop its
//!   siblings; cancellation is driven by the shared shutdown token.
//! - `join` waits for every task, including tasks spawned by other tasks
//!   while the join is in progress, and returns the first failure in spawn
//!   order.
//! - A panicking task is reported as [`TaskError::Panicked`] and is otherwise
//!   treated like any other failed task.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Boxed error returned by a task.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure of a single task, as surfaced by [`TaskGroup::join`].
#[derive(Debug, Error)]
pub enum TaskError {
    /// The task returned an error.
    #[error("task '{task}' failed: {source}")]
    Failed {
        task: String,
        #[source]
        source: BoxError,
    },

    /// The task panicked.
    #[error("task '{task}' panicked")]
    Panicked { task: String },

    /// The task was aborted by the runtime before completing.
    #[error("task '{task}' was cancelled by the runtime")]
    Aborted { task: String },
}

impl TaskError {
    /// Name of the task this error belongs to.
    #[must_use]
    pub fn task(&self) -> &str {
        match self {
            TaskError::Failed { task, .. }
            | TaskError::Panicked { task }
            | TaskError::Aborted { task } => task,
        }
    }
}

struct RegisteredTask {
    name: String,
    handle: JoinHandle<Result<(), BoxError>>,
}

#[derive(Default)]
struct Inner {
    pending: Mutex<VecDeque<RegisteredTask>>,
    spawned: AtomicUsize,
}

/// Shared, append-only group of background tasks.
///
/// Clones refer to the same group, so a task can hold a clone and spawn
/// follow-up work into it.
#[derive(Clone, Default)]
pub struct TaskGroup {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for TaskGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskGroup")
            .field("spawned", &self.len())
            .field("pending", &self.pending().len())
            .finish()
    }
}

impl TaskGroup {
    /// Create an empty group.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `task` under `name` and start running it.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn<F, E>(&self, name: impl Into<String>, task: F)
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        let name = name.into();
        debug!(target: "common.task_group", task = %name, "Spawning task");

        let handle = tokio::spawn(async move { task.await.map_err(Into::into) });

        self.pending().push_back(RegisteredTask { name, handle });
        self.inner.spawned.fetch_add(1, Ordering::SeqCst);
    }

    /// Number of tasks registered so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.spawned.load(Ordering::SeqCst)
    }

    /// Whether no task has been registered yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait for every registered task to finish.
    ///
    /// Returns the first failure in spawn order, or `Ok(())` if every task
    /// succeeded. All tasks are awaited even after a failure.
    pub async fn join(self) -> Result<(), TaskError> {
        let mut first_error: Option<TaskError> = None;
        let mut joined = 0usize;

        loop {
            let batch: Vec<RegisteredTask> = self.pending().drain(..).collect();
            if batch.is_empty() {
                break;
            }

            for RegisteredTask { name, handle } in batch {
                joined += 1;
                let error = match handle.await {
                    Ok(Ok(())) => {
                        debug!(target: "common.task_group", task = %name, "Task finished");
                        continue;
                    }
                    Ok(Err(source)) => TaskError::Failed { task: name, source },
                    Err(e) if e.is_panic() => TaskError::Panicked { task: name },
                    Err(_) => TaskError::Aborted { task: name },
                };

                warn!(target: "common.task_group", error = %error, "Task failed");
                first_error.get_or_insert(error);
            }
        }

        debug!(target: "common.task_group", joined, "All tasks joined");

        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn pending(&self) -> MutexGuard<'_, VecDeque<RegisteredTask>> {
        self.inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
