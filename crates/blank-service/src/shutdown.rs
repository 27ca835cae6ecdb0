//! Shutdown orchestration.
//!
//! # Phases
//!
//! ```text
//! Running ──interrupt──▶ ShuttingDown ──join first──▶ CleanExit
//!                              │
//!                              └──deadline first──▶ ForcedExit
//! ```
//!
//! On interrupt the orchestrator cancels the root token, which is the single
//! trigger for every subsystem's teardown task, then races the task group
//! join against `shutdown.timeout`. Whichever finishes first decides the
//! outcome; the other is dropped without being cancelled, so tasks that are
//! still tearing down keep running until the process exits.

use common::{CancellationRoot, TaskError, TaskGroup};
use std::future::Future;
use std::time::Duration;
use tokio::signal;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Exit status of a clean shutdown.
pub const EXIT_CLEAN: u8 = 0;

/// Exit status of a startup failure or a clean shutdown with teardown errors.
pub const EXIT_FAILURE: u8 = 1;

/// Exit status when the shutdown deadline forced the exit.
pub const EXIT_FORCED: u8 = 2;

/// Lifecycle phase of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Running,
    ShuttingDown,
    CleanExit,
    ForcedExit,
}

/// Terminal result of a shutdown.
#[derive(Debug)]
pub enum ShutdownOutcome {
    /// Every task finished before the deadline. Carries the first task
    /// failure, if any.
    Clean(Result<(), TaskError>),

    /// The deadline elapsed first.
    Forced { timeout: Duration },
}

impl ShutdownOutcome {
    /// Process exit status for this outcome.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            ShutdownOutcome::Clean(Ok(())) => EXIT_CLEAN,
            ShutdownOutcome::Clean(Err(_)) => EXIT_FAILURE,
            ShutdownOutcome::Forced { .. } => EXIT_FORCED,
        }
    }

    #[must_use]
    pub fn is_forced(&self) -> bool {
        matches!(self, ShutdownOutcome::Forced { .. })
    }
}

/// Owner of the top-level shutdown sequence.
pub struct Orchestrator {
    root: CancellationRoot,
    tasks: TaskGroup,
    timeout: Duration,
    phase: watch::Sender<Phase>,
}

impl Orchestrator {
    /// Create an orchestrator in the `Running` phase.
    #[must_use]
    pub fn new(root: CancellationRoot, tasks: TaskGroup, timeout: Duration) -> Self {
        let (phase, _rx) = watch::channel(Phase::Running);
        Self {
            root,
            tasks,
            timeout,
            phase,
        }
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    /// Receiver notified on each phase transition. Keeps the last phase
    /// readable after the orchestrator is consumed.
    #[must_use]
    pub fn subscribe_phase(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    /// Wait for `interrupt`, then shut down.
    pub async fn run<S>(self, interrupt: S) -> ShutdownOutcome
    where
        S: Future<Output = ()>,
    {
        info!(target: "blank.shutdown", tasks = self.tasks.len(), "Running until interrupted");
        interrupt.await;
        info!(target: "blank.shutdown", "Received an interrupt signal");

        self.shutdown().await
    }

    /// Cancel the root token and wait for tasks, bounded by the timeout.
    pub async fn shutdown(self) -> ShutdownOutcome {
        let Self {
            root,
            tasks,
            timeout,
            phase,
        } = self;

        phase.send_replace(Phase::ShuttingDown);
        root.cancel();

        tokio::select! {
            biased;

            result = tasks.join() => {
                phase.send_replace(Phase::CleanExit);
                match &result {
                    Ok(()) => debug!(target: "blank.shutdown", "All tasks exited"),
                    Err(e) => error!(
                        target: "blank.shutdown",
                        error = %e,
                        "Failed to wait for tasks to finish"
                    ),
                }
                ShutdownOutcome::Clean(result)
            }
            () = tokio::time::sleep(timeout) => {
                phase.send_replace(Phase::ForcedExit);
                warn!(
                    target: "blank.shutdown",
                    timeout_secs = timeout.as_secs_f64(),
                    "Shutdown timeout"
                );
                ShutdownOutcome::Forced { timeout }
            }
        }
    }
}

/// Resolve when the process receives SIGINT (Ctrl+C) or, on Unix, SIGTERM.
///
/// A handler that fails to install is logged and never fires.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(target: "blank.shutdown", error = %e, "Failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(target: "blank.shutdown", error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
