//! Cancellation root for process shutdown.
//!
//! A single [`CancellationRoot`] is created when the process starts. Cancelling
//! it is the one signal that shutdown has begun: every subsystem holds a clone
//! (or a child) of its token and runs its teardown once the token fires.
//!
//! Cancellation is one-way. Tokens derived from the root (via
//! [`CancellationToken::child_token`] or [`with_deadline`]) are cancelled
//! whenever the root is, and nothing can un-cancel them.

use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Owner of the root shutdown token.
///
/// Cloning the root is cheap and every clone controls the same token.
#[derive(Debug, Clone, Default)]
pub struct CancellationRoot {
    token: CancellationToken,
}

impl CancellationRoot {
    /// Create a new, not yet cancelled root.
    #[must_use]
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Token to hand to subsystems.
    ///
    /// Holders can test [`CancellationToken::is_cancelled`] or await
    /// [`CancellationToken::cancelled`], but cancelling a clone cancels the
    /// root as well, so subsystems should prefer [`Self::child_token`].
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Token that observes the root but whose own cancellation does not
    /// propagate upwards.
    #[must_use]
    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }

    /// Begin shutdown. Repeated calls are no-ops.
    pub fn cancel(&self) {
        if !self.token.is_cancelled() {
            debug!(target: "common.cancellation", "Cancelling root token");
        }
        self.token.cancel();
    }

    /// Whether shutdown has begun.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Derive a token from `parent` that also cancels itself once `deadline`
/// has elapsed.
///
/// The timer runs on the current Tokio runtime and stops early if the child
/// is cancelled first (for example because the parent was cancelled).
///
/// # Panics
///
/// Must be called from within a Tokio runtime.
#[must_use]
pub fn with_deadline(parent: &CancellationToken, deadline: Duration) -> CancellationToken {
    let child = parent.child_token();
    let timer = child.clone();

    tokio::spawn(async move {
        tokio::select! {
            () = timer.cancelled() => {}
            () = tokio::time::sleep(deadline) => {
                debug!(
                    target: "common.cancellation",
                    deadline_ms = deadline.as_millis(),
                    "Deadline elapsed, cancelling derived token"
                );
                timer.cancel();
            }
        }
    });

    child
}
