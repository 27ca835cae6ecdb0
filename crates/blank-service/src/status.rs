//! Coarse service status shared between subsystems.
//!
//! Any subsystem may write the status; the monitoring endpoint reads it.
//! Only the current value is kept. Writes go through a `watch` channel so
//! they are serialised, and a write of the value already stored is a no-op:
//! subscribers are not notified and nothing is logged.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// Coarse health status reported by the monitoring endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Error,
}

impl Status {
    /// Wire representation (`"ok"` / `"error"`).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Ok => "ok",
            Status::Error => "error",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared holder of the current [`Status`].
///
/// Cheap to clone; all clones refer to the same value.
#[derive(Debug, Clone)]
pub struct StatusRegistry {
    tx: Arc<watch::Sender<Status>>,
}

impl Default for StatusRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusRegistry {
    /// Create a registry starting at [`Status::Ok`].
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Status::Ok);
        Self { tx: Arc::new(tx) }
    }

    /// Current status.
    #[must_use]
    pub fn get(&self) -> Status {
        *self.tx.borrow()
    }

    /// Update the status.
    ///
    /// Returns `true` if the value changed. Setting the current value again
    /// does nothing.
    pub fn set(&self, status: Status) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });

        if changed {
            info!(target: "blank.status", status = %status, "Status changed");
        }

        changed
    }

    /// Receiver notified on every status transition.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Status> {
        self.tx.subscribe()
    }
}
