//! Monitoring subsystem.
//!
//! Owns the HTTP listener behind the status endpoint and registers two tasks
//! with the shared [`TaskGroup`]:
//!
//! - `monitoring.serve` accepts connections until the listener is drained.
//!   A clean close is success; an I/O failure sets the status to `error`.
//! - `monitoring.teardown` waits for the shutdown token, starts the drain and
//!   gives in-flight requests `monitoring.timeout` seconds to finish. If they
//!   do not, the drain is abandoned, the serve task stops, and the timeout is
//!   reported as [`MonitoringError::DrainTimeout`].
//!
//! The listener is bound before any task is spawned, so a bind failure leaves
//! nothing registered.

pub mod health;

use crate::config::MonitoringConfig;
use crate::errors::MonitoringError;
use crate::status::{Status, StatusRegistry};
use axum::Router;
use common::TaskGroup;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

pub use health::{monitoring_router, StatusResponse};

/// Running monitoring subsystem.
#[derive(Debug, Clone)]
pub struct MonitoringHandle {
    local_addr: SocketAddr,
    status: StatusRegistry,
}

impl MonitoringHandle {
    /// Address the listener is bound to.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Update the reported status. Setting the current value is a no-op.
    pub fn set_status(&self, status: Status) -> bool {
        self.status.set(status)
    }

    /// Current reported status.
    #[must_use]
    pub fn status(&self) -> Status {
        self.status.get()
    }
}

/// Bind the monitoring listener and register its serve and teardown tasks.
///
/// # Errors
///
/// Returns [`MonitoringError::Bind`] if the listener cannot be bound. No task
/// is registered in that case.
#[instrument(skip_all, name = "blank.monitoring.initialize", fields(addr = %cfg.bind_address()))]
pub async fn initialize(
    cfg: &MonitoringConfig,
    status: StatusRegistry,
    tasks: &TaskGroup,
    shutdown: CancellationToken,
) -> Result<MonitoringHandle, MonitoringError> {
    let addr = cfg.bind_address();

    let listener = TcpListener::bind(&addr).await.map_err(|source| {
        error!(target: "blank.monitoring", error = %source, addr = %addr, "Failed to bind monitoring listener");
        MonitoringError::Bind {
            addr: addr.clone(),
            source,
        }
    })?;

    let local_addr = listener
        .local_addr()
        .map_err(|source| MonitoringError::Bind { addr, source })?;

    info!(target: "blank.monitoring", addr = %local_addr, "Monitoring server listens");

    let app = monitoring_router(status.clone());
    register_tasks(listener, app, cfg.timeout(), status.clone(), tasks, shutdown);

    Ok(MonitoringHandle { local_addr, status })
}

/// Spawn the serve and teardown tasks for an already bound listener.
fn register_tasks(
    listener: TcpListener,
    app: Router,
    drain_timeout: Duration,
    status: StatusRegistry,
    tasks: &TaskGroup,
    shutdown: CancellationToken,
) {
    // Teardown starts the drain, and abandons it when the budget runs out.
    let drain = CancellationToken::new();
    let abandon = CancellationToken::new();
    let (closed_tx, closed_rx) = oneshot::channel::<()>();

    let serve_drain = drain.clone();
    let serve_abandon = abandon.clone();
    tasks.spawn("monitoring.serve", async move {
        let server = axum::serve(listener, app)
            .with_graceful_shutdown(serve_drain.cancelled_owned())
            .into_future();

        let result = tokio::select! {
            result = server => result,
            () = serve_abandon.cancelled() => {
                warn!(target: "blank.monitoring", "Monitoring server stopped with requests still in flight");
                Ok(())
            }
        };

        // Teardown may already have given up waiting.
        let _ = closed_tx.send(());

        match result {
            Ok(()) => {
                info!(target: "blank.monitoring", "Monitoring server closed");
                Ok(())
            }
            Err(e) => {
                error!(target: "blank.monitoring", error = %e, "Monitoring server failed");
                status.set(Status::Error);
                Err(MonitoringError::Serve(e))
            }
        }
    });

    tasks.spawn("monitoring.teardown", async move {
        shutdown.cancelled().await;
        debug!(target: "blank.monitoring", "Closing monitoring server");
        drain.cancel();

        // A dropped sender means the serve task is gone, which also counts
        // as closed.
        if tokio::time::timeout(drain_timeout, closed_rx).await.is_ok() {
            info!(target: "blank.monitoring", "Closed monitoring server");
            Ok(())
        } else {
            error!(
                target: "blank.monitoring",
                timeout_secs = drain_timeout.as_secs_f64(),
                "Monitoring server close timeout"
            );
            abandon.cancel();
            Err(MonitoringError::DrainTimeout(drain_timeout))
        }
    });
}
