//! Blank service error types.
//!
//! Errors fall into three groups:
//! - startup failures (bind, connect, ping, configuration) abort startup
//!   before the failing subsystem registers any task;
//! - runtime failures (`MonitoringError::Serve`) are reported through the
//!   task group and flip the status to `error`;
//! - teardown failures (`MonitoringError::DrainTimeout`,
//!   `StorageError::Close`) are reported through the task group and
//!   aggregated by the shutdown orchestrator.

use crate::config::ConfigError;
use std::time::Duration;
use thiserror::Error;

/// Monitoring subsystem errors.
#[derive(Debug, Error)]
pub enum MonitoringError {
    /// The listener could not be bound.
    #[error("Failed to bind monitoring listener on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The server stopped with an I/O error while running.
    #[error("Monitoring server failed: {0}")]
    Serve(#[source] std::io::Error),

    /// In-flight requests did not finish within the drain budget.
    #[error("Monitoring server did not drain within {}s", .0.as_secs_f64())]
    DrainTimeout(Duration),
}

/// Storage subsystem errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Opening the connection failed.
    #[error("Failed to connect to the database: {0}")]
    Connect(String),

    /// The connection was opened but the liveness check failed.
    #[error("Failed to ping the database: {0}")]
    Ping(String),

    /// Closing the connection failed.
    #[error("Failed to close database connection: {0}")]
    Close(String),
}

/// Fatal error raised while bringing the service up.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Failed to initialize config: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to initialize monitoring: {0}")]
    Monitoring(#[from] MonitoringError),

    #[error("Failed to initialize storage: {0}")]
    Storage(#[from] StorageError),
}
