//! Storage subsystem.
//!
//! Owns the database connection. Initialisation opens the connection and
//! pings it; either failure flips the status to `error` and aborts startup
//! without registering anything.
//!
//! On success exactly one task is registered, `storage.teardown`, which waits
//! for the shutdown token and closes the connection. A close failure flips the
//! status to `error` and is reported through the task group. There is no serve
//! task: request handlers use the connection directly through
//! [`StorageHandle::database`].

pub mod postgres;

use crate::config::PgConfig;
use crate::errors::StorageError;
use crate::status::{Status, StatusRegistry};
use async_trait::async_trait;
use common::TaskGroup;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

pub use postgres::PgDatabase;

/// Connection owned by the storage subsystem.
#[async_trait]
pub trait Database: Send + Sync + 'static {
    /// Liveness check.
    async fn ping(&self) -> Result<(), StorageError>;

    /// Close the connection. Called once, during shutdown.
    async fn close(&self) -> Result<(), StorageError>;
}

/// Running storage subsystem.
#[derive(Debug)]
pub struct StorageHandle<D> {
    database: Arc<D>,
}

impl<D> Clone for StorageHandle<D> {
    fn clone(&self) -> Self {
        Self {
            database: Arc::clone(&self.database),
        }
    }
}

impl<D: Database> StorageHandle<D> {
    /// Shared access to the connection.
    #[must_use]
    pub fn database(&self) -> &Arc<D> {
        &self.database
    }
}

/// Connect to Postgres and register the close-on-shutdown task.
///
/// # Errors
///
/// Returns [`StorageError::Connect`] or [`StorageError::Ping`] if the database
/// is unreachable. The status is set to `error` and no task is registered.
#[instrument(skip_all, name = "blank.storage.initialize", fields(host = %cfg.host, port = cfg.port))]
pub async fn initialize(
    cfg: &PgConfig,
    status: StatusRegistry,
    tasks: &TaskGroup,
    shutdown: CancellationToken,
) -> Result<StorageHandle<PgDatabase>, StorageError> {
    status.set(Status::Ok);

    debug!(target: "blank.storage", "Connecting to the database");
    let database = PgDatabase::open(cfg).await.map_err(|e| {
        error!(target: "blank.storage", error = %e, "Failed to connect to the database");
        status.set(Status::Error);
        e
    })?;

    initialize_with(database, status, tasks, shutdown).await
}

/// Ping an opened connection and register the close-on-shutdown task.
///
/// # Errors
///
/// Returns [`StorageError::Ping`] (or whatever the ping reports) if the
/// liveness check fails. The status is set to `error` and no task is
/// registered.
pub async fn initialize_with<D: Database>(
    database: D,
    status: StatusRegistry,
    tasks: &TaskGroup,
    shutdown: CancellationToken,
) -> Result<StorageHandle<D>, StorageError> {
    if let Err(e) = database.ping().await {
        error!(target: "blank.storage", error = %e, "Failed to ping the database");
        status.set(Status::Error);
        return Err(e);
    }

    info!(target: "blank.storage", "Database connection established");

    let database = Arc::new(database);
    let teardown_db = Arc::clone(&database);
    tasks.spawn("storage.teardown", async move {
        shutdown.cancelled().await;
        debug!(target: "blank.storage", "Closing database connection");

        if let Err(e) = teardown_db.close().await {
            error!(target: "blank.storage", error = %e, "Failed to close database connection");
            status.set(Status::Error);
            return Err(e);
        }

        info!(target: "blank.storage", "Closed database connection");
        Ok(())
    });

    Ok(StorageHandle { database })
}
