//! Blank Service
//!
//! # Startup Flow
//!
//! 1. Parse flags and initialise logging
//! 2. Load configuration (defaults, config file, environment)
//! 3. Create the status registry, cancellation root and task group
//! 4. Start monitoring (bind the listener, spawn serve + teardown)
//! 5. Connect storage when `pg.host` is configured
//! 6. Wait for SIGINT/SIGTERM, then shut down within `shutdown.timeout`
//!
//! Exit status: 0 clean, 1 startup failure or teardown error, 2 forced exit.

#![warn(clippy::pedantic)]

use blank_service::cli::Cli;
use blank_service::config::Config;
use blank_service::errors::StartupError;
use blank_service::shutdown::{shutdown_signal, Orchestrator, ShutdownOutcome, EXIT_FAILURE};
use blank_service::status::StatusRegistry;
use blank_service::{monitoring, observability, storage};
use clap::Parser;
use common::{CancellationRoot, TaskGroup};
use std::process::ExitCode;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    observability::init_tracing(cli.verbose);

    info!("Starting Blank service");

    match run(&cli).await {
        Ok(outcome @ ShutdownOutcome::Forced { .. }) => {
            // Teardown tasks may still be running; do not wait for the runtime.
            warn!("Forcing process exit");
            std::process::exit(i32::from(outcome.exit_code()));
        }
        Ok(outcome) => {
            info!(exit_code = outcome.exit_code(), "Blank service shutdown complete");
            ExitCode::from(outcome.exit_code())
        }
        Err(e) => {
            error!(error = %e, "Startup failed");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

async fn run(cli: &Cli) -> Result<ShutdownOutcome, StartupError> {
    let config = Config::from_env(cli.config.as_deref()).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        monitoring_address = %config.monitoring.bind_address(),
        monitoring_timeout_seconds = config.monitoring.timeout_seconds,
        shutdown_timeout_seconds = config.shutdown.timeout_seconds,
        storage_enabled = config.pg.is_some(),
        "Configuration loaded successfully"
    );

    let status = StatusRegistry::new();
    let root = CancellationRoot::new();
    let tasks = TaskGroup::new();

    // Nothing is registered yet, so a bind failure needs no teardown.
    let monitoring =
        monitoring::initialize(&config.monitoring, status.clone(), &tasks, root.child_token())
            .await?;
    info!(addr = %monitoring.local_addr(), "Monitoring started");

    let _storage = match &config.pg {
        Some(pg) => {
            match storage::initialize(pg, status.clone(), &tasks, root.child_token()).await {
                Ok(handle) => Some(handle),
                Err(e) => {
                    // Monitoring is already running and must be torn down.
                    let outcome = Orchestrator::new(root, tasks, config.shutdown.timeout())
                        .shutdown()
                        .await;
                    warn!(forced = outcome.is_forced(), "Aborted startup");
                    return Err(e.into());
                }
            }
        }
        None => {
            info!("Storage disabled (pg.host not set)");
            None
        }
    };

    let orchestrator = Orchestrator::new(root, tasks, config.shutdown.timeout());
    Ok(orchestrator.run(shutdown_signal()).await)
}
