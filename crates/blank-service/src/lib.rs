//! Blank Service Library
//!
//! A minimal service skeleton: a status endpoint, an optional Postgres
//! connection, and a shutdown sequence that gives every subsystem a bounded
//! window to close before the process exits.
//!
//! # Lifecycle
//!
//! ```text
//! main
//! ├── CancellationRoot ─┬─▶ monitoring.serve / monitoring.teardown
//! ├── TaskGroup ────────┤
//! ├── StatusRegistry ───┴─▶ storage.teardown
//! └── Orchestrator: interrupt → cancel root → join tasks | shutdown.timeout
//! ```
//!
//! The root token, task group and status registry are created once in
//! `main` and passed to each subsystem's `initialize`.
//!
//! # Modules
//!
//! - [`config`] - layered configuration (defaults, YAML file, environment)
//! - [`monitoring`] - status endpoint subsystem
//! - [`storage`] - database subsystem
//! - [`shutdown`] - shutdown orchestrator and signal handling
//! - [`status`] - shared coarse status

#![warn(clippy::pedantic)]

pub mod cli;
pub mod config;
pub mod errors;
pub mod monitoring;
pub mod observability;
pub mod shutdown;
pub mod status;
pub mod storage;
