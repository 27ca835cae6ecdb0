//! Lifecycle primitives shared by Blank services.
//!
//! - [`cancellation`]: the root shutdown token and deadline-derived tokens
//! - [`task_group`]: registration and joining of fallible background tasks
//! - [`secret`]: redacting wrappers for credentials

#![warn(clippy::pedantic)]

pub mod cancellation;
pub mod secret;
pub mod task_group;

pub use cancellation::{with_deadline, CancellationRoot};
pub use task_group::{TaskError, TaskGroup};
