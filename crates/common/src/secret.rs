//! Secret types for protecting sensitive values from accidental logging.
//!
//! Re-exports the [`secrecy`] types used for credentials such as the database
//! password. `SecretString` implements `Debug` with redaction, so deriving
//! `Debug` on a configuration struct that holds one stays safe to log.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct DatabaseCredentials {
//!     user: String,
//!     pass: SecretString,
//! }
//!
//! let creds = DatabaseCredentials {
//!     user: "blank".to_string(),
//!     pass: SecretString::from("hunter2"),
//! };
//!
//! assert!(!format!("{creds:?}").contains("hunter2"));
//! assert_eq!(creds.pass.expose_secret(), "hunter2");
//! ```
//!
//! Values are zeroized when dropped.

pub use secrecy::{ExposeSecret, SecretBox, SecretString};
