//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use blank_service::errors::StorageError;
use blank_service::storage::Database;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// In-memory [`Database`] with scripted behaviour.
#[derive(Debug, Default)]
pub struct FakeDatabase {
    pub fail_ping: bool,
    pub close_error: Option<&'static str>,
    pub close_delay: Duration,
    pub close_calls: AtomicUsize,
    pub closed: AtomicBool,
}

impl FakeDatabase {
    pub fn healthy() -> Self {
        Self::default()
    }

    pub fn unreachable() -> Self {
        Self {
            fail_ping: true,
            ..Self::default()
        }
    }

    pub fn failing_close(message: &'static str) -> Self {
        Self {
            close_error: Some(message),
            ..Self::default()
        }
    }

    pub fn slow_close(delay: Duration) -> Self {
        Self {
            close_delay: delay,
            ..Self::default()
        }
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Database for FakeDatabase {
    async fn ping(&self) -> Result<(), StorageError> {
        if self.fail_ping {
            Err(StorageError::Ping("connection refused".to_string()))
        } else {
            Ok(())
        }
    }

    async fn close(&self) -> Result<(), StorageError> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.close_delay).await;

        if let Some(message) = self.close_error {
            return Err(StorageError::Close(message.to_string()));
        }

        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
