//! Postgres-backed [`Database`].

use super::Database;
use crate::config::PgConfig;
use crate::errors::StorageError;
use async_trait::async_trait;
use common::secret::ExposeSecret;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgSslMode};

/// Postgres connection pool.
#[derive(Debug, Clone)]
pub struct PgDatabase {
    pool: PgPool,
}

impl PgDatabase {
    /// Open a pool, establishing the first connection.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Connect`] if no connection can be established
    /// within `pg.connect_timeout`.
    pub async fn open(cfg: &PgConfig) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(cfg.max_connections)
            .acquire_timeout(cfg.connect_timeout())
            .connect_with(connect_options(cfg))
            .await
            .map_err(|e| StorageError::Connect(e.to_string()))?;

        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Pool for request handlers.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Database for PgDatabase {
    async fn ping(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| StorageError::Ping(e.to_string()))
    }

    async fn close(&self) -> Result<(), StorageError> {
        // Waits for checked-out connections to be returned.
        self.pool.close().await;
        Ok(())
    }
}

/// Connection options equivalent to
/// `host=.. port=.. user=.. password=.. dbname=.. sslmode=disable`.
#[must_use]
pub fn connect_options(cfg: &PgConfig) -> PgConnectOptions {
    let mut options = PgConnectOptions::new()
        .host(&cfg.host)
        .port(cfg.port)
        .username(&cfg.user)
        .password(cfg.pass.expose_secret())
        .ssl_mode(PgSslMode::Disable);

    if !cfg.name.is_empty() {
        options = options.database(&cfg.name);
    }

    options
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use common::secret::SecretString;

    fn config(host: &str, port: u16) -> PgConfig {
        PgConfig {
            host: host.to_string(),
            port,
            name: "blank".to_string(),
            user: "svc".to_string(),
            pass: SecretString::from("hunter2"),
            max_connections: 1,
            connect_timeout_seconds: 1,
        }
    }

    #[test]
    fn test_connect_options_from_config() {
        let options = connect_options(&config("db.internal", 6543));

        assert_eq!(options.get_host(), "db.internal");
        assert_eq!(options.get_port(), 6543);
        assert_eq!(options.get_username(), "svc");
        assert_eq!(options.get_database(), Some("blank"));
    }

    #[tokio::test]
    async fn test_open_unreachable_database_fails() {
        // Nothing listens on port 1 of the loopback interface.
        let err = PgDatabase::open(&config("127.0.0.1", 1)).await.unwrap_err();
        assert!(matches!(err, StorageError::Connect(_)));
    }
}
