//! Blank service configuration.
//!
//! Settings are resolved in three layers, later layers winning:
//!
//! 1. built-in defaults;
//! 2. an optional `config.yaml`, either given explicitly or found in
//!    `/etc/blank/`, `$HOME/.blank/` or the working directory;
//! 3. environment variables named after the dotted key, upper-cased with
//!    `.` replaced by `_` (`monitoring.port` → `MONITORING_PORT`).
//!
//! Storage is enabled only when `pg.host` is set. The database password is a
//! [`SecretString`] and never appears in `Debug` output.

use common::secret::SecretString;
use serde_yaml::Value;
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Configuration file name searched for in the default directories.
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Default monitoring port.
pub const DEFAULT_MONITORING_PORT: u16 = 8080;

/// Default monitoring drain budget in seconds.
pub const DEFAULT_MONITORING_TIMEOUT_SECONDS: u64 = 3;

/// Default process-wide shutdown budget in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECONDS: u64 = 30;

/// Default Postgres port.
pub const DEFAULT_PG_PORT: u16 = 5432;

/// Default Postgres pool size.
pub const DEFAULT_PG_MAX_CONNECTIONS: u32 = 5;

/// Default timeout for establishing a Postgres connection in seconds.
pub const DEFAULT_PG_CONNECT_TIMEOUT_SECONDS: u64 = 5;

/// Every key the service understands.
pub const KEYS: &[&str] = &[
    "monitoring.host",
    "monitoring.port",
    "monitoring.timeout",
    "shutdown.timeout",
    "pg.host",
    "pg.port",
    "pg.name",
    "pg.user",
    "pg.pass",
    "pg.max_connections",
    "pg.connect_timeout",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid configuration value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
}

/// Monitoring endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitoringConfig {
    /// Host to bind; empty means all interfaces.
    pub host: String,
    pub port: u16,
    /// Drain budget for in-flight requests during shutdown.
    pub timeout_seconds: u64,
}

impl MonitoringConfig {
    /// `host:port` string suitable for `TcpListener::bind`.
    #[must_use]
    pub fn bind_address(&self) -> String {
        let host = if self.host.is_empty() {
            "0.0.0.0"
        } else {
            self.host.as_str()
        };

        if host.contains(':') && !host.starts_with('[') {
            format!("[{host}]:{}", self.port)
        } else {
            format!("{host}:{}", self.port)
        }
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_MONITORING_PORT,
            timeout_seconds: DEFAULT_MONITORING_TIMEOUT_SECONDS,
        }
    }
}

/// Process-wide shutdown settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownConfig {
    /// Time between the interrupt and a forced exit.
    pub timeout_seconds: u64,
}

impl ShutdownConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: DEFAULT_SHUTDOWN_TIMEOUT_SECONDS,
        }
    }
}

/// Postgres connection settings.
#[derive(Debug, Clone)]
pub struct PgConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub pass: SecretString,
    pub max_connections: u32,
    pub connect_timeout_seconds: u64,
}

impl PgConfig {
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }
}

/// Complete service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub monitoring: MonitoringConfig,
    pub shutdown: ShutdownConfig,
    /// `None` when storage is disabled.
    pub pg: Option<PgConfig>,
}

impl Config {
    /// Load configuration from the file layer and the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if an explicit file is missing, a file cannot
    /// be read or parsed, or a value does not parse as its type.
    pub fn from_env(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load(config_file, &env::vars().collect())
    }

    /// Load configuration from the file layer and `vars` (for testing).
    pub fn load(
        config_file: Option<&Path>,
        vars: &HashMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let mut settings = match locate_config_file(config_file, vars)? {
            Some(path) => {
                info!(target: "blank.config", path = %path.display(), "Using configuration file");
                read_config_file(&path)?
            }
            None => {
                warn!(target: "blank.config", "Configuration file not found");
                HashMap::new()
            }
        };

        apply_env_overrides(&mut settings, vars);
        Self::from_settings(&settings)
    }

    /// Load configuration from environment variables only (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut settings = HashMap::new();
        apply_env_overrides(&mut settings, vars);
        Self::from_settings(&settings)
    }

    /// Build a configuration from resolved dotted keys.
    fn from_settings(settings: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let monitoring = MonitoringConfig {
            host: settings
                .get("monitoring.host")
                .cloned()
                .unwrap_or_default(),
            port: parse_or(settings, "monitoring.port", DEFAULT_MONITORING_PORT)?,
            timeout_seconds: parse_or(
                settings,
                "monitoring.timeout",
                DEFAULT_MONITORING_TIMEOUT_SECONDS,
            )?,
        };

        let shutdown = ShutdownConfig {
            timeout_seconds: parse_or(
                settings,
                "shutdown.timeout",
                DEFAULT_SHUTDOWN_TIMEOUT_SECONDS,
            )?,
        };

        let pg = match settings.get("pg.host").filter(|host| !host.is_empty()) {
            Some(host) => Some(PgConfig {
                host: host.clone(),
                port: parse_or(settings, "pg.port", DEFAULT_PG_PORT)?,
                name: settings.get("pg.name").cloned().unwrap_or_default(),
                user: settings.get("pg.user").cloned().unwrap_or_default(),
                pass: SecretString::from(settings.get("pg.pass").cloned().unwrap_or_default()),
                max_connections: parse_or(
                    settings,
                    "pg.max_connections",
                    DEFAULT_PG_MAX_CONNECTIONS,
                )?,
                connect_timeout_seconds: parse_or(
                    settings,
                    "pg.connect_timeout",
                    DEFAULT_PG_CONNECT_TIMEOUT_SECONDS,
                )?,
            }),
            None => None,
        };

        Ok(Config {
            monitoring,
            shutdown,
            pg,
        })
    }
}

/// Environment variable that overrides `key`.
#[must_use]
pub fn env_key(key: &str) -> String {
    key.replace('.', "_").to_uppercase()
}

fn apply_env_overrides(settings: &mut HashMap<String, String>, vars: &HashMap<String, String>) {
    for key in KEYS {
        if let Some(value) = vars.get(&env_key(key)) {
            settings.insert((*key).to_string(), value.clone());
        }
    }
}

fn parse_or<T: FromStr>(
    settings: &HashMap<String, String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    match settings.get(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: value.clone(),
            }),
    }
}

/// Pick the configuration file to read.
///
/// An explicit path must exist. Otherwise the default directories are
/// searched and a missing file is not an error.
fn locate_config_file(
    explicit: Option<&Path>,
    vars: &HashMap<String, String>,
) -> Result<Option<PathBuf>, ConfigError> {
    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
            });
        }
        return Ok(Some(path.to_path_buf()));
    }

    let mut dirs = vec![PathBuf::from("/etc/blank")];
    if let Some(home) = vars.get("HOME") {
        dirs.push(Path::new(home).join(".blank"));
    }
    dirs.push(PathBuf::from("."));

    Ok(dirs
        .into_iter()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find(|path| path.is_file()))
}

/// Read a YAML file and flatten it into dotted keys.
fn read_config_file(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let value: Value = serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut settings = HashMap::new();
    flatten("", &value, &mut settings);
    Ok(settings)
}

fn flatten(prefix: &str, value: &Value, out: &mut HashMap<String, String>) {
    let scalar = match value {
        Value::Mapping(map) => {
            for (key, child) in map {
                let Some(key) = key.as_str() else { continue };
                let key = key.to_lowercase();
                let path = if prefix.is_empty() {
                    key
                } else {
                    format!("{prefix}.{key}")
                };
                flatten(&path, child, out);
            }
            return;
        }
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Sequence(_) | Value::Tagged(_) => return,
    };

    if !prefix.is_empty() {
        out.insert(prefix.to_string(), scalar);
    }
}
