//! Queue configuration.
//!
//! Configuration is read once, at startup, from a TOML file whose every key
//! is optional:
//!
//! ```toml
//! table_name = "tasks"
//! max_attempts = 5
//! completed_retention_days = 7
//! failed_retention_days = 30
//! poll_interval_ms = 1000
//! sweep_interval_secs = 3600
//! # processing_timeout_secs = 900
//!
//! [database]
//! host = "localhost"
//! port = 5432
//! user = "corvee"
//! password = "secret"
//! name = "corvee"
//! pool_size = 4
//! ```

use crate::queue::domain::{
    MaxAttempts, QueueDomainError, QueuePolicy, RetentionPolicy, TableName,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Longest accepted retention window, in days (one hundred years).
pub const MAX_RETENTION_DAYS: u32 = 36_500;

/// Longest accepted processing timeout, in seconds (one hundred years).
pub const MAX_PROCESSING_TIMEOUT_SECS: u64 = 36_500 * 86_400;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for [`QueueConfig`].
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value failed domain validation.
    #[error(transparent)]
    Invalid(#[from] QueueDomainError),

    /// A window exceeds its accepted maximum.
    #[error("{field} is out of range")]
    OutOfRange {
        /// Offending key.
        field: &'static str,
    },
}

/// Top-level queue configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueueConfig {
    /// Table backing the queue.
    pub table_name: String,
    /// Claims allowed per task before it is considered dead.
    pub max_attempts: u32,
    /// Days a completed task is kept, measured from creation.
    pub completed_retention_days: u32,
    /// Days a dead task is kept, measured from creation.
    pub failed_retention_days: u32,
    /// Consumer sleep between polls of an empty queue.
    pub poll_interval_ms: u64,
    /// Period between sweeper passes.
    pub sweep_interval_secs: u64,
    /// Lease expiry for claimed tasks; unset disables reclaiming.
    pub processing_timeout_secs: Option<u64>,
    /// Store connection parameters.
    pub database: DatabaseConfig,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            table_name: TableName::DEFAULT.to_owned(),
            max_attempts: MaxAttempts::DEFAULT.value(),
            completed_retention_days: 7,
            failed_retention_days: 30,
            poll_interval_ms: 1_000,
            sweep_interval_secs: 3_600,
            processing_timeout_secs: None,
            database: DatabaseConfig::default(),
        }
    }
}

impl QueueConfig {
    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML, unknown keys, or
    /// mistyped values.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] when the file cannot be read or
    /// [`ConfigError::Parse`] when its content is invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Validated table name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when `table_name` is not a plain
    /// identifier.
    pub fn table(&self) -> Result<TableName, ConfigError> {
        Ok(TableName::new(self.table_name.clone())?)
    }

    /// Validated queue policy.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a zero attempt ceiling or
    /// [`ConfigError::OutOfRange`] for a retention window longer than
    /// [`MAX_RETENTION_DAYS`] or a timeout longer than
    /// [`MAX_PROCESSING_TIMEOUT_SECS`].
    pub fn policy(&self) -> Result<QueuePolicy, ConfigError> {
        let max_attempts = MaxAttempts::new(self.max_attempts)?;
        let completed_days =
            bounded_days(self.completed_retention_days, "completed_retention_days")?;
        let failed_days = bounded_days(self.failed_retention_days, "failed_retention_days")?;
        let retention = RetentionPolicy::from_days(completed_days, failed_days);
        let policy = QueuePolicy::new(max_attempts, retention);
        let Some(secs) = self.processing_timeout_secs else {
            return Ok(policy);
        };
        let out_of_range = ConfigError::OutOfRange {
            field: "processing_timeout_secs",
        };
        if secs > MAX_PROCESSING_TIMEOUT_SECS {
            return Err(out_of_range);
        }
        let timeout =
            chrono::Duration::from_std(Duration::from_secs(secs)).map_err(|_| out_of_range)?;
        Ok(policy.with_processing_timeout(timeout))
    }

    /// Consumer idle poll interval.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Sweeper period.
    #[must_use]
    pub const fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// `PostgreSQL` connection parameters.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Full connection URL; overrides the individual fields when set.
    pub url: Option<String>,
    /// Server host name or socket directory.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Role name.
    pub user: String,
    /// Role password.
    pub password: Option<String>,
    /// Database name.
    pub name: String,
    /// Maximum pooled connections.
    pub pool_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: "localhost".to_owned(),
            port: 5432,
            user: "postgres".to_owned(),
            password: None,
            name: "postgres".to_owned(),
            pool_size: 4,
        }
    }
}

impl DatabaseConfig {
    /// Returns a connection string accepted by libpq.
    ///
    /// Uses `url` verbatim when set; otherwise renders a keyword/value
    /// conninfo string with every value quoted.
    #[must_use]
    pub fn connection_string(&self) -> String {
        if let Some(url) = &self.url {
            return url.clone();
        }
        let port = self.port.to_string();
        let mut pairs = vec![
            ("host", self.host.as_str()),
            ("port", port.as_str()),
            ("user", self.user.as_str()),
            ("dbname", self.name.as_str()),
        ];
        if let Some(password) = &self.password {
            pairs.push(("password", password.as_str()));
        }
        pairs
            .into_iter()
            .map(|(key, value)| format!("{key}={}", quote_conninfo(value)))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &self.url.as_ref().map(|_| "<redacted>"))
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("name", &self.name)
            .field("pool_size", &self.pool_size)
            .finish()
    }
}

const fn bounded_days(days: u32, field: &'static str) -> Result<u32, ConfigError> {
    if days > MAX_RETENTION_DAYS {
        return Err(ConfigError::OutOfRange { field });
    }
    Ok(days)
}

fn quote_conninfo(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for ch in value.chars() {
        if ch == '\'' || ch == '\\' {
            quoted.push('\\');
        }
        quoted.push(ch);
    }
    quoted.push('\'');
    quoted
}
