//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::path::PathBuf;
use std::time::Duration;

use postbox_store::{Durability, StoreOptions};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// SQLite file holding key packages and mailboxes.
    /// Env: `POSTBOX_DB_PATH`
    /// Default: `db/server.db`
    pub db_path: PathBuf,

    /// How often the backlog snapshot is logged.
    /// Env: `POSTBOX_REPORT_INTERVAL_SECS`
    /// Default: `300`
    pub report_interval: Duration,

    /// Warn when more undelivered messages than this are queued (0 = never).
    /// Env: `POSTBOX_BACKLOG_WARN`
    /// Default: `10000`
    pub backlog_warn: u64,

    /// How long a write waits for a lock held by another connection.
    /// Env: `POSTBOX_BUSY_TIMEOUT_MS`
    /// Default: `5000`
    pub busy_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("db/server.db"),
            report_interval: Duration::from_secs(300),
            backlog_warn: 10_000,
            busy_timeout: Duration::from_millis(5_000),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(path) = lookup("POSTBOX_DB_PATH") {
            if !path.is_empty() {
                config.db_path = PathBuf::from(path);
            }
        }

        if let Some(secs) = parse_number(&lookup, "POSTBOX_REPORT_INTERVAL_SECS") {
            if secs == 0 {
                tracing::warn!("POSTBOX_REPORT_INTERVAL_SECS must be positive, using default");
            } else {
                config.report_interval = Duration::from_secs(secs);
            }
        }

        if let Some(n) = parse_number(&lookup, "POSTBOX_BACKLOG_WARN") {
            config.backlog_warn = n;
        }

        if let Some(ms) = parse_number(&lookup, "POSTBOX_BUSY_TIMEOUT_MS") {
            config.busy_timeout = Duration::from_millis(ms);
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }

    /// Store settings for the server database: every commit is fsynced.
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            durability: Durability::Extra,
            busy_timeout: self.busy_timeout,
        }
    }
}

fn parse_number(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<u64> {
    let raw = lookup(key)?;
    match raw.trim().parse::<u64>() {
        Ok(n) => Some(n),
        Err(e) => {
            tracing::warn!(key, value = %raw, error = %e, "invalid number, using default");
            None
        }
    }
}
