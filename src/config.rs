//! Configuration for the SQLite connection adapter.
//!
//! [`SqliteConfig`] derives `clap::Args` so applications can flatten it into
//! their own CLI; every option can also be set through a `QUERY_HELPER_*`
//! environment variable.

use clap::{ArgAction, Args};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_DATABASE_URL: &str = "sqlite::memory:";
pub const DEFAULT_BUSY_TIMEOUT_SECS: u64 = 5;

/// SQLite connection options.
#[derive(Debug, Clone, PartialEq, Eq, Args, Serialize, Deserialize)]
pub struct SqliteConfig {
    /// Connection URL, e.g. `sqlite:path/to/db.sqlite` or `sqlite::memory:`
    #[arg(long = "database-url", env = "QUERY_HELPER_DATABASE_URL", default_value = DEFAULT_DATABASE_URL)]
    #[serde(default = "default_url")]
    pub url: String,

    /// Open the database read-only (default: false)
    #[arg(long, env = "QUERY_HELPER_READ_ONLY", action = ArgAction::Set, default_value_t = false)]
    #[serde(default)]
    pub read_only: bool,

    /// Create the database file if it does not exist; ignored when read-only (default: true)
    #[arg(long, env = "QUERY_HELPER_CREATE_IF_MISSING", action = ArgAction::Set, default_value_t = true)]
    #[serde(default = "default_create_if_missing")]
    pub create_if_missing: bool,

    /// How long SQLite waits on a locked database, in seconds; 0 fails at once (default: 5)
    #[arg(long, env = "QUERY_HELPER_BUSY_TIMEOUT", default_value_t = DEFAULT_BUSY_TIMEOUT_SECS)]
    #[serde(default = "default_busy_timeout_secs")]
    pub busy_timeout_secs: u64,

    /// Timeout for commands that do not set their own, in seconds (default: none)
    #[arg(long, env = "QUERY_HELPER_COMMAND_TIMEOUT")]
    #[serde(default)]
    pub command_timeout_secs: Option<u64>,
}

fn default_url() -> String {
    DEFAULT_DATABASE_URL.to_string()
}

fn default_create_if_missing() -> bool {
    true
}

fn default_busy_timeout_secs() -> u64 {
    DEFAULT_BUSY_TIMEOUT_SECS
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            read_only: false,
            create_if_missing: true,
            busy_timeout_secs: DEFAULT_BUSY_TIMEOUT_SECS,
            command_timeout_secs: None,
        }
    }
}

impl SqliteConfig {
    /// Create a config for `url` with default options.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Config for a private in-memory database.
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn with_command_timeout(mut self, secs: u64) -> Self {
        self.command_timeout_secs = Some(secs);
        self
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_secs(self.busy_timeout_secs)
    }

    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout_secs.map(Duration::from_secs)
    }

    /// Validate the config and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.url.trim().is_empty() {
            return Err("database url must not be empty".to_string());
        }
        if !self.url.starts_with("sqlite:") {
            return Err(format!(
                "unsupported database url '{}': expected sqlite:path or sqlite::memory:",
                self.url
            ));
        }
        if self.command_timeout_secs == Some(0) {
            return Err("command_timeout_secs must be greater than 0".to_string());
        }
        Ok(())
    }
}
