//! Configuration for QuillKV
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;
use std::str::FromStr;

use crate::error::QuillError;

/// Main configuration for a QuillKV instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// SQLite database file holding the `kv_store` table
    pub db_path: PathBuf,

    /// How long a connection waits on a locked database (milliseconds)
    pub busy_timeout_ms: u64,

    /// Upper bound on an encoded value (in bytes)
    pub max_value_size: u64,

    // -------------------------------------------------------------------------
    // Transaction Configuration
    // -------------------------------------------------------------------------
    /// How `commit` applies the pending operations
    pub commit_mode: CommitMode,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Number of worker threads serving connections
    pub workers: usize,

    /// Max accepted request body (in bytes)
    pub max_body_size: usize,

    /// Connection read timeout (milliseconds)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds)
    pub write_timeout_ms: u64,
}

/// Commit strategy for buffered transactions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommitMode {
    /// Replay operations one by one, each in its own storage transaction.
    /// A failure stops the replay; operations already applied stay applied.
    #[default]
    Replay,

    /// Apply every operation inside a single storage transaction.
    /// A failure leaves storage untouched.
    Atomic,
}

impl FromStr for CommitMode {
    type Err = QuillError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "replay" => Ok(CommitMode::Replay),
            "atomic" => Ok(CommitMode::Atomic),
            other => Err(QuillError::Config(format!(
                "unknown commit mode '{}' (expected 'replay' or 'atomic')",
                other
            ))),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./quillkv_data/kv_store.db"),
            busy_timeout_ms: 5000,
            max_value_size: 16 * 1024 * 1024, // 16 MB
            commit_mode: CommitMode::Replay,
            listen_addr: "127.0.0.1:5000".to_string(),
            workers: 4,
            max_body_size: 32 * 1024 * 1024, // 32 MB
            read_timeout_ms: 5000,
            write_timeout_ms: 5000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the SQLite database file
    pub fn db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.db_path = path.into();
        self
    }

    /// Set the busy timeout (in milliseconds)
    pub fn busy_timeout_ms(mut self, ms: u64) -> Self {
        self.config.busy_timeout_ms = ms;
        self
    }

    /// Set the maximum encoded value size (in bytes)
    pub fn max_value_size(mut self, size: u64) -> Self {
        self.config.max_value_size = size;
        self
    }

    /// Set the commit strategy
    pub fn commit_mode(mut self, mode: CommitMode) -> Self {
        self.config.commit_mode = mode;
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the number of worker threads
    pub fn workers(mut self, count: usize) -> Self {
        self.config.workers = count;
        self
    }

    /// Set the maximum request body size (in bytes)
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.config.max_body_size = size;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
