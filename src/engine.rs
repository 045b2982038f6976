//! Engine Module
//!
//! Thread-safe front door over one transaction session.
//!
//! ## Responsibilities
//! - Open the store and build the session from config
//! - Serialize access to the session across worker threads
//! - Route commands to session operations

use std::path::Path;

use parking_lot::Mutex;

use crate::config::Config;
use crate::error::Result;
use crate::protocol::Command;
use crate::storage::Store;
use crate::txn::{CommitOutcome, Session};
use crate::value::Value;

/// Result of executing a command
#[derive(Debug)]
pub enum Reply {
    /// Mutation applied or buffered, or transaction state changed
    Done,

    /// Result of a get; `None` means the key is absent
    Value { key: String, value: Option<Value> },

    /// Result of a commit
    Commit(CommitOutcome),

    Health { version: &'static str },
}

/// The shared engine
///
/// ## Concurrency Model
/// One [`Session`] per engine, guarded by a mutex. Each command runs with
/// the lock held, so a `commit` can never interleave with a `begin` or a
/// buffered `set` from another connection. The transaction state is
/// global to the engine: every client sees the same open transaction.
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// The single transaction session (exclusive access needed)
    session: Mutex<Session>,
}

impl Engine {
    /// Open or create an engine with the given config
    pub fn open(config: Config) -> Result<Self> {
        let store = Store::open(&config)?;
        let session = Session::with_commit_mode(store, config.commit_mode);

        tracing::info!(
            db = %config.db_path.display(),
            commit_mode = ?config.commit_mode,
            "Engine opened"
        );

        Ok(Self {
            config,
            session: Mutex::new(session),
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified database file
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().db_path(path).build())
    }

    /// Execute a command
    ///
    /// Routes commands to appropriate session operations
    pub fn execute(&self, command: Command) -> Result<Reply> {
        let mut session = self.session.lock();

        match command {
            Command::Get { key } => {
                let value = session.get(&key)?;
                Ok(Reply::Value { key, value })
            }
            Command::Set { key, value } => {
                session.set(&key, value)?;
                Ok(Reply::Done)
            }
            Command::Update { key, value } => {
                session.update(&key, value)?;
                Ok(Reply::Done)
            }
            Command::Delete { key } => {
                session.delete(&key)?;
                Ok(Reply::Done)
            }
            Command::Begin => {
                session.begin();
                Ok(Reply::Done)
            }
            Command::Commit => Ok(Reply::Commit(session.commit())),
            Command::Rollback => {
                session.rollback();
                Ok(Reply::Done)
            }
            Command::Health => Ok(Reply::Health {
                version: crate::VERSION,
            }),
        }
    }

    /// Run `f` with exclusive access to the session
    pub fn with_session<T>(&self, f: impl FnOnce(&mut Session) -> T) -> T {
        f(&mut self.session.lock())
    }

    /// Whether a transaction is currently open
    pub fn in_transaction(&self) -> bool {
        self.session.lock().is_open()
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}
