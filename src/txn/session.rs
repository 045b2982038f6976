//! Transaction session
//!
//! Buffers mutations while a transaction is open and replays them into the
//! store on commit.

use crate::config::CommitMode;
use crate::error::{QuillError, Result};
use crate::storage::Store;
use crate::value::Value;

use super::PendingOps;

/// Result of [`Session::commit`]
#[derive(Debug)]
pub enum CommitOutcome {
    /// Every pending operation reached storage
    Committed { applied: usize },

    /// Replay stopped at `error`; the remaining operations were dropped
    ///
    /// In [`CommitMode::Replay`] the first `applied` operations stay in
    /// storage. In [`CommitMode::Atomic`] `applied` is always zero.
    RolledBack {
        applied: usize,
        discarded: usize,
        error: QuillError,
    },
}

impl CommitOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, CommitOutcome::Committed { .. })
    }

    /// Number of operations that reached storage
    pub fn applied(&self) -> usize {
        match self {
            CommitOutcome::Committed { applied } | CommitOutcome::RolledBack { applied, .. } => {
                *applied
            }
        }
    }
}

/// A transaction buffer in front of a [`Store`]
///
/// ## States
/// - **Idle**: `set`/`update`/`delete` go straight to the store
/// - **Open**: they are appended to the pending set instead
///
/// `get` always reads the store, never the pending set, so a buffered
/// write is not visible until it is committed.
///
/// ## Concurrency
/// All mutators take `&mut self`. Share a session across threads only
/// behind a lock (see [`crate::Engine`]), or give each caller its own.
#[derive(Debug)]
pub struct Session {
    store: Store,
    pending: PendingOps,
    open: bool,
    commit_mode: CommitMode,
}

impl Session {
    /// Create an idle session that replays on commit
    pub fn new(store: Store) -> Self {
        Self::with_commit_mode(store, CommitMode::Replay)
    }

    pub fn with_commit_mode(store: Store, commit_mode: CommitMode) -> Self {
        Self {
            store,
            pending: PendingOps::new(),
            open: false,
            commit_mode,
        }
    }

    /// Open a transaction, dropping anything already buffered
    pub fn begin(&mut self) {
        if self.open && !self.pending.is_empty() {
            tracing::warn!(
                discarded = self.pending.len(),
                "begin while a transaction is open, discarding pending operations"
            );
        }
        self.pending.clear();
        self.open = true;
        tracing::debug!("Transaction opened");
    }

    /// Discard the pending set and return to idle
    pub fn rollback(&mut self) {
        if self.open {
            tracing::debug!(discarded = self.pending.len(), "Transaction rolled back");
        }
        self.pending.clear();
        self.open = false;
    }

    /// Apply the pending set: sets, then updates, then deletes
    ///
    /// A failure is not returned as an error. The session rolls back and
    /// reports what happened through [`CommitOutcome::RolledBack`].
    pub fn commit(&mut self) -> CommitOutcome {
        let pending = std::mem::take(&mut self.pending);
        self.open = false;

        if pending.is_empty() {
            return CommitOutcome::Committed { applied: 0 };
        }

        let total = pending.len();
        let result = match self.commit_mode {
            CommitMode::Replay => self.replay(&pending),
            CommitMode::Atomic => self.store.apply_batch(&pending).map_err(|e| (0, e)),
        };

        match result {
            Ok(applied) => {
                tracing::debug!(applied, "Transaction committed");
                CommitOutcome::Committed { applied }
            }
            Err((applied, error)) => {
                let discarded = total - applied;
                tracing::error!(
                    applied,
                    discarded,
                    error = %error,
                    "Error committing transaction, rolling back"
                );
                CommitOutcome::RolledBack {
                    applied,
                    discarded,
                    error,
                }
            }
        }
    }

    /// Insert a new record, or buffer the insert
    pub fn set(&mut self, key: &str, value: Value) -> Result<()> {
        if self.open {
            tracing::debug!(key, "Buffered set");
            self.pending.push_set(key, value);
            Ok(())
        } else {
            self.store.put(key, &value)
        }
    }

    /// Read straight from the store
    pub fn get(&self, key: &str) -> Result<Option<Value>> {
        self.store.get(key)
    }

    /// Overwrite an existing record, or buffer the update
    pub fn update(&mut self, key: &str, value: Value) -> Result<()> {
        if self.open {
            tracing::debug!(key, "Buffered update");
            self.pending.push_update(key, value);
            Ok(())
        } else {
            self.store.update(key, &value)
        }
    }

    /// Remove a record, or buffer the delete
    pub fn delete(&mut self, key: &str) -> Result<()> {
        if self.open {
            tracing::debug!(key, "Buffered delete");
            self.pending.push_delete(key);
            Ok(())
        } else {
            self.store.delete(key)
        }
    }

    /// Whether a transaction is open
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Operations buffered so far
    pub fn pending(&self) -> &PendingOps {
        &self.pending
    }

    pub fn commit_mode(&self) -> CommitMode {
        self.commit_mode
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Replay one operation at a time, stopping at the first failure
    ///
    /// On failure returns how many operations were applied before it.
    fn replay(&self, pending: &PendingOps) -> std::result::Result<usize, (usize, QuillError)> {
        let mut applied = 0;

        for (key, value) in pending.sets() {
            self.store.put(key, value).map_err(|e| (applied, e))?;
            applied += 1;
        }
        for (key, value) in pending.updates() {
            self.store.update(key, value).map_err(|e| (applied, e))?;
            applied += 1;
        }
        for key in pending.deletes() {
            self.store.delete(key).map_err(|e| (applied, e))?;
            applied += 1;
        }

        Ok(applied)
    }
}
