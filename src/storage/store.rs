//! Storage Engine
//!
//! Point operations against the `kv_store` table.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{
    params, Connection, ErrorCode, OpenFlags, OptionalExtension, Transaction, TransactionBehavior,
};

use crate::codec::Codec;
use crate::config::Config;
use crate::error::{Op, QuillError, Result};
use crate::txn::PendingOps;
use crate::value::Value;

/// Durable key-value storage over one SQLite file
///
/// Holds no connection. `Store` is cheap to clone, and clones may be used
/// from different threads at the same time.
#[derive(Debug, Clone)]
pub struct Store {
    /// SQLite database file
    path: PathBuf,

    /// Value encoder/decoder
    codec: Codec,

    /// Lock wait bound applied to every connection
    busy_timeout: Duration,
}

impl Store {
    /// Open or create the database and make sure the table exists
    pub fn open(config: &Config) -> Result<Self> {
        let store = Self {
            path: config.db_path.clone(),
            codec: Codec::new(config.max_value_size),
            busy_timeout: Duration::from_millis(config.busy_timeout_ms),
        };

        if let Some(parent) = store.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| QuillError::storage(Op::Open, None, e))?;
            }
        }

        store.create_table()?;
        Ok(store)
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified database file
    pub fn open_path(path: &Path) -> Result<Self> {
        let config = Config::builder().db_path(path).build();
        Self::open(&config)
    }

    /// Get a value by key
    ///
    /// Returns:
    /// - `Ok(Some(value))`: record found
    /// - `Ok(None)`: no record for this key
    pub fn get(&self, key: &str) -> Result<Option<Value>> {
        validate_key(Op::Get, key)?;

        let conn = self.connect(Op::Get, Some(key))?;
        let bytes: Option<Vec<u8>> = conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| match e {
                // The cell exists but holds TEXT, INTEGER, REAL or NULL
                rusqlite::Error::InvalidColumnType(..)
                | rusqlite::Error::FromSqlConversionFailure(..) => QuillError::DecodeFailure {
                    op: Op::Get,
                    key: Some(key.to_string()),
                    message: format!("Failed to deserialize value: {}", e),
                },
                e => QuillError::storage(Op::Get, Some(key), e),
            })?;
        drop(conn);

        let Some(bytes) = bytes else {
            tracing::debug!(key, "Key not found");
            return Ok(None);
        };

        let value = self
            .codec
            .decode(&bytes)
            .map_err(|e| QuillError::DecodeFailure {
                op: Op::Get,
                key: Some(key.to_string()),
                message: format!("Failed to deserialize value: {}", e),
            })?;

        tracing::debug!(key, kind = value.type_name(), "Value retrieved");
        Ok(Some(value))
    }

    /// Check whether a record exists for `key`
    pub fn contains(&self, key: &str) -> Result<bool> {
        validate_key(Op::Get, key)?;

        let conn = self.connect(Op::Get, Some(key))?;
        let found = conn
            .query_row(
                "SELECT 1 FROM kv_store WHERE key = ?1",
                params![key],
                |_| Ok(()),
            )
            .optional()
            .map_err(|e| QuillError::storage(Op::Get, Some(key), e))?;

        Ok(found.is_some())
    }

    /// Insert a new record
    ///
    /// Fails with `KeyAlreadyExists` instead of overwriting.
    pub fn put(&self, key: &str, value: &Value) -> Result<()> {
        validate_key(Op::Put, key)?;
        let bytes = self.encode(Op::Put, key, value)?;

        let mut conn = self.connect(Op::Put, Some(key))?;
        let tx = begin_write(&mut conn).map_err(|e| QuillError::storage(Op::Put, Some(key), e))?;
        insert_row(&tx, key, &bytes)?;
        tx.commit()
            .map_err(|e| QuillError::storage(Op::Put, Some(key), e))?;

        tracing::debug!(key, "Value put");
        Ok(())
    }

    /// Overwrite the value of an existing record
    ///
    /// Fails with `KeyNotFound` instead of creating.
    pub fn update(&self, key: &str, value: &Value) -> Result<()> {
        validate_key(Op::Update, key)?;
        let bytes = self.encode(Op::Update, key, value)?;

        let mut conn = self.connect(Op::Update, Some(key))?;
        let tx =
            begin_write(&mut conn).map_err(|e| QuillError::storage(Op::Update, Some(key), e))?;
        update_row(&tx, key, &bytes)?;
        tx.commit()
            .map_err(|e| QuillError::storage(Op::Update, Some(key), e))?;

        tracing::debug!(key, "Value updated");
        Ok(())
    }

    /// Remove a record
    pub fn delete(&self, key: &str) -> Result<()> {
        validate_key(Op::Delete, key)?;

        let mut conn = self.connect(Op::Delete, Some(key))?;
        let tx =
            begin_write(&mut conn).map_err(|e| QuillError::storage(Op::Delete, Some(key), e))?;
        delete_row(&tx, key)?;
        tx.commit()
            .map_err(|e| QuillError::storage(Op::Delete, Some(key), e))?;

        tracing::debug!(key, "Value deleted");
        Ok(())
    }

    /// Apply a pending set inside one SQLite transaction
    ///
    /// Same order and per-operation rules as replaying sets, then updates,
    /// then deletes one call at a time. On the first failure the transaction
    /// is dropped, so nothing is applied. Returns the number of operations.
    pub fn apply_batch(&self, pending: &PendingOps) -> Result<usize> {
        let mut conn = self.connect(Op::Commit, None)?;
        let tx = begin_write(&mut conn).map_err(|e| QuillError::storage(Op::Commit, None, e))?;

        for (key, value) in pending.sets() {
            validate_key(Op::Put, key)?;
            let bytes = self.encode(Op::Put, key, value)?;
            insert_row(&tx, key, &bytes)?;
        }
        for (key, value) in pending.updates() {
            validate_key(Op::Update, key)?;
            let bytes = self.encode(Op::Update, key, value)?;
            update_row(&tx, key, &bytes)?;
        }
        for key in pending.deletes() {
            validate_key(Op::Delete, key)?;
            delete_row(&tx, key)?;
        }

        tx.commit()
            .map_err(|e| QuillError::storage(Op::Commit, None, e))?;

        tracing::debug!(operations = pending.len(), "Batch applied");
        Ok(pending.len())
    }

    /// Number of records in the table
    pub fn len(&self) -> Result<usize> {
        let conn = self.connect(Op::Get, None)?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM kv_store", [], |row| row.get(0))
            .map_err(|e| QuillError::storage(Op::Get, None, e))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Get the database file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the codec used for stored values
    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Create the table (safe to call on an existing database)
    fn create_table(&self) -> Result<()> {
        tracing::info!(path = %self.path.display(), "Creating table");

        let conn = Connection::open(&self.path)
            .map_err(|e| QuillError::storage(Op::CreateTable, None, e))?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv_store (
                key   TEXT PRIMARY KEY,
                value BLOB NOT NULL
            )",
            [],
        )
        .map_err(|e| QuillError::storage(Op::CreateTable, None, e))?;

        tracing::info!("Table ready");
        Ok(())
    }

    /// Acquire a connection for one operation
    ///
    /// Opens without CREATE: a database file that disappeared after
    /// `open` is reported as unavailable rather than silently recreated.
    fn connect(&self, op: Op, key: Option<&str>) -> Result<Connection> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;

        let conn = Connection::open_with_flags(&self.path, flags).map_err(|e| {
            tracing::error!(op = %op, error = %e, "Error creating session");
            QuillError::storage(op, key, e)
        })?;
        conn.busy_timeout(self.busy_timeout)
            .map_err(|e| QuillError::storage(op, key, e))?;
        Ok(conn)
    }

    fn encode(&self, op: Op, key: &str, value: &Value) -> Result<Vec<u8>> {
        self.codec.encode(value).map_err(|e| QuillError::EncodeFailure {
            op,
            key: Some(key.to_string()),
            message: format!("Failed to serialize value: {}", e),
        })
    }
}

/// Start a write transaction holding the write lock from the outset
///
/// A deferred transaction that upgrades its read lock can be refused
/// with SQLITE_BUSY without the busy handler ever running.
fn begin_write(conn: &mut Connection) -> rusqlite::Result<Transaction<'_>> {
    conn.transaction_with_behavior(TransactionBehavior::Immediate)
}

/// Reject empty keys before any I/O
fn validate_key(op: Op, key: &str) -> Result<()> {
    if key.is_empty() {
        tracing::debug!(op = %op, "Key cannot be empty");
        return Err(QuillError::invalid_key(op));
    }
    Ok(())
}

fn insert_row(conn: &Connection, key: &str, bytes: &[u8]) -> Result<()> {
    conn.execute(
        "INSERT INTO kv_store (key, value) VALUES (?1, ?2)",
        params![key, bytes],
    )
    .map_err(|e| match e {
        rusqlite::Error::SqliteFailure(ref failure, _)
            if failure.code == ErrorCode::ConstraintViolation =>
        {
            QuillError::key_already_exists(Op::Put, key)
        }
        e => QuillError::storage(Op::Put, Some(key), e),
    })?;
    Ok(())
}

fn update_row(conn: &Connection, key: &str, bytes: &[u8]) -> Result<()> {
    let changed = conn
        .execute(
            "UPDATE kv_store SET value = ?1 WHERE key = ?2",
            params![bytes, key],
        )
        .map_err(|e| QuillError::storage(Op::Update, Some(key), e))?;

    if changed == 0 {
        return Err(QuillError::key_not_found(Op::Update, key));
    }
    Ok(())
}

fn delete_row(conn: &Connection, key: &str) -> Result<()> {
    let changed = conn
        .execute("DELETE FROM kv_store WHERE key = ?1", params![key])
        .map_err(|e| QuillError::storage(Op::Delete, Some(key), e))?;

    if changed == 0 {
        return Err(QuillError::key_not_found(Op::Delete, key));
    }
    Ok(())
}
