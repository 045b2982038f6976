//! Storage Module
//!
//! Durable storage layer on a single-file SQLite table.
//!
//! ## Responsibilities
//! - Create the backing table once, idempotently
//! - Point lookups, inserts, in-place updates and deletes by primary key
//! - Translate SQLite and codec failures into the error taxonomy
//!
//! ## Table Layout
//! ```text
//! kv_store
//! ┌──────────────────────────┬─────────────────────────────────┐
//! │ key   TEXT PRIMARY KEY   │ value BLOB NOT NULL             │
//! ├──────────────────────────┼─────────────────────────────────┤
//! │ "user:1"                 │ version | crc32 | bincode(Value)│
//! └──────────────────────────┴─────────────────────────────────┘
//! ```
//!
//! ## Connection Model
//! No connection outlives a call. Every operation acquires its own
//! connection, runs one statement, commits and drops the connection
//! on every exit path.

mod store;

pub use store::Store;

/// Name of the single table holding all records
pub const TABLE_NAME: &str = "kv_store";
