//! # QuillKV
//!
//! A key-value store served over HTTP with:
//! - A single-file SQLite table as durable storage
//! - Self-describing, checksummed value encoding
//! - A buffered transaction layer replayed on commit
//! - A thread-pooled HTTP/1.1 server
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      HTTP Server                             │
//! │                  (Worker Thread Pool)                        │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ Command
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                       Engine                                 │
//! │                (Mutex<Session>)                              │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │ Idle                    │ Open
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │ pass-through│          │ PendingOps  │── commit ──┐
//!   └──────┬──────┘          └─────────────┘            │
//!          │                                            │
//!          ▼                                            ▼
//!   ┌──────────────────────────────────────────────────────┐
//!   │          Store (SQLite, connection per call)         │
//!   └──────────────────────────────────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod value;
pub mod codec;
pub mod storage;
pub mod txn;
pub mod network;
pub mod protocol;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{ErrorKind, Op, QuillError, Result};
pub use config::{CommitMode, Config};
pub use engine::{Engine, Reply};
pub use storage::Store;
pub use txn::{CommitOutcome, PendingOps, Session};
pub use value::Value;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of QuillKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
