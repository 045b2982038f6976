//! Transaction Module
//!
//! Buffered transactions in front of the storage engine.
//!
//! ## Lifecycle
//! ```text
//!            begin()                      commit() / rollback()
//!   ┌──────┐ ──────────────▶ ┌──────┐ ─────────────────────────▶ ┌──────┐
//!   │ Idle │                 │ Open │                            │ Idle │
//!   └──────┘ ◀── begin() ──▶ └──────┘                            └──────┘
//!                (resets pending set)
//! ```
//!
//! ## Commit Replay Order
//! 1. All pending sets, in the order buffered
//! 2. All pending updates, in the order buffered
//! 3. All pending deletes, in the order buffered
//!
//! ## Known Limitation
//! With [`CommitMode::Replay`](crate::config::CommitMode) a failure part way
//! through replay leaves the operations before it applied. Commit is not
//! all-or-nothing in that mode. [`CommitMode::Atomic`](crate::config::CommitMode)
//! applies the whole set in one storage transaction instead.

mod pending;
mod session;

pub use pending::PendingOps;
pub use session::{CommitOutcome, Session};
