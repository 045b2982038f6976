//! Network Module
//!
//! HTTP/1.1 serving over plain TCP.
//!
//! ## Threading
//! The thread calling [`Server::run`] accepts. A fixed pool of workers
//! each owns one connection at a time and serves its keep-alive requests
//! in order. Every request goes through the shared [`Engine`](crate::Engine).
//!
//! ## Shutdown
//! [`ShutdownHandle::shutdown`] sets a flag and wakes the acceptor. Workers
//! finish the connections they hold, then exit once the queue is drained.

mod connection;
mod server;

pub use connection::Connection;
pub use server::{Server, ShutdownHandle};
