//! Error types for QuillKV
//!
//! Provides a unified error type for all operations.
//!
//! Storage failures carry the operation that failed, the key involved (when
//! there is one) and a human-readable message. Callers that need to branch
//! on the failure use [`QuillError::kind`].

use std::fmt;

use thiserror::Error;

/// Result type alias using QuillError
pub type Result<T> = std::result::Result<T, QuillError>;

/// Operation a storage failure is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Open,
    CreateTable,
    Get,
    Put,
    Update,
    Delete,
    Commit,
}

impl Op {
    pub fn as_str(&self) -> &'static str {
        match self {
            Op::Open => "open",
            Op::CreateTable => "create_table",
            Op::Get => "get",
            Op::Put => "put",
            Op::Update => "update",
            Op::Delete => "delete",
            Op::Commit => "commit",
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The storage failure taxonomy, without context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidKey,
    KeyNotFound,
    KeyAlreadyExists,
    EncodeFailure,
    DecodeFailure,
    StorageUnavailable,
}

/// Renders ` for key 'k'` or nothing.
struct KeyContext<'a>(&'a Option<String>);

impl fmt::Display for KeyContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(key) => write!(f, " for key '{}'", key),
            None => Ok(()),
        }
    }
}

/// Unified error type for QuillKV operations
#[derive(Debug, Error)]
pub enum QuillError {
    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("operation '{op}' failed: {message}")]
    InvalidKey { op: Op, message: String },

    #[error("operation '{op}' failed for key '{key}': {message}")]
    KeyNotFound { op: Op, key: String, message: String },

    #[error("operation '{op}' failed for key '{key}': {message}")]
    KeyAlreadyExists { op: Op, key: String, message: String },

    #[error("operation '{op}' failed{}: {message}", KeyContext(.key))]
    EncodeFailure {
        op: Op,
        key: Option<String>,
        message: String,
    },

    #[error("operation '{op}' failed{}: {message}", KeyContext(.key))]
    DecodeFailure {
        op: Op,
        key: Option<String>,
        message: String,
    },

    #[error("operation '{op}' failed{}: {message}", KeyContext(.key))]
    StorageUnavailable {
        op: Op,
        key: Option<String>,
        message: String,
    },

    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl QuillError {
    pub fn invalid_key(op: Op) -> Self {
        QuillError::InvalidKey {
            op,
            message: "Key cannot be empty".to_string(),
        }
    }

    pub fn key_not_found(op: Op, key: &str) -> Self {
        QuillError::KeyNotFound {
            op,
            key: key.to_string(),
            message: "Key does not exist".to_string(),
        }
    }

    pub fn key_already_exists(op: Op, key: &str) -> Self {
        QuillError::KeyAlreadyExists {
            op,
            key: key.to_string(),
            message: "Key already exists".to_string(),
        }
    }

    pub fn storage(op: Op, key: Option<&str>, message: impl fmt::Display) -> Self {
        QuillError::StorageUnavailable {
            op,
            key: key.map(str::to_string),
            message: message.to_string(),
        }
    }

    /// Caused by the request rather than by the store or the server
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            QuillError::InvalidKey { .. }
                | QuillError::KeyNotFound { .. }
                | QuillError::KeyAlreadyExists { .. }
                | QuillError::EncodeFailure { .. }
                | QuillError::Protocol(_)
        )
    }

    /// Taxonomy kind, `None` for ambient errors (I/O, protocol, config)
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            QuillError::InvalidKey { .. } => Some(ErrorKind::InvalidKey),
            QuillError::KeyNotFound { .. } => Some(ErrorKind::KeyNotFound),
            QuillError::KeyAlreadyExists { .. } => Some(ErrorKind::KeyAlreadyExists),
            QuillError::EncodeFailure { .. } => Some(ErrorKind::EncodeFailure),
            QuillError::DecodeFailure { .. } => Some(ErrorKind::DecodeFailure),
            QuillError::StorageUnavailable { .. } => Some(ErrorKind::StorageUnavailable),
            QuillError::Io(_) | QuillError::Protocol(_) | QuillError::Config(_) => None,
        }
    }

    pub fn operation(&self) -> Option<Op> {
        match self {
            QuillError::InvalidKey { op, .. }
            | QuillError::KeyNotFound { op, .. }
            | QuillError::KeyAlreadyExists { op, .. }
            | QuillError::EncodeFailure { op, .. }
            | QuillError::DecodeFailure { op, .. }
            | QuillError::StorageUnavailable { op, .. } => Some(*op),
            _ => None,
        }
    }

    pub fn key(&self) -> Option<&str> {
        match self {
            QuillError::KeyNotFound { key, .. } | QuillError::KeyAlreadyExists { key, .. } => {
                Some(key)
            }
            QuillError::EncodeFailure { key, .. }
            | QuillError::DecodeFailure { key, .. }
            | QuillError::StorageUnavailable { key, .. } => key.as_deref(),
            _ => None,
        }
    }

    /// Human-readable message without the operation/key prefix
    pub fn message(&self) -> String {
        match self {
            QuillError::InvalidKey { message, .. }
            | QuillError::KeyNotFound { message, .. }
            | QuillError::KeyAlreadyExists { message, .. }
            | QuillError::EncodeFailure { message, .. }
            | QuillError::DecodeFailure { message, .. }
            | QuillError::StorageUnavailable { message, .. } => message.clone(),
            QuillError::Io(e) => e.to_string(),
            QuillError::Protocol(m) | QuillError::Config(m) => m.clone(),
        }
    }
}
