//! Response definitions
//!
//! Represents responses to clients. Every body is a JSON object whose
//! `response` field is either `"success"` or `"error"`.

use serde_json::{json, Map, Value as JsonValue};

use crate::engine::Reply;
use crate::error::{ErrorKind, QuillError, Result};
use crate::txn::CommitOutcome;

/// HTTP status codes used by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum Status {
    Ok = 200,
    BadRequest = 400,
    NotFound = 404,
    Conflict = 409,
    PayloadTooLarge = 413,
    InternalError = 500,
    ServiceUnavailable = 503,
}

impl Status {
    pub fn code(&self) -> u16 {
        *self as u16
    }

    pub fn reason(&self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::BadRequest => "Bad Request",
            Status::NotFound => "Not Found",
            Status::Conflict => "Conflict",
            Status::PayloadTooLarge => "Payload Too Large",
            Status::InternalError => "Internal Server Error",
            Status::ServiceUnavailable => "Service Unavailable",
        }
    }

    /// Status for a failed operation
    pub fn for_error(error: &QuillError) -> Self {
        match error.kind() {
            Some(ErrorKind::InvalidKey) => Status::BadRequest,
            Some(ErrorKind::KeyNotFound) => Status::NotFound,
            Some(ErrorKind::KeyAlreadyExists) => Status::Conflict,
            Some(ErrorKind::EncodeFailure) => Status::PayloadTooLarge,
            Some(ErrorKind::DecodeFailure) => Status::InternalError,
            Some(ErrorKind::StorageUnavailable) => Status::ServiceUnavailable,
            None => match error {
                QuillError::Protocol(_) => Status::BadRequest,
                _ => Status::InternalError,
            },
        }
    }
}

/// A response to send to a client
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Status code
    pub status: Status,

    /// JSON body
    pub body: JsonValue,
}

impl Response {
    /// `{"response": "success"}`
    pub fn success() -> Self {
        Self::success_with(Map::new())
    }

    /// `{"response": "success", ...fields}`
    pub fn success_with(mut fields: Map<String, JsonValue>) -> Self {
        fields.insert("response".to_string(), json!("success"));
        Self {
            status: Status::Ok,
            body: JsonValue::Object(fields),
        }
    }

    /// `{"response": "error", "message": ...}`
    pub fn error(status: Status, message: &str) -> Self {
        Self {
            status,
            body: json!({ "response": "error", "message": message }),
        }
    }

    /// Error response for a failed operation
    pub fn from_error(error: &QuillError) -> Self {
        Self::error(Status::for_error(error), &error.to_string())
    }

    /// NOT_FOUND response for an unknown route
    pub fn no_route(method: &str, path: &str) -> Self {
        Self::error(
            Status::NotFound,
            &format!("no route for {} {}", method, path),
        )
    }

    /// Response for the result of executing a command
    pub fn from_result(result: &Result<Reply>) -> Self {
        match result {
            Ok(reply) => Self::from_reply(reply),
            Err(e) => Self::from_error(e),
        }
    }

    pub fn from_reply(reply: &Reply) -> Self {
        match reply {
            Reply::Done => Self::success(),
            Reply::Value {
                key,
                value: Some(value),
            } => {
                let mut fields = Map::new();
                fields.insert("key".to_string(), json!(key));
                fields.insert("value".to_string(), value.to_json());
                Self::success_with(fields)
            }
            Reply::Value { key, value: None } => {
                Self::error(Status::NotFound, &format!("key '{}' not found", key))
            }
            Reply::Commit(CommitOutcome::Committed { applied }) => {
                let mut fields = Map::new();
                fields.insert("applied".to_string(), json!(applied));
                Self::success_with(fields)
            }
            Reply::Commit(CommitOutcome::RolledBack {
                applied,
                discarded,
                error,
            }) => Self {
                status: Status::Conflict,
                body: json!({
                    "response": "error",
                    "message": format!("transaction rolled back: {}", error),
                    "applied": applied,
                    "discarded": discarded,
                }),
            },
            Reply::Health { version } => {
                let mut fields = Map::new();
                fields.insert("version".to_string(), json!(version));
                Self::success_with(fields)
            }
        }
    }

    pub fn is_success(&self) -> bool {
        self.body.get("response").and_then(JsonValue::as_str) == Some("success")
    }
}
