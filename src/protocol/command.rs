//! Command definitions
//!
//! Represents operations requested by clients, and how HTTP routes and
//! script lines map onto them.

use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::error::{QuillError, Result};
use crate::value::Value;

use super::Request;

/// Route prefixes for keyed operations
pub const PUT_PREFIX: &str = "/put/kv/";
pub const GET_PREFIX: &str = "/get/kv/";
pub const UPDATE_PREFIX: &str = "/update/kv/";
pub const DELETE_PREFIX: &str = "/delete/kv/";

/// A parsed command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Get a value by key
    Get { key: String },

    /// Insert a key-value pair
    Set { key: String, value: Value },

    /// Overwrite an existing key
    Update { key: String, value: Value },

    /// Delete a key
    Delete { key: String },

    /// Open a transaction
    Begin,

    /// Apply the open transaction
    Commit,

    /// Discard the open transaction
    Rollback,

    /// Liveness check
    Health,
}

/// JSON body carried by PUT and UPDATE
#[derive(Debug, Deserialize)]
struct ValueBody {
    value: JsonValue,
}

impl Command {
    /// Short name, used in log lines
    pub fn name(&self) -> &'static str {
        match self {
            Command::Get { .. } => "get",
            Command::Set { .. } => "set",
            Command::Update { .. } => "update",
            Command::Delete { .. } => "delete",
            Command::Begin => "begin",
            Command::Commit => "commit",
            Command::Rollback => "rollback",
            Command::Health => "health",
        }
    }

    /// Map an HTTP request to a command
    ///
    /// Returns:
    /// - `Ok(Some(cmd))`: route matched
    /// - `Ok(None)`: no such route
    /// - `Err(Protocol)`: route matched but the request is malformed
    pub fn from_request(request: &Request) -> Result<Option<Command>> {
        let path = request.path.split('?').next().unwrap_or("");
        let method = request.method.as_str();

        let command = match method {
            "PUT" => match path.strip_prefix(PUT_PREFIX) {
                Some(raw) => Command::Set {
                    key: percent_decode(raw)?,
                    value: parse_value_body(&request.body)?,
                },
                None => return Ok(None),
            },
            "GET" => match path.strip_prefix(GET_PREFIX) {
                Some(raw) => Command::Get {
                    key: percent_decode(raw)?,
                },
                None if path == "/health" => Command::Health,
                None => return Ok(None),
            },
            "UPDATE" => match path.strip_prefix(UPDATE_PREFIX) {
                Some(raw) => Command::Update {
                    key: percent_decode(raw)?,
                    value: parse_value_body(&request.body)?,
                },
                None => return Ok(None),
            },
            "DELETE" => match path.strip_prefix(DELETE_PREFIX) {
                Some(raw) => Command::Delete {
                    key: percent_decode(raw)?,
                },
                None => return Ok(None),
            },
            "POST" => match path {
                "/txn/begin" => Command::Begin,
                "/txn/commit" => Command::Commit,
                "/txn/rollback" => Command::Rollback,
                _ => return Ok(None),
            },
            _ => return Ok(None),
        };

        Ok(Some(command))
    }

    /// Parse one line of a batch script
    ///
    /// ```text
    /// begin | commit | rollback
    /// get <key> | delete <key>
    /// set <key> <json> | update <key> <json>
    /// ```
    ///
    /// Blank lines and lines starting with `#` yield `Ok(None)`.
    pub fn parse_line(line: &str) -> Result<Option<Command>> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        let (verb, rest) = split_word(line);
        let command = match verb.to_ascii_lowercase().as_str() {
            "begin" => Command::Begin,
            "commit" => Command::Commit,
            "rollback" => Command::Rollback,
            "get" => Command::Get {
                key: single_key(verb, rest)?,
            },
            "delete" | "del" => Command::Delete {
                key: single_key(verb, rest)?,
            },
            "set" | "put" => {
                let (key, json) = key_and_json(verb, rest)?;
                Command::Set { key, value: json }
            }
            "update" => {
                let (key, json) = key_and_json(verb, rest)?;
                Command::Update { key, value: json }
            }
            other => {
                return Err(QuillError::Protocol(format!("unknown command '{}'", other)));
            }
        };

        Ok(Some(command))
    }
}

/// Parse a value from JSON text
pub fn parse_json_value(text: &str) -> Result<Value> {
    let json: JsonValue = serde_json::from_str(text)
        .map_err(|e| QuillError::Protocol(format!("invalid JSON value: {}", e)))?;
    Ok(Value::from(json))
}

fn parse_value_body(body: &[u8]) -> Result<Value> {
    let parsed: ValueBody = serde_json::from_slice(body).map_err(|e| {
        QuillError::Protocol(format!(
            "request body must be a JSON object with a 'value' field: {}",
            e
        ))
    })?;
    Ok(Value::from(parsed.value))
}

/// Decode `%XX` escapes in a path segment
pub fn percent_decode(raw: &str) -> Result<String> {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes
                .get(i + 1..i + 3)
                .filter(|h| h.iter().all(u8::is_ascii_hexdigit))
                .and_then(|h| std::str::from_utf8(h).ok())
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .ok_or_else(|| {
                    QuillError::Protocol(format!("invalid percent escape in '{}'", raw))
                })?;
            out.push(hex);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }

    String::from_utf8(out)
        .map_err(|_| QuillError::Protocol(format!("key is not valid UTF-8 after decoding '{}'", raw)))
}

fn split_word(s: &str) -> (&str, &str) {
    match s.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim_start()),
        None => (s, ""),
    }
}

fn single_key(verb: &str, rest: &str) -> Result<String> {
    let (key, extra) = split_word(rest);
    if key.is_empty() || !extra.is_empty() {
        return Err(QuillError::Protocol(format!("usage: {} <key>", verb)));
    }
    Ok(key.to_string())
}

fn key_and_json(verb: &str, rest: &str) -> Result<(String, Value)> {
    let (key, json) = split_word(rest);
    if key.is_empty() || json.is_empty() {
        return Err(QuillError::Protocol(format!("usage: {} <key> <json>", verb)));
    }
    Ok((key.to_string(), parse_json_value(json)?))
}
