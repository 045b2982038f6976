//! Protocol codec
//!
//! Reading and writing HTTP/1.1 messages.
//!
//! ## Request Format
//! ```text
//! METHOD SP path SP HTTP/1.1 CRLF
//! Header: value CRLF
//! ...
//! CRLF
//! body (Content-Length bytes)
//! ```
//!
//! Only `Content-Length` framing is supported; chunked bodies are rejected.

use std::io::{BufRead, Read, Write};

use serde_json::Value as JsonValue;

use crate::error::{QuillError, Result};

use super::Response;

/// Longest accepted request line or header line
pub const MAX_LINE_LEN: usize = 8 * 1024;

/// Most headers accepted on one request
pub const MAX_HEADERS: usize = 64;

/// A parsed HTTP request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub path: String,
    pub version: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Request {
    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Whether the client expects the connection to stay open
    pub fn keep_alive(&self) -> bool {
        match self.header("Connection") {
            Some(v) if v.eq_ignore_ascii_case("close") => false,
            Some(v) if v.eq_ignore_ascii_case("keep-alive") => true,
            _ => self.version == "HTTP/1.1",
        }
    }
}

// =============================================================================
// Request Reading/Writing
// =============================================================================

/// Read one request
///
/// Returns `Ok(None)` if the stream ends cleanly before a request starts.
pub fn read_request<R: BufRead>(reader: &mut R, max_body: usize) -> Result<Option<Request>> {
    let request_line = match read_line(reader)? {
        Some(line) => line,
        None => return Ok(None),
    };

    let mut parts = request_line.split_whitespace();
    let (method, path, version) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(m), Some(p), Some(v), None) if v.starts_with("HTTP/1.") => {
            (m.to_string(), p.to_string(), v.to_string())
        }
        _ => {
            return Err(QuillError::Protocol(format!(
                "malformed request line: '{}'",
                request_line
            )))
        }
    };

    let headers = read_headers(reader)?;
    let mut request = Request {
        method,
        path,
        version,
        headers,
        body: Vec::new(),
    };

    if request
        .header("Transfer-Encoding")
        .is_some_and(|v| !v.eq_ignore_ascii_case("identity"))
    {
        return Err(QuillError::Protocol(
            "chunked request bodies are not supported".to_string(),
        ));
    }

    let length = content_length(&request.headers)?;
    if length > max_body {
        return Err(QuillError::Protocol(format!(
            "request body too large: {} bytes (max {})",
            length, max_body
        )));
    }

    let mut body = vec![0u8; length];
    reader.read_exact(&mut body)?;
    request.body = body;

    Ok(Some(request))
}

/// Encode a request to bytes (used by clients and tests)
pub fn encode_request(method: &str, path: &str, body: Option<&JsonValue>) -> Vec<u8> {
    let body = body.map(|b| b.to_string()).unwrap_or_default();
    let mut message = format!(
        "{} {} HTTP/1.1\r\nHost: localhost\r\nContent-Length: {}\r\n",
        method,
        path,
        body.len()
    );
    if !body.is_empty() {
        message.push_str("Content-Type: application/json\r\n");
    }
    message.push_str("\r\n");
    message.push_str(&body);
    message.into_bytes()
}

// =============================================================================
// Response Reading/Writing
// =============================================================================

/// Write a response with a JSON body
pub fn write_response<W: Write>(writer: &mut W, response: &Response, keep_alive: bool) -> Result<()> {
    let body = response.body.to_string();
    write!(
        writer,
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: {}\r\n\r\n",
        response.status.code(),
        response.status.reason(),
        body.len(),
        if keep_alive { "keep-alive" } else { "close" },
    )?;
    writer.write_all(body.as_bytes())?;
    writer.flush()?;
    Ok(())
}

/// Read a response, returning the status code and JSON body
pub fn read_response<R: BufRead>(reader: &mut R) -> Result<(u16, JsonValue)> {
    let status_line = read_line(reader)?.ok_or_else(|| {
        QuillError::Protocol("connection closed before response".to_string())
    })?;

    let code = status_line
        .split_whitespace()
        .nth(1)
        .and_then(|c| c.parse::<u16>().ok())
        .ok_or_else(|| QuillError::Protocol(format!("malformed status line: '{}'", status_line)))?;

    let headers = read_headers(reader)?;
    let mut body = vec![0u8; content_length(&headers)?];
    reader.read_exact(&mut body)?;

    let json = serde_json::from_slice(&body)
        .map_err(|e| QuillError::Protocol(format!("invalid JSON response body: {}", e)))?;
    Ok((code, json))
}

// =============================================================================
// Private Helpers
// =============================================================================

/// Read a CRLF (or LF) terminated line, without the terminator
fn read_line<R: BufRead>(reader: &mut R) -> Result<Option<String>> {
    let mut buf = Vec::new();
    let n = (&mut *reader)
        .take(MAX_LINE_LEN as u64 + 1)
        .read_until(b'\n', &mut buf)?;
    if n == 0 {
        return Ok(None);
    }
    if buf.last() != Some(&b'\n') {
        if buf.len() > MAX_LINE_LEN {
            return Err(QuillError::Protocol(format!(
                "header line exceeds {} bytes",
                MAX_LINE_LEN
            )));
        }
        return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
    }

    buf.pop();
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }

    String::from_utf8(buf)
        .map(Some)
        .map_err(|_| QuillError::Protocol("header line is not valid UTF-8".to_string()))
}

fn read_headers<R: BufRead>(reader: &mut R) -> Result<Vec<(String, String)>> {
    let mut headers = Vec::new();
    loop {
        let line = read_line(reader)?
            .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::UnexpectedEof))?;
        if line.is_empty() {
            return Ok(headers);
        }
        if headers.len() == MAX_HEADERS {
            return Err(QuillError::Protocol(format!(
                "more than {} headers",
                MAX_HEADERS
            )));
        }
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| QuillError::Protocol(format!("malformed header: '{}'", line)))?;
        headers.push((name.trim().to_string(), value.trim().to_string()));
    }
}

fn content_length(headers: &[(String, String)]) -> Result<usize> {
    let mut length = None;
    for (_, v) in headers
        .iter()
        .filter(|(k, _)| k.eq_ignore_ascii_case("Content-Length"))
    {
        if v.is_empty() || !v.bytes().all(|b| b.is_ascii_digit()) {
            return Err(QuillError::Protocol(format!("invalid Content-Length: '{}'", v)));
        }
        let parsed: usize = v
            .parse()
            .map_err(|_| QuillError::Protocol(format!("invalid Content-Length: '{}'", v)))?;

        match length {
            Some(seen) if seen != parsed => {
                return Err(QuillError::Protocol(format!(
                    "conflicting Content-Length headers: {} and {}",
                    seen, parsed
                )));
            }
            _ => length = Some(parsed),
        }
    }
    Ok(length.unwrap_or(0))
}
