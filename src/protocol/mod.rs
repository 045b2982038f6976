//! Protocol Module
//!
//! Defines the HTTP surface for client-server communication.
//!
//! ## Routes
//! ```text
//! PUT    /put/kv/{key}      body {"value": <json>}   → set
//! GET    /get/kv/{key}                              → get
//! UPDATE /update/kv/{key}   body {"value": <json>}   → update
//! DELETE /delete/kv/{key}                           → delete
//! POST   /txn/begin | /txn/commit | /txn/rollback
//! GET    /health
//! ```
//!
//! ## Response Bodies
//! - Success: `{"response": "success", ...}`
//! - Failure: `{"response": "error", "message": "..."}`

mod command;
mod response;
mod codec;

pub use command::{parse_json_value, percent_decode, Command};
pub use response::{Response, Status};
pub use codec::{encode_request, read_request, read_response, write_response, Request};
