//! Codec for inbound JSON-RPC payloads
//!
//! While serde provides generic JSON serialization, JSON-RPC needs a few
//! protocol rules on top of it:
//!
//! - **Batch detection**: an array payload is a batch, an object is a single call
//! - **Entry validation**: each request object is checked field by field, so a
//!   bad entry yields `-32600` for that entry only and the rest of the batch runs
//! - **ID recovery**: when an entry is invalid, its `id` is still echoed back if
//!   it was well-typed
//!
//! Transports hand over the parsed JSON document: [`classify`] splits it into
//! entries and [`parse_request`] validates each one.
//!
//! # Examples
//!
//! ```rust
//! use tyro_core::codec::{self, Payload};
//! use serde_json::json;
//!
//! let payload = codec::classify(json!([
//!     {"jsonrpc": "2.0", "method": "a", "id": 1},
//!     {"jsonrpc": "2.0", "method": "b", "id": 2},
//! ]));
//! assert!(matches!(payload, Payload::Batch(ref items) if items.len() == 2));
//! ```

use crate::error::JsonRpcErrorData;
use crate::types::{Id, JsonRpcRequest, JsonRpcResponse, JSONRPC_VERSION};
use serde_json::Value;

/// Shape of an inbound JSON-RPC payload
#[derive(Debug, Clone)]
pub enum Payload {
    /// A single value that should be a request object
    Single(Value),
    /// A non-empty batch; entries are still raw because each is parsed separately
    Batch(Vec<Value>),
    /// An empty array, which the protocol rejects as a whole
    EmptyBatch,
}

/// A batch entry or single payload that is not a valid request object
///
/// Carries the error to answer with and the best ID that could be recovered.
#[derive(Debug, Clone)]
pub struct InvalidEntry {
    /// Error data to send back (always `-32600`)
    pub error: JsonRpcErrorData,
    /// Recovered request ID, `Id::Null` when none could be read
    pub id: Id,
}

impl InvalidEntry {
    fn new(reason: impl Into<String>, id: Id) -> Self {
        Self {
            error: JsonRpcErrorData::invalid_request(reason),
            id,
        }
    }

    /// Turn the invalid entry into its error response
    pub fn into_response(self) -> JsonRpcResponse {
        JsonRpcResponse::error(self.error, self.id)
    }
}

/// Classify a parsed JSON document as a single call or a batch
pub fn classify(value: Value) -> Payload {
    match value {
        Value::Array(items) if items.is_empty() => Payload::EmptyBatch,
        Value::Array(items) => Payload::Batch(items),
        other => Payload::Single(other),
    }
}

/// Validate one request object
///
/// The rules are the JSON-RPC 2.0 ones:
///
/// - the entry must be an object
/// - `jsonrpc` must be exactly `"2.0"`
/// - `method` must be a string
/// - `id`, when present, must be a string, a number or null
/// - `params`, when present, must be structured (object or array)
///
/// Array params pass this check on purpose: they are a valid JSON-RPC request
/// that tyro methods do not support, which the dispatcher reports with its own
/// code once it knows the method exists.
pub fn parse_request(value: Value) -> Result<JsonRpcRequest, InvalidEntry> {
    let Value::Object(mut object) = value else {
        return Err(InvalidEntry::new("Request must be an object", Id::Null));
    };

    // Recover the id first so every later failure can echo it
    let id = match object.remove("id") {
        None => None,
        Some(raw) => match Id::from_value(&raw) {
            Some(id) => Some(id),
            None => {
                return Err(InvalidEntry::new(
                    "Request id must be a string, a number or null",
                    Id::Null,
                ))
            }
        },
    };
    let reply_id = id.clone().unwrap_or(Id::Null);

    match object.get("jsonrpc") {
        Some(Value::String(version)) if version == JSONRPC_VERSION => {}
        _ => {
            return Err(InvalidEntry::new(
                "Request must have a \"jsonrpc\" member equal to \"2.0\"",
                reply_id,
            ))
        }
    }

    let method = match object.remove("method") {
        Some(Value::String(method)) => method,
        _ => {
            return Err(InvalidEntry::new(
                "Request must have a string \"method\" member",
                reply_id,
            ))
        }
    };

    let params = match object.remove("params") {
        None => None,
        Some(params @ (Value::Object(_) | Value::Array(_))) => Some(params),
        Some(_) => {
            return Err(InvalidEntry::new(
                "Request params must be an object or an array",
                reply_id,
            ))
        }
    };

    Ok(JsonRpcRequest {
        jsonrpc: JSONRPC_VERSION.to_string(),
        method,
        params,
        id,
    })
}
