//! JSON-RPC 2.0 types as defined in the specification
//!
//! This module implements the wire structures from the JSON-RPC 2.0
//! specification (https://www.jsonrpc.org/specification):
//!
//! 1. **Request**: A call to a method; a request without an `id` is a notification
//! 2. **Response**: The result of processing a request (success or error)
//! 3. **Reply**: What goes back over the transport, a single response or a batch
//!
//! # Request IDs
//!
//! IDs correlate responses with requests. JSON-RPC allows string, number, or
//! null IDs. Numbers are kept as `serde_json::Number` so an ID is echoed back
//! exactly as the client sent it.

use crate::error::JsonRpcErrorData;
use serde::{Deserialize, Serialize};
use std::fmt;

/// JSON protocol version carried by every message
pub const JSONRPC_VERSION: &str = "2.0";

/// JSON-RPC 2.0 request ID
///
/// This enum uses `#[serde(untagged)]` to serialize directly as the inner
/// value without a type discriminator, matching the JSON-RPC 2.0 spec.
///
/// # Examples
///
/// ```rust
/// use tyro_core::Id;
///
/// let id1: Id = "req-123".into();
/// let id2: Id = 42i64.into();
///
/// assert_eq!(id1.to_string(), "\"req-123\"");
/// assert_eq!(id2.to_string(), "42");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    /// String identifier
    String(String),
    /// Numeric identifier, integer or not
    Number(serde_json::Number),
    /// Null identifier, allowed but makes correlation impossible
    Null,
}

impl Id {
    /// Read an ID from a raw JSON value
    ///
    /// Returns `None` for values that cannot be IDs (booleans, arrays, objects).
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(s) => Some(Id::String(s.clone())),
            serde_json::Value::Number(n) => Some(Id::Number(n.clone())),
            serde_json::Value::Null => Some(Id::Null),
            _ => None,
        }
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id::String(s) => write!(f, "\"{}\"", s),
            Id::Number(n) => write!(f, "{}", n),
            Id::Null => write!(f, "null"),
        }
    }
}

impl From<String> for Id {
    fn from(s: String) -> Self {
        Id::String(s)
    }
}

impl From<&str> for Id {
    fn from(s: &str) -> Self {
        Id::String(s.to_string())
    }
}

impl From<i64> for Id {
    fn from(n: i64) -> Self {
        Id::Number(n.into())
    }
}

impl From<u64> for Id {
    fn from(n: u64) -> Self {
        Id::Number(n.into())
    }
}

/// JSON-RPC 2.0 request message
///
/// A request MUST contain `jsonrpc` (exactly "2.0") and `method`, and MAY
/// contain `params` and `id`. A request without `id` is a notification: it is
/// executed but never answered.
///
/// Note that `id: null` is *not* a notification; it is a request whose
/// response carries a null ID. The codec keeps the two apart, which plain
/// `Option<Id>` deserialization would not.
///
/// # Examples
///
/// ```rust
/// use tyro_core::{JsonRpcRequest, Id};
/// use serde_json::json;
///
/// let req = JsonRpcRequest::new("double", Some(json!({"x": 7})), Id::from(1i64));
/// assert!(!req.is_notification());
///
/// let notif = JsonRpcRequest::notification("audit", None);
/// assert!(notif.is_notification());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// JSON-RPC version, always "2.0"
    pub jsonrpc: String,
    /// Name of the remote method to invoke
    pub method: String,
    /// Optional parameters to pass to the method
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
    /// Correlation ID; `None` marks a notification
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,
}

impl JsonRpcRequest {
    /// Create a new JSON-RPC 2.0 request that expects a response
    pub fn new(method: impl Into<String>, params: Option<serde_json::Value>, id: Id) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
            id: Some(id),
        }
    }

    /// Create a new JSON-RPC 2.0 notification
    pub fn notification(method: impl Into<String>, params: Option<serde_json::Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
            id: None,
        }
    }

    /// Check whether the request is a notification (no response expected)
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// JSON-RPC 2.0 response message
///
/// A response contains either a result (success) or an error (failure), but
/// never both. The mutual exclusion is enforced by the constructors.
///
/// If the request `id` could not be determined (e.g. an invalid request
/// object), the response uses `Id::Null`.
///
/// # Examples
///
/// ```rust
/// use tyro_core::{JsonRpcResponse, JsonRpcErrorData, Id};
/// use serde_json::json;
///
/// let success = JsonRpcResponse::success(json!(21), Id::from(1i64));
/// assert!(success.is_success());
///
/// let error = JsonRpcResponse::error(
///     JsonRpcErrorData::method_not_found("unknownMethod"),
///     Id::from(2i64)
/// );
/// assert!(error.is_error());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// JSON-RPC version, always "2.0"
    pub jsonrpc: String,
    /// The result of the method invocation (present only on success)
    ///
    /// A `null` result is `Some(Value::Null)`, both ways over the wire.
    #[serde(
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub result: Option<serde_json::Value>,
    /// Error information (present only on failure)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcErrorData>,
    /// Request ID from the original request
    pub id: Id,
}

fn present_value<'de, D>(deserializer: D) -> Result<Option<serde_json::Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(Some)
}

impl JsonRpcResponse {
    /// Create a successful JSON-RPC 2.0 response
    ///
    /// A handler returning `()` produces `null`, which is still a result: the
    /// `result` member is present on the wire.
    pub fn success(result: serde_json::Value, id: Id) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    /// Create an error JSON-RPC 2.0 response
    pub fn error(error: JsonRpcErrorData, id: Id) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: None,
            error: Some(error),
            id,
        }
    }

    /// Build a response from a dispatch outcome
    pub fn from_outcome(outcome: Result<serde_json::Value, JsonRpcErrorData>, id: Id) -> Self {
        match outcome {
            Ok(result) => Self::success(result, id),
            Err(error) => Self::error(error, id),
        }
    }

    /// Check if the response represents a successful result
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Check if the response represents an error
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// What a transport sends back for one inbound payload
///
/// The shape mirrors the request: a single request object gets a single
/// response, a batch array gets an array of responses.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum JsonRpcReply {
    /// Response to a single request object
    Single(JsonRpcResponse),
    /// Responses to a batch, one per non-notification entry
    Batch(Vec<JsonRpcResponse>),
}

impl JsonRpcReply {
    /// All responses carried by this reply
    pub fn responses(&self) -> &[JsonRpcResponse] {
        match self {
            JsonRpcReply::Single(response) => std::slice::from_ref(response),
            JsonRpcReply::Batch(responses) => responses,
        }
    }
}
