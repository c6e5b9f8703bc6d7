//! Error types for tyro
//!
//! Three families of errors live here:
//!
//! - **Error**: Application-level errors for internal use (uses thiserror)
//! - **ConfigError**: Wiring mistakes that must abort startup
//! - **JsonRpcErrorData**: Wire-format errors as defined in the JSON-RPC 2.0 spec
//!
//! # Error Codes
//!
//! Standard JSON-RPC 2.0 codes are used for protocol failures. Validation and
//! handler failures use the tyro code table in [`codes`], which is part of the
//! public contract and never renumbered.
//!
//! # Examples
//!
//! ```rust
//! use tyro_core::{codes, JsonRpcErrorData};
//!
//! let error = JsonRpcErrorData::invalid_params(vec!["/x: expected number, got string".into()]);
//! assert_eq!(error.code, codes::INVALID_PARAMS);
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for tyro operations
pub type Result<T> = std::result::Result<T, Error>;

/// Numeric error codes used on the wire
///
/// The `-3199x` block belongs to tyro; everything else is reserved by the
/// JSON-RPC 2.0 specification.
pub mod codes {
    /// The JSON sent is not a valid request object
    pub const INVALID_REQUEST: i64 = -32600;
    /// The method does not exist
    pub const METHOD_NOT_FOUND: i64 = -32601;

    /// Parameters failed schema validation
    pub const INVALID_PARAMS: i64 = -31999;
    /// The handler produced a value that violates the return schema
    pub const INVALID_RETURN: i64 = -31998;
    /// The handler failed with an error that carries no domain code
    pub const NON_DOMAIN_ERROR: i64 = -31997;
    /// `params` was an array, a scalar, or missing where an object is required
    pub const UNSUPPORTED_PARAMS_TYPE: i64 = -31996;
}

/// Application-level error type for tyro operations
///
/// Protocol, validation and handler failures never show up here: they are
/// answered inside response envelopes. This type covers what is left.
///
/// # Error Categories
///
/// - **Configuration errors**: Config (fatal at wiring time)
/// - **Engine errors**: Internal
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Configuration error raised while wiring the application
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Internal engine failure
    ///
    /// Used for failures of the dispatch machinery itself, as opposed to
    /// validation or handler failures, which are always carried in envelopes.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Fatal configuration errors
///
/// These are raised synchronously while methods are registered or a service
/// is built. They are never turned into RPC responses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A method with this name is already registered
    #[error("method `{0}` is already registered")]
    DuplicateMethod(String),

    /// Some parameter names appear both as mandatory and optional
    #[error("method `{method}` declares {params:?} as both mandatory and optional")]
    OverlappingParams {
        /// The offending method
        method: String,
        /// Names present in both parameter maps, sorted
        params: Vec<String>,
    },

    /// The service has no way to produce an execution context
    #[error("no context builder configured")]
    MissingContextBuilder,
}

/// JSON-RPC 2.0 error data as defined in the specification
///
/// This structure is the exact wire format for the `error` member of a
/// response: `code` and `message` are mandatory, `data` is optional.
///
/// # Examples
///
/// ```rust
/// use tyro_core::JsonRpcErrorData;
/// use serde_json::json;
///
/// let error = JsonRpcErrorData::method_not_found("calculate");
/// assert_eq!(error.code, -32601);
///
/// let custom = JsonRpcErrorData::with_data(
///     1001,
///     "Insufficient funds",
///     json!({"balance": 50, "required": 100})
/// );
/// assert!(custom.data.is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcErrorData {
    /// Numeric error code indicating the error type
    pub code: i64,

    /// Human-readable error message
    pub message: String,

    /// Optional additional error information
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl JsonRpcErrorData {
    /// Create a new JSON-RPC error with code and message
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Create a new JSON-RPC error with additional data
    pub fn with_data(code: i64, message: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            code,
            message: message.into(),
            data: Some(data),
        }
    }

    /// Create an invalid request error (-32600)
    ///
    /// # Arguments
    ///
    /// * `msg` - Specific reason why the request is invalid
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::new(codes::INVALID_REQUEST, msg)
    }

    /// Create a method not found error (-32601)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tyro_core::JsonRpcErrorData;
    ///
    /// let error = JsonRpcErrorData::method_not_found("calculateFoo");
    /// assert_eq!(error.message, "Method not found: calculateFoo");
    /// ```
    pub fn method_not_found(method: impl Into<String>) -> Self {
        Self::new(
            codes::METHOD_NOT_FOUND,
            format!("Method not found: {}", method.into()),
        )
    }

    /// Create a batch size exceeded error (-32600)
    ///
    /// # Arguments
    ///
    /// * `limit` - The configured maximum batch size
    /// * `actual` - The actual size of the rejected batch
    pub fn batch_size_exceeded(limit: usize, actual: usize) -> Self {
        Self::new(
            codes::INVALID_REQUEST,
            format!("Batch size limit exceeded: limit={}, actual={}", limit, actual),
        )
    }

    /// Create a parameter validation error (-31999)
    ///
    /// The validation messages are carried in `data.errors`, one per failing
    /// field, so clients can show exactly what was wrong.
    pub fn invalid_params(errors: Vec<String>) -> Self {
        Self::with_data(
            codes::INVALID_PARAMS,
            "Invalid parameters type",
            serde_json::json!({ "errors": errors }),
        )
    }

    /// Create a return validation error (-31998)
    pub fn invalid_return(errors: Vec<String>) -> Self {
        Self::with_data(
            codes::INVALID_RETURN,
            "Invalid return type",
            serde_json::json!({ "errors": errors }),
        )
    }

    /// Create an error for a handler failure that carries no domain code (-31997)
    pub fn non_domain(message: impl Into<String>) -> Self {
        Self::new(codes::NON_DOMAIN_ERROR, message)
    }

    /// Create an unsupported params shape error (-31996)
    ///
    /// # Arguments
    ///
    /// * `found` - Description of what was received instead of an object
    pub fn unsupported_params_type(found: &str) -> Self {
        Self::new(
            codes::UNSUPPORTED_PARAMS_TYPE,
            format!("Unsupported params type: expected an object, got {}", found),
        )
    }

    /// Validation messages carried in `data.errors`, if any
    pub fn validation_errors(&self) -> Vec<String> {
        self.data
            .as_ref()
            .and_then(|data| data.get("errors"))
            .and_then(|errors| errors.as_array())
            .map(|errors| {
                errors
                    .iter()
                    .filter_map(|e| e.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl std::fmt::Display for JsonRpcErrorData {
    /// Formats as "[code] message" for easy readability in logs.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for JsonRpcErrorData {}
