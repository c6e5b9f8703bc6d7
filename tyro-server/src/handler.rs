//! Handler traits and types for RPC methods
//!
//! A handler receives the validated parameter object and the per-request
//! context, and resolves to either a JSON result or a [`MethodError`]. The
//! dispatcher never sees concrete handler types: everything is stored as a
//! `Box<dyn MethodHandler<C>>`, so handlers with different future types can
//! live in one registry.
//!
//! # Creating Handlers
//!
//! 1. **from_fn**: Wrap an async closure that works with raw JSON values
//! 2. **from_typed_fn**: Wrap an async closure with serde conversion on both ends
//!
//! # Failing
//!
//! A handler fails in one of two ways, and the dispatcher treats them
//! differently:
//!
//! - [`MethodError::Domain`]: a business failure with a caller-chosen code,
//!   sent to the client verbatim
//! - [`MethodError::Unexpected`]: anything else; the client sees code `-31997`
//!   and the service's error observer is notified
//!
//! Any `std::error::Error` converts into `Unexpected`, so `?` works inside
//! handlers without ceremony.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use tyro_server::{from_fn, from_typed_fn, MethodError};
//! use serde::Deserialize;
//!
//! struct Session { user: String }
//!
//! let whoami = from_fn(|_params, ctx: Arc<Session>| async move {
//!     Ok(serde_json::json!(ctx.user))
//! });
//!
//! #[derive(Deserialize)]
//! struct Withdraw { amount: u64 }
//!
//! let withdraw = from_typed_fn(|params: Withdraw, _ctx: Arc<Session>| async move {
//!     if params.amount > 100 {
//!         return Err(MethodError::domain(1001, "Insufficient funds"));
//!     }
//!     Ok(100 - params.amount)
//! });
//! ```

use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Shared, type-erased error raised by a handler
pub type BoxError = Arc<dyn std::error::Error + Send + Sync>;

/// Result type for handler bodies
pub type MethodResult<T> = std::result::Result<T, MethodError>;

/// Future returned by every handler
pub type HandlerFuture = Pin<Box<dyn Future<Output = MethodResult<Value>> + Send>>;

/// Failure of a handler
///
/// This type deliberately does not implement `std::error::Error`: that keeps
/// the blanket `From` conversion below coherent.
#[derive(Debug, Clone)]
pub enum MethodError {
    /// Business-logic failure carrying an application-chosen code
    Domain {
        /// Error code sent to the client
        code: i64,
        /// Error message sent to the client
        message: String,
    },
    /// Any other failure
    Unexpected(BoxError),
}

impl MethodError {
    /// Create a domain error
    ///
    /// # Arguments
    ///
    /// * `code` - Code the client receives unchanged
    /// * `message` - Message the client receives unchanged
    pub fn domain(code: i64, message: impl Into<String>) -> Self {
        MethodError::Domain {
            code,
            message: message.into(),
        }
    }

    /// Create an unexpected error from a plain message
    pub fn unexpected(message: impl Into<String>) -> Self {
        MethodError::Unexpected(Arc::new(Message(message.into())))
    }
}

impl<E> From<E> for MethodError
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(error: E) -> Self {
        MethodError::Unexpected(Arc::new(error))
    }
}

impl fmt::Display for MethodError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodError::Domain { code, message } => write!(f, "[{}] {}", code, message),
            MethodError::Unexpected(error) => write!(f, "{}", error),
        }
    }
}

/// Error carrying only a message
#[derive(Debug)]
struct Message(String);

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for Message {}

/// Trait for RPC method handlers
///
/// `C` is the execution context type built once per HTTP request. You rarely
/// implement this directly; [`from_fn`] and [`from_typed_fn`] cover closures.
pub trait MethodHandler<C>: Send + Sync {
    /// Run the method
    ///
    /// # Arguments
    ///
    /// * `params` - The validated parameter object, stripped of undeclared keys
    /// * `ctx` - Context of the HTTP request the call arrived in
    fn call(&self, params: Value, ctx: Arc<C>) -> HandlerFuture;
}

/// Wrapper that adapts an async function into a [`MethodHandler`]
pub struct AsyncHandler<F> {
    func: F,
}

impl<F> AsyncHandler<F> {
    /// Wrap a function
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<C, F, Fut> MethodHandler<C> for AsyncHandler<F>
where
    F: Fn(Value, Arc<C>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = MethodResult<Value>> + Send + 'static,
{
    fn call(&self, params: Value, ctx: Arc<C>) -> HandlerFuture {
        Box::pin((self.func)(params, ctx))
    }
}

/// Create a handler from an async function over raw JSON
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use tyro_server::from_fn;
///
/// let echo = from_fn(|params, _ctx: Arc<()>| async move { Ok(params) });
/// ```
pub fn from_fn<C, F, Fut>(func: F) -> Box<dyn MethodHandler<C>>
where
    C: 'static,
    F: Fn(Value, Arc<C>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = MethodResult<Value>> + Send + 'static,
{
    Box::new(AsyncHandler::new(func))
}

/// Create a handler from an async function with serde conversion
///
/// The parameter object is deserialized into `P` and the result serialized
/// from `R`. Parameters have already passed schema validation by then, so a
/// conversion failure means the Rust types and the declared schemas disagree;
/// it is reported as an unexpected error.
pub fn from_typed_fn<C, P, R, F, Fut>(func: F) -> Box<dyn MethodHandler<C>>
where
    C: Send + Sync + 'static,
    P: serde::de::DeserializeOwned + Send + 'static,
    R: serde::Serialize + Send + 'static,
    F: Fn(P, Arc<C>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = MethodResult<R>> + Send + 'static,
{
    let func = Arc::new(func);

    from_fn(move |params: Value, ctx: Arc<C>| {
        let func = Arc::clone(&func);
        async move {
            let params: P = serde_json::from_value(params)?;
            let result = func(params, ctx).await?;
            Ok::<_, MethodError>(serde_json::to_value(result)?)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Deserialize)]
    struct AddParams {
        a: i32,
        b: i32,
    }

    #[derive(Serialize, Deserialize)]
    struct AddResult {
        sum: i32,
    }

    #[tokio::test]
    async fn test_typed_handler() {
        let handler = from_typed_fn(|params: AddParams, _ctx: Arc<()>| async move {
            Ok(AddResult {
                sum: params.a + params.b,
            })
        });

        let result = handler
            .call(serde_json::json!({"a": 5, "b": 3}), Arc::new(()))
            .await
            .unwrap();

        let sum: AddResult = serde_json::from_value(result).unwrap();
        assert_eq!(sum.sum, 8);
    }

    #[tokio::test]
    async fn test_typed_handler_conversion_failure_is_unexpected() {
        let handler = from_typed_fn(|params: AddParams, _ctx: Arc<()>| async move {
            Ok(params.a)
        });

        let error = handler
            .call(serde_json::json!({"a": "five"}), Arc::new(()))
            .await
            .unwrap_err();

        assert!(matches!(error, MethodError::Unexpected(_)));
    }

    #[tokio::test]
    async fn test_handler_sees_context() {
        let handler = from_fn(|_params, ctx: Arc<String>| async move {
            Ok(serde_json::json!(ctx.as_str()))
        });

        let result = handler
            .call(serde_json::json!({}), Arc::new("alice".to_string()))
            .await
            .unwrap();
        assert_eq!(result, "alice");
    }

    #[test]
    fn test_error_conversions() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let error: MethodError = io.into();
        assert!(matches!(error, MethodError::Unexpected(_)));
        assert_eq!(error.to_string(), "disk on fire");

        let domain = MethodError::domain(12345, "custom error message");
        assert!(matches!(domain, MethodError::Domain { code: 12345, .. }));
        assert_eq!(domain.to_string(), "[12345] custom error message");

        assert_eq!(MethodError::unexpected("boom").to_string(), "boom");
    }
}
