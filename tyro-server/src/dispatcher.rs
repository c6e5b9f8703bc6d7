//! Per-call validation, execution and error mapping
//!
//! The dispatcher turns one request into one outcome. It never fails outward:
//! every path ends in either a result value or a [`JsonRpcErrorData`] that the
//! caller wraps in an envelope.
//!
//! # Pipeline
//!
//! 1. **Lookup**: unknown names yield `-32601`
//! 2. **Shape**: `params` must be an object; arrays, scalars and (when the
//!    method has mandatory parameters) a missing `params` yield `-31996`
//! 3. **Split**: keys are sorted into the mandatory and optional slices;
//!    undeclared keys are dropped without error
//! 4. **Validate**: the mandatory slice must match exactly, each optional key
//!    must match when present; all violations are reported together as `-31999`
//! 5. **Invoke**: the handler runs with the merged slices and the context
//! 6. **Check result**: a value violating the return schema yields `-31998`
//! 7. **Map failures**: domain errors pass through verbatim, anything else
//!    (panics included) becomes `-31997` and is reported to the error observer
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use tyro_server::{from_fn, Dispatcher, Registry};
//! use tyro_core::{MethodSpec, Schema};
//! use serde_json::json;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let registry = Registry::<()>::new()
//!     .method(
//!         MethodSpec::new("double").param("x", Schema::Number).returns(Schema::Number),
//!         from_fn(|params, _| async move {
//!             Ok(json!(params["x"].as_f64().unwrap_or_default() * 2.0))
//!         }),
//!     )
//!     .unwrap();
//!
//! let dispatcher = Dispatcher::new(Arc::new(registry));
//! let result = dispatcher.call("double", Some(json!({"x": 4})), Arc::new(())).await;
//! assert_eq!(result, Ok(json!(8.0)));
//!
//! let error = dispatcher.call("double", Some(json!([4])), Arc::new(())).await.unwrap_err();
//! assert_eq!(error.code, tyro_core::codes::UNSUPPORTED_PARAMS_TYPE);
//! # }
//! ```

use crate::handler::{BoxError, MethodError};
use crate::metrics::ServerMetrics;
use crate::registry::{RegisteredMethod, Registry};
use futures::FutureExt;
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tyro_core::schema::{self, json_type_name, FieldMode};
use tyro_core::{JsonRpcErrorData, JsonRpcRequest, JsonRpcResponse, Schema};

/// Observer notified of unexpected handler failures
///
/// Called with the error, the method name and the params exactly as received
/// (`null` when absent). It runs inline and cannot change the response; a
/// panicking observer is caught and logged.
pub type ErrorObserver = Arc<dyn Fn(&BoxError, &str, &Value) + Send + Sync>;

/// Validates, executes and maps calls against a registry
pub struct Dispatcher<C> {
    registry: Arc<Registry<C>>,
    on_error: Option<ErrorObserver>,
    metrics: Option<Arc<ServerMetrics>>,
}

impl<C> Clone for Dispatcher<C> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            on_error: self.on_error.clone(),
            metrics: self.metrics.clone(),
        }
    }
}

impl<C: Send + Sync + 'static> Dispatcher<C> {
    /// Create a dispatcher over a registry
    pub fn new(registry: Arc<Registry<C>>) -> Self {
        Self {
            registry,
            on_error: None,
            metrics: None,
        }
    }

    /// Install the observer for unexpected handler failures
    pub fn with_error_observer(mut self, observer: ErrorObserver) -> Self {
        self.on_error = Some(observer);
        self
    }

    /// Record call outcomes in the given metrics
    pub fn with_metrics(mut self, metrics: Arc<ServerMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// The registry this dispatcher serves
    pub fn registry(&self) -> &Registry<C> {
        &self.registry
    }

    /// Metrics sink, if enabled
    pub fn metrics(&self) -> Option<&ServerMetrics> {
        self.metrics.as_deref()
    }

    /// Dispatch a parsed request
    ///
    /// Notifications are executed like any other call, but produce no
    /// response.
    pub async fn dispatch(&self, request: JsonRpcRequest, ctx: Arc<C>) -> Option<JsonRpcResponse> {
        let outcome = self.call(&request.method, request.params, ctx).await;
        request
            .id
            .map(|id| JsonRpcResponse::from_outcome(outcome, id))
    }

    /// Run one call through the full pipeline
    #[tracing::instrument(name = "rpc_call", level = "debug", skip_all, fields(method = %method))]
    pub async fn call(
        &self,
        method: &str,
        params: Option<Value>,
        ctx: Arc<C>,
    ) -> Result<Value, JsonRpcErrorData> {
        let started = Instant::now();
        let outcome = self.execute(method, params, ctx).await;

        match &outcome {
            Ok(_) => tracing::debug!("Call succeeded"),
            Err(error) => tracing::debug!(code = error.code, error = %error.message, "Call failed"),
        }

        if let Some(metrics) = &self.metrics {
            let status = if outcome.is_ok() { "success" } else { "error" };
            metrics.record_call(method, status, started.elapsed().as_secs_f64());
            if let Err(error) = &outcome {
                metrics.record_error(error.code);
            }
        }

        outcome
    }

    async fn execute(
        &self,
        method: &str,
        params: Option<Value>,
        ctx: Arc<C>,
    ) -> Result<Value, JsonRpcErrorData> {
        let entry = self
            .registry
            .get(method)
            .ok_or_else(|| JsonRpcErrorData::method_not_found(method))?;
        let spec = entry.spec();

        let object = match &params {
            Some(Value::Object(object)) => Cow::Borrowed(object),
            None if spec.params.is_empty() => Cow::Owned(Map::new()),
            None => return Err(JsonRpcErrorData::unsupported_params_type("undefined")),
            Some(other) => {
                return Err(JsonRpcErrorData::unsupported_params_type(json_type_name(other)))
            }
        };

        let mandatory = slice(&spec.params, &object);
        let optional = slice(&spec.optional_params, &object);

        let mut violations = schema::validate_fields(&spec.params, &mandatory, FieldMode::Declared);
        violations.extend(schema::validate_fields(
            &spec.optional_params,
            &optional,
            FieldMode::AllOptional,
        ));
        if !violations.is_empty() {
            return Err(JsonRpcErrorData::invalid_params(schema::messages(&violations)));
        }

        let mut merged = mandatory;
        merged.extend(optional);

        match invoke(entry, Value::Object(merged), ctx).await {
            Ok(value) => check_return(&spec.returns, value),
            Err(MethodError::Domain { code, message }) => Err(JsonRpcErrorData::new(code, message)),
            Err(MethodError::Unexpected(error)) => {
                tracing::error!(method = %method, error = %error, "Handler failed unexpectedly");
                let raw = params.as_ref().unwrap_or(&Value::Null);
                self.notify(&error, method, raw);
                Err(JsonRpcErrorData::non_domain(error.to_string()))
            }
        }
    }

    fn notify(&self, error: &BoxError, method: &str, raw_params: &Value) {
        let Some(observer) = &self.on_error else {
            return;
        };
        let outcome =
            std::panic::catch_unwind(AssertUnwindSafe(|| observer(error, method, raw_params)));
        if outcome.is_err() {
            tracing::warn!(method = %method, "Error observer panicked");
        }
    }
}

/// Copy the declared keys of `object` into a new map
fn slice(fields: &BTreeMap<String, Schema>, object: &Map<String, Value>) -> Map<String, Value> {
    fields
        .keys()
        .filter_map(|name| object.get(name).map(|value| (name.clone(), value.clone())))
        .collect()
}

async fn invoke<C: Send + Sync + 'static>(
    entry: &RegisteredMethod<C>,
    params: Value,
    ctx: Arc<C>,
) -> Result<Value, MethodError> {
    let handler = entry.handler();
    let running = async move { handler.call(params, ctx).await };

    match AssertUnwindSafe(running).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(panic) => Err(MethodError::Unexpected(Arc::new(HandlerPanic::from_payload(&*panic)))),
    }
}

fn check_return(returns: &Schema, value: Value) -> Result<Value, JsonRpcErrorData> {
    match returns.validate(&value) {
        Ok(()) => Ok(value),
        Err(violations) => Err(JsonRpcErrorData::invalid_return(schema::messages(&violations))),
    }
}

/// A handler panicked instead of returning
#[derive(Debug)]
pub struct HandlerPanic(String);

impl HandlerPanic {
    fn from_payload(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        HandlerPanic(message)
    }
}

impl fmt::Display for HandlerPanic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handler panicked: {}", self.0)
    }
}

impl std::error::Error for HandlerPanic {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::from_fn;
    use serde_json::json;
    use std::sync::Mutex;
    use tyro_core::{codes, Id, MethodSpec};

    fn double_registry() -> Registry<()> {
        Registry::new()
            .method(
                MethodSpec::new("double")
                    .param("x", Schema::Number)
                    .optional_param("factor", Schema::Number)
                    .returns(Schema::Number),
                from_fn(|params, _| async move {
                    let x = params["x"].as_f64().unwrap_or_default();
                    let factor = params.get("factor").and_then(Value::as_f64).unwrap_or(1.0);
                    Ok(json!(factor * x))
                }),
            )
            .unwrap()
    }

    fn dispatcher(registry: Registry<()>) -> Dispatcher<()> {
        Dispatcher::new(Arc::new(registry))
    }

    #[tokio::test]
    async fn test_double() {
        let dispatcher = dispatcher(double_registry());

        let result = dispatcher
            .call("double", Some(json!({"x": 7, "factor": 3})), Arc::new(()))
            .await
            .unwrap();
        assert_eq!(result.as_f64(), Some(21.0));

        let result = dispatcher
            .call("double", Some(json!({"x": 7})), Arc::new(()))
            .await
            .unwrap();
        assert_eq!(result.as_f64(), Some(7.0));
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let dispatcher = dispatcher(double_registry());
        let error = dispatcher.call("triple", None, Arc::new(())).await.unwrap_err();

        assert_eq!(error.code, codes::METHOD_NOT_FOUND);
        assert_eq!(error.message, "Method not found: triple");
    }

    #[tokio::test]
    async fn test_params_shape() {
        let dispatcher = dispatcher(double_registry());

        for params in [Some(json!([7])), Some(json!(7)), Some(json!("x")), None] {
            let error = dispatcher.call("double", params, Arc::new(())).await.unwrap_err();
            assert_eq!(error.code, codes::UNSUPPORTED_PARAMS_TYPE);
        }
    }

    #[tokio::test]
    async fn test_absent_params_without_mandatory() {
        let registry = Registry::new()
            .method(
                MethodSpec::new("count")
                    .optional_param("limit", Schema::Integer)
                    .returns(Schema::Integer),
                from_fn(|params, _| async move {
                    Ok(params.get("limit").cloned().unwrap_or(json!(10)))
                }),
            )
            .unwrap();
        let dispatcher = dispatcher(registry);

        let result = dispatcher.call("count", None, Arc::new(())).await.unwrap();
        assert_eq!(result, json!(10));
    }

    #[tokio::test]
    async fn test_mandatory_errors_come_first() {
        let dispatcher = dispatcher(double_registry());
        let error = dispatcher
            .call("double", Some(json!({"factor": "3"})), Arc::new(()))
            .await
            .unwrap_err();

        assert_eq!(error.code, codes::INVALID_PARAMS);
        assert_eq!(error.message, "Invalid parameters type");
        assert_eq!(
            error.validation_errors(),
            vec![
                "/x: expected number, got undefined".to_string(),
                "/factor: expected number, got string".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_null_optional_rejected() {
        let dispatcher = dispatcher(double_registry());
        let error = dispatcher
            .call("double", Some(json!({"x": 1, "factor": null})), Arc::new(()))
            .await
            .unwrap_err();

        assert_eq!(error.code, codes::INVALID_PARAMS);
        assert_eq!(error.validation_errors(), vec!["/factor: expected number, got null"]);
    }

    #[tokio::test]
    async fn test_undeclared_keys_stripped() {
        let seen = Arc::new(Mutex::new(Value::Null));
        let captured = Arc::clone(&seen);
        let registry = Registry::new()
            .method(
                MethodSpec::new("inspect").param("a", Schema::Number),
                from_fn(move |params, _| {
                    *captured.lock().unwrap() = params;
                    async { Ok(Value::Null) }
                }),
            )
            .unwrap();
        let dispatcher = dispatcher(registry);

        dispatcher
            .call("inspect", Some(json!({"a": 1, "b": 2})), Arc::new(()))
            .await
            .unwrap();
        assert_eq!(*seen.lock().unwrap(), json!({"a": 1}));
    }

    #[tokio::test]
    async fn test_invalid_return() {
        let registry = Registry::new()
            .method(
                MethodSpec::new("liar").returns(Schema::Number),
                from_fn(|_, _| async { Ok(json!("not a number")) }),
            )
            .unwrap();
        let error = dispatcher(registry)
            .call("liar", None, Arc::new(()))
            .await
            .unwrap_err();

        assert_eq!(error.code, codes::INVALID_RETURN);
        assert_eq!(error.validation_errors(), vec!["/: expected number, got string"]);
    }

    #[tokio::test]
    async fn test_return_not_stripped() {
        let registry = Registry::new()
            .method(
                MethodSpec::new("user").returns(Schema::object([("id", Schema::String)])),
                from_fn(|_, _| async { Ok(json!({"id": "u1", "secret": "kept"})) }),
            )
            .unwrap();
        let result = dispatcher(registry)
            .call("user", None, Arc::new(()))
            .await
            .unwrap();

        assert_eq!(result["secret"], "kept");
    }

    #[tokio::test]
    async fn test_domain_error_verbatim() {
        let calls = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&calls);
        let registry = Registry::new()
            .method(
                MethodSpec::new("fail"),
                from_fn(|_, _| async { Err(MethodError::domain(12345, "custom error message")) }),
            )
            .unwrap();
        let observer: ErrorObserver =
            Arc::new(move |_: &BoxError, _: &str, _: &Value| *counter.lock().unwrap() += 1);
        let dispatcher = dispatcher(registry).with_error_observer(observer);

        let error = dispatcher.call("fail", None, Arc::new(())).await.unwrap_err();
        assert_eq!(error, JsonRpcErrorData::new(12345, "custom error message"));
        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unexpected_error_notifies_observer() {
        let seen: Arc<Mutex<Vec<(String, String, Value)>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let registry = Registry::new()
            .method(
                MethodSpec::new("boom").param("a", Schema::Number),
                from_fn(|_, _| async { Err(MethodError::unexpected("kaboom")) }),
            )
            .unwrap();
        let observer: ErrorObserver = Arc::new(move |error: &BoxError, method: &str, raw: &Value| {
            sink.lock()
                .unwrap()
                .push((error.to_string(), method.to_string(), raw.clone()));
        });
        let dispatcher = dispatcher(registry).with_error_observer(observer);

        let error = dispatcher
            .call("boom", Some(json!({"a": 1, "extra": true})), Arc::new(()))
            .await
            .unwrap_err();

        assert_eq!(error.code, codes::NON_DOMAIN_ERROR);
        assert_eq!(error.message, "kaboom");
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "kaboom");
        assert_eq!(seen[0].1, "boom");
        assert_eq!(seen[0].2, json!({"a": 1, "extra": true}));
    }

    #[tokio::test]
    async fn test_panics_are_contained() {
        let registry = Registry::new()
            .method(
                MethodSpec::new("panic"),
                from_fn(|params: Value, _| async move {
                    if params.is_object() {
                        panic!("handler exploded");
                    }
                    Ok(params)
                }),
            )
            .unwrap();
        let observer: ErrorObserver =
            Arc::new(|_: &BoxError, _: &str, _: &Value| panic!("observer exploded"));
        let dispatcher = dispatcher(registry).with_error_observer(observer);

        let error = dispatcher.call("panic", None, Arc::new(())).await.unwrap_err();
        assert_eq!(error.code, codes::NON_DOMAIN_ERROR);
        assert!(error.message.contains("handler exploded"));
    }

    #[tokio::test]
    async fn test_notification_gets_no_response() {
        let dispatcher = dispatcher(double_registry());

        let response = dispatcher
            .dispatch(
                JsonRpcRequest::notification("double", Some(json!({"x": 1}))),
                Arc::new(()),
            )
            .await;
        assert!(response.is_none());

        let response = dispatcher
            .dispatch(
                JsonRpcRequest::new("double", Some(json!({"x": 1})), Id::from("a")),
                Arc::new(()),
            )
            .await
            .unwrap();
        assert_eq!(response.id, Id::from("a"));
        assert!(response.is_success());
    }
}
