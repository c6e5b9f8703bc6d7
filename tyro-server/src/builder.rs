//! Service builder for wiring an RPC endpoint
//!
//! The builder takes a finished [`Registry`] and collects everything the HTTP
//! adapter needs around it:
//! - How to build the execution context for each request
//! - Who to tell about unexpected handler failures
//! - How to run batches
//! - Whether to record metrics
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use tyro_server::{from_fn, BatchMode, Registry, ServiceBuilder};
//! use tyro_core::{MethodSpec, Schema};
//!
//! struct Session { user: Option<String> }
//!
//! let registry = Registry::<Session>::new()
//!     .method(
//!         MethodSpec::new("whoami").returns(Schema::optional(Schema::String)),
//!         from_fn(|_, ctx: Arc<Session>| async move { Ok(serde_json::json!(ctx.user)) }),
//!     )
//!     .unwrap();
//!
//! let service = ServiceBuilder::new(registry)
//!     .context_builder(|parts: &http::request::Parts| {
//!         let user = parts
//!             .headers
//!             .get("x-user")
//!             .and_then(|value| value.to_str().ok())
//!             .map(str::to_string);
//!         async move { Ok::<_, std::convert::Infallible>(Session { user }) }
//!     })
//!     .on_error(|error, method, _params| eprintln!("{method} failed: {error}"))
//!     .batch_mode(BatchMode::Parallel)
//!     .max_batch_size(50)
//!     .build()
//!     .unwrap();
//!
//! let app: axum::Router = service.router("/rpc");
//! ```

use crate::batch::{BatchMode, BatchProcessor};
use crate::dispatcher::{Dispatcher, ErrorObserver};
use crate::handler::BoxError;
use crate::metrics::ServerMetrics;
use crate::registry::Registry;
use crate::service::{ContextBuilder, ContextError, RpcService};
use futures::FutureExt;
use http::request::Parts;
use serde_json::Value;
use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;
use tyro_core::{ConfigError, Error, Result, TelemetryConfig};

/// Builder for [`RpcService`]
pub struct ServiceBuilder<C> {
    registry: Registry<C>,
    context_builder: Option<ContextBuilder<C>>,
    on_error: Option<ErrorObserver>,
    batch_mode: BatchMode,
    max_batch_size: Option<usize>,
    metrics_service_name: Option<String>,
    telemetry: Option<TelemetryConfig>,
}

impl<C: Send + Sync + 'static> ServiceBuilder<C> {
    /// Start from a registry
    pub fn new(registry: Registry<C>) -> Self {
        Self {
            registry,
            context_builder: None,
            on_error: None,
            batch_mode: BatchMode::default(),
            max_batch_size: None,
            metrics_service_name: None,
            telemetry: None,
        }
    }

    /// Set the function that builds each request's context
    ///
    /// The function receives the HTTP request head. If its future fails, the
    /// request is answered with HTTP 500 and no handler runs.
    pub fn context_builder<F, Fut, E>(mut self, builder: F) -> Self
    where
        F: Fn(&Parts) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<C, E>> + Send + 'static,
        E: Into<ContextError>,
    {
        let builder: ContextBuilder<C> = Arc::new(move |parts: &Parts| {
            builder(parts)
                .map(|built| built.map_err(|e| -> ContextError { e.into() }))
                .boxed()
        });
        self.context_builder = Some(builder);
        self
    }

    /// Set the observer for unexpected handler failures
    ///
    /// It receives the error, the method name and the raw params (`null`
    /// when the request had none).
    pub fn on_error<F>(mut self, observer: F) -> Self
    where
        F: Fn(&BoxError, &str, &Value) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(observer));
        self
    }

    /// Set the batch execution mode
    pub fn batch_mode(mut self, mode: BatchMode) -> Self {
        self.batch_mode = mode;
        self
    }

    /// Limit the number of entries in a batch
    pub fn max_batch_size(mut self, max_size: usize) -> Self {
        self.max_batch_size = Some(max_size);
        self
    }

    /// Record metrics on the global meter under the given service name
    pub fn with_metrics(mut self, service_name: impl Into<String>) -> Self {
        self.metrics_service_name = Some(service_name.into());
        self
    }

    /// Initialize telemetry while building, and record metrics under its
    /// service name
    pub fn with_telemetry(mut self, config: TelemetryConfig) -> Self {
        self.telemetry = Some(config);
        self
    }

    /// Finish the service
    ///
    /// # Errors
    ///
    /// - `Error::Config(MissingContextBuilder)` if neither
    ///   [`context_builder`](Self::context_builder) nor
    ///   [`default_context`](Self::default_context) was called
    /// - `Error::Internal` if telemetry was requested and failed to initialize
    pub fn build(self) -> Result<RpcService<C>> {
        let context_builder = self
            .context_builder
            .ok_or(Error::Config(ConfigError::MissingContextBuilder))?;

        let mut metrics_service_name = self.metrics_service_name;
        if let Some(config) = self.telemetry {
            metrics_service_name.get_or_insert_with(|| config.service_name.clone());
            tyro_core::init_telemetry(config)
                .map_err(|e| Error::Internal(format!("Failed to initialize telemetry: {}", e)))?;
        }
        let metrics = metrics_service_name.map(|name| Arc::new(ServerMetrics::new(name)));

        let mut dispatcher = Dispatcher::new(Arc::new(self.registry));
        if let Some(observer) = self.on_error {
            dispatcher = dispatcher.with_error_observer(observer);
        }
        if let Some(metrics) = &metrics {
            dispatcher = dispatcher.with_metrics(Arc::clone(metrics));
        }

        tracing::info!(
            methods = dispatcher.registry().len(),
            batch_mode = %self.batch_mode,
            max_batch_size = ?self.max_batch_size,
            "RPC service built"
        );

        Ok(RpcService::new(
            dispatcher,
            BatchProcessor::with_limit(self.batch_mode, self.max_batch_size),
            context_builder,
            metrics,
        ))
    }
}

impl<C: Default + Send + Sync + 'static> ServiceBuilder<C> {
    /// Use `C::default()` as every request's context
    ///
    /// This is the context to pick when requests carry nothing a handler
    /// needs; `()` or an all-`None` struct gives every call an empty context.
    pub fn default_context(self) -> Self {
        self.context_builder(|_: &Parts| async { Ok::<_, Infallible>(C::default()) })
    }
}
