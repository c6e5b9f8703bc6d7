//! Schema-validated JSON-RPC 2.0 methods over HTTP
//!
//! This crate implements the server half of tyro: methods are declared with a
//! [`MethodSpec`](tyro_core::MethodSpec), registered with a handler, and served
//! from a single HTTP endpoint that validates every call against its spec.
//!
//! # Core Features
//!
//! - **Registry**: Name-indexed methods with configuration errors at wiring time
//! - **Validation**: Parameters and results are checked against their schemas
//! - **Error mapping**: Every failure becomes a JSON-RPC error with a stable code
//! - **Batches**: Single and batch payloads, run in parallel or in order
//! - **Context**: A per-request value built from the HTTP request head
//! - **Observability**: `tracing` spans and OpenTelemetry metrics
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use serde::Deserialize;
//! use tyro_core::{MethodSpec, Schema};
//! use tyro_server::{from_typed_fn, Registry, ServiceBuilder};
//!
//! #[derive(Deserialize)]
//! struct DoubleParams { x: f64, factor: Option<f64> }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = Registry::<()>::new().method(
//!         MethodSpec::new("double")
//!             .param("x", Schema::Number)
//!             .optional_param("factor", Schema::Number)
//!             .returns(Schema::Number),
//!         from_typed_fn(|p: DoubleParams, _ctx: Arc<()>| async move {
//!             Ok(p.factor.unwrap_or(1.0) * p.x)
//!         }),
//!     )?;
//!
//!     let app = ServiceBuilder::new(registry)
//!         .default_context()
//!         .build()?
//!         .router("/rpc");
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Request Flow
//!
//! HTTP request → [`RpcService`] builds the context → [`BatchProcessor`] splits
//! the payload → [`Dispatcher`] validates and runs each call against the
//! [`Registry`] → responses are reassembled and written back.

mod batch;
mod builder;
mod dispatcher;
mod handler;
mod metrics;
mod registry;
mod service;

pub use batch::{BatchMode, BatchProcessor};
pub use builder::ServiceBuilder;
pub use dispatcher::{Dispatcher, ErrorObserver, HandlerPanic};
pub use handler::{
    from_fn, from_typed_fn, AsyncHandler, BoxError, HandlerFuture, MethodError, MethodHandler,
    MethodResult,
};
pub use metrics::ServerMetrics;
pub use registry::{RegisteredMethod, Registry};
pub use service::{rpc_endpoint, ContextBuilder, ContextError, EngineError, HttpReply, RpcService};
