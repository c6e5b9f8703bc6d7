//! HTTP transport adapter
//!
//! [`RpcService`] sits between an HTTP framework and the batch processor. For
//! each request it:
//!
//! 1. Refuses bodies the framework could not parse as a JSON object or array
//!    (HTTP 500; there is no id to answer to)
//! 2. Builds the execution context from the request head; a failing builder
//!    also ends in HTTP 500 before any handler runs
//! 3. Hands the body to the batch processor and returns its reply with HTTP
//!    200, or HTTP 204 when every entry was a notification
//!
//! Validation and handler failures are inside the envelope and never change
//! the status code. Engine failures are returned as `Err` so the framework's
//! own error path handles them.
//!
//! The core, [`RpcService::handle`], does not depend on a framework. The axum
//! integration is [`rpc_endpoint`] plus [`RpcService::router`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use tyro_server::{from_fn, Registry, ServiceBuilder};
//! use tyro_core::{MethodSpec, Schema};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = Registry::<()>::new().method(
//!     MethodSpec::new("ping").returns(Schema::String),
//!     from_fn(|_, _| async { Ok(serde_json::json!("pong")) }),
//! )?;
//!
//! let app = ServiceBuilder::new(registry)
//!     .default_context()
//!     .build()?
//!     .router("/rpc");
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

use crate::batch::BatchProcessor;
use crate::dispatcher::Dispatcher;
use crate::metrics::ServerMetrics;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Json;
use futures::future::BoxFuture;
use http::request::Parts;
use http::StatusCode;
use serde_json::Value;
use std::sync::Arc;
use tyro_core::{Error, JsonRpcReply, SpecManifest};

/// Error produced by a context builder
pub type ContextError = Box<dyn std::error::Error + Send + Sync>;

/// Type-erased context builder
pub type ContextBuilder<C> =
    Arc<dyn Fn(&Parts) -> BoxFuture<'static, Result<C, ContextError>> + Send + Sync>;

/// Outcome of one HTTP request
#[derive(Debug, Clone)]
pub enum HttpReply {
    /// A JSON-RPC reply, sent with HTTP 200
    Envelope(JsonRpcReply),
    /// Only notifications were received, HTTP 204 with no body
    NoContent,
    /// The request never reached the dispatcher, HTTP 500
    Failure,
}

impl HttpReply {
    /// HTTP status for this reply
    pub fn status(&self) -> StatusCode {
        match self {
            HttpReply::Envelope(_) => StatusCode::OK,
            HttpReply::NoContent => StatusCode::NO_CONTENT,
            HttpReply::Failure => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for HttpReply {
    fn into_response(self) -> Response {
        match self {
            HttpReply::Envelope(reply) => (StatusCode::OK, Json(reply)).into_response(),
            other => other.status().into_response(),
        }
    }
}

/// Engine failure surfaced to the HTTP framework
#[derive(Debug)]
pub struct EngineError(pub Error);

impl From<Error> for EngineError {
    fn from(error: Error) -> Self {
        EngineError(error)
    }
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self.0, "RPC engine failure");
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    }
}

struct Inner<C> {
    dispatcher: Dispatcher<C>,
    batch: BatchProcessor,
    context_builder: ContextBuilder<C>,
    metrics: Option<Arc<ServerMetrics>>,
}

/// A configured RPC endpoint
///
/// Cheap to clone; all clones share the same registry.
pub struct RpcService<C> {
    inner: Arc<Inner<C>>,
}

impl<C> Clone for RpcService<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Send + Sync + 'static> RpcService<C> {
    pub(crate) fn new(
        dispatcher: Dispatcher<C>,
        batch: BatchProcessor,
        context_builder: ContextBuilder<C>,
        metrics: Option<Arc<ServerMetrics>>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                dispatcher,
                batch,
                context_builder,
                metrics,
            }),
        }
    }

    /// The dispatcher behind this service
    pub fn dispatcher(&self) -> &Dispatcher<C> {
        &self.inner.dispatcher
    }

    /// Manifest of every registered method
    pub fn manifest(&self) -> SpecManifest {
        self.inner.dispatcher.registry().manifest()
    }

    /// Handle one HTTP request
    ///
    /// # Arguments
    ///
    /// * `parts` - The request head, passed to the context builder
    /// * `body` - The parsed body, or `None` if the framework could not parse it
    ///
    /// # Errors
    ///
    /// Returns the engine error when batch processing itself broke down.
    pub async fn handle(&self, parts: &Parts, body: Option<Value>) -> Result<HttpReply, Error> {
        let body = match body {
            Some(body @ (Value::Object(_) | Value::Array(_))) => body,
            Some(_) | None => {
                tracing::warn!(uri = %parts.uri, "Request body is not a JSON object or array");
                return Ok(HttpReply::Failure);
            }
        };

        let ctx = match (self.inner.context_builder)(parts).await {
            Ok(ctx) => Arc::new(ctx),
            Err(error) => {
                tracing::error!(error = %error, uri = %parts.uri, "Failed to create RPC context");
                if let Some(metrics) = &self.inner.metrics {
                    metrics.record_context_failure();
                }
                return Ok(HttpReply::Failure);
            }
        };

        let reply = self
            .inner
            .batch
            .process(body, &self.inner.dispatcher, ctx)
            .await?;

        Ok(match reply {
            Some(reply) => {
                let responses = reply.responses();
                tracing::debug!(
                    responses = responses.len(),
                    errors = responses.iter().filter(|r| r.is_error()).count(),
                    "RPC reply ready"
                );
                HttpReply::Envelope(reply)
            }
            None => HttpReply::NoContent,
        })
    }

    /// An axum router serving this endpoint with `POST` at `path`
    pub fn router(&self, path: &str) -> axum::Router {
        axum::Router::new()
            .route(path, post(rpc_endpoint::<C>))
            .with_state(self.clone())
    }
}

/// axum handler for an [`RpcService`]
///
/// A body axum cannot extract as JSON counts as unparsed and is answered with
/// HTTP 500.
pub async fn rpc_endpoint<C: Send + Sync + 'static>(
    State(service): State<RpcService<C>>,
    parts: Parts,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<HttpReply, EngineError> {
    let body = match body {
        Ok(Json(value)) => Some(value),
        Err(rejection) => {
            tracing::warn!(reason = %rejection.body_text(), "Rejected RPC body");
            None
        }
    };

    Ok(service.handle(&parts, body).await?)
}
