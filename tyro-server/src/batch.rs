//! Batch processing for JSON-RPC payloads
//!
//! A payload is either one request object or an array of them. Each entry is
//! parsed and dispatched on its own, so one malformed or failing entry never
//! affects its neighbours; the reply has the same shape as the payload.
//!
//! # Batch Modes
//!
//! - **Parallel**: Spawn one task per entry (default)
//! - **Sequential**: Run entries in order, for handlers that depend on each other
//!
//! Responses come back in payload order in both modes, and each carries the id
//! of its request, so clients may also correlate out of order.
//!
//! # Size Limiting
//!
//! A configured maximum turns oversized batches into a single `-32600` error
//! without running any entry.
//!
//! # Examples
//!
//! ```rust
//! use tyro_server::{BatchMode, BatchProcessor};
//!
//! let processor = BatchProcessor::with_limit(BatchMode::Parallel, Some(100));
//! let sequential = BatchProcessor::new(BatchMode::Sequential);
//! ```

use crate::dispatcher::Dispatcher;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tyro_core::codec::{self, Payload};
use tyro_core::{Error, Id, JsonRpcErrorData, JsonRpcReply, JsonRpcResponse, Result};

/// Mode for processing batch entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchMode {
    /// Process all entries concurrently
    #[default]
    Parallel,
    /// Process entries one after another, in payload order
    Sequential,
}

impl fmt::Display for BatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchMode::Parallel => f.write_str("parallel"),
            BatchMode::Sequential => f.write_str("sequential"),
        }
    }
}

/// Processor for single and batch payloads
#[derive(Debug, Clone, Default)]
pub struct BatchProcessor {
    mode: BatchMode,
    max_size: Option<usize>,
}

impl BatchProcessor {
    /// Create a processor with the given mode and no size limit
    pub fn new(mode: BatchMode) -> Self {
        Self {
            mode,
            max_size: None,
        }
    }

    /// Create a processor with mode and maximum batch size
    pub fn with_limit(mode: BatchMode, max_size: Option<usize>) -> Self {
        Self { mode, max_size }
    }

    /// The execution mode
    pub fn mode(&self) -> BatchMode {
        self.mode
    }

    /// Process a parsed payload
    ///
    /// Returns `Ok(None)` when every entry was a notification: there is
    /// nothing to send back.
    ///
    /// # Errors
    ///
    /// Returns `Error::Internal` if a spawned entry task could not be joined.
    /// That is a failure of the engine itself, not of a call, and is never
    /// turned into an envelope.
    pub async fn process<C: Send + Sync + 'static>(
        &self,
        payload: Value,
        dispatcher: &Dispatcher<C>,
        ctx: Arc<C>,
    ) -> Result<Option<JsonRpcReply>> {
        match codec::classify(payload) {
            Payload::Single(value) => Ok(process_entry(value, dispatcher, ctx)
                .await
                .map(JsonRpcReply::Single)),
            Payload::EmptyBatch => Ok(Some(JsonRpcReply::Single(JsonRpcResponse::error(
                JsonRpcErrorData::invalid_request("Empty batch"),
                Id::Null,
            )))),
            Payload::Batch(entries) => {
                let responses = self.process_batch(entries, dispatcher, ctx).await?;
                Ok((!responses.is_empty()).then_some(JsonRpcReply::Batch(responses)))
            }
        }
    }

    /// Process the entries of a batch
    #[tracing::instrument(skip(self, entries, dispatcher, ctx), fields(batch_size = entries.len(), mode = %self.mode))]
    pub async fn process_batch<C: Send + Sync + 'static>(
        &self,
        entries: Vec<Value>,
        dispatcher: &Dispatcher<C>,
        ctx: Arc<C>,
    ) -> Result<Vec<JsonRpcResponse>> {
        if let Some(metrics) = dispatcher.metrics() {
            metrics.record_batch(entries.len() as u64, &self.mode.to_string());
        }

        if let Some(max_size) = self.max_size {
            if entries.len() > max_size {
                tracing::warn!(
                    batch_size = entries.len(),
                    max_size = max_size,
                    "Batch size exceeded"
                );
                return Ok(vec![JsonRpcResponse::error(
                    JsonRpcErrorData::batch_size_exceeded(max_size, entries.len()),
                    Id::Null,
                )]);
            }
        }

        let responses = match self.mode {
            BatchMode::Parallel => process_parallel(entries, dispatcher, ctx).await?,
            BatchMode::Sequential => process_sequential(entries, dispatcher, ctx).await,
        };

        tracing::debug!(response_count = responses.len(), "Batch processing completed");
        Ok(responses)
    }
}

async fn process_parallel<C: Send + Sync + 'static>(
    entries: Vec<Value>,
    dispatcher: &Dispatcher<C>,
    ctx: Arc<C>,
) -> Result<Vec<JsonRpcResponse>> {
    let tasks: Vec<_> = entries
        .into_iter()
        .map(|entry| {
            let dispatcher = dispatcher.clone();
            let ctx = Arc::clone(&ctx);
            tokio::spawn(async move { process_entry(entry, &dispatcher, ctx).await })
        })
        .collect();

    let mut responses = Vec::with_capacity(tasks.len());
    for task in tasks {
        let response = task
            .await
            .map_err(|e| Error::Internal(format!("Batch entry task failed: {}", e)))?;
        responses.extend(response);
    }

    Ok(responses)
}

async fn process_sequential<C: Send + Sync + 'static>(
    entries: Vec<Value>,
    dispatcher: &Dispatcher<C>,
    ctx: Arc<C>,
) -> Vec<JsonRpcResponse> {
    let mut responses = Vec::with_capacity(entries.len());
    for entry in entries {
        responses.extend(process_entry(entry, dispatcher, Arc::clone(&ctx)).await);
    }
    responses
}

/// Parse and dispatch one entry
async fn process_entry<C: Send + Sync + 'static>(
    entry: Value,
    dispatcher: &Dispatcher<C>,
    ctx: Arc<C>,
) -> Option<JsonRpcResponse> {
    match codec::parse_request(entry) {
        Ok(request) => dispatcher.dispatch(request, ctx).await,
        Err(invalid) => {
            tracing::debug!(id = %invalid.id, reason = %invalid.error.message, "Invalid request entry");
            if let Some(metrics) = dispatcher.metrics() {
                metrics.record_error(invalid.error.code);
            }
            Some(invalid.into_response())
        }
    }
}
