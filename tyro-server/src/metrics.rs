//! Server metrics definitions
//!
//! OpenTelemetry instruments recorded by the dispatcher, the batch processor
//! and the HTTP adapter. They go through the global meter provider, which
//! `tyro_core::init_telemetry` points at an OTLP collector; without it the
//! instruments are no-ops.
//!
//! # Metrics Collected
//!
//! - **tyro.server.calls.total**: Method calls by method and outcome (counter)
//! - **tyro.server.call.duration**: Call latency in seconds, validation included (histogram)
//! - **tyro.server.batch.size**: Entries per batch payload (histogram)
//! - **tyro.server.errors.total**: Error envelopes by code (counter)
//! - **tyro.server.context.failures**: Context builder failures (counter)
//!
//! # Examples
//!
//! ```rust,no_run
//! use tyro_server::ServerMetrics;
//!
//! let metrics = ServerMetrics::new("billing-rpc");
//! metrics.record_call("double", "success", 0.002);
//! metrics.record_error(-31999);
//! ```

use opentelemetry::{
    global,
    metrics::{Counter, Histogram, Meter},
    KeyValue,
};

/// Server metrics for monitoring
pub struct ServerMetrics {
    /// Method calls processed
    pub calls_total: Counter<u64>,
    /// Call duration in seconds
    pub call_duration: Histogram<f64>,
    /// Batch size distribution
    pub batch_size: Histogram<u64>,
    /// Error envelopes produced
    pub errors_total: Counter<u64>,
    /// Requests rejected because no context could be built
    pub context_failures: Counter<u64>,
}

impl ServerMetrics {
    /// Create metrics on the global meter named after the service
    pub fn new(service_name: impl Into<String>) -> Self {
        let name: &'static str = Box::leak(service_name.into().into_boxed_str());
        let meter = global::meter(name);
        Self::new_with_meter(&meter)
    }

    /// Create metrics on a specific meter
    pub fn new_with_meter(meter: &Meter) -> Self {
        Self {
            calls_total: meter
                .u64_counter("tyro.server.calls.total")
                .with_description("Total number of method calls processed")
                .build(),
            call_duration: meter
                .f64_histogram("tyro.server.call.duration")
                .with_description("Method call duration in seconds")
                .build(),
            batch_size: meter
                .u64_histogram("tyro.server.batch.size")
                .with_description("Number of entries in batch payloads")
                .build(),
            errors_total: meter
                .u64_counter("tyro.server.errors.total")
                .with_description("Total number of error responses by code")
                .build(),
            context_failures: meter
                .u64_counter("tyro.server.context.failures")
                .with_description("Requests rejected because the context builder failed")
                .build(),
        }
    }

    /// Record one method call
    ///
    /// # Arguments
    ///
    /// * `method` - Method name as sent by the client
    /// * `outcome` - "success" or "error"
    /// * `duration_secs` - Time from lookup to response
    pub fn record_call(&self, method: &str, outcome: &str, duration_secs: f64) {
        let attributes = &[
            KeyValue::new("method", method.to_string()),
            KeyValue::new("outcome", outcome.to_string()),
        ];
        self.calls_total.add(1, attributes);
        self.call_duration.record(duration_secs, attributes);
    }

    /// Record a batch payload
    pub fn record_batch(&self, size: u64, mode: &str) {
        let attributes = &[KeyValue::new("mode", mode.to_string())];
        self.batch_size.record(size, attributes);
    }

    /// Record an error envelope
    pub fn record_error(&self, code: i64) {
        self.errors_total.add(1, &[KeyValue::new("code", code)]);
    }

    /// Record a context builder failure
    pub fn record_context_failure(&self) {
        self.context_failures.add(1, &[]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = ServerMetrics::new("test-server");

        metrics.record_call("double", "success", 0.1);
        metrics.record_batch(10, "parallel");
        metrics.record_error(-31997);
        metrics.record_context_failure();
    }

    #[test]
    fn test_custom_meter() {
        let provider = opentelemetry_sdk::metrics::SdkMeterProvider::builder().build();
        let meter = opentelemetry::metrics::MeterProvider::meter(&provider, "tyro-test");
        let metrics = ServerMetrics::new_with_meter(&meter);

        metrics.record_call("double", "error", 0.01);
        metrics.record_batch(2, "sequential");
    }
}
