//! Telemetry setup: structured logs, OpenTelemetry traces and metrics
//!
//! tyro itself only emits `tracing` events and spans and records metrics
//! through the global OpenTelemetry meter. Where that data goes is decided by
//! the host application, usually by calling [`init_telemetry`] once at startup:
//!
//! - **Logs**: JSON lines on stdout, filtered by `RUST_LOG` or the configured level
//! - **Traces**: `tracing` spans bridged to OpenTelemetry and exported over OTLP/gRPC
//! - **Metrics**: exported over OTLP/gRPC every 30 seconds
//!
//! ```rust,no_run
//! use tyro_core::TelemetryConfig;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = TelemetryConfig::new("billing-rpc")
//!         .with_endpoint("http://localhost:4317")
//!         .with_log_level("debug");
//!
//!     tyro_core::init_telemetry(config).expect("Failed to init telemetry");
//!
//!     // ... serve requests ...
//!
//!     tyro_core::shutdown_telemetry();
//! }
//! ```
//!
//! # Environment Variables
//!
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: Collector endpoint
//! - `RUST_LOG`: Log filter directives (take precedence over the configured level)

use opentelemetry::{global, KeyValue};
use opentelemetry_sdk::Resource;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

type InitError = Box<dyn std::error::Error + Send + Sync>;

/// Telemetry configuration
///
/// # Defaults
///
/// - Service name: "tyro"
/// - Service version: the crate version
/// - OTLP endpoint: `$OTEL_EXPORTER_OTLP_ENDPOINT` or "http://localhost:4317"
/// - Traces and metrics exported
/// - Log level: `$RUST_LOG` or "info"
///
/// # Examples
///
/// ```rust
/// use tyro_core::TelemetryConfig;
///
/// let config = TelemetryConfig::new("my-api")
///     .with_version("1.2.3")
///     .with_metrics(false);
/// assert!(config.export_traces);
/// assert!(!config.export_metrics);
/// ```
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to every span and metric
    pub service_name: String,
    /// Service version attached to every span and metric
    pub service_version: String,
    /// gRPC endpoint of the OpenTelemetry collector
    pub otlp_endpoint: String,
    /// Export spans over OTLP
    pub export_traces: bool,
    /// Export metrics over OTLP
    pub export_metrics: bool,
    /// Default log filter, used when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "tyro".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            otlp_endpoint: std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
                .unwrap_or_else(|_| "http://localhost:4317".to_string()),
            export_traces: true,
            export_metrics: true,
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        }
    }
}

impl TelemetryConfig {
    /// Create a configuration for the named service
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            ..Default::default()
        }
    }

    /// Set the OTLP collector endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.otlp_endpoint = endpoint.into();
        self
    }

    /// Set the default log filter
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Set the service version
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.service_version = version.into();
        self
    }

    /// Enable or disable trace export
    pub fn with_traces(mut self, enable: bool) -> Self {
        self.export_traces = enable;
        self
    }

    /// Enable or disable metric export
    pub fn with_metrics(mut self, enable: bool) -> Self {
        self.export_metrics = enable;
        self
    }

    fn resource(&self) -> Resource {
        Resource::builder_empty()
            .with_attributes(vec![
                KeyValue::new(
                    opentelemetry_semantic_conventions::resource::SERVICE_NAME,
                    self.service_name.clone(),
                ),
                KeyValue::new(
                    opentelemetry_semantic_conventions::resource::SERVICE_VERSION,
                    self.service_version.clone(),
                ),
            ])
            .build()
    }
}

/// Install the global tracing subscriber and OpenTelemetry providers
///
/// Call once at startup, inside a Tokio runtime. A second call fails because
/// the global subscriber is already set.
///
/// # Errors
///
/// Fails if an exporter cannot be built, the log filter does not parse, or a
/// global subscriber is already installed.
pub fn init_telemetry(config: TelemetryConfig) -> Result<(), InitError> {
    // The tracer must exist before the subscriber, which wraps it in a layer
    let tracer = if config.export_traces {
        Some(init_tracer(&config)?)
    } else {
        None
    };

    if config.export_metrics {
        init_metrics(&config)?;
    }

    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.log_level))?;
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .json();
    let telemetry_layer = tracer.map(|tracer| tracing_opentelemetry::layer().with_tracer(tracer));

    tracing_subscriber::registry()
        .with(telemetry_layer)
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    tracing::info!(
        service_name = %config.service_name,
        otlp_endpoint = %config.otlp_endpoint,
        traces = config.export_traces,
        metrics = config.export_metrics,
        "Telemetry initialized"
    );

    Ok(())
}

fn init_tracer(config: &TelemetryConfig) -> Result<opentelemetry_sdk::trace::Tracer, InitError> {
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::trace::{RandomIdGenerator, Sampler};

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(config.otlp_endpoint.clone())
        .build()?;

    let provider = opentelemetry_sdk::trace::SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(config.resource())
        .with_sampler(Sampler::AlwaysOn)
        .with_id_generator(RandomIdGenerator::default())
        .build();

    let tracer = provider.tracer(config.service_name.clone());
    global::set_tracer_provider(provider);

    Ok(tracer)
}

fn init_metrics(config: &TelemetryConfig) -> Result<(), InitError> {
    use opentelemetry_otlp::WithExportConfig;

    let exporter = opentelemetry_otlp::MetricExporter::builder()
        .with_tonic()
        .with_endpoint(config.otlp_endpoint.clone())
        .build()?;

    let reader = opentelemetry_sdk::metrics::PeriodicReader::builder(exporter)
        .with_interval(Duration::from_secs(30))
        .build();

    let provider = opentelemetry_sdk::metrics::SdkMeterProvider::builder()
        .with_reader(reader)
        .with_resource(config.resource())
        .build();

    global::set_meter_provider(provider);
    Ok(())
}

/// Flush telemetry before exit
///
/// Providers flush when dropped; this only marks the end of the process in
/// the logs so the last export is easy to spot.
pub fn shutdown_telemetry() {
    tracing::info!("Shutting down telemetry");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "tyro");
        assert_eq!(config.service_version, env!("CARGO_PKG_VERSION"));
        assert!(config.export_traces);
        assert!(config.export_metrics);
    }

    #[test]
    fn test_custom_config() {
        let config = TelemetryConfig::new("test-service")
            .with_endpoint("http://custom:4317")
            .with_log_level("debug")
            .with_version("1.0.0")
            .with_traces(false);

        assert_eq!(config.service_name, "test-service");
        assert_eq!(config.otlp_endpoint, "http://custom:4317");
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.service_version, "1.0.0");
        assert!(!config.export_traces);
        assert!(config.export_metrics);
    }
}
