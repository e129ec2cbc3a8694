//! Logging and distributed tracing setup.
//!
//! With the `logging` feature a `tracing` subscriber is installed with an
//! env filter and either a human-readable or JSON formatter. The
//! `telemetry` feature adds an OpenTelemetry layer exporting spans over
//! OTLP.

#[cfg(feature = "telemetry")]
use opentelemetry::trace::TracerProvider;
#[cfg(feature = "telemetry")]
use opentelemetry::KeyValue;
#[cfg(feature = "telemetry")]
use opentelemetry_otlp::WithExportConfig;
#[cfg(feature = "telemetry")]
use opentelemetry_sdk::{
    runtime,
    trace::{RandomIdGenerator, Sampler},
    Resource,
};
#[cfg(feature = "telemetry")]
use opentelemetry_semantic_conventions::resource::SERVICE_NAME;
#[cfg(feature = "logging")]
use tracing_subscriber::{
    layer::SubscriberExt, registry::LookupSpan, util::SubscriberInitExt, EnvFilter, Layer,
};

use crate::BatchResult;
use serde::{Deserialize, Serialize};

/// Telemetry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Whether span export is enabled.
    #[serde(default)]
    pub enabled: bool,

    /// Service name reported on exported spans.
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// OTLP endpoint URL (e.g., "http://localhost:4317").
    #[serde(default)]
    pub otlp_endpoint: Option<String>,

    /// Sampling ratio (0.0 to 1.0).
    #[serde(default = "default_sampling_ratio")]
    pub sampling_ratio: f64,

    /// Whether to write log lines to stdout.
    #[serde(default = "default_console_output")]
    pub console_output: bool,

    /// Emit log lines as JSON instead of the pretty formatter.
    #[serde(default)]
    pub json_output: bool,

    /// Filter used when `RUST_LOG` is not set.
    #[serde(default = "default_filter")]
    pub filter: String,
}

fn default_service_name() -> String {
    "stylebatch".to_string()
}

fn default_sampling_ratio() -> f64 {
    1.0
}

fn default_console_output() -> bool {
    true
}

fn default_filter() -> String {
    "info,stylebatch=debug,tower_http=debug".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            service_name: default_service_name(),
            otlp_endpoint: None,
            sampling_ratio: default_sampling_ratio(),
            console_output: default_console_output(),
            json_output: false,
            filter: default_filter(),
        }
    }
}

#[cfg(feature = "logging")]
fn env_filter(config: &TelemetryConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter))
}

#[cfg(feature = "logging")]
fn fmt_layer<S>(json: bool) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    if json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer().with_target(true).boxed()
    }
}

/// Installs the global subscriber.
///
/// Without span export this is plain structured logging. With export
/// enabled, an OpenTelemetry tracer is created (batched over OTLP when an
/// endpoint is configured) and bridged through `tracing-opentelemetry`.
#[cfg(feature = "telemetry")]
pub fn init_telemetry(config: &TelemetryConfig) -> BatchResult<()> {
    if !config.enabled {
        return init_logging(config);
    }

    let sampler = if config.sampling_ratio >= 1.0 {
        Sampler::AlwaysOn
    } else if config.sampling_ratio <= 0.0 {
        Sampler::AlwaysOff
    } else {
        Sampler::TraceIdRatioBased(config.sampling_ratio)
    };

    let resource = Resource::new(vec![KeyValue::new(
        SERVICE_NAME,
        config.service_name.clone(),
    )]);

    let builder = opentelemetry_sdk::trace::TracerProvider::builder()
        .with_sampler(sampler)
        .with_id_generator(RandomIdGenerator::default())
        .with_resource(resource);

    let tracer_provider = if let Some(endpoint) = &config.otlp_endpoint {
        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(endpoint)
            .build()
            .map_err(|e| {
                crate::BatchError::Configuration(format!("Failed to create OTLP exporter: {}", e))
            })?;
        builder.with_batch_exporter(exporter, runtime::Tokio).build()
    } else {
        builder.build()
    };

    let tracer = tracer_provider.tracer("stylebatch");
    opentelemetry::global::set_tracer_provider(tracer_provider);

    tracing_subscriber::registry()
        .with(env_filter(config))
        .with(config.console_output.then(|| fmt_layer(config.json_output)))
        .with(tracing_opentelemetry::layer().with_tracer(tracer))
        .try_init()
        .map_err(|e| crate::BatchError::Configuration(format!("Failed to install subscriber: {}", e)))?;

    tracing::info!(
        service_name = %config.service_name,
        sampling_ratio = %config.sampling_ratio,
        otlp_endpoint = ?config.otlp_endpoint,
        "Telemetry initialized"
    );

    Ok(())
}

/// Installs a logging-only subscriber.
#[cfg(feature = "logging")]
pub fn init_logging(config: &TelemetryConfig) -> BatchResult<()> {
    if !config.console_output {
        return Ok(());
    }

    tracing_subscriber::registry()
        .with(env_filter(config))
        .with(fmt_layer(config.json_output))
        .try_init()
        .map_err(|e| crate::BatchError::Configuration(format!("Failed to install subscriber: {}", e)))
}

#[cfg(all(feature = "logging", not(feature = "telemetry")))]
pub fn init_telemetry(config: &TelemetryConfig) -> BatchResult<()> {
    init_logging(config)
}

#[cfg(not(feature = "logging"))]
pub fn init_telemetry(_config: &TelemetryConfig) -> BatchResult<()> {
    Ok(())
}

/// Flushes pending spans.
#[cfg(feature = "telemetry")]
pub fn shutdown_telemetry() {
    opentelemetry::global::shutdown_tracer_provider();
    tracing::info!("Telemetry shutdown complete");
}

#[cfg(not(feature = "telemetry"))]
pub fn shutdown_telemetry() {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TelemetryConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.service_name, "stylebatch");
        assert_eq!(config.sampling_ratio, 1.0);
        assert!(config.console_output);
        assert!(!config.json_output);
        assert!(config.filter.contains("stylebatch=debug"));
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: TelemetryConfig =
            serde_json::from_str(r#"{"enabled": true, "json_output": true}"#).unwrap();
        assert!(config.enabled);
        assert!(config.json_output);
        assert_eq!(config.service_name, "stylebatch");
        assert!(config.otlp_endpoint.is_none());
    }
}
