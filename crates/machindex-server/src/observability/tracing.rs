//! Logging and distributed tracing
//!
//! Console logging in text or JSON, filtered through `RUST_LOG`, with
//! optional OTLP span export.
//!
//! Environment variables:
//! - `OTEL_EXPORTER_OTLP_ENDPOINT` - OTLP endpoint (e.g., `http://tempo.infra.svc.cluster.local:4317`)
//! - `OTEL_SERVICE_NAME` - Service name (default: `machindex`)
//! - `LOG_FORMAT` - Set to `json` for JSON output (default: `text`)

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    trace::{RandomIdGenerator, Sampler, SdkTracerProvider},
    Resource,
};
use std::sync::OnceLock;
use tracing::level_filters::LevelFilter;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static TRACER_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    /// `json` (any case) selects JSON; everything else is text.
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// OTLP endpoint for span export (None = disabled)
    pub otlp_endpoint: Option<String>,
    pub service_name: String,
    pub log_format: LogFormat,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            otlp_endpoint: None,
            service_name: "machindex".to_string(),
            log_format: LogFormat::Text,
        }
    }
}

impl TracingConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            otlp_endpoint: std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
                .ok()
                .filter(|endpoint| !endpoint.is_empty()),
            service_name: std::env::var("OTEL_SERVICE_NAME").unwrap_or(defaults.service_name),
            log_format: std::env::var("LOG_FORMAT")
                .map(|format| LogFormat::parse(&format))
                .unwrap_or(defaults.log_format),
        }
    }
}

/// Install the global subscriber.
pub fn init_tracing(config: TracingConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let tracer = match &config.otlp_endpoint {
        Some(endpoint) => {
            let exporter = opentelemetry_otlp::SpanExporter::builder()
                .with_tonic()
                .with_endpoint(endpoint)
                .build()?;

            let resource = Resource::builder()
                .with_service_name(config.service_name.clone())
                .build();

            let provider = SdkTracerProvider::builder()
                .with_sampler(Sampler::AlwaysOn)
                .with_id_generator(RandomIdGenerator::default())
                .with_resource(resource)
                .with_batch_exporter(exporter)
                .build();

            let tracer = provider.tracer("machindex");
            let _ = TRACER_PROVIDER.set(provider);
            Some(tracer)
        }
        None => None,
    };

    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    let json = config.log_format == LogFormat::Json;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracer.map(|tracer| OpenTelemetryLayer::new(tracer)))
        .with(json.then(|| fmt::layer().json()))
        .with((!json).then(|| fmt::layer()))
        .try_init()?;

    match &config.otlp_endpoint {
        Some(endpoint) => tracing::info!(
            endpoint = %endpoint,
            service_name = %config.service_name,
            "OpenTelemetry tracing initialized"
        ),
        None => tracing::debug!("Tracing initialized (no OTLP export)"),
    }

    Ok(())
}

/// Flush pending spans. Call once before exit.
pub fn shutdown_tracing() {
    if let Some(provider) = TRACER_PROVIDER.get() {
        if let Err(e) = provider.shutdown() {
            tracing::warn!(error = %e, "Error shutting down tracer provider");
        }
    }
}
