//! Observability Module
//!
//! - `metrics`: Prometheus metrics for the indices and lookups
//! - `tracing`: log output and OpenTelemetry span export

pub mod metrics;
pub mod tracing;

pub use self::metrics::{init_metrics, record_lookup, LookupResult, MetricsState};
pub use self::tracing::{init_tracing, shutdown_tracing, LogFormat, TracingConfig};
