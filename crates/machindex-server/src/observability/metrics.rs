//! Prometheus Metrics
//!
//! Metrics tracked:
//! - `machindex_index_records` - gauge of indexed records by kind
//! - `machindex_lookups_total` - counter of index lookups by kind and result
//! - `machindex_invalid_objects_total` - counter of objects rejected by validation
//! - `machindex_client_cache_total` - counter of remote client cache hits, misses and evictions

use metrics::{counter, describe_counter, describe_gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// State containing the Prometheus handle for metrics export
#[derive(Clone)]
pub struct MetricsState {
    pub prometheus_handle: PrometheusHandle,
}

/// Install the Prometheus recorder and describe all metrics.
pub fn init_metrics() -> Result<MetricsState, Box<dyn std::error::Error + Send + Sync>> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    register_metric_descriptions();
    Ok(MetricsState {
        prometheus_handle: handle,
    })
}

fn register_metric_descriptions() {
    describe_gauge!(
        "machindex_index_records",
        "Number of records held by each index"
    );
    describe_counter!(
        "machindex_lookups_total",
        "Index lookups served over HTTP by kind and result"
    );
    describe_counter!(
        "machindex_invalid_objects_total",
        "Objects skipped because they failed validation"
    );
    describe_counter!(
        "machindex_client_cache_total",
        "Remote index client cache hits, misses and evictions"
    );
}

/// Outcome of an HTTP index lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupResult {
    Found,
    NotFound,
    Ambiguous,
    NotReady,
}

impl LookupResult {
    pub fn as_str(self) -> &'static str {
        match self {
            LookupResult::Found => "found",
            LookupResult::NotFound => "not_found",
            LookupResult::Ambiguous => "ambiguous",
            LookupResult::NotReady => "not_ready",
        }
    }
}

pub fn record_lookup(kind: &'static str, result: LookupResult) {
    counter!(
        "machindex_lookups_total",
        "kind" => kind,
        "result" => result.as_str()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_recording() {
        // No recorder installed: must not panic.
        record_lookup("machine", LookupResult::Found);
        record_lookup("bmc", LookupResult::NotReady);
    }
}
