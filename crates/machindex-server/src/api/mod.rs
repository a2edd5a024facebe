//! HTTP API Module
//!
//! - `state`: Shared application state
//! - `health`: Liveness and readiness probes
//! - `metrics`: Prometheus metrics endpoint
//! - `lookup`: Identity lookups against the indices

mod health;
mod lookup;
mod metrics;
mod state;

pub use state::AppState;

use axum::{routing::get, Router};
use machindex_core::RecordKind;

/// Create the API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health checks
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Observability
        .route("/metrics", get(metrics::get_metrics))
        // Index lookups
        .route(&lookup_route(RecordKind::Machine), get(lookup::machine_info))
        .route(&lookup_route(RecordKind::Bmc), get(lookup::bmc_info))
        .route(&lookup_route(RecordKind::MachineType), get(lookup::machine_type))
        .with_state(state)
}

fn lookup_route(kind: RecordKind) -> String {
    format!("/{}", kind.lookup_path())
}
