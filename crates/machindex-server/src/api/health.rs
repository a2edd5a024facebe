//! Kubernetes probes
//!
//! Liveness only reports that the process serves HTTP. Readiness waits for
//! every index to be published and populated, so traffic is not routed to
//! a replica that would answer 406.

use super::state::AppState;
use axum::{extract::State, http::StatusCode};

pub async fn health_check() -> &'static str {
    "OK"
}

#[tracing::instrument(skip(state))]
pub async fn readiness_check(State(state): State<AppState>) -> Result<&'static str, StatusCode> {
    state
        .is_ready()
        .then_some("READY")
        .ok_or(StatusCode::SERVICE_UNAVAILABLE)
}
