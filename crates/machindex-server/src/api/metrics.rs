//! Prometheus scrape endpoint

use super::AppState;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

const TEXT_FORMAT: &str = "text/plain; version=0.0.4; charset=utf-8";

/// GET /metrics
pub async fn get_metrics(State(state): State<AppState>) -> Response {
    let Some(metrics) = state.metrics_state.as_ref() else {
        return (StatusCode::SERVICE_UNAVAILABLE, "metrics disabled").into_response();
    };
    ([(header::CONTENT_TYPE, TEXT_FORMAT)], metrics.prometheus_handle.render()).into_response()
}
