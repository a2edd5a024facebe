//! Identity Lookup Endpoints
//!
//! `GET /info`, `GET /bmc` and `GET /type` resolve repeated `mac` and
//! `uuid` query parameters against one index:
//!
//! - 406 while the index is not published or not populated
//! - 400 when the hits name different records
//! - 404 when nothing matches
//! - 200 with `{"name", "namespace"}` otherwise

use super::AppState;
use crate::observability::{record_lookup, LookupResult};
use axum::{
    extract::{RawQuery, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use machindex_core::{FullIndex, IndexRecord, Mac};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// MACs and UUIDs named by a lookup query, in request order.
#[derive(Debug, Default, PartialEq)]
struct LookupQuery {
    macs: Vec<String>,
    uuids: Vec<String>,
}

impl LookupQuery {
    fn parse(raw: Option<&str>) -> Self {
        let mut query = Self::default();
        for (key, value) in url::form_urlencoded::parse(raw.unwrap_or_default().as_bytes()) {
            match key.as_ref() {
                "mac" => query.macs.push(value.into_owned()),
                "uuid" => query.uuids.push(value.into_owned()),
                _ => {}
            }
        }
        query
    }
}

pub async fn machine_info(State(state): State<AppState>, RawQuery(query): RawQuery) -> Response {
    lookup(state.machines.get(), query.as_deref()).await
}

pub async fn bmc_info(State(state): State<AppState>, RawQuery(query): RawQuery) -> Response {
    lookup(state.bmcs.get(), query.as_deref()).await
}

pub async fn machine_type(State(state): State<AppState>, RawQuery(query): RawQuery) -> Response {
    lookup(state.types.get(), query.as_deref()).await
}

async fn lookup<R: IndexRecord>(index: Option<Arc<FullIndex<R>>>, raw: Option<&str>) -> Response {
    let kind: &'static str = R::KIND.into();

    let Some(index) = index.filter(|index| index.is_initialized()) else {
        warn!(kind, "lookup before index is ready");
        record_lookup(kind, LookupResult::NotReady);
        return StatusCode::NOT_ACCEPTABLE.into_response();
    };

    let query = LookupQuery::parse(raw);
    debug!(kind, macs = ?query.macs, uuids = ?query.uuids, "lookup");

    let mut hits: Vec<Arc<R>> = Vec::new();
    for mac in &query.macs {
        match Mac::parse(mac) {
            Ok(parsed) => hits.extend(index.get_by_mac(&parsed).await),
            Err(e) => debug!(kind, mac = %mac, error = %e, "ignoring malformed MAC"),
        }
    }
    for uuid in &query.uuids {
        match Uuid::parse_str(uuid) {
            Ok(parsed) => hits.extend(index.get_by_uuid(&parsed).await),
            Err(e) => debug!(kind, uuid = %uuid, error = %e, "ignoring malformed UUID"),
        }
    }

    let Some(first) = hits.first() else {
        record_lookup(kind, LookupResult::NotFound);
        return StatusCode::NOT_FOUND.into_response();
    };
    if hits.iter().any(|hit| hit.name() != first.name()) {
        warn!(kind, macs = ?query.macs, uuids = ?query.uuids, "lookup matches several records");
        record_lookup(kind, LookupResult::Ambiguous);
        return StatusCode::BAD_REQUEST.into_response();
    }

    record_lookup(kind, LookupResult::Found);
    debug!(kind, object = %first.name(), "lookup matched");
    Json(first.name().clone()).into_response()
}
