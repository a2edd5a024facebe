//! HTTP client for the index server with a local cache in front.

use crate::cache::IndexCache;
use machindex_core::{ObjectName, RecordKind};
use metrics::counter;
use parking_lot::Mutex;
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

/// Failure of a remote lookup. None of these are cached.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("no MAC or UUID given")]
    MissingKey,
    #[error("identity not found")]
    NotFound,
    #[error("index server not ready")]
    NotReady,
    #[error("index server answered {0}")]
    Status(StatusCode),
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("malformed response: {0}")]
    Decode(#[source] reqwest::Error),
    #[error("invalid server URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound)
    }
}

/// Resolves MACs and UUIDs to object names through an index server.
pub struct IndexClient {
    http: reqwest::Client,
    base: Url,
    cache: Mutex<IndexCache>,
}

impl IndexClient {
    /// Client querying `base` directly, caching up to `max_cache` objects.
    pub fn new(base: Url, max_cache: usize) -> Self {
        let cache = IndexCache::new(max_cache);
        debug!(base = %base, capacity = cache.capacity(), "index client created");
        Self {
            http: reqwest::Client::new(),
            base,
            cache: Mutex::new(cache),
        }
    }

    /// Client for the lookup endpoint of `kind` on `server`.
    pub fn for_kind(server: &Url, kind: RecordKind, max_cache: usize) -> Result<Self, ClientError> {
        let mut root = server.clone();
        if !root.path().ends_with('/') {
            let path = format!("{}/", root.path());
            root.set_path(&path);
        }
        let base = root.join(kind.lookup_path())?;
        Ok(Self::new(base, max_cache))
    }

    /// Bound the duration of each remote lookup.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, ClientError> {
        self.http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ClientError::Transport)?;
        Ok(self)
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn cached(&self) -> usize {
        self.cache.lock().len()
    }

    /// Resolve a MAC and/or UUID, preferring the cache.
    pub async fn resolve(
        &self,
        mac: Option<&str>,
        uuid: Option<&str>,
    ) -> Result<ObjectName, ClientError> {
        let mac = mac.filter(|mac| !mac.is_empty());
        let uuid = uuid.filter(|uuid| !uuid.is_empty());
        if mac.is_none() && uuid.is_none() {
            return Err(ClientError::MissingKey);
        }

        let cached = self.cache.lock().lookup(mac, uuid);
        if let Some(name) = cached {
            counter!("machindex_client_cache_total", "result" => "hit").increment(1);
            debug!(object = %name, "cache hit");
            return Ok(name);
        }
        counter!("machindex_client_cache_total", "result" => "miss").increment(1);

        let mut url = self.base.clone();
        {
            let mut query = url.query_pairs_mut();
            if let Some(mac) = mac {
                query.append_pair("mac", mac);
            }
            if let Some(uuid) = uuid {
                query.append_pair("uuid", uuid);
            }
        }

        info!(url = %url, "querying index server");
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(ClientError::Transport)?;

        match response.status() {
            StatusCode::NOT_FOUND => return Err(ClientError::NotFound),
            StatusCode::NOT_ACCEPTABLE => return Err(ClientError::NotReady),
            status if !status.is_success() => return Err(ClientError::Status(status)),
            _ => {}
        }

        let name: ObjectName = response.json().await.map_err(ClientError::Decode)?;

        let mut evicted = 0;
        {
            let mut cache = self.cache.lock();
            if let Some(mac) = mac {
                evicted += cache.insert_mac(mac, &name);
            }
            if let Some(uuid) = uuid {
                evicted += cache.insert_uuid(uuid, &name);
            }
        }
        if evicted > 0 {
            counter!("machindex_client_cache_total", "result" => "eviction").increment(evicted as u64);
        }

        Ok(name)
    }
}
