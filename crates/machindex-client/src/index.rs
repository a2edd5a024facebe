//! Remote-backed resolver
//!
//! Used by processes that do not own the index: identities are resolved to
//! names by the index server, and the named object is then read from the
//! backing store and converted locally.

use crate::remote::{ClientError, IndexClient};
use machindex_core::{IndexRecord, IntoRecord, ObjectName, ObjectStore, ResolveError, Resolver};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

pub struct RemoteIndex<R, S> {
    client: IndexClient,
    store: S,
    _record: PhantomData<fn() -> R>,
}

impl<R, S> RemoteIndex<R, S>
where
    R: IndexRecord,
    S: ObjectStore,
    S::Object: IntoRecord<R>,
{
    pub fn new(client: IndexClient, store: S) -> Self {
        Self {
            client,
            store,
            _record: PhantomData,
        }
    }

    pub fn client(&self) -> &IndexClient {
        &self.client
    }

    async fn lookup(
        &self,
        mac: Option<&str>,
        uuid: Option<&str>,
    ) -> Result<Option<Arc<R>>, ResolveError> {
        match self.client.resolve(mac, uuid).await {
            Ok(name) => self.resolve_by_name(&name).await,
            Err(ClientError::NotFound | ClientError::MissingKey) => Ok(None),
            Err(e) => Err(ResolveError::remote(e)),
        }
    }
}

impl<R, S> Resolver for RemoteIndex<R, S>
where
    R: IndexRecord,
    S: ObjectStore,
    S::Object: IntoRecord<R>,
{
    type Record = R;

    async fn resolve_by_mac(&self, mac: &str) -> Result<Option<Arc<R>>, ResolveError> {
        self.lookup(Some(mac), None).await
    }

    async fn resolve_by_uuid(&self, uuid: &str) -> Result<Option<Arc<R>>, ResolveError> {
        self.lookup(None, Some(uuid)).await
    }

    async fn resolve_by_name(&self, name: &ObjectName) -> Result<Option<Arc<R>>, ResolveError> {
        let Some(object) = self.store.get(name).await? else {
            debug!(kind = %R::KIND, object = %name, "resolved object is gone from the store");
            return Ok(None);
        };
        Ok(Some(Arc::new(object.to_record()?)))
    }

    fn is_initialized(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use machindex_core::{Machine, MemoryStore, Nic, RecordKind};
    use serde_json::json;
    use url::Url;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MAC: &str = "00:de:11:64:00:a1";

    async fn remote(server: &MockServer, store: MemoryStore<Machine>) -> RemoteIndex<Machine, MemoryStore<Machine>> {
        let url: Url = server.uri().parse().unwrap();
        let client = IndexClient::for_kind(&url, RecordKind::Machine, 10).unwrap();
        RemoteIndex::new(client, store)
    }

    #[tokio::test]
    async fn test_resolves_through_server_and_store() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/info"))
            .and(query_param("mac", MAC))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "name": "node-1", "namespace": "lab" })),
            )
            .mount(&server)
            .await;

        let machine =
            Machine::new(ObjectName::new("lab", "node-1")).with_nic(Nic::new(MAC.parse().unwrap()));
        let index = remote(&server, [machine.clone()].into_iter().collect()).await;

        assert!(index.is_initialized());
        let found = index.resolve_by_mac(MAC).await.unwrap().unwrap();
        assert_eq!(*found, machine);
    }

    #[tokio::test]
    async fn test_not_found_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let index = remote(&server, MemoryStore::new()).await;
        assert!(index.resolve_by_uuid("c0ffee").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_server_failure_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let index = remote(&server, MemoryStore::new()).await;
        assert!(matches!(
            index.resolve_by_mac(MAC).await,
            Err(ResolveError::Remote(_))
        ));
    }

    #[tokio::test]
    async fn test_stale_name_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "name": "gone", "namespace": "lab" })),
            )
            .mount(&server)
            .await;

        let index = remote(&server, MemoryStore::new()).await;
        assert!(index.resolve_by_mac(MAC).await.unwrap().is_none());
    }
}
