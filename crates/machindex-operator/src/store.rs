//! Kubernetes-backed object store

use k8s_openapi::NamespaceResourceScope;
use kube::api::{Api, ListParams};
use kube::{Client, Resource};
use machindex_core::{ObjectName, ObjectStore, StoreError};
use serde::de::DeserializeOwned;
use std::fmt::Debug;

/// Lists and reads custom resources of one kind, cluster wide or in one
/// namespace.
pub struct KubeStore<K> {
    client: Client,
    namespace: Option<String>,
    all: Api<K>,
}

impl<K> KubeStore<K>
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + Debug
        + DeserializeOwned,
{
    pub fn new(client: Client, namespace: Option<String>) -> Self {
        let all = match &namespace {
            Some(ns) => Api::namespaced(client.clone(), ns),
            None => Api::all(client.clone()),
        };
        Self {
            client,
            namespace,
            all,
        }
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Api scoped to the namespace of `name`.
    pub fn api_for(&self, name: &ObjectName) -> Api<K> {
        Api::namespaced(self.client.clone(), &name.namespace)
    }
}

impl<K> ObjectStore for KubeStore<K>
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + Debug
        + DeserializeOwned
        + Send
        + Sync
        + 'static,
{
    type Object = K;

    async fn list(&self) -> Result<Vec<K>, StoreError> {
        let list = self
            .all
            .list(&ListParams::default())
            .await
            .map_err(StoreError::backend)?;
        Ok(list.items)
    }

    async fn get(&self, name: &ObjectName) -> Result<Option<K>, StoreError> {
        self.api_for(name)
            .get_opt(&name.name)
            .await
            .map_err(StoreError::backend)
    }
}
