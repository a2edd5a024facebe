//! Index controller
//!
//! One controller per record kind. Applied objects are converted and set
//! in the index; deleted objects are removed through a finalizer.

use super::Context;
use crate::crds::{object_name, HasIndexStatus, IndexStatus};
use futures::StreamExt;
use k8s_openapi::NamespaceResourceScope;
use kube::{
    api::{Api, Patch, PatchParams},
    runtime::{
        controller::{Action, Controller},
        finalizer::{finalizer, Error as FinalizerError, Event},
        watcher::Config,
    },
    Client, Resource, ResourceExt,
};
use machindex_core::{FullIndex, IndexRecord, IntoRecord};
use metrics::{counter, gauge};
use serde::{de::DeserializeOwned, Serialize};
use std::{fmt::Debug, sync::Arc, time::Duration};
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),
}

/// A custom resource that converts into records of type `R`.
pub trait IndexedResource<R>:
    Resource<Scope = NamespaceResourceScope, DynamicType = ()>
    + IntoRecord<R>
    + HasIndexStatus
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
}

impl<K, R> IndexedResource<R> for K where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + IntoRecord<R>
        + HasIndexStatus
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static
{
}

pub struct IndexController;

impl IndexController {
    /// Watch `K` objects, cluster wide or in `namespace`, and mirror them
    /// into `index`.
    pub async fn run<K, R>(client: Client, namespace: Option<String>, index: Arc<FullIndex<R>>)
    where
        K: IndexedResource<R>,
        R: IndexRecord,
    {
        let api: Api<K> = match &namespace {
            Some(ns) => Api::namespaced(client.clone(), ns),
            None => Api::all(client.clone()),
        };
        let ctx = Arc::new(Context::new(client, index));

        info!(kind = %R::KIND, "starting controller");
        Controller::new(api, Config::default())
            .run(reconcile::<K, R>, error_policy::<K, R>, ctx)
            .for_each(|res| async move {
                match res {
                    Ok((obj, _)) => debug!(kind = %R::KIND, name = %obj.name, "reconciled"),
                    Err(e) => error!(kind = %R::KIND, error = %e, "reconcile error"),
                }
            })
            .await;
    }
}

#[instrument(skip(obj, ctx), fields(name = %obj.name_any()))]
async fn reconcile<K, R>(
    obj: Arc<K>,
    ctx: Arc<Context<R>>,
) -> Result<Action, FinalizerError<ReconcileError>>
where
    K: IndexedResource<R>,
    R: IndexRecord,
{
    let ns = obj.namespace().unwrap_or_default();
    let api: Api<K> = Api::namespaced(ctx.client.clone(), &ns);
    let finalizer_name = format!("machindex.io/{}-finalizer", R::KIND);

    finalizer(&api, &finalizer_name, obj, |event| async {
        match event {
            Event::Apply(obj) => {
                let status = apply::<K, R>(&obj, &ctx.index).await;
                if obj.index_status() != Some(&status) {
                    patch_status(&api, &obj.name_any(), &status).await?;
                }
                Ok(Action::requeue(Duration::from_secs(300)))
            }
            Event::Cleanup(obj) => {
                cleanup::<K, R>(&obj, &ctx.index).await;
                Ok(Action::await_change())
            }
        }
    })
    .await
}

/// Set the record for `obj`, or drop it from the index if `obj` is invalid.
async fn apply<K, R>(obj: &K, index: &FullIndex<R>) -> IndexStatus
where
    K: IntoRecord<R> + HasIndexStatus,
    R: IndexRecord,
{
    let kind: &'static str = R::KIND.into();
    let status = match obj.to_record() {
        Ok(record) => {
            let record = index.set(record).await;
            info!(kind, object = %record.name(), "indexed");
            IndexStatus::ok(K::ok_message())
        }
        Err(e) => {
            warn!(kind, object = %e.object, reason = %e.reason, "invalid object");
            counter!("machindex_invalid_objects_total", "kind" => kind).increment(1);
            index.delete(&e.object).await;
            IndexStatus::invalid(e.reason)
        }
    };
    gauge!("machindex_index_records", "kind" => kind).set(index.len().await as f64);
    status
}

async fn cleanup<K, R>(obj: &K, index: &FullIndex<R>)
where
    K: IntoRecord<R>,
    R: IndexRecord,
{
    let kind: &'static str = R::KIND.into();
    let name = obj.object_name();
    if index.delete(&name).await.is_some() {
        info!(kind, object = %name, "removed from index");
    }
    gauge!("machindex_index_records", "kind" => kind).set(index.len().await as f64);
}

pub(crate) async fn patch_status<K>(
    api: &Api<K>,
    name: &str,
    status: &IndexStatus,
) -> Result<(), kube::Error>
where
    K: Resource + Clone + Debug + DeserializeOwned,
{
    let patch = serde_json::json!({ "status": status });
    api.patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
        .await?;
    Ok(())
}

fn error_policy<K, R>(
    obj: Arc<K>,
    error: &FinalizerError<ReconcileError>,
    _ctx: Arc<Context<R>>,
) -> Action
where
    K: IndexedResource<R>,
    R: IndexRecord,
{
    error!(kind = %R::KIND, object = %object_name(obj.as_ref()), error = %error, "reconcile failed");
    Action::requeue(Duration::from_secs(60))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crds::{IndexedState, MachineInfo, MachineType};
    use machindex_core::{IndexState, Machine, MachineTypeIndex, MemoryStore, ObjectName, Resolver};

    const MAC: &str = "00:de:11:64:00:01";

    fn machine_info(spec: serde_json::Value) -> MachineInfo {
        let mut obj = MachineInfo::new("node-1", serde_json::from_value(spec).unwrap());
        obj.metadata.namespace = Some("lab".to_string());
        obj
    }

    async fn ready_index() -> FullIndex<Machine> {
        let index = FullIndex::new();
        index
            .setup(Some(&MemoryStore::<Machine>::new()))
            .await
            .unwrap();
        assert_eq!(index.state(), IndexState::Ready);
        index
    }

    #[tokio::test]
    async fn test_apply_sets_record() {
        let index = ready_index().await;
        let obj = machine_info(serde_json::json!({ "nics": [ { "mac": MAC } ] }));

        let status = apply(&obj, &index).await;
        assert_eq!(status, IndexStatus::ok("machine ok"));
        let found = index.resolve_by_mac(MAC).await.unwrap().unwrap();
        assert_eq!(found.name, ObjectName::new("lab", "node-1"));
    }

    #[tokio::test]
    async fn test_apply_invalid_drops_record() {
        let index = ready_index().await;
        apply(
            &machine_info(serde_json::json!({ "nics": [ { "mac": MAC } ] })),
            &index,
        )
        .await;

        let status = apply(
            &machine_info(serde_json::json!({ "nics": [ { "mac": "00:de:11" } ] })),
            &index,
        )
        .await;
        assert_eq!(status.state, IndexedState::Invalid);
        assert!(status.message.starts_with("nic 0:"));
        assert!(index.resolve_by_mac(MAC).await.unwrap().is_none());
        assert!(index.is_empty().await);
    }

    #[tokio::test]
    async fn test_cleanup_removes_record() {
        let index = ready_index().await;
        let obj = machine_info(serde_json::json!({ "nics": [ { "mac": MAC } ] }));
        apply(&obj, &index).await;

        cleanup(&obj, &index).await;
        assert!(index.resolve_by_mac(MAC).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_apply_machine_type() {
        let index = MachineTypeIndex::new();
        index
            .setup(Some(&MemoryStore::<machindex_core::MachineType>::new()))
            .await
            .unwrap();

        let mut obj = MachineType::new(
            "x11",
            serde_json::from_value(serde_json::json!({
                "manufacturer": "Supermicro",
                "type": "X11",
                "macPrefixes": ["0c:c4:7a/24"]
            }))
            .unwrap(),
        );
        obj.metadata.namespace = Some("lab".to_string());

        let status = apply(&obj, &index).await;
        assert_eq!(status, IndexStatus::ok("machine type ok"));
        let found = index.resolve_by_mac("0c:c4:7a:12:34:56").await.unwrap().unwrap();
        assert_eq!(found.model, "X11");
    }
}
