//! Initial population of the indices from the cluster

use crate::controllers::{patch_status, IndexController, IndexedResource};
use crate::crds::{BmcInfo, IndexStatus, MachineInfo, MachineType};
use crate::store::KubeStore;
use kube::Client;
use machindex_core::{
    Bmc, BmcIndex, FullIndex, IndexRecord, Machine, MachineIndex, MachineTypeIndex, SetupReport,
    StoreError,
};
use metrics::{counter, gauge};
use std::sync::Arc;
use tracing::{info, warn};

/// Run the setup pass of `index` against the `K` objects in the cluster.
///
/// Objects rejected by validation get an `Invalid` status; failing to
/// write that status is logged and does not fail the pass.
pub async fn setup_index<K, R>(
    client: Client,
    namespace: Option<String>,
    index: &FullIndex<R>,
) -> Result<SetupReport, StoreError>
where
    K: IndexedResource<R>,
    R: IndexRecord,
{
    let kind: &'static str = R::KIND.into();
    let store = KubeStore::<K>::new(client, namespace);
    info!(kind, namespace = store.namespace().unwrap_or("*"), "populating index");
    let report = index.setup(Some(&store)).await?;

    if !report.already_initialized {
        gauge!("machindex_index_records", "kind" => kind).set(report.indexed as f64);
    }

    for invalid in &report.invalid {
        counter!("machindex_invalid_objects_total", "kind" => kind).increment(1);
        let status = IndexStatus::invalid(invalid.reason.clone());
        let api = store.api_for(&invalid.object);
        if let Err(e) = patch_status(&api, &invalid.object.name, &status).await {
            warn!(kind, object = %invalid.object, error = %e, "failed to mark object invalid");
        }
    }

    Ok(report)
}

/// The three indices served by one process.
#[derive(Clone, Default)]
pub struct Indices {
    pub machines: Arc<MachineIndex>,
    pub bmcs: Arc<BmcIndex>,
    pub types: Arc<MachineTypeIndex>,
}

/// Populate all indices, then keep them current until a controller stops.
pub async fn run(client: Client, namespace: Option<String>, indices: Indices) -> Result<(), StoreError> {
    let (machines, bmcs, types) = tokio::try_join!(
        setup_index::<MachineInfo, Machine>(client.clone(), namespace.clone(), &indices.machines),
        setup_index::<BmcInfo, Bmc>(client.clone(), namespace.clone(), &indices.bmcs),
        setup_index::<MachineType, machindex_core::MachineType>(client.clone(), namespace.clone(), &indices.types),
    )?;
    info!(
        machines = machines.indexed,
        bmcs = bmcs.indexed,
        types = types.indexed,
        "indices ready"
    );

    tokio::select! {
        _ = IndexController::run::<MachineInfo, _>(client.clone(), namespace.clone(), indices.machines.clone()) => {}
        _ = IndexController::run::<BmcInfo, _>(client.clone(), namespace.clone(), indices.bmcs.clone()) => {}
        _ = IndexController::run::<MachineType, _>(client, namespace, indices.types.clone()) => {}
    }

    Ok(())
}
