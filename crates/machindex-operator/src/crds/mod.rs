//! Custom Resource Definitions
//!
//! Kubernetes CRDs for the hardware identities held by the indices.

pub mod bmc_info;
pub mod machine_info;
pub mod machine_type;
pub mod status;

pub use bmc_info::{BasicAuthCredentials, BmcInfo, BmcInfoSpec};
pub use machine_info::{MachineInfo, MachineInfoSpec, NicSpec};
pub use machine_type::{MachineType, MachineTypeSpec};
pub use status::{HasIndexStatus, IndexStatus, IndexedState};

use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::{CustomResourceExt, ResourceExt};
use machindex_core::{Mac, ObjectName, ValidationError};
use std::net::IpAddr;
use uuid::Uuid;

/// All CRDs of the `machindex.io` group.
pub fn crds() -> Vec<CustomResourceDefinition> {
    vec![MachineInfo::crd(), BmcInfo::crd(), MachineType::crd()]
}

pub(crate) fn object_name<K: ResourceExt>(obj: &K) -> ObjectName {
    ObjectName::new(obj.namespace().unwrap_or_default(), obj.name_any())
}

pub(crate) fn parse_mac(name: &ObjectName, field: &str, mac: &str) -> Result<Mac, ValidationError> {
    Mac::parse(mac).map_err(|e| ValidationError::new(name.clone(), format!("{field}: {e}")))
}

/// Empty or missing UUIDs are treated as absent.
pub(crate) fn parse_uuid(
    name: &ObjectName,
    uuid: Option<&str>,
) -> Result<Option<Uuid>, ValidationError> {
    match uuid.filter(|uuid| !uuid.is_empty()) {
        Some(uuid) => Uuid::parse_str(uuid)
            .map(Some)
            .map_err(|e| ValidationError::new(name.clone(), format!("uuid: {e}"))),
        None => Ok(None),
    }
}

pub(crate) fn parse_ip(
    name: &ObjectName,
    field: &str,
    ip: Option<&str>,
) -> Result<Option<IpAddr>, ValidationError> {
    match ip.filter(|ip| !ip.is_empty()) {
        Some(ip) => ip
            .parse()
            .map(Some)
            .map_err(|e| ValidationError::new(name.clone(), format!("{field} ip: {e}"))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crds_group() {
        let names: Vec<_> = crds().into_iter().map(|crd| crd.spec.names.kind).collect();
        assert_eq!(names, vec!["MachineInfo", "BmcInfo", "MachineType"]);
        assert!(crds().iter().all(|crd| crd.spec.group == "machindex.io"));
    }

    #[test]
    fn test_values_schema_preserves_fields() {
        let crd = serde_json::to_value(MachineInfo::crd()).unwrap();
        let values = &crd["spec"]["versions"][0]["schema"]["openAPIV3Schema"]["properties"]["spec"]
            ["properties"]["values"];
        assert_eq!(values["x-kubernetes-preserve-unknown-fields"], true);
    }
}
