//! MachineInfo CRD
//!
//! Hardware identity of a physical machine: its system UUID and the NICs
//! it is reachable through.

use super::status::{preserve_unknown_fields, HasIndexStatus, IndexStatus};
use super::{object_name, parse_ip, parse_mac, parse_uuid};
use kube::CustomResource;
use machindex_core::{IntoRecord, Machine, Nic, ObjectName, ValidationError};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// MachineInfo records how a machine is recognised on the network.
///
/// MACs, UUID and IPs are kept as strings and validated when the object is
/// indexed, so a malformed entry marks the object `Invalid` instead of
/// failing to deserialize.
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "machindex.io",
    version = "v1alpha1",
    kind = "MachineInfo",
    namespaced,
    status = "IndexStatus",
    shortname = "mi",
    printcolumn = r#"{"name":"UUID", "type":"string", "jsonPath":".spec.uuid"}"#,
    printcolumn = r#"{"name":"State", "type":"string", "jsonPath":".status.state"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct MachineInfoSpec {
    /// System UUID as reported by the firmware.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nics: Vec<NicSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "preserve_unknown_fields")]
    pub values: Option<serde_json::Value>,
}

/// A network interface of the machine.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NicSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub mac: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
}

impl IntoRecord<Machine> for MachineInfo {
    fn object_name(&self) -> ObjectName {
        object_name(self)
    }

    fn to_record(&self) -> Result<Machine, ValidationError> {
        let name = object_name(self);

        let mut nics = Vec::with_capacity(self.spec.nics.len());
        for (i, nic) in self.spec.nics.iter().enumerate() {
            nics.push(Nic {
                name: nic.name.clone(),
                mac: parse_mac(&name, &format!("nic {i}"), &nic.mac)?,
                ip: parse_ip(&name, &format!("nic {i}"), nic.ip.as_deref())?,
            });
        }

        Ok(Machine {
            uuid: parse_uuid(&name, self.spec.uuid.as_deref())?,
            nics,
            values: self
                .spec
                .values
                .clone()
                .unwrap_or_else(|| serde_json::json!({})),
            name,
        })
    }
}

impl HasIndexStatus for MachineInfo {
    fn index_status(&self) -> Option<&IndexStatus> {
        self.status.as_ref()
    }

    fn ok_message() -> &'static str {
        "machine ok"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use machindex_core::{IndexRecord, Mac};

    fn machine_info(spec: &str) -> MachineInfo {
        let mut obj = MachineInfo::new("node-1", serde_json::from_str(spec).unwrap());
        obj.metadata.namespace = Some("lab".to_string());
        obj
    }

    #[test]
    fn test_to_record() {
        let obj = machine_info(
            r#"{
                "uuid": "5F1C9BB0-0B1E-4A4E-9A8E-2F3A61D0C1A7",
                "nics": [
                    { "name": "eth0", "mac": "00-DE-11-64-00-01", "ip": "10.0.0.5" },
                    { "mac": "00de.1164.0002" }
                ]
            }"#,
        );

        let machine = obj.to_record().unwrap();
        assert_eq!(machine.name, ObjectName::new("lab", "node-1"));
        assert_eq!(
            machine.macs(),
            vec![
                Mac::parse("00:de:11:64:00:01").unwrap(),
                Mac::parse("00:de:11:64:00:02").unwrap()
            ]
        );
        assert_eq!(
            machine.uuid.unwrap().to_string(),
            "5f1c9bb0-0b1e-4a4e-9a8e-2f3a61d0c1a7"
        );
        assert_eq!(machine.nics[0].ip, Some("10.0.0.5".parse().unwrap()));
        assert_eq!(machine.values, serde_json::json!({}));
    }

    #[test]
    fn test_empty_uuid_is_none() {
        let obj = machine_info(r#"{ "uuid": "" }"#);
        assert!(obj.to_record().unwrap().uuid.is_none());
    }

    #[test]
    fn test_invalid_mac_names_nic() {
        let obj = machine_info(r#"{ "nics": [ { "mac": "00:de:11:64:00:01" }, { "mac": "zz" } ] }"#);
        let err = obj.to_record().unwrap_err();
        assert_eq!(err.object, ObjectName::new("lab", "node-1"));
        assert!(err.reason.starts_with("nic 1:"), "{}", err.reason);
    }

    #[test]
    fn test_invalid_ip() {
        let obj = machine_info(r#"{ "nics": [ { "mac": "00:de:11:64:00:01", "ip": "10.0.0" } ] }"#);
        assert!(obj.to_record().is_err());
    }
}
