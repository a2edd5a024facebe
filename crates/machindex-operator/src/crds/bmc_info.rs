//! BmcInfo CRD
//!
//! Baseboard management controller of a machine, with the inventory the
//! controller reports about the hardware.

use super::status::{preserve_unknown_fields, HasIndexStatus, IndexStatus};
use super::{object_name, parse_ip, parse_mac, parse_uuid};
use kube::CustomResource;
use machindex_core::{Bmc, Fru, IntoRecord, ObjectName, ValidationError};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "machindex.io",
    version = "v1alpha1",
    kind = "BmcInfo",
    namespaced,
    status = "IndexStatus",
    shortname = "bmci",
    printcolumn = r#"{"name":"UUID", "type":"string", "jsonPath":".spec.uuid"}"#,
    printcolumn = r#"{"name":"MAC", "type":"string", "jsonPath":".spec.mac"}"#,
    printcolumn = r#"{"name":"State", "type":"string", "jsonPath":".status.state"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct BmcInfoSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bmc_version: Option<String>,

    /// Host NIC the controller shares, if not dedicated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nic: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<BasicAuthCredentials>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub frus: Vec<Fru>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "preserve_unknown_fields")]
    pub values: Option<serde_json::Value>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
pub struct BasicAuthCredentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl IntoRecord<Bmc> for BmcInfo {
    fn object_name(&self) -> ObjectName {
        object_name(self)
    }

    fn to_record(&self) -> Result<Bmc, ValidationError> {
        let name = object_name(self);
        let mac = match self.spec.mac.as_deref().filter(|mac| !mac.is_empty()) {
            Some(mac) => Some(parse_mac(&name, "mac", mac)?),
            None => None,
        };

        Ok(Bmc {
            uuid: parse_uuid(&name, self.spec.uuid.as_deref())?,
            mac,
            ip: parse_ip(&name, "ip", self.spec.ip.as_deref())?,
            nic: self.spec.nic.clone(),
            version: self.spec.bmc_version.clone(),
            frus: self.spec.frus.clone(),
            values: self
                .spec
                .values
                .clone()
                .unwrap_or_else(|| serde_json::json!({})),
            name,
        })
    }
}

impl HasIndexStatus for BmcInfo {
    fn index_status(&self) -> Option<&IndexStatus> {
        self.status.as_ref()
    }

    fn ok_message() -> &'static str {
        "bmc ok"
    }
}
