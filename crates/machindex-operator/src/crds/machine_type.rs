//! MachineType CRD
//!
//! Classifies machines by the vendor MAC prefixes of their NICs.

use super::object_name;
use super::status::{preserve_unknown_fields, HasIndexStatus, IndexStatus};
use kube::CustomResource;
use machindex_core::{IntoRecord, MacPrefix, MachineType as MachineTypeRecord, ObjectName, ValidationError};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "machindex.io",
    version = "v1alpha1",
    kind = "MachineType",
    namespaced,
    status = "IndexStatus",
    shortname = "macht",
    printcolumn = r#"{"name":"Manufacturer", "type":"string", "jsonPath":".spec.manufacturer"}"#,
    printcolumn = r#"{"name":"Type", "type":"string", "jsonPath":".spec.type"}"#,
    printcolumn = r#"{"name":"State", "type":"string", "jsonPath":".status.state"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct MachineTypeSpec {
    pub manufacturer: String,

    /// Model name.
    #[serde(rename = "type")]
    pub model: String,

    /// Prefixes in `<mac>/<bits>` notation, checked in order.
    pub mac_prefixes: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "preserve_unknown_fields")]
    pub values: Option<serde_json::Value>,
}

impl IntoRecord<MachineTypeRecord> for MachineType {
    fn object_name(&self) -> ObjectName {
        object_name(self)
    }

    fn to_record(&self) -> Result<MachineTypeRecord, ValidationError> {
        let name = object_name(self);

        let prefixes = self
            .spec
            .mac_prefixes
            .iter()
            .enumerate()
            .map(|(i, prefix)| {
                MacPrefix::parse(prefix).map_err(|e| {
                    ValidationError::new(name.clone(), format!("invalid prefix ({i}) {prefix}: {e}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut record = MachineTypeRecord::new(name, prefixes)?;
        record.manufacturer = self.spec.manufacturer.clone();
        record.model = self.spec.model.clone();
        record.values = self
            .spec
            .values
            .clone()
            .unwrap_or_else(|| serde_json::json!({}));
        Ok(record)
    }
}

impl HasIndexStatus for MachineType {
    fn index_status(&self) -> Option<&IndexStatus> {
        self.status.as_ref()
    }

    fn ok_message() -> &'static str {
        "machine type ok"
    }
}
