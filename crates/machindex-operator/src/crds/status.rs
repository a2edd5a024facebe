//! Status shared by all indexed resources

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Outcome of the last conversion of a resource into an index record.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IndexStatus {
    #[serde(default)]
    pub state: IndexedState,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema, Display, EnumString,
)]
pub enum IndexedState {
    #[default]
    Ok,
    Invalid,
}

impl IndexStatus {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            state: IndexedState::Ok,
            message: message.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            state: IndexedState::Invalid,
            message: message.into(),
        }
    }
}

/// Access to the index status of a resource.
pub trait HasIndexStatus {
    fn index_status(&self) -> Option<&IndexStatus>;

    /// Message written to the status when the resource is indexed.
    fn ok_message() -> &'static str;
}

/// Schema for free-form `values` blocks.
pub(crate) fn preserve_unknown_fields(
    _: &mut schemars::gen::SchemaGenerator,
) -> schemars::schema::Schema {
    let mut schema = schemars::schema::SchemaObject {
        instance_type: Some(schemars::schema::InstanceType::Object.into()),
        ..Default::default()
    };
    schema.extensions.insert(
        "x-kubernetes-preserve-unknown-fields".to_string(),
        serde_json::Value::Bool(true),
    );
    schemars::schema::Schema::Object(schema)
}
