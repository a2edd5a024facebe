//! Identity Records
//!
//! The logical objects held by a [`FullIndex`](crate::index::FullIndex):
//! machines, baseboard management controllers and machine types. Records
//! are built once from a raw backing-store object (see [`IntoRecord`]) and
//! shared read-only afterwards.

use crate::mac::{Mac, MacPrefix};
use crate::name::ObjectName;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use strum::{Display, EnumString, IntoStaticStr};
use thiserror::Error;
use uuid::Uuid;

/// Resource kinds that get their own index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString, IntoStaticStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RecordKind {
    Machine,
    Bmc,
    MachineType,
}

impl RecordKind {
    /// Path segment the index server answers lookups for this kind on.
    pub const fn lookup_path(self) -> &'static str {
        match self {
            RecordKind::Machine => "info",
            RecordKind::Bmc => "bmc",
            RecordKind::MachineType => "type",
        }
    }
}

/// How `resolve_by_mac` treats a queried address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacLookup {
    /// Exact match against the record MACs.
    Exact,
    /// Classification: first record prefix that contains the address.
    Prefix,
}

/// A record that can be held by a full index.
pub trait IndexRecord: Send + Sync + 'static {
    const KIND: RecordKind;
    const MAC_LOOKUP: MacLookup = MacLookup::Exact;

    fn name(&self) -> &ObjectName;

    /// Addresses this record is found under by exact MAC lookup.
    fn macs(&self) -> Vec<Mac>;

    fn uuid(&self) -> Option<Uuid>;

    /// Prefixes used when `MAC_LOOKUP` is `Prefix`.
    fn prefixes(&self) -> &[MacPrefix] {
        &[]
    }
}

/// A raw object that failed domain validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {object}: {reason}")]
pub struct ValidationError {
    pub object: ObjectName,
    pub reason: String,
}

impl ValidationError {
    pub fn new(object: ObjectName, reason: impl Into<String>) -> Self {
        Self {
            object,
            reason: reason.into(),
        }
    }
}

/// Conversion from a raw backing-store object into a record.
///
/// Domain validation happens here: an object that cannot be turned into a
/// record is reported with a [`ValidationError`] instead.
pub trait IntoRecord<R> {
    fn object_name(&self) -> ObjectName;

    fn to_record(&self) -> Result<R, ValidationError>;
}

impl<R: IndexRecord + Clone> IntoRecord<R> for R {
    fn object_name(&self) -> ObjectName {
        self.name().clone()
    }

    fn to_record(&self) -> Result<R, ValidationError> {
        Ok(self.clone())
    }
}

/// A physical machine, found by the MACs of its NICs or its system UUID.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Machine {
    pub name: ObjectName,
    pub uuid: Option<Uuid>,
    pub nics: Vec<Nic>,
    pub values: serde_json::Value,
}

/// A network interface of a machine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Nic {
    pub name: Option<String>,
    pub mac: Mac,
    pub ip: Option<IpAddr>,
}

impl Nic {
    pub fn new(mac: Mac) -> Self {
        Self {
            name: None,
            mac,
            ip: None,
        }
    }
}

impl Machine {
    pub fn new(name: ObjectName) -> Self {
        Self {
            name,
            uuid: None,
            nics: Vec::new(),
            values: serde_json::Value::Null,
        }
    }

    pub fn with_uuid(mut self, uuid: Uuid) -> Self {
        self.uuid = Some(uuid);
        self
    }

    pub fn with_nic(mut self, nic: Nic) -> Self {
        self.nics.push(nic);
        self
    }
}

impl IndexRecord for Machine {
    const KIND: RecordKind = RecordKind::Machine;

    fn name(&self) -> &ObjectName {
        &self.name
    }

    fn macs(&self) -> Vec<Mac> {
        self.nics.iter().map(|nic| nic.mac).collect()
    }

    fn uuid(&self) -> Option<Uuid> {
        self.uuid
    }
}

/// A baseboard management controller, found by its own MAC or UUID.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bmc {
    pub name: ObjectName,
    pub uuid: Option<Uuid>,
    pub mac: Option<Mac>,
    pub ip: Option<IpAddr>,
    pub nic: Option<String>,
    pub version: Option<String>,
    pub frus: Vec<Fru>,
    pub values: serde_json::Value,
}

impl Bmc {
    pub fn new(name: ObjectName) -> Self {
        Self {
            name,
            uuid: None,
            mac: None,
            ip: None,
            nic: None,
            version: None,
            frus: Vec::new(),
            values: serde_json::Value::Null,
        }
    }

    pub fn with_uuid(mut self, uuid: Uuid) -> Self {
        self.uuid = Some(uuid);
        self
    }

    pub fn with_mac(mut self, mac: Mac) -> Self {
        self.mac = Some(mac);
        self
    }
}

impl IndexRecord for Bmc {
    const KIND: RecordKind = RecordKind::Bmc;

    fn name(&self) -> &ObjectName {
        &self.name
    }

    fn macs(&self) -> Vec<Mac> {
        self.mac.into_iter().collect()
    }

    fn uuid(&self) -> Option<Uuid> {
        self.uuid
    }
}

/// Field replaceable unit reported by a BMC.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Fru {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chassis: Option<FruInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board: Option<FruInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<FruInfo>,
}

/// Inventory data of one FRU area.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FruInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mfg_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_tag: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra: Vec<String>,
}

/// A machine type, identified by the vendor MAC prefixes of its NICs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MachineType {
    pub name: ObjectName,
    pub manufacturer: String,
    pub model: String,
    pub prefixes: Vec<MacPrefix>,
    pub values: serde_json::Value,
}

impl MachineType {
    /// Build a machine type. At least one prefix is required.
    pub fn new(name: ObjectName, prefixes: Vec<MacPrefix>) -> Result<Self, ValidationError> {
        if prefixes.is_empty() {
            return Err(ValidationError::new(name, "prefixes required"));
        }
        Ok(Self {
            name,
            manufacturer: String::new(),
            model: String::new(),
            prefixes,
            values: serde_json::Value::Null,
        })
    }
}

impl IndexRecord for MachineType {
    const KIND: RecordKind = RecordKind::MachineType;
    const MAC_LOOKUP: MacLookup = MacLookup::Prefix;

    fn name(&self) -> &ObjectName {
        &self.name
    }

    fn macs(&self) -> Vec<Mac> {
        Vec::new()
    }

    fn uuid(&self) -> Option<Uuid> {
        None
    }

    fn prefixes(&self) -> &[MacPrefix] {
        &self.prefixes
    }
}
