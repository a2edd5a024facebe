//! machindex operator library
//!
//! Custom resources for machine, BMC and machine-type identities, and the
//! reconcilers that keep the in-memory indices in step with the cluster.

pub mod bootstrap;
pub mod controllers;
pub mod crds;
pub mod store;

pub use bootstrap::{setup_index, Indices};
pub use crds::{crds, BmcInfo, IndexStatus, MachineInfo, MachineType};
pub use store::KubeStore;
