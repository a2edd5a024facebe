//! Kubernetes controllers
//!
//! Reconcilers that watch the identity CRDs and keep the indices current.

mod context;
mod index;

pub use context::Context;
pub use index::{IndexController, IndexedResource, ReconcileError};

pub(crate) use index::patch_status;
