//! Resolver Contract
//!
//! The lookup surface shared by the in-process [`FullIndex`](crate::FullIndex)
//! and remote-backed indices. A miss is `Ok(None)`; errors are reserved for
//! failures of a remote service or backing store.

use crate::name::ObjectName;
use crate::record::{IndexRecord, ValidationError};
use crate::store::StoreError;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

/// Failure while resolving an identity.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("remote lookup failed: {0}")]
    Remote(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

impl ResolveError {
    pub fn remote(error: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Remote(error.into())
    }
}

/// Resolve hardware identity to an identity record.
pub trait Resolver: Send + Sync {
    type Record: IndexRecord;

    fn resolve_by_mac(
        &self,
        mac: &str,
    ) -> impl Future<Output = Result<Option<Arc<Self::Record>>, ResolveError>> + Send;

    fn resolve_by_uuid(
        &self,
        uuid: &str,
    ) -> impl Future<Output = Result<Option<Arc<Self::Record>>, ResolveError>> + Send;

    fn resolve_by_name(
        &self,
        name: &ObjectName,
    ) -> impl Future<Output = Result<Option<Arc<Self::Record>>, ResolveError>> + Send;

    /// Whether a miss can be trusted as authoritative.
    fn is_initialized(&self) -> bool;
}
