//! Shared controller context

use kube::Client;
use machindex_core::FullIndex;
use std::sync::Arc;

/// Shared context for the controllers of one record kind.
pub struct Context<R> {
    pub client: Client,
    pub index: Arc<FullIndex<R>>,
}

impl<R> Context<R> {
    pub fn new(client: Client, index: Arc<FullIndex<R>>) -> Self {
        Self { client, index }
    }
}
