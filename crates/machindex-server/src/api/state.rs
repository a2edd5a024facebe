//! Application State
//!
//! Shared state passed to all API handlers.

use crate::observability::MetricsState;
use machindex_core::{BmcIndex, IndexSubscriber, MachineIndex, MachineTypeIndex};

/// Shared application state
///
/// The indices are picked up from their slots once the cluster bootstrap
/// has created them; until then lookups answer 406.
#[derive(Clone)]
pub struct AppState {
    pub machines: IndexSubscriber<MachineIndex>,
    pub bmcs: IndexSubscriber<BmcIndex>,
    pub types: IndexSubscriber<MachineTypeIndex>,
    pub metrics_state: Option<MetricsState>,
}

impl AppState {
    /// Every index is published and has finished its setup pass.
    pub fn is_ready(&self) -> bool {
        self.machines.get().is_some_and(|index| index.is_initialized())
            && self.bmcs.get().is_some_and(|index| index.is_initialized())
            && self.types.get().is_some_and(|index| index.is_initialized())
    }
}
