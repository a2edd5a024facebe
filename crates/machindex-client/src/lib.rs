//! Remote index client
//!
//! Resolves MACs and UUIDs through a machindex server, with a bounded local
//! cache in front of the network.

pub mod cache;
pub mod index;
pub mod remote;

pub use cache::IndexCache;
pub use index::RemoteIndex;
pub use remote::{ClientError, IndexClient};
