//! Core types for machindex
//!
//! MAC parsing, identity records, the in-memory full identity index and
//! the resolver contract shared by local and remote indices.

pub mod index;
pub mod mac;
pub mod name;
pub mod record;
pub mod registry;
pub mod resolver;
pub mod store;

pub use index::{BmcIndex, FullIndex, IndexState, MachineIndex, MachineTypeIndex, SetupReport};
pub use mac::{Mac, MacPrefix, ParseError};
pub use name::ObjectName;
pub use record::{
    Bmc, Fru, FruInfo, IndexRecord, IntoRecord, MacLookup, Machine, MachineType, Nic, RecordKind,
    ValidationError,
};
pub use registry::{IndexSlot, IndexSubscriber};
pub use resolver::{ResolveError, Resolver};
pub use store::{MemoryStore, ObjectStore, StoreError};
