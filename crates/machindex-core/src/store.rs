//! Backing Object Store
//!
//! The collaborator an index is populated from. The selector is fixed per
//! store instance: a store lists every object of one kind it is scoped to.

use crate::name::ObjectName;
use crate::record::IndexRecord;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::future::Future;
use thiserror::Error;

/// Failure talking to a backing store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("backing store error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    pub fn backend(error: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Backend(error.into())
    }
}

/// Source of raw objects for one resource kind.
pub trait ObjectStore: Send + Sync {
    type Object: Send + Sync;

    /// All objects selected by this store.
    fn list(&self) -> impl Future<Output = Result<Vec<Self::Object>, StoreError>> + Send;

    /// A single object by name.
    fn get(
        &self,
        name: &ObjectName,
    ) -> impl Future<Output = Result<Option<Self::Object>, StoreError>> + Send;
}

/// In-memory object store.
pub struct MemoryStore<O> {
    objects: RwLock<BTreeMap<ObjectName, O>>,
}

impl<O> Default for MemoryStore<O> {
    fn default() -> Self {
        Self {
            objects: RwLock::new(BTreeMap::new()),
        }
    }
}

impl<O> MemoryStore<O> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, name: ObjectName, object: O) -> Option<O> {
        self.objects.write().insert(name, object)
    }

    pub fn remove(&self, name: &ObjectName) -> Option<O> {
        self.objects.write().remove(name)
    }

    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }
}

impl<R: IndexRecord> FromIterator<R> for MemoryStore<R> {
    fn from_iter<I: IntoIterator<Item = R>>(iter: I) -> Self {
        let objects = iter
            .into_iter()
            .map(|record| (record.name().clone(), record))
            .collect();
        Self {
            objects: RwLock::new(objects),
        }
    }
}

impl<O: Clone + Send + Sync> ObjectStore for MemoryStore<O> {
    type Object = O;

    async fn list(&self) -> Result<Vec<O>, StoreError> {
        Ok(self.objects.read().values().cloned().collect())
    }

    async fn get(&self, name: &ObjectName) -> Result<Option<O>, StoreError> {
        Ok(self.objects.read().get(name).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Machine;

    #[tokio::test]
    async fn test_memory_store_list_and_get() {
        let store: MemoryStore<Machine> = [
            Machine::new(ObjectName::new("lab", "b")),
            Machine::new(ObjectName::new("lab", "a")),
        ]
        .into_iter()
        .collect();

        let names: Vec<_> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.name.name)
            .collect();
        assert_eq!(names, vec!["a", "b"]);

        assert!(store
            .get(&ObjectName::new("lab", "a"))
            .await
            .unwrap()
            .is_some());
        store.remove(&ObjectName::new("lab", "a"));
        assert!(store
            .get(&ObjectName::new("lab", "a"))
            .await
            .unwrap()
            .is_none());
        assert_eq!(store.len(), 1);
    }
}
