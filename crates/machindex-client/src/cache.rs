//! Bounded lookup cache
//!
//! Maps MAC and UUID strings to the object names the index server resolved
//! them to. Each cached object is one entry carrying the keys known to
//! resolve to it and a logical access stamp. Going over capacity evicts the
//! entry with the oldest stamp, found by a linear scan.

use machindex_core::ObjectName;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Default)]
struct Entry {
    macs: HashSet<String>,
    uuids: HashSet<String>,
    last: u64,
}

impl Entry {
    fn keys_mut(&mut self, space: KeySpace) -> &mut HashSet<String> {
        match space {
            KeySpace::Mac => &mut self.macs,
            KeySpace::Uuid => &mut self.uuids,
        }
    }

    fn is_empty(&self) -> bool {
        self.macs.is_empty() && self.uuids.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
enum KeySpace {
    Mac,
    Uuid,
}

/// Cache of resolved identities. A capacity of `0` means unbounded.
#[derive(Debug)]
pub struct IndexCache {
    capacity: usize,
    clock: u64,
    entries: HashMap<ObjectName, Entry>,
    macs: HashMap<String, ObjectName>,
    uuids: HashMap<String, ObjectName>,
}

impl IndexCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            clock: 0,
            entries: HashMap::new(),
            macs: HashMap::new(),
            uuids: HashMap::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of cached objects.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_name(&self, name: &ObjectName) -> bool {
        self.entries.contains_key(name)
    }

    /// Look up a cached name. A MAC hit wins; the UUID is only consulted
    /// when the MAC is absent or misses.
    pub fn lookup(&mut self, mac: Option<&str>, uuid: Option<&str>) -> Option<ObjectName> {
        let name = mac
            .filter(|mac| !mac.is_empty())
            .and_then(|mac| self.macs.get(mac))
            .or_else(|| {
                uuid.filter(|uuid| !uuid.is_empty())
                    .and_then(|uuid| self.uuids.get(uuid))
            })?
            .clone();

        self.clock += 1;
        if let Some(entry) = self.entries.get_mut(&name) {
            entry.last = self.clock;
        }
        Some(name)
    }

    /// Cache `mac -> name`. Returns the number of evicted entries.
    pub fn insert_mac(&mut self, mac: &str, name: &ObjectName) -> usize {
        self.insert(KeySpace::Mac, mac, name)
    }

    /// Cache `uuid -> name`. Returns the number of evicted entries.
    pub fn insert_uuid(&mut self, uuid: &str, name: &ObjectName) -> usize {
        self.insert(KeySpace::Uuid, uuid, name)
    }

    fn keys_mut(&mut self, space: KeySpace) -> &mut HashMap<String, ObjectName> {
        match space {
            KeySpace::Mac => &mut self.macs,
            KeySpace::Uuid => &mut self.uuids,
        }
    }

    fn insert(&mut self, space: KeySpace, key: &str, name: &ObjectName) -> usize {
        self.clock += 1;
        let last = self.clock;

        let previous = self.keys_mut(space).insert(key.to_owned(), name.clone());
        if let Some(previous) = previous.filter(|previous| previous != name) {
            let orphaned = self.entries.get_mut(&previous).is_some_and(|entry| {
                entry.keys_mut(space).remove(key);
                entry.is_empty()
            });
            if orphaned {
                self.entries.remove(&previous);
            }
        }

        let entry = self.entries.entry(name.clone()).or_default();
        entry.keys_mut(space).insert(key.to_owned());
        entry.last = last;

        self.evict()
    }

    fn evict(&mut self) -> usize {
        let mut evicted = 0;
        while self.capacity > 0 && self.entries.len() > self.capacity {
            let Some(oldest) = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last)
                .map(|(name, _)| name.clone())
            else {
                break;
            };
            if let Some(entry) = self.entries.remove(&oldest) {
                for mac in &entry.macs {
                    self.macs.remove(mac);
                }
                for uuid in &entry.uuids {
                    self.uuids.remove(uuid);
                }
            }
            evicted += 1;
        }
        evicted
    }
}
