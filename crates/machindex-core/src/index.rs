//! Full Identity Index
//!
//! In-memory index over identity records by object name, MAC and UUID.
//!
//! Records live in a name-keyed arena; the MAC and UUID maps hold names
//! into that arena. All three maps sit behind one lock and change together,
//! so a reader never sees a record whose keys are half registered.
//!
//! A new index is `Uninitialized`. Lookups wait until the first
//! [`FullIndex::setup`] pass has published `Ready`; after that they never
//! wait again. Incremental [`FullIndex::set`] / [`FullIndex::delete`] calls
//! from reconcilers are accepted in any state.

use crate::mac::Mac;
use crate::name::ObjectName;
use crate::record::{Bmc, IndexRecord, IntoRecord, Machine, MacLookup, MachineType, ValidationError};
use crate::resolver::{ResolveError, Resolver};
use crate::store::{ObjectStore, StoreError};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use strum::Display;
use tokio::sync::{watch, Mutex, RwLock};
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

pub type MachineIndex = FullIndex<Machine>;
pub type BmcIndex = FullIndex<Bmc>;
pub type MachineTypeIndex = FullIndex<MachineType>;

/// Initialization state of an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum IndexState {
    Uninitialized,
    Initializing,
    Ready,
}

/// Outcome of a [`FullIndex::setup`] call.
#[derive(Debug, Default)]
pub struct SetupReport {
    /// Records inserted by this pass.
    pub indexed: usize,
    /// Objects skipped because they failed validation.
    pub invalid: Vec<ValidationError>,
    /// The index was already populated; nothing was listed.
    pub already_initialized: bool,
}

impl SetupReport {
    fn already_initialized() -> Self {
        Self {
            already_initialized: true,
            ..Self::default()
        }
    }
}

struct Entries<R> {
    by_name: BTreeMap<ObjectName, Arc<R>>,
    by_mac: HashMap<Mac, ObjectName>,
    by_uuid: HashMap<Uuid, ObjectName>,
}

impl<R: IndexRecord> Entries<R> {
    fn new() -> Self {
        Self {
            by_name: BTreeMap::new(),
            by_mac: HashMap::new(),
            by_uuid: HashMap::new(),
        }
    }

    fn insert(&mut self, record: Arc<R>) {
        let name = record.name().clone();

        if let Some(old) = self.by_name.remove(&name) {
            self.cleanup(&old);
        }

        for mac in record.macs() {
            if let Some(previous) = self.by_mac.insert(mac, name.clone()) {
                if previous != name {
                    warn!(
                        kind = %R::KIND,
                        mac = %mac,
                        previous = %previous,
                        object = %name,
                        "MAC moved to another record"
                    );
                }
            }
        }

        if let Some(uuid) = record.uuid() {
            if let Some(previous) = self.by_uuid.insert(uuid, name.clone()) {
                if previous != name {
                    warn!(
                        kind = %R::KIND,
                        uuid = %uuid,
                        previous = %previous,
                        object = %name,
                        "UUID moved to another record"
                    );
                }
            }
        }

        self.by_name.insert(name, record);
    }

    fn remove(&mut self, name: &ObjectName) -> Option<Arc<R>> {
        let old = self.by_name.remove(name)?;
        self.cleanup(&old);
        Some(old)
    }

    /// Release the secondary keys of `record` that still point at it.
    ///
    /// `record` must already be gone from `by_name`. A released key goes to
    /// the first remaining record that lists it, so every indexed record
    /// stays reachable through its keys.
    fn cleanup(&mut self, record: &R) {
        let name = record.name();
        for mac in record.macs() {
            if self.by_mac.get(&mac) != Some(name) {
                continue;
            }
            match self.claimant(|other| other.macs().contains(&mac)) {
                Some(other) => {
                    debug!(kind = %R::KIND, mac = %mac, object = %other, "MAC returned to record");
                    self.by_mac.insert(mac, other);
                }
                None => {
                    self.by_mac.remove(&mac);
                }
            }
        }
        if let Some(uuid) = record.uuid() {
            if self.by_uuid.get(&uuid) == Some(name) {
                match self.claimant(|other| other.uuid() == Some(uuid)) {
                    Some(other) => {
                        debug!(kind = %R::KIND, uuid = %uuid, object = %other, "UUID returned to record");
                        self.by_uuid.insert(uuid, other);
                    }
                    None => {
                        self.by_uuid.remove(&uuid);
                    }
                }
            }
        }
    }

    fn claimant(&self, lists_key: impl Fn(&R) -> bool) -> Option<ObjectName> {
        self.by_name
            .values()
            .find(|other| lists_key(other))
            .map(|other| other.name().clone())
    }

    fn by_mac(&self, mac: &Mac) -> Option<Arc<R>> {
        match R::MAC_LOOKUP {
            MacLookup::Exact => self
                .by_mac
                .get(mac)
                .and_then(|name| self.by_name.get(name))
                .cloned(),
            MacLookup::Prefix => self
                .by_name
                .values()
                .find(|record| record.prefixes().iter().any(|p| p.contains(mac)))
                .cloned(),
        }
    }

    fn by_uuid(&self, uuid: &Uuid) -> Option<Arc<R>> {
        self.by_uuid
            .get(uuid)
            .and_then(|name| self.by_name.get(name))
            .cloned()
    }
}

/// Concurrent multi-key index for one resource kind.
pub struct FullIndex<R> {
    entries: RwLock<Entries<R>>,
    state: watch::Sender<IndexState>,
    setup_lock: Mutex<()>,
}

impl<R: IndexRecord> Default for FullIndex<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: IndexRecord> FullIndex<R> {
    pub fn new() -> Self {
        let (state, _) = watch::channel(IndexState::Uninitialized);
        Self {
            entries: RwLock::new(Entries::new()),
            state,
            setup_lock: Mutex::new(()),
        }
    }

    pub fn state(&self) -> IndexState {
        *self.state.borrow()
    }

    pub fn is_initialized(&self) -> bool {
        self.state() == IndexState::Ready
    }

    /// Wait until the first setup pass has completed.
    pub async fn wait_ready(&self) {
        if self.is_initialized() {
            return;
        }
        let mut rx = self.state.subscribe();
        // The sender lives in `self`, so this only ends once Ready is published.
        let _ = rx.wait_for(|state| *state == IndexState::Ready).await;
    }

    /// Populate the index from `store` once.
    ///
    /// Without a store the call waits for another caller's setup to finish.
    /// Invalid objects are skipped and returned in the report. A failing
    /// `list` leaves the index uninitialized so setup can be retried.
    pub async fn setup<S>(&self, store: Option<&S>) -> Result<SetupReport, StoreError>
    where
        S: ObjectStore,
        S::Object: IntoRecord<R>,
    {
        if self.is_initialized() {
            info!(kind = %R::KIND, "index already initialized");
            return Ok(SetupReport::already_initialized());
        }

        let Some(store) = store else {
            info!(kind = %R::KIND, "waiting for index setup");
            self.wait_ready().await;
            return Ok(SetupReport::already_initialized());
        };

        let _guard = self.setup_lock.lock().await;
        if self.is_initialized() {
            return Ok(SetupReport::already_initialized());
        }

        self.state.send_replace(IndexState::Initializing);
        info!(kind = %R::KIND, "setting up index");

        let objects = match store.list().await {
            Ok(objects) => objects,
            Err(e) => {
                self.state.send_replace(IndexState::Uninitialized);
                warn!(kind = %R::KIND, error = %e, "listing backing store failed");
                return Err(e);
            }
        };

        let mut report = SetupReport::default();
        let mut records = Vec::with_capacity(objects.len());
        for object in &objects {
            match IntoRecord::<R>::to_record(object) {
                Ok(record) => records.push(Arc::new(record)),
                Err(e) => {
                    warn!(
                        kind = %R::KIND,
                        object = %e.object,
                        reason = %e.reason,
                        "skipping invalid object"
                    );
                    report.invalid.push(e);
                }
            }
        }

        {
            let mut entries = self.entries.write().await;
            for record in records {
                debug!(kind = %R::KIND, object = %record.name(), "found record");
                entries.insert(record);
                report.indexed += 1;
            }
        }

        self.state.send_replace(IndexState::Ready);
        info!(
            kind = %R::KIND,
            indexed = report.indexed,
            invalid = report.invalid.len(),
            "index setup done"
        );

        Ok(report)
    }

    /// Insert or replace a record.
    ///
    /// The keys of a previous record with the same name are removed first,
    /// so MACs dropped between reconciliations stop resolving.
    pub async fn set(&self, record: R) -> Arc<R> {
        let record = Arc::new(record);
        trace!(kind = %R::KIND, object = %record.name(), "set record");
        self.entries.write().await.insert(record.clone());
        record
    }

    /// Remove a record and all of its keys.
    pub async fn delete(&self, name: &ObjectName) -> Option<Arc<R>> {
        let removed = self.entries.write().await.remove(name);
        if removed.is_some() {
            trace!(kind = %R::KIND, object = %name, "deleted record");
        }
        removed
    }

    pub async fn get(&self, name: &ObjectName) -> Option<Arc<R>> {
        self.wait_ready().await;
        self.entries.read().await.by_name.get(name).cloned()
    }

    /// Exact MAC lookup, or classification for prefix-keyed records.
    pub async fn get_by_mac(&self, mac: &Mac) -> Option<Arc<R>> {
        self.wait_ready().await;
        self.entries.read().await.by_mac(mac)
    }

    pub async fn get_by_uuid(&self, uuid: &Uuid) -> Option<Arc<R>> {
        self.wait_ready().await;
        self.entries.read().await.by_uuid(uuid)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.by_name.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.by_name.is_empty()
    }

    pub async fn names(&self) -> Vec<ObjectName> {
        self.entries.read().await.by_name.keys().cloned().collect()
    }
}

impl<R: IndexRecord> Resolver for FullIndex<R> {
    type Record = R;

    async fn resolve_by_mac(&self, mac: &str) -> Result<Option<Arc<R>>, ResolveError> {
        match Mac::parse(mac) {
            Ok(mac) => Ok(self.get_by_mac(&mac).await),
            Err(e) => {
                debug!(kind = %R::KIND, error = %e, "lookup with unparsable MAC");
                Ok(None)
            }
        }
    }

    async fn resolve_by_uuid(&self, uuid: &str) -> Result<Option<Arc<R>>, ResolveError> {
        match Uuid::parse_str(uuid) {
            Ok(uuid) => Ok(self.get_by_uuid(&uuid).await),
            Err(e) => {
                debug!(kind = %R::KIND, error = %e, "lookup with unparsable UUID");
                Ok(None)
            }
        }
    }

    async fn resolve_by_name(&self, name: &ObjectName) -> Result<Option<Arc<R>>, ResolveError> {
        Ok(self.get(name).await)
    }

    fn is_initialized(&self) -> bool {
        FullIndex::is_initialized(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mac::MacPrefix;
    use crate::record::Nic;
    use crate::store::MemoryStore;
    use std::time::Duration;

    const MAC_A1: &str = "00:de:11:64:00:a1";
    const MAC_A2: &str = "00:de:11:64:00:a2";
    const MAC_A3: &str = "00:de:11:64:00:a3";

    fn name(n: &str) -> ObjectName {
        ObjectName::new("lab", n)
    }

    fn machine(n: &str, macs: &[&str]) -> Machine {
        macs.iter().fold(Machine::new(name(n)), |m, mac| {
            m.with_nic(Nic::new(mac.parse().unwrap()))
        })
    }

    fn ready_index() -> MachineIndex {
        let index = MachineIndex::new();
        index.state.send_replace(IndexState::Ready);
        index
    }

    /// Raw object with unvalidated MAC text.
    #[derive(Clone)]
    struct RawMachine {
        name: &'static str,
        macs: Vec<&'static str>,
    }

    impl IntoRecord<Machine> for RawMachine {
        fn object_name(&self) -> ObjectName {
            name(self.name)
        }

        fn to_record(&self) -> Result<Machine, ValidationError> {
            let mut machine = Machine::new(self.object_name());
            for mac in &self.macs {
                let mac = Mac::parse(mac)
                    .map_err(|e| ValidationError::new(self.object_name(), e.to_string()))?;
                machine = machine.with_nic(Nic::new(mac));
            }
            Ok(machine)
        }
    }

    struct FailingStore;

    impl ObjectStore for FailingStore {
        type Object = Machine;

        async fn list(&self) -> Result<Vec<Machine>, StoreError> {
            Err(StoreError::backend("connection refused"))
        }

        async fn get(&self, _name: &ObjectName) -> Result<Option<Machine>, StoreError> {
            Err(StoreError::backend("connection refused"))
        }
    }

    #[tokio::test]
    async fn test_setup_resolves_end_to_end() {
        let store: MemoryStore<Machine> = [machine("m1", &[MAC_A1]), machine("m2", &[MAC_A2, MAC_A3])]
            .into_iter()
            .collect();
        let index = MachineIndex::new();

        let report = index.setup(Some(&store)).await.unwrap();
        assert_eq!(report.indexed, 2);
        assert!(report.invalid.is_empty());

        let found = index.resolve_by_mac(MAC_A3).await.unwrap().unwrap();
        assert_eq!(found.name, name("m2"));
        assert!(index.resolve_by_mac("00:00:00:00:00:00").await.unwrap().is_none());
        assert!(index.resolve_by_mac("zz").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_lookup_accepts_any_notation() {
        let index = ready_index();
        index.set(machine("m1", &[MAC_A1])).await;

        let found = index.resolve_by_mac("00-DE-11-64-00-A1").await.unwrap();
        assert_eq!(found.unwrap().name, name("m1"));
        let found = index.resolve_by_mac("00de.1164.00a1").await.unwrap();
        assert_eq!(found.unwrap().name, name("m1"));
    }

    #[tokio::test]
    async fn test_initialized_flag_follows_setup() {
        let store: MemoryStore<Machine> = MemoryStore::new();
        let index = MachineIndex::new();
        assert_eq!(index.state(), IndexState::Uninitialized);
        assert!(!index.is_initialized());

        index.setup(Some(&store)).await.unwrap();
        assert_eq!(index.state(), IndexState::Ready);
        assert!(index.is_initialized());
    }

    #[tokio::test]
    async fn test_setup_twice_is_noop() {
        let store: MemoryStore<Machine> = [machine("m1", &[MAC_A1])].into_iter().collect();
        let index = MachineIndex::new();
        index.setup(Some(&store)).await.unwrap();

        store.insert(name("m2"), machine("m2", &[MAC_A2]));
        let report = index.setup(Some(&store)).await.unwrap();
        assert!(report.already_initialized);
        assert_eq!(report.indexed, 0);
        assert_eq!(index.len().await, 1);
    }

    #[tokio::test]
    async fn test_setup_skips_invalid_objects() {
        let store = MemoryStore::new();
        store.insert(
            name("good"),
            RawMachine {
                name: "good",
                macs: vec![MAC_A1],
            },
        );
        store.insert(
            name("bad"),
            RawMachine {
                name: "bad",
                macs: vec![MAC_A2, "not-a-mac"],
            },
        );

        let index = MachineIndex::new();
        let report = index.setup(Some(&store)).await.unwrap();

        assert_eq!(report.indexed, 1);
        assert_eq!(report.invalid.len(), 1);
        assert_eq!(report.invalid[0].object, name("bad"));
        assert!(index.is_initialized());
        assert!(index.resolve_by_mac(MAC_A2).await.unwrap().is_none());
        assert!(index.resolve_by_mac(MAC_A1).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_failed_list_leaves_index_uninitialized() {
        let index = MachineIndex::new();
        assert!(index.setup(Some(&FailingStore)).await.is_err());
        assert_eq!(index.state(), IndexState::Uninitialized);

        let store: MemoryStore<Machine> = MemoryStore::new();
        index.setup(Some(&store)).await.unwrap();
        assert!(index.is_initialized());
    }

    #[tokio::test]
    async fn test_readers_wait_for_setup() {
        let index = Arc::new(MachineIndex::new());

        let readers: Vec<_> = [MAC_A1, MAC_A3]
            .into_iter()
            .map(|mac| {
                let index = index.clone();
                tokio::spawn(async move { index.resolve_by_mac(mac).await.unwrap() })
            })
            .collect();

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(readers.iter().all(|r| !r.is_finished()));

        let store: MemoryStore<Machine> = [machine("m1", &[MAC_A1]), machine("m2", &[MAC_A2, MAC_A3])]
            .into_iter()
            .collect();
        index.setup(Some(&store)).await.unwrap();

        let found: Vec<_> = join_readers(readers).await;
        assert_eq!(found[0].as_ref().unwrap().name, name("m1"));
        assert_eq!(found[1].as_ref().unwrap().name, name("m2"));
    }

    async fn join_readers(
        handles: Vec<tokio::task::JoinHandle<Option<Arc<Machine>>>>,
    ) -> Vec<Option<Arc<Machine>>> {
        let mut out = Vec::with_capacity(handles.len());
        for handle in handles {
            out.push(handle.await.unwrap());
        }
        out
    }

    #[tokio::test]
    async fn test_setup_without_store_waits_for_other_setup() {
        let index = Arc::new(MachineIndex::new());

        let waiter = {
            let index = index.clone();
            tokio::spawn(async move { index.setup::<MemoryStore<Machine>>(None).await.unwrap() })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        let store: MemoryStore<Machine> = [machine("m1", &[MAC_A1])].into_iter().collect();
        index.setup(Some(&store)).await.unwrap();

        let report = waiter.await.unwrap();
        assert!(report.already_initialized);
        assert!(index.resolve_by_mac(MAC_A1).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_set_replaces_mac_set() {
        let index = ready_index();
        index.set(machine("m1", &[MAC_A1, MAC_A2])).await;
        index.set(machine("m1", &[MAC_A3])).await;

        assert!(index.resolve_by_mac(MAC_A1).await.unwrap().is_none());
        assert!(index.resolve_by_mac(MAC_A2).await.unwrap().is_none());
        let found = index.resolve_by_mac(MAC_A3).await.unwrap().unwrap();
        assert_eq!(found.macs(), vec![Mac::parse(MAC_A3).unwrap()]);
        assert_eq!(index.len().await, 1);
    }

    #[tokio::test]
    async fn test_set_replaces_uuid() {
        let index = ready_index();
        let old = Uuid::new_v4();
        let new = Uuid::new_v4();
        index.set(machine("m1", &[]).with_uuid(old)).await;
        index.set(machine("m1", &[]).with_uuid(new)).await;

        assert!(index.resolve_by_uuid(&old.to_string()).await.unwrap().is_none());
        assert!(index.resolve_by_uuid(&new.to_string()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_uuid_lookup_is_case_insensitive() {
        let index = ready_index();
        let uuid = Uuid::new_v4();
        index.set(machine("m1", &[]).with_uuid(uuid)).await;

        let upper = uuid.to_string().to_uppercase();
        let found = index.resolve_by_uuid(&upper).await.unwrap();
        assert_eq!(found.unwrap().name, name("m1"));
        assert!(index.resolve_by_uuid("not-a-uuid").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_removes_all_keys() {
        let index = ready_index();
        let uuid = Uuid::new_v4();
        index.set(machine("m1", &[MAC_A1, MAC_A2]).with_uuid(uuid)).await;

        let removed = index.delete(&name("m1")).await;
        assert!(removed.is_some());

        assert!(index.resolve_by_name(&name("m1")).await.unwrap().is_none());
        assert!(index.resolve_by_mac(MAC_A1).await.unwrap().is_none());
        assert!(index.resolve_by_mac(MAC_A2).await.unwrap().is_none());
        assert!(index.resolve_by_uuid(&uuid.to_string()).await.unwrap().is_none());
        assert!(index.is_empty().await);

        assert!(index.delete(&name("m1")).await.is_none());
    }

    #[tokio::test]
    async fn test_cleanup_keeps_keys_claimed_by_others() {
        let index = ready_index();
        index.set(machine("m1", &[MAC_A1])).await;
        index.set(machine("m2", &[MAC_A1])).await;

        let found = index.resolve_by_mac(MAC_A1).await.unwrap().unwrap();
        assert_eq!(found.name, name("m2"));

        index.set(machine("m1", &[MAC_A2])).await;
        let found = index.resolve_by_mac(MAC_A1).await.unwrap().unwrap();
        assert_eq!(found.name, name("m2"));

        index.delete(&name("m1")).await;
        assert!(index.resolve_by_mac(MAC_A1).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_returns_shared_keys_to_remaining_record() {
        let index = ready_index();
        let uuid = Uuid::new_v4();
        index.set(machine("m1", &[MAC_A1]).with_uuid(uuid)).await;
        index.set(machine("m2", &[MAC_A1]).with_uuid(uuid)).await;

        let found = index.resolve_by_mac(MAC_A1).await.unwrap().unwrap();
        assert_eq!(found.name, name("m2"));

        index.delete(&name("m2")).await;

        let found = index.resolve_by_mac(MAC_A1).await.unwrap().unwrap();
        assert_eq!(found.name, name("m1"));
        let found = index.get_by_uuid(&uuid).await.unwrap();
        assert_eq!(found.name, name("m1"));

        index.delete(&name("m1")).await;
        assert!(index.resolve_by_mac(MAC_A1).await.unwrap().is_none());
        assert!(index.get_by_uuid(&uuid).await.is_none());
    }

    #[tokio::test]
    async fn test_update_returns_dropped_key_to_other_claimant() {
        let index = ready_index();
        index.set(machine("m1", &[MAC_A1])).await;
        index.set(machine("m2", &[MAC_A1])).await;

        // m2 stops listing A1; m1 still does
        index.set(machine("m2", &[MAC_A2])).await;

        let found = index.resolve_by_mac(MAC_A1).await.unwrap().unwrap();
        assert_eq!(found.name, name("m1"));
        let found = index.resolve_by_mac(MAC_A2).await.unwrap().unwrap();
        assert_eq!(found.name, name("m2"));
    }

    fn prefixes(ps: &[&str]) -> Vec<MacPrefix> {
        ps.iter().map(|p| MacPrefix::parse(p).unwrap()).collect()
    }

    #[tokio::test]
    async fn test_machine_type_classification() {
        let index = MachineTypeIndex::new();
        index.state.send_replace(IndexState::Ready);

        index
            .set(MachineType::new(name("vendor-b"), prefixes(&["20/4"])).unwrap())
            .await;
        index
            .set(MachineType::new(name("vendor-a"), prefixes(&["31/8", "21:80/16"])).unwrap())
            .await;

        let found = index.resolve_by_mac("21:80:23:24:25:16").await.unwrap().unwrap();
        assert_eq!(found.name, name("vendor-a"));

        let found = index.resolve_by_mac("22:80:23:24:25:16").await.unwrap().unwrap();
        assert_eq!(found.name, name("vendor-b"));

        assert!(index.resolve_by_mac("41:80:23:24:25:16").await.unwrap().is_none());
        assert!(index.resolve_by_uuid(&Uuid::new_v4().to_string()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_names_snapshot_is_ordered() {
        let index = ready_index();
        index.set(machine("b", &[])).await;
        index.set(machine("a", &[])).await;
        assert_eq!(index.names().await, vec![name("a"), name("b")]);
    }
}
