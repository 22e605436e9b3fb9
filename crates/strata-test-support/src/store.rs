//! Test stores — in-memory and failing `EventStore` / `SnapshotStore`
//! implementations.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use strata_core::error::DomainError;
use strata_core::store::{
    EventStore, EventWindow, SnapshotHead, SnapshotStore, StoredEvent, StoredSnapshot,
};

fn connection_refused() -> DomainError {
    DomainError::Infrastructure("connection refused".into())
}

/// An event log held in memory, one collection per aggregate type.
///
/// Enforces uniqueness of `(aggregate_id, version)` like the Postgres store and
/// applies each append all-or-nothing. Counts storage round trips so tests can
/// assert on batching.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    events: Mutex<HashMap<String, Vec<StoredEvent>>>,
    fail_appends: AtomicBool,
    round_trips: AtomicUsize,
}

impl InMemoryEventStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent append fail with an infrastructure error until
    /// switched off again.
    pub fn fail_appends(&self, fail: bool) {
        self.fail_appends.store(fail, Ordering::SeqCst);
    }

    /// Number of storage operations issued so far.
    pub fn round_trips(&self) -> usize {
        self.round_trips.load(Ordering::SeqCst)
    }

    /// Every stored event of `aggregate_type`, in append order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn stored(&self, aggregate_type: &str) -> Vec<StoredEvent> {
        self.events
            .lock()
            .unwrap()
            .get(aggregate_type)
            .cloned()
            .unwrap_or_default()
    }

    /// Inserts records directly, bypassing uniqueness checks. Used to seed
    /// corrupted histories.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn seed(&self, aggregate_type: &str, events: Vec<StoredEvent>) {
        self.events
            .lock()
            .unwrap()
            .entry(aggregate_type.to_owned())
            .or_default()
            .extend(events);
    }

    fn tick(&self) {
        self.round_trips.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append_events(
        &self,
        aggregate_type: &str,
        events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        self.tick();
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(connection_refused());
        }

        let mut all = self.events.lock().unwrap();
        let collection = all.entry(aggregate_type.to_owned()).or_default();

        let mut taken: HashSet<(&str, i64)> = collection
            .iter()
            .map(|e| (e.aggregate_id.as_str(), e.version))
            .collect();
        for event in events {
            if !taken.insert((event.aggregate_id.as_str(), event.version)) {
                return Err(DomainError::ConcurrencyConflict {
                    aggregate_id: event.aggregate_id.clone(),
                    version: event.version,
                });
            }
        }

        collection.extend_from_slice(events);
        Ok(())
    }

    async fn load_events(
        &self,
        aggregate_type: &str,
        aggregate_id: &str,
        after_version: Option<i64>,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        self.tick();
        let window = EventWindow {
            aggregate_id: aggregate_id.to_owned(),
            after_version,
        };
        let mut events: Vec<StoredEvent> = self
            .stored(aggregate_type)
            .into_iter()
            .filter(|e| window.contains(e))
            .collect();
        events.sort_by_key(|e| e.version);
        Ok(events)
    }

    async fn load_event_windows(
        &self,
        aggregate_type: &str,
        windows: &[EventWindow],
    ) -> Result<Vec<StoredEvent>, DomainError> {
        self.tick();
        Ok(self
            .stored(aggregate_type)
            .into_iter()
            .filter(|e| windows.iter().any(|w| w.contains(e)))
            .collect())
    }

    async fn aggregate_ids(&self, aggregate_type: &str) -> Result<Vec<String>, DomainError> {
        self.tick();
        let ids: BTreeSet<String> = self
            .stored(aggregate_type)
            .into_iter()
            .map(|e| e.aggregate_id)
            .collect();
        Ok(ids.into_iter().collect())
    }
}

/// A snapshot collection held in memory, one collection per aggregate type.
#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
    snapshots: Mutex<HashMap<String, Vec<StoredSnapshot>>>,
    fail_saves: AtomicBool,
    round_trips: AtomicUsize,
}

impl InMemorySnapshotStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent save fail with an infrastructure error until
    /// switched off again.
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Number of storage operations issued so far.
    pub fn round_trips(&self) -> usize {
        self.round_trips.load(Ordering::SeqCst)
    }

    /// Every stored snapshot of `aggregate_type`, in write order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn stored(&self, aggregate_type: &str) -> Vec<StoredSnapshot> {
        self.snapshots
            .lock()
            .unwrap()
            .get(aggregate_type)
            .cloned()
            .unwrap_or_default()
    }

    fn tick(&self) {
        self.round_trips.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn save_snapshots(
        &self,
        aggregate_type: &str,
        snapshots: &[StoredSnapshot],
    ) -> Result<(), DomainError> {
        self.tick();
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(connection_refused());
        }
        let mut all = self.snapshots.lock().unwrap();
        let collection = all.entry(aggregate_type.to_owned()).or_default();
        for snapshot in snapshots {
            // Re-saving an existing version overwrites it.
            match collection.iter_mut().find(|s| {
                s.aggregate_id == snapshot.aggregate_id
                    && s.snapshot_version == snapshot.snapshot_version
            }) {
                Some(existing) => *existing = snapshot.clone(),
                None => collection.push(snapshot.clone()),
            }
        }
        Ok(())
    }

    async fn latest_snapshot(
        &self,
        aggregate_type: &str,
        aggregate_id: &str,
    ) -> Result<Option<StoredSnapshot>, DomainError> {
        self.tick();
        Ok(self
            .stored(aggregate_type)
            .into_iter()
            .filter(|s| s.aggregate_id == aggregate_id)
            .max_by_key(|s| s.snapshot_version))
    }

    async fn latest_snapshot_heads(
        &self,
        aggregate_type: &str,
        aggregate_ids: &[String],
    ) -> Result<Vec<SnapshotHead>, DomainError> {
        self.tick();
        let mut heads: HashMap<String, i64> = HashMap::new();
        for snapshot in self.stored(aggregate_type) {
            if !aggregate_ids.contains(&snapshot.aggregate_id) {
                continue;
            }
            let head = heads.entry(snapshot.aggregate_id).or_insert(snapshot.snapshot_version);
            *head = (*head).max(snapshot.snapshot_version);
        }
        Ok(heads
            .into_iter()
            .map(|(aggregate_id, snapshot_version)| SnapshotHead {
                aggregate_id,
                snapshot_version,
            })
            .collect())
    }

    async fn load_snapshots(
        &self,
        aggregate_type: &str,
        heads: &[SnapshotHead],
    ) -> Result<Vec<StoredSnapshot>, DomainError> {
        self.tick();
        Ok(self
            .stored(aggregate_type)
            .into_iter()
            .filter(|s| {
                heads.iter().any(|h| {
                    h.aggregate_id == s.aggregate_id && h.snapshot_version == s.snapshot_version
                })
            })
            .collect())
    }
}

/// An event store that always returns an infrastructure error. Useful for
/// testing error-handling paths.
#[derive(Debug)]
pub struct FailingEventStore;

#[async_trait]
impl EventStore for FailingEventStore {
    async fn append_events(&self, _: &str, _: &[StoredEvent]) -> Result<(), DomainError> {
        Err(connection_refused())
    }

    async fn load_events(
        &self,
        _: &str,
        _: &str,
        _: Option<i64>,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        Err(connection_refused())
    }

    async fn load_event_windows(
        &self,
        _: &str,
        _: &[EventWindow],
    ) -> Result<Vec<StoredEvent>, DomainError> {
        Err(connection_refused())
    }

    async fn aggregate_ids(&self, _: &str) -> Result<Vec<String>, DomainError> {
        Err(connection_refused())
    }
}

/// A snapshot store that always returns an infrastructure error.
#[derive(Debug)]
pub struct FailingSnapshotStore;

#[async_trait]
impl SnapshotStore for FailingSnapshotStore {
    async fn save_snapshots(&self, _: &str, _: &[StoredSnapshot]) -> Result<(), DomainError> {
        Err(connection_refused())
    }

    async fn latest_snapshot(
        &self,
        _: &str,
        _: &str,
    ) -> Result<Option<StoredSnapshot>, DomainError> {
        Err(connection_refused())
    }

    async fn latest_snapshot_heads(
        &self,
        _: &str,
        _: &[String],
    ) -> Result<Vec<SnapshotHead>, DomainError> {
        Err(connection_refused())
    }

    async fn load_snapshots(
        &self,
        _: &str,
        _: &[SnapshotHead],
    ) -> Result<Vec<StoredSnapshot>, DomainError> {
        Err(connection_refused())
    }
}
