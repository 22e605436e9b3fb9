//! Shared fixtures for repository integration tests: a small `Ledger`
//! aggregate and helpers for wiring a repository over in-memory stores.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use strata_core::aggregate::AggregateRoot;
use strata_core::error::DomainError;
use strata_core::event::{DomainEvent, EventMetadata};
use strata_core::repository::Repository;
use strata_core::store::{EventStore, SnapshotStore, StoredEvent};
use strata_test_support::{
    FixedClock, InMemoryEventStore, InMemorySnapshotStore, RecordingObserver,
};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LedgerEventKind {
    Opened { owner: String },
    Deposited { amount: i64 },
}

#[derive(Debug, Clone)]
pub struct LedgerEvent {
    pub metadata: EventMetadata,
    pub kind: LedgerEventKind,
}

impl DomainEvent for LedgerEvent {
    fn event_type(&self) -> &'static str {
        match self.kind {
            LedgerEventKind::Opened { .. } => "ledger.opened",
            LedgerEventKind::Deposited { .. } => "ledger.deposited",
        }
    }

    fn to_payload(&self) -> Result<serde_json::Value, DomainError> {
        Ok(serde_json::to_value(&self.kind)?)
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }

    fn from_stored(stored: &StoredEvent) -> Result<Self, DomainError> {
        Ok(Self {
            metadata: EventMetadata::from_stored(stored),
            kind: serde_json::from_value(stored.payload.clone())?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LedgerNotification {
    Opened(String),
    Deposited(i64),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerState {
    pub owner: String,
    pub balance: i64,
}

#[derive(Debug, Default)]
pub struct Ledger {
    pub id: Option<String>,
    pub version: i64,
    pub snapshot_version: i64,
    pub state: LedgerState,
    uncommitted: Vec<LedgerEvent>,
    notifications: Vec<LedgerNotification>,
}

impl Ledger {
    pub fn opened(id: &str, owner: &str) -> Self {
        let mut ledger = Self::default();
        ledger.id = Some(id.to_owned());
        ledger.record(LedgerEventKind::Opened {
            owner: owner.to_owned(),
        });
        ledger
            .notifications
            .push(LedgerNotification::Opened(owner.to_owned()));
        ledger
    }

    pub fn deposit(&mut self, amount: i64) {
        self.record(LedgerEventKind::Deposited { amount });
        self.notifications.push(LedgerNotification::Deposited(amount));
    }

    fn record(&mut self, kind: LedgerEventKind) {
        self.mutate(&kind);
        self.version += 1;
        self.uncommitted.push(LedgerEvent {
            metadata: EventMetadata {
                event_id: Uuid::new_v4(),
                event_type: String::new(),
                aggregate_id: self.id.clone().unwrap_or_default(),
                version: self.version,
                correlation_id: Uuid::nil(),
                causation_id: Uuid::nil(),
                occurred_at: Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
            },
            kind,
        });
    }

    fn mutate(&mut self, kind: &LedgerEventKind) {
        match kind {
            LedgerEventKind::Opened { owner } => self.state.owner.clone_from(owner),
            LedgerEventKind::Deposited { amount } => self.state.balance += amount,
        }
    }
}

impl AggregateRoot for Ledger {
    type Event = LedgerEvent;
    type Notification = LedgerNotification;
    type State = LedgerState;

    fn aggregate_type() -> &'static str {
        "Ledger"
    }

    fn index_fields() -> &'static [&'static str] {
        &["owner"]
    }

    fn blank(id: &str) -> Self {
        Self {
            id: Some(id.to_owned()),
            ..Self::default()
        }
    }

    fn from_snapshot(id: &str, state: Self::State, snapshot_version: i64) -> Self {
        Self {
            id: Some(id.to_owned()),
            version: snapshot_version,
            snapshot_version,
            state,
            ..Self::default()
        }
    }

    fn aggregate_id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn snapshot_version(&self) -> i64 {
        self.snapshot_version
    }

    fn set_snapshot_version(&mut self, version: i64) {
        self.snapshot_version = version;
    }

    fn snapshot(&self) -> Self::State {
        self.state.clone()
    }

    fn index_value(&self, field: &str) -> Option<serde_json::Value> {
        match field {
            "owner" => Some(serde_json::Value::String(self.state.owner.clone())),
            _ => None,
        }
    }

    fn replay(&mut self, event: &Self::Event) {
        self.mutate(&event.kind);
        self.version += 1;
    }

    fn uncommitted_events(&self) -> &[Self::Event] {
        &self.uncommitted
    }

    fn clear_uncommitted_events(&mut self) {
        self.uncommitted.clear();
    }

    fn pending_notifications(&self) -> &[Self::Notification] {
        &self.notifications
    }

    fn take_pending_notifications(&mut self) -> Vec<Self::Notification> {
        std::mem::take(&mut self.notifications)
    }
}

/// A repository over fresh in-memory stores, with handles to the stores and a
/// recording observer.
pub struct Harness {
    pub events: Arc<InMemoryEventStore>,
    pub snapshots: Arc<InMemorySnapshotStore>,
    pub observer: Arc<RecordingObserver<LedgerNotification>>,
    pub repo: Repository<Ledger>,
}

pub fn harness() -> Harness {
    let events = Arc::new(InMemoryEventStore::new());
    let snapshots = Arc::new(InMemorySnapshotStore::new());
    let observer = Arc::new(RecordingObserver::new());
    let repo = Repository::<Ledger>::new(
        Arc::clone(&events) as Arc<dyn EventStore>,
        Arc::clone(&snapshots) as Arc<dyn SnapshotStore>,
    )
    .with_clock(Arc::new(FixedClock::default()))
    .with_observer(observer.clone());
    Harness {
        events,
        snapshots,
        observer,
        repo,
    }
}

/// A ledger with `deposits` deposits of 1..=deposits after opening.
pub fn ledger_with_deposits(id: &str, deposits: i64) -> Ledger {
    let mut ledger = Ledger::opened(id, "ada");
    for amount in 1..=deposits {
        ledger.deposit(amount);
    }
    ledger
}
