//! Storage abstractions for the event log and snapshot collections.
//!
//! Both traits take the aggregate type name on every call; a backend keeps one
//! event collection and one snapshot collection per type.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DomainError;

/// Stored representation of a domain event.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEvent {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// Aggregate this event belongs to.
    pub aggregate_id: String,
    /// Aggregate version after this event was applied.
    pub version: i64,
    /// Event type name for deserialization routing.
    pub event_type: String,
    /// Serialized event payload.
    pub payload: serde_json::Value,
    /// Denormalized index fields, as a JSON object.
    pub indices: serde_json::Value,
    /// Correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Causation ID linking to the causing event/command.
    pub causation_id: Uuid,
    /// Timestamp of event creation.
    pub occurred_at: DateTime<Utc>,
}

/// Stored full-state checkpoint of an aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredSnapshot {
    /// Aggregate this snapshot belongs to.
    pub aggregate_id: String,
    /// Version of the last event reflected in `state`.
    pub snapshot_version: i64,
    /// Serialized aggregate state.
    pub state: serde_json::Value,
    /// Denormalized index fields, as a JSON object.
    pub indices: serde_json::Value,
    /// When the snapshot was taken.
    pub taken_at: DateTime<Utc>,
}

/// The newest snapshot version recorded for one aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SnapshotHead {
    /// Aggregate identifier.
    pub aggregate_id: String,
    /// Maximum stored snapshot version.
    pub snapshot_version: i64,
}

/// One disjunct of a batched event query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventWindow {
    /// Aggregate identifier.
    pub aggregate_id: String,
    /// Only events with a version strictly greater than this; `None` selects
    /// the whole history.
    pub after_version: Option<i64>,
}

impl EventWindow {
    /// Returns `true` if `event` falls inside this window.
    #[must_use]
    pub fn contains(&self, event: &StoredEvent) -> bool {
        event.aggregate_id == self.aggregate_id
            && self.after_version.is_none_or(|after| event.version > after)
    }
}

/// Append-only event log keyed by aggregate id and version.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Appends events, possibly for several aggregates, in one storage
    /// operation. Either every event is stored or none is.
    async fn append_events(
        &self,
        aggregate_type: &str,
        events: &[StoredEvent],
    ) -> Result<(), DomainError>;

    /// Loads events for one aggregate, ascending by version, optionally only
    /// those after `after_version`.
    async fn load_events(
        &self,
        aggregate_type: &str,
        aggregate_id: &str,
        after_version: Option<i64>,
    ) -> Result<Vec<StoredEvent>, DomainError>;

    /// Loads every event matching any of `windows` in a single query. Order of
    /// the result is unspecified.
    async fn load_event_windows(
        &self,
        aggregate_type: &str,
        windows: &[EventWindow],
    ) -> Result<Vec<StoredEvent>, DomainError>;

    /// Distinct aggregate ids present in the log, sorted ascending.
    async fn aggregate_ids(&self, aggregate_type: &str) -> Result<Vec<String>, DomainError>;
}

/// Snapshot collection keyed by aggregate id and snapshot version.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Writes snapshots in one storage operation.
    async fn save_snapshots(
        &self,
        aggregate_type: &str,
        snapshots: &[StoredSnapshot],
    ) -> Result<(), DomainError>;

    /// Loads the snapshot with the greatest version for one aggregate.
    async fn latest_snapshot(
        &self,
        aggregate_type: &str,
        aggregate_id: &str,
    ) -> Result<Option<StoredSnapshot>, DomainError>;

    /// Groups snapshots by aggregate id and returns the maximum version per id
    /// for the ids that have any snapshot.
    async fn latest_snapshot_heads(
        &self,
        aggregate_type: &str,
        aggregate_ids: &[String],
    ) -> Result<Vec<SnapshotHead>, DomainError>;

    /// Loads the snapshot bodies identified by `heads`.
    async fn load_snapshots(
        &self,
        aggregate_type: &str,
        heads: &[SnapshotHead],
    ) -> Result<Vec<StoredSnapshot>, DomainError>;
}
