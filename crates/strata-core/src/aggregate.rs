//! Aggregate root abstraction.
//!
//! An aggregate mutates itself: command methods apply the change, bump the
//! version, and queue both the resulting event and any notification for
//! observers. The [`crate::repository::Repository`] only drains those queues
//! and later rebuilds the aggregate through [`AggregateRoot::blank`] or
//! [`AggregateRoot::from_snapshot`] followed by [`AggregateRoot::replay`].

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::event::DomainEvent;

/// Trait for aggregate roots persisted as an event log plus snapshots.
pub trait AggregateRoot: Send + Sync + Sized {
    /// The event type this aggregate produces and consumes.
    type Event: DomainEvent;

    /// Side-effect signal queued during mutation, delivered after commit.
    type Notification: Send + Sync + std::fmt::Debug;

    /// Full serializable state captured by a snapshot.
    type State: Serialize + DeserializeOwned + Send;

    /// Name of the aggregate type. Storage keeps one event collection and one
    /// snapshot collection per type.
    fn aggregate_type() -> &'static str;

    /// Field names denormalized onto every event and snapshot record.
    fn index_fields() -> &'static [&'static str] {
        &[]
    }

    /// A fresh aggregate with no history.
    fn blank(id: &str) -> Self;

    /// An aggregate restored from a snapshot taken at `snapshot_version`.
    /// Both `version` and `snapshot_version` start at that value.
    fn from_snapshot(id: &str, state: Self::State, snapshot_version: i64) -> Self;

    /// Returns the aggregate identifier, or `None` before one was assigned.
    fn aggregate_id(&self) -> Option<&str>;

    /// Returns the current version (number of events applied).
    fn version(&self) -> i64;

    /// Returns the version reflected by the last stored snapshot.
    fn snapshot_version(&self) -> i64;

    /// Records that a snapshot at `version` is durable.
    fn set_snapshot_version(&mut self, version: i64);

    /// Captures the full current state.
    fn snapshot(&self) -> Self::State;

    /// Current value of a declared index field.
    fn index_value(&self, _field: &str) -> Option<serde_json::Value> {
        None
    }

    /// Re-applies one historical event. Must mutate state exactly as the live
    /// mutation did, bump the version, and queue nothing.
    fn replay(&mut self, event: &Self::Event);

    /// Returns uncommitted events produced by command handling.
    fn uncommitted_events(&self) -> &[Self::Event];

    /// Clears uncommitted events after persistence.
    fn clear_uncommitted_events(&mut self);

    /// Returns notifications queued since the last commit.
    fn pending_notifications(&self) -> &[Self::Notification];

    /// Drains the notification queue.
    fn take_pending_notifications(&mut self) -> Vec<Self::Notification>;
}
