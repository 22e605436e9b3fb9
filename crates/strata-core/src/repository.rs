//! Repository for snapshotted event-sourced aggregates.
//!
//! `commit` appends pending events, conditionally checkpoints the aggregate,
//! and only then releases queued notifications. `get` and `get_all` rebuild
//! aggregates from the newest snapshot plus the events recorded after it.
//!
//! Commits targeting the same aggregate id from independent callers are not
//! serialized here. Two such commits can assign the same version; the storage
//! backend rejects the second append with `DomainError::ConcurrencyConflict`.
//! Callers that need single-writer semantics per id must queue externally.

use std::marker::PhantomData;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::aggregate::AggregateRoot;
use crate::clock::{Clock, SystemClock};
use crate::error::DomainError;
use crate::event::DomainEvent;
use crate::observer::NotificationObserver;
use crate::options::{CommitOptions, RepositoryOptions};
use crate::planner::{self, ResolvedHistory};
use crate::rehydrate::rehydrate;
use crate::store::{EventStore, SnapshotStore, StoredEvent, StoredSnapshot};

/// Commits and loads aggregates of type `A`.
pub struct Repository<A: AggregateRoot> {
    events: Arc<dyn EventStore>,
    snapshots: Arc<dyn SnapshotStore>,
    observers: Vec<Arc<dyn NotificationObserver<A::Notification>>>,
    clock: Arc<dyn Clock>,
    options: RepositoryOptions,
    marker: PhantomData<fn() -> A>,
}

impl<A: AggregateRoot> Clone for Repository<A> {
    fn clone(&self) -> Self {
        Self {
            events: Arc::clone(&self.events),
            snapshots: Arc::clone(&self.snapshots),
            observers: self.observers.clone(),
            clock: Arc::clone(&self.clock),
            options: self.options,
            marker: PhantomData,
        }
    }
}

impl<A: AggregateRoot> std::fmt::Debug for Repository<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("aggregate_type", &A::aggregate_type())
            .field("observers", &self.observers.len())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<A: AggregateRoot> Repository<A> {
    /// Creates a repository over the given stores with default options.
    #[must_use]
    pub fn new(events: Arc<dyn EventStore>, snapshots: Arc<dyn SnapshotStore>) -> Self {
        Self {
            events,
            snapshots,
            observers: Vec::new(),
            clock: Arc::new(SystemClock),
            options: RepositoryOptions::default(),
            marker: PhantomData,
        }
    }

    /// Replaces the repository options.
    #[must_use]
    pub fn with_options(mut self, options: RepositoryOptions) -> Self {
        self.options = options;
        self
    }

    /// Registers an observer for notifications released by commits.
    #[must_use]
    pub fn with_observer(
        mut self,
        observer: Arc<dyn NotificationObserver<A::Notification>>,
    ) -> Self {
        self.observers.push(observer);
        self
    }

    /// Replaces the clock used to timestamp snapshots.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Returns the repository options.
    #[must_use]
    pub fn options(&self) -> RepositoryOptions {
        self.options
    }

    /// Commits one aggregate: appends its pending events, snapshots it when
    /// due, then delivers its queued notifications.
    ///
    /// If the append fails nothing is cleared, so the same call can be retried.
    /// Once the append is durable the pending events are cleared; a snapshot
    /// failure after that point leaves notifications queued.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the aggregate has no id, or any
    /// error raised by the stores.
    #[instrument(skip_all, fields(aggregate_type = A::aggregate_type(), aggregate_id = tracing::field::Empty))]
    pub async fn commit(&self, aggregate: &mut A, options: CommitOptions) -> Result<(), DomainError> {
        let aggregate_id = require_id(aggregate)?;
        tracing::Span::current().record("aggregate_id", aggregate_id.as_str());

        let stored = stamp_events(&aggregate_id, aggregate)?;
        if !stored.is_empty() {
            self.events
                .append_events(A::aggregate_type(), &stored)
                .await
                .inspect_err(|e| warn!(error = %e, "event append failed"))?;
            aggregate.clear_uncommitted_events();
            info!(count = stored.len(), version = aggregate.version(), "committed events");
        }

        if let Some(snapshot) = self.snapshot_if_due(aggregate, options)? {
            self.snapshots
                .save_snapshots(A::aggregate_type(), std::slice::from_ref(&snapshot))
                .await
                .inspect_err(|e| warn!(error = %e, "snapshot write failed"))?;
            aggregate.set_snapshot_version(snapshot.snapshot_version);
            info!(snapshot_version = snapshot.snapshot_version, "committed snapshot");
        }

        self.deliver(&aggregate_id, aggregate).await;
        Ok(())
    }

    /// Commits a batch: one combined event append, one combined snapshot
    /// write, then notifications for every aggregate in input order.
    ///
    /// If the event append fails no aggregate is touched and no notification
    /// fires. The batch is not a distributed transaction; on failure retry the
    /// whole batch.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if any aggregate has no id, or any
    /// error raised by the stores.
    #[instrument(skip_all, fields(aggregate_type = A::aggregate_type(), count = aggregates.len()))]
    pub async fn commit_all(
        &self,
        aggregates: &mut [A],
        options: CommitOptions,
    ) -> Result<(), DomainError> {
        let ids = aggregates
            .iter()
            .map(require_id)
            .collect::<Result<Vec<_>, _>>()?;

        let mut stored = Vec::new();
        for (aggregate_id, aggregate) in ids.iter().zip(aggregates.iter()) {
            stored.extend(stamp_events(aggregate_id, aggregate)?);
        }

        if !stored.is_empty() {
            self.events
                .append_events(A::aggregate_type(), &stored)
                .await
                .inspect_err(|e| warn!(error = %e, "batch event append failed"))?;
            for aggregate in aggregates.iter_mut() {
                aggregate.clear_uncommitted_events();
            }
            info!(events = stored.len(), ?ids, "committed batch events");
        }

        let mut snapshots = Vec::new();
        for (index, aggregate) in aggregates.iter().enumerate() {
            if let Some(snapshot) = self.snapshot_if_due(aggregate, options)? {
                snapshots.push((index, snapshot));
            }
        }

        if !snapshots.is_empty() {
            let bodies: Vec<StoredSnapshot> = snapshots.iter().map(|(_, s)| s.clone()).collect();
            self.snapshots
                .save_snapshots(A::aggregate_type(), &bodies)
                .await
                .inspect_err(|e| warn!(error = %e, "batch snapshot write failed"))?;
            for (index, snapshot) in &snapshots {
                aggregates[*index].set_snapshot_version(snapshot.snapshot_version);
            }
            info!(snapshots = bodies.len(), "committed batch snapshots");
        }

        for (aggregate_id, aggregate) in ids.iter().zip(aggregates.iter_mut()) {
            self.deliver(aggregate_id, aggregate).await;
        }
        Ok(())
    }

    /// Loads one aggregate. Returns `Ok(None)` if it has neither a snapshot
    /// nor any event.
    ///
    /// # Errors
    ///
    /// Returns any error raised by the stores, or a decoding / contiguity
    /// error from replay.
    #[instrument(skip(self), fields(aggregate_type = A::aggregate_type()))]
    pub async fn get(&self, aggregate_id: &str) -> Result<Option<A>, DomainError> {
        let snapshot = self
            .snapshots
            .latest_snapshot(A::aggregate_type(), aggregate_id)
            .await?;
        let after_version = snapshot.as_ref().map(|s| s.snapshot_version);
        let events = self
            .events
            .load_events(A::aggregate_type(), aggregate_id, after_version)
            .await?;

        debug!(?after_version, events = events.len(), "loaded history");

        rehydrate(ResolvedHistory {
            aggregate_id: aggregate_id.to_owned(),
            snapshot,
            events,
        })
    }

    /// Loads many aggregates through the batch planner.
    ///
    /// `None` loads every id present in the event log. Ids without any stored
    /// history are omitted; the result follows the order of the requested ids
    /// that were found, with duplicates collapsed.
    ///
    /// # Errors
    ///
    /// Returns any error raised by the stores, or a decoding / contiguity
    /// error from replay.
    #[instrument(skip_all, fields(aggregate_type = A::aggregate_type()))]
    pub async fn get_all(&self, aggregate_ids: Option<&[String]>) -> Result<Vec<A>, DomainError> {
        let ids = match aggregate_ids {
            Some(ids) => ids.to_vec(),
            None => self.events.aggregate_ids(A::aggregate_type()).await?,
        };

        let histories = planner::resolve(
            self.events.as_ref(),
            self.snapshots.as_ref(),
            A::aggregate_type(),
            &ids,
        )
        .await?;

        let mut aggregates = Vec::with_capacity(histories.len());
        for history in histories {
            if let Some(aggregate) = rehydrate(history)? {
                aggregates.push(aggregate);
            }
        }

        debug!(requested = ids.len(), found = aggregates.len(), "loaded batch");
        Ok(aggregates)
    }

    fn snapshot_if_due(
        &self,
        aggregate: &A,
        options: CommitOptions,
    ) -> Result<Option<StoredSnapshot>, DomainError> {
        if !self
            .options
            .should_snapshot(aggregate.version(), aggregate.snapshot_version(), options)
        {
            return Ok(None);
        }

        let aggregate_id = require_id(aggregate)?;
        let state = serde_json::to_value(aggregate.snapshot())?;
        Ok(Some(StoredSnapshot {
            aggregate_id,
            snapshot_version: aggregate.version(),
            state,
            indices: index_values(aggregate),
            taken_at: self.clock.now(),
        }))
    }

    async fn deliver(&self, aggregate_id: &str, aggregate: &mut A) {
        let notifications = aggregate.take_pending_notifications();
        aggregate.clear_uncommitted_events();
        if notifications.is_empty() {
            return;
        }

        for notification in &notifications {
            for observer in &self.observers {
                observer.notify(aggregate_id, notification).await;
            }
        }
        debug!(aggregate_id, count = notifications.len(), "delivered notifications");
    }
}

fn require_id<A: AggregateRoot>(aggregate: &A) -> Result<String, DomainError> {
    match aggregate.aggregate_id() {
        Some(id) if !id.trim().is_empty() => Ok(id.to_owned()),
        _ => Err(DomainError::Validation(format!(
            "cannot commit {} without an aggregate id",
            A::aggregate_type()
        ))),
    }
}

/// Current values of every declared index field, as a JSON object.
fn index_values<A: AggregateRoot>(aggregate: &A) -> serde_json::Value {
    let map = A::index_fields()
        .iter()
        .map(|field| {
            let value = aggregate.index_value(field).unwrap_or(serde_json::Value::Null);
            ((*field).to_owned(), value)
        })
        .collect::<serde_json::Map<_, _>>();
    serde_json::Value::Object(map)
}

/// Converts the pending events into stored records tagged with the
/// aggregate's id and index fields. The id comes from the aggregate, since
/// events recorded before it was assigned carry none.
fn stamp_events<A: AggregateRoot>(
    aggregate_id: &str,
    aggregate: &A,
) -> Result<Vec<StoredEvent>, DomainError> {
    let indices = index_values(aggregate);
    aggregate
        .uncommitted_events()
        .iter()
        .map(|event| {
            let meta = event.metadata();
            Ok(StoredEvent {
                event_id: meta.event_id,
                aggregate_id: aggregate_id.to_owned(),
                version: meta.version,
                event_type: event.event_type().to_owned(),
                payload: event.to_payload()?,
                indices: indices.clone(),
                correlation_id: meta.correlation_id,
                causation_id: meta.causation_id,
                occurred_at: meta.occurred_at,
            })
        })
        .collect()
}
