//! Batch planner: resolves snapshots and event windows for many aggregates in
//! a bounded number of round trips.
//!
//! 1. One aggregation over the snapshot collection yields the newest snapshot
//!    version per id, and one lookup fetches exactly those bodies.
//! 2. One disjunctive event query asks, per id, for the whole history (no
//!    snapshot) or only the events after the resolved snapshot.
//! 3. The events are partitioned by id, sorted by version, and paired with the
//!    snapshot for that id.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::error::DomainError;
use crate::store::{EventStore, EventWindow, SnapshotStore, StoredEvent, StoredSnapshot};

/// Everything needed to rebuild one aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedHistory {
    /// Aggregate identifier.
    pub aggregate_id: String,
    /// Newest snapshot, if any.
    pub snapshot: Option<StoredSnapshot>,
    /// Events after the snapshot, ascending by version.
    pub events: Vec<StoredEvent>,
}

impl ResolvedHistory {
    /// `true` when there is neither a snapshot nor any event.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshot.is_none() && self.events.is_empty()
    }
}

/// Drops repeated ids, keeping the first occurrence.
#[must_use]
pub fn distinct_ids(ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}

/// Builds one event window per id from the resolved snapshots.
#[must_use]
pub fn event_windows(ids: &[String], snapshots: &HashMap<String, StoredSnapshot>) -> Vec<EventWindow> {
    ids.iter()
        .map(|id| EventWindow {
            aggregate_id: id.clone(),
            after_version: snapshots.get(id).map(|s| s.snapshot_version),
        })
        .collect()
}

/// Partitions a flat event list by id and pairs each id with its snapshot.
/// Output follows the order of `ids`.
#[must_use]
pub fn partition(
    ids: &[String],
    mut snapshots: HashMap<String, StoredSnapshot>,
    events: Vec<StoredEvent>,
) -> Vec<ResolvedHistory> {
    let mut by_id: HashMap<String, Vec<StoredEvent>> = HashMap::new();
    for event in events {
        by_id.entry(event.aggregate_id.clone()).or_default().push(event);
    }

    ids.iter()
        .map(|id| {
            let mut events = by_id.remove(id).unwrap_or_default();
            events.sort_by_key(|e| e.version);
            ResolvedHistory {
                aggregate_id: id.clone(),
                snapshot: snapshots.remove(id),
                events,
            }
        })
        .collect()
}

/// Resolves snapshot and event history for every id in `ids`.
///
/// # Errors
///
/// Returns any `DomainError` raised by the stores.
pub async fn resolve(
    events: &dyn EventStore,
    snapshots: &dyn SnapshotStore,
    aggregate_type: &str,
    ids: &[String],
) -> Result<Vec<ResolvedHistory>, DomainError> {
    let ids = distinct_ids(ids);
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let heads = snapshots.latest_snapshot_heads(aggregate_type, &ids).await?;
    let bodies = if heads.is_empty() {
        Vec::new()
    } else {
        snapshots.load_snapshots(aggregate_type, &heads).await?
    };
    let by_id: HashMap<String, StoredSnapshot> = bodies
        .into_iter()
        .map(|s| (s.aggregate_id.clone(), s))
        .collect();

    let windows = event_windows(&ids, &by_id);
    let found = events.load_event_windows(aggregate_type, &windows).await?;

    debug!(
        aggregate_type,
        ids = ids.len(),
        snapshots = by_id.len(),
        events = found.len(),
        "resolved batch history"
    );

    Ok(partition(&ids, by_id, found))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn event(aggregate_id: &str, version: i64) -> StoredEvent {
        StoredEvent {
            event_id: Uuid::new_v4(),
            aggregate_id: aggregate_id.to_owned(),
            version,
            event_type: "test.happened".to_owned(),
            payload: serde_json::json!({}),
            indices: serde_json::json!({}),
            correlation_id: Uuid::nil(),
            causation_id: Uuid::nil(),
            occurred_at: Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
        }
    }

    fn snapshot(aggregate_id: &str, snapshot_version: i64) -> StoredSnapshot {
        StoredSnapshot {
            aggregate_id: aggregate_id.to_owned(),
            snapshot_version,
            state: serde_json::json!({}),
            indices: serde_json::json!({}),
            taken_at: Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
        }
    }

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_owned()).collect()
    }

    #[test]
    fn test_distinct_ids_keeps_first_occurrence_order() {
        let result = distinct_ids(&ids(&["b", "a", "b", "c", "a"]));

        assert_eq!(result, ids(&["b", "a", "c"]));
    }

    #[test]
    fn test_event_windows_use_snapshot_version_when_present() {
        // Arrange
        let mut snapshots = HashMap::new();
        snapshots.insert("a".to_owned(), snapshot("a", 12));

        // Act
        let windows = event_windows(&ids(&["a", "b"]), &snapshots);

        // Assert
        assert_eq!(
            windows,
            vec![
                EventWindow {
                    aggregate_id: "a".to_owned(),
                    after_version: Some(12),
                },
                EventWindow {
                    aggregate_id: "b".to_owned(),
                    after_version: None,
                },
            ]
        );
    }

    #[test]
    fn test_window_contains_only_later_events_of_same_id() {
        let window = EventWindow {
            aggregate_id: "a".to_owned(),
            after_version: Some(2),
        };

        assert!(!window.contains(&event("a", 2)));
        assert!(window.contains(&event("a", 3)));
        assert!(!window.contains(&event("b", 3)));
    }

    #[test]
    fn test_partition_sorts_each_id_and_follows_requested_order() {
        // Arrange
        let events = vec![event("b", 2), event("a", 14), event("b", 1), event("a", 13)];
        let mut snapshots = HashMap::new();
        snapshots.insert("a".to_owned(), snapshot("a", 12));

        // Act
        let resolved = partition(&ids(&["b", "a", "c"]), snapshots, events);

        // Assert
        assert_eq!(resolved.len(), 3);
        assert_eq!(resolved[0].aggregate_id, "b");
        assert!(resolved[0].snapshot.is_none());
        assert_eq!(
            resolved[0].events.iter().map(|e| e.version).collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert_eq!(resolved[1].aggregate_id, "a");
        assert_eq!(resolved[1].snapshot.as_ref().map(|s| s.snapshot_version), Some(12));
        assert_eq!(
            resolved[1].events.iter().map(|e| e.version).collect::<Vec<_>>(),
            vec![13, 14]
        );
        assert!(resolved[2].is_empty());
    }
}
