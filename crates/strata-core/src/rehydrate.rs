//! Rebuilds aggregates from a snapshot and the events recorded after it.

use tracing::debug;

use crate::aggregate::AggregateRoot;
use crate::error::DomainError;
use crate::event::DomainEvent;
use crate::planner::ResolvedHistory;

/// Rebuilds an aggregate from its resolved history.
///
/// Returns `Ok(None)` when there is neither a snapshot nor any event. Events
/// must be ascending and contiguous with the snapshot version.
///
/// # Errors
///
/// Returns `DomainError::Serialization` if the snapshot state or an event
/// payload does not decode, and `DomainError::Corrupted` if a stored version
/// does not directly follow the current one.
pub fn rehydrate<A: AggregateRoot>(history: ResolvedHistory) -> Result<Option<A>, DomainError> {
    if history.is_empty() {
        return Ok(None);
    }

    let ResolvedHistory {
        aggregate_id,
        snapshot,
        events,
    } = history;

    let mut aggregate = match snapshot {
        Some(snapshot) => {
            let state: A::State = serde_json::from_value(snapshot.state).map_err(|e| {
                DomainError::Serialization(format!(
                    "snapshot state for {aggregate_id} at version {} failed to decode: {e}",
                    snapshot.snapshot_version
                ))
            })?;
            A::from_snapshot(&aggregate_id, state, snapshot.snapshot_version)
        }
        None => A::blank(&aggregate_id),
    };

    for stored in &events {
        let expected = aggregate.version() + 1;
        if stored.version != expected {
            return Err(DomainError::Corrupted {
                aggregate_id,
                expected,
                found: stored.version,
            });
        }
        let event = A::Event::from_stored(stored)?;
        aggregate.replay(&event);
    }

    debug!(
        aggregate_type = A::aggregate_type(),
        aggregate_id,
        version = aggregate.version(),
        snapshot_version = aggregate.snapshot_version(),
        replayed = events.len(),
        "rehydrated aggregate"
    );

    Ok(Some(aggregate))
}
