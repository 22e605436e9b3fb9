//! `PostgreSQL` storage backends for the event log and snapshot store.

pub mod pg_event_store;
pub mod pg_snapshot_store;
pub mod schema;

pub use pg_event_store::PgEventStore;
pub use pg_snapshot_store::PgSnapshotStore;
pub use schema::ensure_schema;

use sqlx::postgres::PgDatabaseError;
use strata_core::error::DomainError;
use strata_core::store::StoredEvent;

/// Postgres caps a statement at 65535 bind parameters.
pub(crate) const MAX_BINDS: usize = 60_000;

pub(crate) fn infrastructure(error: sqlx::Error) -> DomainError {
    DomainError::Infrastructure(error.to_string())
}

/// Maps an append failure to `DomainError`, turning unique violations on
/// `(aggregate_id, version)` into `ConcurrencyConflict`.
pub(crate) fn append_error(error: sqlx::Error, events: &[StoredEvent]) -> DomainError {
    let sqlx::Error::Database(db) = &error else {
        return infrastructure(error);
    };
    if !db.is_unique_violation() {
        return infrastructure(error);
    }

    let parsed = db
        .try_downcast_ref::<PgDatabaseError>()
        .and_then(PgDatabaseError::detail)
        .and_then(parse_conflict_detail);
    match (parsed, events.first()) {
        (Some((aggregate_id, version)), _) => DomainError::ConcurrencyConflict {
            aggregate_id,
            version,
        },
        (None, Some(first)) => DomainError::ConcurrencyConflict {
            aggregate_id: first.aggregate_id.clone(),
            version: first.version,
        },
        (None, None) => infrastructure(error),
    }
}

/// Parses `Key (aggregate_id, version)=(m-1, 3) already exists.`
fn parse_conflict_detail(detail: &str) -> Option<(String, i64)> {
    let values = detail
        .strip_prefix("Key (aggregate_id, version)=(")?
        .strip_suffix(") already exists.")?;
    let (aggregate_id, version) = values.rsplit_once(", ")?;
    Some((aggregate_id.to_owned(), version.parse().ok()?))
}
