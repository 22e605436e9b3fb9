//! `PostgreSQL` implementation of the `EventStore` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::debug;
use uuid::Uuid;

use strata_core::error::DomainError;
use strata_core::store::{EventStore, EventWindow, StoredEvent};

use crate::schema::Tables;
use crate::{MAX_BINDS, append_error, infrastructure};

const EVENT_COLUMNS: &str = "event_id, aggregate_id, version, event_type, payload, indices, \
                             correlation_id, causation_id, occurred_at";
const BINDS_PER_EVENT: usize = 9;

/// PostgreSQL-backed event log.
#[derive(Debug, Clone)]
pub struct PgEventStore {
    pool: PgPool,
}

impl PgEventStore {
    /// Creates a new `PgEventStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct EventRow {
    event_id: Uuid,
    aggregate_id: String,
    version: i64,
    event_type: String,
    payload: serde_json::Value,
    indices: serde_json::Value,
    correlation_id: Uuid,
    causation_id: Uuid,
    occurred_at: DateTime<Utc>,
}

impl From<EventRow> for StoredEvent {
    fn from(row: EventRow) -> Self {
        Self {
            event_id: row.event_id,
            aggregate_id: row.aggregate_id,
            version: row.version,
            event_type: row.event_type,
            payload: row.payload,
            indices: row.indices,
            correlation_id: row.correlation_id,
            causation_id: row.causation_id,
            occurred_at: row.occurred_at,
        }
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn append_events(
        &self,
        aggregate_type: &str,
        events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        if events.is_empty() {
            return Ok(());
        }
        let tables = Tables::for_type(aggregate_type)?;

        let mut tx = self.pool.begin().await.map_err(infrastructure)?;
        for chunk in events.chunks(MAX_BINDS / BINDS_PER_EVENT) {
            let mut builder: QueryBuilder<Postgres> =
                QueryBuilder::new(format!(r#"INSERT INTO "{}" ({EVENT_COLUMNS}) "#, tables.events));
            builder.push_values(chunk, |mut row, event| {
                row.push_bind(event.event_id)
                    .push_bind(&event.aggregate_id)
                    .push_bind(event.version)
                    .push_bind(&event.event_type)
                    .push_bind(&event.payload)
                    .push_bind(&event.indices)
                    .push_bind(event.correlation_id)
                    .push_bind(event.causation_id)
                    .push_bind(event.occurred_at);
            });
            builder
                .build()
                .execute(&mut *tx)
                .await
                .map_err(|e| append_error(e, chunk))?;
        }
        tx.commit().await.map_err(|e| append_error(e, events))?;

        debug!(aggregate_type, count = events.len(), "appended events");
        Ok(())
    }

    async fn load_events(
        &self,
        aggregate_type: &str,
        aggregate_id: &str,
        after_version: Option<i64>,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        let tables = Tables::for_type(aggregate_type)?;
        let sql = format!(
            r#"SELECT {EVENT_COLUMNS} FROM "{}"
               WHERE aggregate_id = $1 AND ($2::BIGINT IS NULL OR version > $2)
               ORDER BY version ASC"#,
            tables.events
        );

        let rows: Vec<EventRow> = sqlx::query_as(&sql)
            .bind(aggregate_id)
            .bind(after_version)
            .fetch_all(&self.pool)
            .await
            .map_err(infrastructure)?;

        Ok(rows.into_iter().map(StoredEvent::from).collect())
    }

    async fn load_event_windows(
        &self,
        aggregate_type: &str,
        windows: &[EventWindow],
    ) -> Result<Vec<StoredEvent>, DomainError> {
        if windows.is_empty() {
            return Ok(Vec::new());
        }
        let tables = Tables::for_type(aggregate_type)?;
        let ids: Vec<&str> = windows.iter().map(|w| w.aggregate_id.as_str()).collect();
        let afters: Vec<Option<i64>> = windows.iter().map(|w| w.after_version).collect();

        // One round trip regardless of the number of windows.
        let sql = format!(
            r#"SELECT {columns} FROM "{events}" e
               JOIN UNNEST($1::TEXT[], $2::BIGINT[]) AS w(aggregate_id, after_version)
                 ON e.aggregate_id = w.aggregate_id
                AND (w.after_version IS NULL OR e.version > w.after_version)
               ORDER BY e.aggregate_id, e.version"#,
            columns = prefixed_columns("e"),
            events = tables.events
        );

        let rows: Vec<EventRow> = sqlx::query_as(&sql)
            .bind(&ids)
            .bind(&afters)
            .fetch_all(&self.pool)
            .await
            .map_err(infrastructure)?;

        debug!(
            aggregate_type,
            windows = windows.len(),
            rows = rows.len(),
            "loaded event windows"
        );
        Ok(rows.into_iter().map(StoredEvent::from).collect())
    }

    async fn aggregate_ids(&self, aggregate_type: &str) -> Result<Vec<String>, DomainError> {
        let tables = Tables::for_type(aggregate_type)?;
        let sql = format!(
            r#"SELECT DISTINCT aggregate_id FROM "{}" ORDER BY aggregate_id"#,
            tables.events
        );

        sqlx::query_scalar(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(infrastructure)
    }
}

fn prefixed_columns(alias: &str) -> String {
    EVENT_COLUMNS
        .split(", ")
        .map(|column| format!("{alias}.{column}"))
        .collect::<Vec<_>>()
        .join(", ")
}
