//! `PostgreSQL` implementation of the `SnapshotStore` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::debug;

use strata_core::error::DomainError;
use strata_core::store::{SnapshotHead, SnapshotStore, StoredSnapshot};

use crate::schema::Tables;
use crate::{MAX_BINDS, infrastructure};

const BINDS_PER_SNAPSHOT: usize = 5;

/// PostgreSQL-backed snapshot store.
#[derive(Debug, Clone)]
pub struct PgSnapshotStore {
    pool: PgPool,
}

impl PgSnapshotStore {
    /// Creates a new `PgSnapshotStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct SnapshotRow {
    aggregate_id: String,
    snapshot_version: i64,
    state: serde_json::Value,
    indices: serde_json::Value,
    taken_at: DateTime<Utc>,
}

impl From<SnapshotRow> for StoredSnapshot {
    fn from(row: SnapshotRow) -> Self {
        Self {
            aggregate_id: row.aggregate_id,
            snapshot_version: row.snapshot_version,
            state: row.state,
            indices: row.indices,
            taken_at: row.taken_at,
        }
    }
}

#[async_trait]
impl SnapshotStore for PgSnapshotStore {
    async fn save_snapshots(
        &self,
        aggregate_type: &str,
        snapshots: &[StoredSnapshot],
    ) -> Result<(), DomainError> {
        if snapshots.is_empty() {
            return Ok(());
        }
        let tables = Tables::for_type(aggregate_type)?;

        let mut tx = self.pool.begin().await.map_err(infrastructure)?;
        for chunk in snapshots.chunks(MAX_BINDS / BINDS_PER_SNAPSHOT) {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
                r#"INSERT INTO "{}" (aggregate_id, snapshot_version, state, indices, taken_at) "#,
                tables.snapshots
            ));
            builder.push_values(chunk, |mut row, snapshot| {
                row.push_bind(&snapshot.aggregate_id)
                    .push_bind(snapshot.snapshot_version)
                    .push_bind(&snapshot.state)
                    .push_bind(&snapshot.indices)
                    .push_bind(snapshot.taken_at);
            });
            // Re-saving an existing version overwrites it.
            builder.push(
                " ON CONFLICT (aggregate_id, snapshot_version) DO UPDATE \
                 SET state = EXCLUDED.state, indices = EXCLUDED.indices, taken_at = EXCLUDED.taken_at",
            );
            builder
                .build()
                .execute(&mut *tx)
                .await
                .map_err(infrastructure)?;
        }
        tx.commit().await.map_err(infrastructure)?;

        debug!(aggregate_type, count = snapshots.len(), "saved snapshots");
        Ok(())
    }

    async fn latest_snapshot(
        &self,
        aggregate_type: &str,
        aggregate_id: &str,
    ) -> Result<Option<StoredSnapshot>, DomainError> {
        let tables = Tables::for_type(aggregate_type)?;
        let sql = format!(
            r#"SELECT aggregate_id, snapshot_version, state, indices, taken_at FROM "{}"
               WHERE aggregate_id = $1
               ORDER BY snapshot_version DESC
               LIMIT 1"#,
            tables.snapshots
        );

        let row: Option<SnapshotRow> = sqlx::query_as(&sql)
            .bind(aggregate_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(infrastructure)?;

        Ok(row.map(StoredSnapshot::from))
    }

    async fn latest_snapshot_heads(
        &self,
        aggregate_type: &str,
        aggregate_ids: &[String],
    ) -> Result<Vec<SnapshotHead>, DomainError> {
        if aggregate_ids.is_empty() {
            return Ok(Vec::new());
        }
        let tables = Tables::for_type(aggregate_type)?;
        let sql = format!(
            r#"SELECT aggregate_id, MAX(snapshot_version) FROM "{}"
               WHERE aggregate_id = ANY($1)
               GROUP BY aggregate_id"#,
            tables.snapshots
        );

        let rows: Vec<(String, i64)> = sqlx::query_as(&sql)
            .bind(aggregate_ids)
            .fetch_all(&self.pool)
            .await
            .map_err(infrastructure)?;

        Ok(rows
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
        if heads.is_empty() {
            return Ok(Vec::new());
        }
        let tables = Tables::for_type(aggregate_type)?;
        let ids: Vec<&str> = heads.iter().map(|h| h.aggregate_id.as_str()).collect();
        let versions: Vec<i64> = heads.iter().map(|h| h.snapshot_version).collect();
        let sql = format!(
            r#"SELECT s.aggregate_id, s.snapshot_version, s.state, s.indices, s.taken_at
               FROM "{}" s
               JOIN UNNEST($1::TEXT[], $2::BIGINT[]) AS h(aggregate_id, snapshot_version)
                 ON s.aggregate_id = h.aggregate_id
                AND s.snapshot_version = h.snapshot_version"#,
            tables.snapshots
        );

        let rows: Vec<SnapshotRow> = sqlx::query_as(&sql)
            .bind(&ids)
            .bind(&versions)
            .fetch_all(&self.pool)
            .await
            .map_err(infrastructure)?;

        Ok(rows.into_iter().map(StoredSnapshot::from).collect())
    }
}
