//! Event store database schema.
//!
//! Every aggregate type gets its own pair of tables, `"<Type>.events"` and
//! `"<Type>.snapshots"`. Names are quoted identifiers, so the aggregate type
//! is validated before it is spliced into SQL.

use sqlx::PgPool;
use strata_core::error::DomainError;
use tracing::info;

use crate::infrastructure;

/// Longest aggregate type name that still fits Postgres' 63-byte identifier
/// limit once `.snapshots` or an index suffix is appended.
const MAX_TYPE_LEN: usize = 53;

/// Table names for one aggregate type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tables {
    /// Event log table, e.g. `Market.events`.
    pub events: String,
    /// Snapshot table, e.g. `Market.snapshots`.
    pub snapshots: String,
    aggregate_type: String,
}

impl Tables {
    /// Resolves table names for `aggregate_type`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` unless the name is an ASCII letter
    /// followed by letters, digits or underscores, at most 53 bytes long.
    pub fn for_type(aggregate_type: &str) -> Result<Self, DomainError> {
        let mut chars = aggregate_type.chars();
        let starts_with_letter = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
        let rest_valid = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !starts_with_letter || !rest_valid || aggregate_type.len() > MAX_TYPE_LEN {
            return Err(DomainError::Validation(format!(
                "invalid aggregate type name: {aggregate_type:?}"
            )));
        }

        Ok(Self {
            events: format!("{aggregate_type}.events"),
            snapshots: format!("{aggregate_type}.snapshots"),
            aggregate_type: aggregate_type.to_owned(),
        })
    }

    /// Index name for `suffix`, quoted the same way as the tables so types
    /// differing only in case stay distinct.
    fn index(&self, suffix: &str) -> String {
        format!("{}.{suffix}", self.aggregate_type)
    }

    /// DDL creating both tables and their indexes.
    #[must_use]
    pub fn create_sql(&self) -> String {
        let Self {
            events, snapshots, ..
        } = self;
        let events_correlation = self.index("ev_cid");
        let events_indices = self.index("ev_idx");
        let snapshots_version = self.index("sn_ver");
        let snapshots_indices = self.index("sn_idx");
        format!(
            r#"
CREATE TABLE IF NOT EXISTS "{events}" (
    event_id        UUID PRIMARY KEY,
    aggregate_id    TEXT NOT NULL,
    version         BIGINT NOT NULL,
    event_type      VARCHAR(255) NOT NULL,
    payload         JSONB NOT NULL,
    indices         JSONB NOT NULL DEFAULT '{{}}'::jsonb,
    correlation_id  UUID NOT NULL,
    causation_id    UUID NOT NULL,
    occurred_at     TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    UNIQUE (aggregate_id, version)
);

CREATE INDEX IF NOT EXISTS "{events_correlation}"
    ON "{events}" (correlation_id);

CREATE INDEX IF NOT EXISTS "{events_indices}"
    ON "{events}" USING GIN (indices);

CREATE TABLE IF NOT EXISTS "{snapshots}" (
    aggregate_id     TEXT NOT NULL,
    snapshot_version BIGINT NOT NULL,
    state            JSONB NOT NULL,
    indices          JSONB NOT NULL DEFAULT '{{}}'::jsonb,
    taken_at         TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    PRIMARY KEY (aggregate_id, snapshot_version)
);

CREATE INDEX IF NOT EXISTS "{snapshots_version}"
    ON "{snapshots}" (snapshot_version);

CREATE INDEX IF NOT EXISTS "{snapshots_indices}"
    ON "{snapshots}" USING GIN (indices);
"#
        )
    }
}

/// Creates the event and snapshot tables for `aggregate_type` if missing.
///
/// # Errors
///
/// Returns `DomainError::Validation` for an invalid type name and
/// `DomainError::Infrastructure` if the DDL fails.
pub async fn ensure_schema(pool: &PgPool, aggregate_type: &str) -> Result<(), DomainError> {
    let tables = Tables::for_type(aggregate_type)?;
    sqlx::raw_sql(&tables.create_sql())
        .execute(pool)
        .await
        .map_err(infrastructure)?;
    info!(aggregate_type, "ensured event store schema");
    Ok(())
}
