//! Domain error types.

use thiserror::Error;

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An aggregate was not found.
    #[error("aggregate not found: {0}")]
    AggregateNotFound(String),

    /// An append collided with an already stored `(aggregate_id, version)`.
    #[error("concurrency conflict on aggregate {aggregate_id}: version {version} is already stored")]
    ConcurrencyConflict {
        /// The aggregate that had the conflict.
        aggregate_id: String,
        /// The version that was already present.
        version: i64,
    },

    /// A validation error, raised before any write is attempted.
    #[error("validation error: {0}")]
    Validation(String),

    /// The storage backend was unreachable, timed out, or rejected the operation.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),

    /// A payload or state document could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Stored history is not contiguous.
    #[error("corrupted history for aggregate {aggregate_id}: expected version {expected}, found {found}")]
    Corrupted {
        /// The aggregate being rehydrated.
        aggregate_id: String,
        /// The version replay expected next.
        expected: i64,
        /// The version actually stored.
        found: i64,
    },
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
