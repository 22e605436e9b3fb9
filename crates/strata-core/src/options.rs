//! Repository and commit options.

use crate::error::DomainError;

/// Snapshot every this many events unless configured otherwise.
pub const DEFAULT_SNAPSHOT_FREQUENCY: i64 = 10;

/// Settings fixed for the lifetime of a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepositoryOptions {
    snapshot_frequency: i64,
}

impl RepositoryOptions {
    /// Sets how many events may accumulate after the last snapshot before a
    /// commit takes a new one.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if `frequency` is less than 1.
    pub fn with_snapshot_frequency(mut self, frequency: i64) -> Result<Self, DomainError> {
        if frequency < 1 {
            return Err(DomainError::Validation(format!(
                "snapshot frequency must be at least 1, got {frequency}"
            )));
        }
        self.snapshot_frequency = frequency;
        Ok(self)
    }

    /// Returns the configured snapshot frequency.
    #[must_use]
    pub fn snapshot_frequency(&self) -> i64 {
        self.snapshot_frequency
    }

    /// Decides whether a commit at `version` takes a snapshot.
    #[must_use]
    pub fn should_snapshot(&self, version: i64, snapshot_version: i64, commit: CommitOptions) -> bool {
        commit.force_snapshot || version - snapshot_version >= self.snapshot_frequency
    }
}

impl Default for RepositoryOptions {
    fn default() -> Self {
        Self {
            snapshot_frequency: DEFAULT_SNAPSHOT_FREQUENCY,
        }
    }
}

/// Per-call commit settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitOptions {
    /// Take a snapshot regardless of how many events accumulated.
    pub force_snapshot: bool,
}

impl CommitOptions {
    /// Options that always snapshot.
    #[must_use]
    pub fn force_snapshot() -> Self {
        Self {
            force_snapshot: true,
        }
    }
}
