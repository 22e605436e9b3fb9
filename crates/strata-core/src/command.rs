//! Command abstractions.

use uuid::Uuid;

/// Trait that all commands implement.
pub trait Command: Send + Sync + std::fmt::Debug {
    /// The type name for this command, used in log fields.
    fn command_type(&self) -> &'static str;

    /// Correlation ID stamped onto every event the command produces.
    fn correlation_id(&self) -> Uuid;

    /// The aggregate the command targets.
    fn aggregate_id(&self) -> &str;
}
