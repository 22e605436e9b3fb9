//! In-memory stores and test doubles for Strata.

mod clock;
mod observer;
mod store;

pub use clock::FixedClock;
pub use observer::RecordingObserver;
pub use store::{FailingEventStore, FailingSnapshotStore, InMemoryEventStore, InMemorySnapshotStore};
