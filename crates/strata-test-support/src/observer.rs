//! Recording observer — captures delivered notifications for assertions.

use std::sync::Mutex;

use async_trait::async_trait;
use strata_core::observer::NotificationObserver;

/// An observer that records every `(aggregate_id, notification)` it receives,
/// in delivery order.
#[derive(Debug)]
pub struct RecordingObserver<N> {
    received: Mutex<Vec<(String, N)>>,
}

impl<N> Default for RecordingObserver<N> {
    fn default() -> Self {
        Self {
            received: Mutex::new(Vec::new()),
        }
    }
}

impl<N: Clone> RecordingObserver<N> {
    /// Creates an empty recording observer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns everything delivered so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn received(&self) -> Vec<(String, N)> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl<N> NotificationObserver<N> for RecordingObserver<N>
where
    N: Clone + Send + Sync,
{
    async fn notify(&self, aggregate_id: &str, notification: &N) {
        self.received
            .lock()
            .unwrap()
            .push((aggregate_id.to_owned(), notification.clone()));
    }
}
