//! Notification observers.
//!
//! Notifications are queued on the aggregate while it mutates and handed to
//! every registered observer once the commit that carries their events is
//! durable.

use async_trait::async_trait;
use tracing::info;

/// Receives notifications released by a successful commit.
#[async_trait]
pub trait NotificationObserver<N>: Send + Sync {
    /// Handles one notification for `aggregate_id`. Delivery cannot fail the
    /// commit that released it.
    async fn notify(&self, aggregate_id: &str, notification: &N);
}

/// Observer that writes every notification to the tracing log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

#[async_trait]
impl<N> NotificationObserver<N> for TracingObserver
where
    N: std::fmt::Debug + Sync,
{
    async fn notify(&self, aggregate_id: &str, notification: &N) {
        info!(aggregate_id, ?notification, "notification delivered");
    }
}
