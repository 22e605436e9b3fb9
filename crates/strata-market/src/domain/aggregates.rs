//! Aggregate roots for the Market context.

use serde::{Deserialize, Serialize};
use strata_core::aggregate::AggregateRoot;
use strata_core::clock::Clock;
use strata_core::error::DomainError;
use strata_core::event::EventMetadata;
use uuid::Uuid;

use super::events::{
    MARKET_INITIALIZED_EVENT_TYPE, MarketEvent, MarketEventKind, MarketInitialized,
    ORDER_CREATED_EVENT_TYPE, Order, OrderCreated,
};
use super::notifications::MarketNotification;

/// Index field denormalized onto every market event and snapshot.
pub const EXCHANGE_INDEX: &str = "exchange";

/// Full market state captured by a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketState {
    /// The exchange the market trades on.
    pub exchange: String,
    /// Every order placed, oldest first.
    pub orders: Vec<Order>,
    /// Average price over all orders.
    pub price: f64,
}

/// The aggregate root for a market.
#[derive(Debug, Default)]
pub struct Market {
    /// Aggregate identifier.
    id: Option<String>,
    /// Current version (event count).
    version: i64,
    /// Version of the newest durable snapshot.
    snapshot_version: i64,
    state: MarketState,
    /// Uncommitted events pending persistence.
    uncommitted_events: Vec<MarketEvent>,
    /// Notifications released after the next successful commit.
    pending_notifications: Vec<MarketNotification>,
}

impl Market {
    /// Opens a market on `exchange`, producing a `MarketInitialized` event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the id or exchange is blank.
    pub fn init(
        market_id: &str,
        exchange: &str,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<Self, DomainError> {
        if market_id.trim().is_empty() {
            return Err(DomainError::Validation("market id must not be empty".into()));
        }
        if exchange.trim().is_empty() {
            return Err(DomainError::Validation("exchange must not be empty".into()));
        }

        let mut market = Self {
            id: Some(market_id.to_owned()),
            ..Self::default()
        };
        market.record(
            MarketEventKind::MarketInitialized(MarketInitialized {
                market_id: market_id.to_owned(),
                exchange: exchange.to_owned(),
            }),
            correlation_id,
            clock,
        );
        market
            .pending_notifications
            .push(MarketNotification::Initialized {
                market_id: market_id.to_owned(),
                exchange: exchange.to_owned(),
            });
        Ok(market)
    }

    /// Places an order, producing an `OrderCreated` event and updating the
    /// average price.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the market was never initialized,
    /// or the price is not a positive finite number, or the quantity is zero.
    pub fn create_order(
        &mut self,
        order: Order,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        let market_id = self.id.clone().unwrap_or_default();
        if self.state.exchange.is_empty() {
            return Err(DomainError::Validation(format!(
                "market {market_id} is not initialized"
            )));
        }
        if !order.price.is_finite() || order.price <= 0.0 {
            return Err(DomainError::Validation(format!(
                "order price must be positive, got {}",
                order.price
            )));
        }
        if order.quantity == 0 {
            return Err(DomainError::Validation(
                "order quantity must be positive".into(),
            ));
        }

        self.record(
            MarketEventKind::OrderCreated(OrderCreated {
                market_id: market_id.clone(),
                order: order.clone(),
            }),
            correlation_id,
            clock,
        );
        self.pending_notifications
            .push(MarketNotification::OrderCreated {
                market_id,
                order,
                price: self.state.price,
            });
        Ok(())
    }

    /// The exchange the market trades on.
    #[must_use]
    pub fn exchange(&self) -> &str {
        &self.state.exchange
    }

    /// Every order placed, oldest first.
    #[must_use]
    pub fn orders(&self) -> &[Order] {
        &self.state.orders
    }

    /// Average price over all orders, or 0 before the first order.
    #[must_use]
    pub fn price(&self) -> f64 {
        self.state.price
    }

    fn record(&mut self, kind: MarketEventKind, correlation_id: Uuid, clock: &dyn Clock) {
        self.mutate(&kind);
        self.version += 1;

        let event_type = match &kind {
            MarketEventKind::MarketInitialized(_) => MARKET_INITIALIZED_EVENT_TYPE,
            MarketEventKind::OrderCreated(_) => ORDER_CREATED_EVENT_TYPE,
        };
        self.uncommitted_events.push(MarketEvent {
            metadata: EventMetadata {
                event_id: Uuid::new_v4(),
                event_type: event_type.to_owned(),
                aggregate_id: self.id.clone().unwrap_or_default(),
                version: self.version,
                correlation_id,
                causation_id: correlation_id,
                occurred_at: clock.now(),
            },
            kind,
        });
    }

    /// Applies a state change. Shared by live mutation and replay.
    fn mutate(&mut self, kind: &MarketEventKind) {
        match kind {
            MarketEventKind::MarketInitialized(payload) => {
                self.state.exchange.clone_from(&payload.exchange);
            }
            MarketEventKind::OrderCreated(payload) => {
                self.state.orders.push(payload.order.clone());
                let total: f64 = self.state.orders.iter().map(|o| o.price).sum();
                #[allow(clippy::cast_precision_loss)]
                let count = self.state.orders.len() as f64;
                self.state.price = total / count;
            }
        }
    }
}

impl AggregateRoot for Market {
    type Event = MarketEvent;
    type Notification = MarketNotification;
    type State = MarketState;

    fn aggregate_type() -> &'static str {
        "Market"
    }

    fn index_fields() -> &'static [&'static str] {
        &[EXCHANGE_INDEX]
    }

    fn blank(id: &str) -> Self {
        Self {
            id: Some(id.to_owned()),
            ..Self::default()
        }
    }

    fn from_snapshot(id: &str, state: Self::State, snapshot_version: i64) -> Self {
        Self {
            id: Some(id.to_owned()),
            version: snapshot_version,
            snapshot_version,
            state,
            ..Self::default()
        }
    }

    fn aggregate_id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn snapshot_version(&self) -> i64 {
        self.snapshot_version
    }

    fn set_snapshot_version(&mut self, version: i64) {
        self.snapshot_version = version;
    }

    fn snapshot(&self) -> Self::State {
        self.state.clone()
    }

    fn index_value(&self, field: &str) -> Option<serde_json::Value> {
        (field == EXCHANGE_INDEX).then(|| serde_json::Value::String(self.state.exchange.clone()))
    }

    fn replay(&mut self, event: &Self::Event) {
        self.mutate(&event.kind);
        self.version += 1;
    }

    fn uncommitted_events(&self) -> &[Self::Event] {
        &self.uncommitted_events
    }

    fn clear_uncommitted_events(&mut self) {
        self.uncommitted_events.clear();
    }

    fn pending_notifications(&self) -> &[Self::Notification] {
        &self.pending_notifications
    }

    fn take_pending_notifications(&mut self) -> Vec<Self::Notification> {
        std::mem::take(&mut self.pending_notifications)
    }
}
