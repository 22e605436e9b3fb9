//! Domain events for the Market context.

use serde::{Deserialize, Serialize};
use strata_core::error::DomainError;
use strata_core::event::{DomainEvent, EventMetadata};
use strata_core::store::StoredEvent;

/// Event type name for `MarketInitialized`.
pub const MARKET_INITIALIZED_EVENT_TYPE: &str = "market.initialized";
/// Event type name for `OrderCreated`.
pub const ORDER_CREATED_EVENT_TYPE: &str = "market.order_created";

/// Which side of the book an order sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// A bid.
    Buy,
    /// An offer.
    Sell,
}

/// A single order placed on a market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Side of the book.
    pub side: Side,
    /// Limit price.
    pub price: f64,
    /// Number of units.
    pub quantity: u64,
}

/// Emitted when a market is opened on an exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketInitialized {
    /// The market identifier.
    pub market_id: String,
    /// The exchange the market trades on.
    pub exchange: String,
}

/// Emitted when an order is placed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCreated {
    /// The market identifier.
    pub market_id: String,
    /// The order placed.
    pub order: Order,
}

/// Event payload variants for the Market context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MarketEventKind {
    /// A market has been initialized.
    MarketInitialized(MarketInitialized),
    /// An order has been created.
    OrderCreated(OrderCreated),
}

/// Domain event envelope for the Market context.
#[derive(Debug, Clone)]
pub struct MarketEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: MarketEventKind,
}

impl DomainEvent for MarketEvent {
    fn event_type(&self) -> &'static str {
        match &self.kind {
            MarketEventKind::MarketInitialized(_) => MARKET_INITIALIZED_EVENT_TYPE,
            MarketEventKind::OrderCreated(_) => ORDER_CREATED_EVENT_TYPE,
        }
    }

    fn to_payload(&self) -> Result<serde_json::Value, DomainError> {
        Ok(serde_json::to_value(&self.kind)?)
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }

    fn from_stored(stored: &StoredEvent) -> Result<Self, DomainError> {
        let kind: MarketEventKind =
            serde_json::from_value(stored.payload.clone()).map_err(|e| {
                DomainError::Serialization(format!(
                    "{} event {} of {} failed to decode: {e}",
                    stored.event_type, stored.version, stored.aggregate_id
                ))
            })?;
        Ok(Self {
            metadata: EventMetadata::from_stored(stored),
            kind,
        })
    }
}
