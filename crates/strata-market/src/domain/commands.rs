//! Commands for the Market context.

use strata_core::command::Command;
use uuid::Uuid;

use super::events::Side;

/// Command to open a new market.
#[derive(Debug, Clone)]
pub struct InitMarket {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The market identifier.
    pub market_id: String,
    /// The exchange the market trades on.
    pub exchange: String,
}

impl Command for InitMarket {
    fn command_type(&self) -> &'static str {
        "market.init"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn aggregate_id(&self) -> &str {
        &self.market_id
    }
}

/// Command to place an order on an existing market.
#[derive(Debug, Clone)]
pub struct CreateOrder {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The market identifier.
    pub market_id: String,
    /// Side of the book.
    pub side: Side,
    /// Limit price.
    pub price: f64,
    /// Number of units.
    pub quantity: u64,
    /// Snapshot the market on this commit regardless of frequency.
    pub force_snapshot: bool,
}

impl Command for CreateOrder {
    fn command_type(&self) -> &'static str {
        "market.create_order"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn aggregate_id(&self) -> &str {
        &self.market_id
    }
}
