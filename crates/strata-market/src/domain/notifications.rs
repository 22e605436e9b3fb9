//! Notifications released to observers after a market commit.

use super::events::Order;

/// Side-effect signals queued by `Market` mutations.
#[derive(Debug, Clone, PartialEq)]
pub enum MarketNotification {
    /// A market opened on `exchange`.
    Initialized {
        /// The market identifier.
        market_id: String,
        /// The exchange the market trades on.
        exchange: String,
    },
    /// An order was placed; `price` is the new average.
    OrderCreated {
        /// The market identifier.
        market_id: String,
        /// The order placed.
        order: Order,
        /// Average order price after this order.
        price: f64,
    },
}
