//! Shared application state.

use std::sync::Arc;

use strata_core::clock::Clock;
use strata_core::repository::Repository;
use strata_market::domain::aggregates::Market;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Clock used to timestamp events.
    pub clock: Arc<dyn Clock>,
    /// Repository for market aggregates.
    pub markets: Repository<Market>,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, markets: Repository<Market>) -> Self {
        Self { clock, markets }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("markets", &self.markets)
            .finish_non_exhaustive()
    }
}
