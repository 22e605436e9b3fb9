//! Strata API — HTTP surface over the market repository.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use strata_core::clock::SystemClock;
use strata_core::observer::TracingObserver;
use strata_core::options::RepositoryOptions;
use strata_core::repository::Repository;
use strata_core::store::{EventStore, SnapshotStore};
use strata_market::domain::aggregates::Market;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Wires a market repository over the given stores with the system clock
/// and a logging observer.
#[must_use]
pub fn build_state(
    events: Arc<dyn EventStore>,
    snapshots: Arc<dyn SnapshotStore>,
    options: RepositoryOptions,
) -> AppState {
    let markets = Repository::<Market>::new(events, snapshots)
        .with_options(options)
        .with_observer(Arc::new(TracingObserver));
    AppState::new(Arc::new(SystemClock), markets)
}

/// Builds the full application router.
pub fn app(state: AppState) -> Router {
    // TODO: Replace CorsLayer::permissive() with restricted origins for production.
    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1/markets", routes::markets::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
