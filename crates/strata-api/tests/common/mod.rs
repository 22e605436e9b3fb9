//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use sqlx::PgPool;
use strata_core::aggregate::AggregateRoot;
use strata_core::options::RepositoryOptions;
use strata_event_store::{PgEventStore, PgSnapshotStore, ensure_schema};
use strata_market::domain::aggregates::Market;
use strata_test_support::{InMemoryEventStore, InMemorySnapshotStore};
use tower::ServiceExt;

/// Stores behind an in-memory app, kept so tests can inspect what was written.
pub struct InMemoryApp {
    pub router: Router,
    pub events: Arc<InMemoryEventStore>,
    pub snapshots: Arc<InMemorySnapshotStore>,
}

/// Build the full app router over in-memory stores. Uses the same route
/// structure as `main.rs`.
pub fn build_test_app() -> InMemoryApp {
    let events = Arc::new(InMemoryEventStore::new());
    let snapshots = Arc::new(InMemorySnapshotStore::new());
    let state = strata_api::build_state(
        events.clone(),
        snapshots.clone(),
        RepositoryOptions::default(),
    );
    InMemoryApp {
        router: strata_api::app(state),
        events,
        snapshots,
    }
}

/// Build the full app router over the Postgres stores.
pub async fn build_pg_app(pool: PgPool) -> Router {
    ensure_schema(&pool, Market::aggregate_type()).await.unwrap();
    let state = strata_api::build_state(
        Arc::new(PgEventStore::new(pool.clone())),
        Arc::new(PgSnapshotStore::new(pool)),
        RepositoryOptions::default(),
    );
    strata_api::app(state)
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}

/// Posts an init followed by one order per price, alternating buy and sell.
pub async fn seed_market(app: &Router, market_id: &str, exchange: &str, prices: &[f64]) {
    let (status, _) = post_json(
        app.clone(),
        "/api/v1/markets/init",
        &serde_json::json!({ "market_id": market_id, "exchange": exchange }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    seed_market_orders(app, market_id, prices).await;
}

/// Posts one order per price on an existing market, alternating buy and sell.
pub async fn seed_market_orders(app: &Router, market_id: &str, prices: &[f64]) {
    for (i, price) in prices.iter().enumerate() {
        let side = if i % 2 == 0 { "buy" } else { "sell" };
        let (status, _) = post_json(
            app.clone(),
            "/api/v1/markets/create-order",
            &serde_json::json!({
                "market_id": market_id,
                "side": side,
                "price": price,
                "quantity": 1000
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
}
