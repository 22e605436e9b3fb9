//! Routes for the Market bounded context.

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use strata_market::application::command_handlers::{self, MarketCommandResult};
use strata_market::application::query_handlers::{self, MarketView};
use strata_market::domain::commands;
use strata_market::domain::events::Side;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /init.
#[derive(Debug, Deserialize)]
pub struct InitMarketRequest {
    /// The market identifier.
    pub market_id: String,
    /// The exchange the market trades on.
    pub exchange: String,
}

/// Request body for POST /create-order.
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    /// The market identifier.
    pub market_id: String,
    /// Side of the book.
    pub side: Side,
    /// Limit price.
    pub price: f64,
    /// Number of units.
    pub quantity: u64,
    /// Snapshot on this commit regardless of frequency.
    #[serde(default)]
    pub force_snapshot: bool,
}

/// Query string for GET /.
#[derive(Debug, Deserialize)]
pub struct ListMarketsQuery {
    /// Comma-separated market ids; absent lists every market.
    pub ids: Option<String>,
}

/// Response body returned after a command is successfully handled.
#[derive(Debug, Serialize)]
pub struct CommandResponse {
    /// The market identifier.
    pub market_id: String,
    /// Market version after the commit.
    pub version: i64,
    /// Version of the newest durable snapshot.
    pub snapshot_version: i64,
}

impl From<MarketCommandResult> for CommandResponse {
    fn from(result: MarketCommandResult) -> Self {
        Self {
            market_id: result.aggregate_id,
            version: result.version,
            snapshot_version: result.snapshot_version,
        }
    }
}

/// POST /init
#[instrument(skip(state, request), fields(market_id = %request.market_id))]
async fn init_market(
    State(state): State<AppState>,
    Json(request): Json<InitMarketRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    let command = commands::InitMarket {
        correlation_id: Uuid::new_v4(),
        market_id: request.market_id,
        exchange: request.exchange,
    };

    info!(correlation_id = %command.correlation_id, "handling init_market command");

    let result =
        command_handlers::handle_init_market(&command, state.clock.as_ref(), &state.markets)
            .await?;

    Ok(Json(result.into()))
}

/// POST /create-order
#[instrument(skip(state, request), fields(market_id = %request.market_id))]
async fn create_order(
    State(state): State<AppState>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    let command = commands::CreateOrder {
        correlation_id: Uuid::new_v4(),
        market_id: request.market_id,
        side: request.side,
        price: request.price,
        quantity: request.quantity,
        force_snapshot: request.force_snapshot,
    };

    info!(correlation_id = %command.correlation_id, "handling create_order command");

    let result =
        command_handlers::handle_create_order(&command, state.clock.as_ref(), &state.markets)
            .await?;

    Ok(Json(result.into()))
}

/// GET /{market_id}
#[instrument(skip(state))]
async fn get_market(
    State(state): State<AppState>,
    Path(market_id): Path<String>,
) -> Result<Json<MarketView>, ApiError> {
    let view = query_handlers::get_market_by_id(&market_id, &state.markets).await?;
    Ok(Json(view))
}

/// GET /?ids=a,b
#[instrument(skip(state))]
async fn list_markets(
    State(state): State<AppState>,
    Query(query): Query<ListMarketsQuery>,
) -> Result<Json<Vec<MarketView>>, ApiError> {
    let ids: Option<Vec<String>> = query.ids.map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_owned)
            .collect()
    });

    let views = query_handlers::list_markets(ids.as_deref(), &state.markets).await?;
    Ok(Json(views))
}

/// Returns the router for the market context.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_markets))
        .route("/init", post(init_market))
        .route("/create-order", post(create_order))
        .route("/{market_id}", get(get_market))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use strata_core::repository::Repository;
    use strata_core::store::{EventStore, SnapshotStore};
    use strata_market::domain::aggregates::Market;
    use strata_test_support::{
        FailingEventStore, FailingSnapshotStore, FixedClock, InMemoryEventStore,
        InMemorySnapshotStore,
    };
    use tower::ServiceExt;

    fn app_state_with(events: Arc<dyn EventStore>, snapshots: Arc<dyn SnapshotStore>) -> AppState {
        let clock = Arc::new(FixedClock::default());
        let markets = Repository::<Market>::new(events, snapshots).with_clock(clock.clone());
        AppState::new(clock, markets)
    }

    fn test_app_state() -> AppState {
        app_state_with(
            Arc::new(InMemoryEventStore::new()),
            Arc::new(InMemorySnapshotStore::new()),
        )
    }

    fn failing_app_state() -> AppState {
        app_state_with(Arc::new(FailingEventStore), Arc::new(FailingSnapshotStore))
    }

    fn post(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_init_market_returns_200_with_version() {
        // Arrange
        let app = router().with_state(test_app_state());
        let body = serde_json::json!({ "market_id": "m-1", "exchange": "XNYS" });

        // Act
        let response = app.oneshot(post("/init", &body)).await.unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["market_id"], "m-1");
        assert_eq!(json["version"], 1);
        assert_eq!(json["snapshot_version"], 0);
    }

    #[tokio::test]
    async fn test_init_market_with_blank_exchange_returns_400() {
        let app = router().with_state(test_app_state());
        let body = serde_json::json!({ "market_id": "m-1", "exchange": "" });

        let response = app.oneshot(post("/init", &body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "validation_error");
    }

    #[tokio::test]
    async fn test_create_order_on_unknown_market_returns_404() {
        let app = router().with_state(test_app_state());
        let body = serde_json::json!({
            "market_id": "m-404",
            "side": "buy",
            "price": 90.0,
            "quantity": 1000
        });

        let response = app.oneshot(post("/create-order", &body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_create_order_with_forced_snapshot() {
        // Arrange
        let state = test_app_state();
        router()
            .with_state(state.clone())
            .oneshot(post(
                "/init",
                &serde_json::json!({ "market_id": "m-1", "exchange": "XNYS" }),
            ))
            .await
            .unwrap();
        let body = serde_json::json!({
            "market_id": "m-1",
            "side": "sell",
            "price": 91.5,
            "quantity": 10,
            "force_snapshot": true
        });

        // Act
        let response = router()
            .with_state(state)
            .oneshot(post("/create-order", &body))
            .await
            .unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["version"], 2);
        assert_eq!(json["snapshot_version"], 2);
    }

    #[tokio::test]
    async fn test_get_market_returns_404_when_missing() {
        let app = router().with_state(test_app_state());
        let request = Request::builder()
            .uri("/m-404")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["error"], "aggregate_not_found");
    }

    #[tokio::test]
    async fn test_list_markets_with_empty_ids_returns_empty_array() {
        let app = router().with_state(test_app_state());
        let request = Request::builder()
            .uri("/?ids=")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_storage_failure_returns_500() {
        // Arrange
        let app = router().with_state(failing_app_state());
        let request = Request::builder()
            .uri("/m-1")
            .body(Body::empty())
            .unwrap();

        // Act
        let response = app.oneshot(request).await.unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = json_body(response).await;
        assert_eq!(json["error"], "infrastructure_error");
    }
}
