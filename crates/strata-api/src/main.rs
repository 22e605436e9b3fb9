//! Strata API server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use strata_api::config::Config;
use strata_api::error::AppError;
use strata_core::aggregate::AggregateRoot;
use strata_event_store::{PgEventStore, PgSnapshotStore, ensure_schema};
use strata_market::domain::aggregates::Market;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting Strata API server");

    let config = Config::from_env()?;
    let options = config.repository_options()?;

    // Create database connection pool.
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await?;

    ensure_schema(&pool, Market::aggregate_type()).await?;

    let app_state = strata_api::build_state(
        Arc::new(PgEventStore::new(pool.clone())),
        Arc::new(PgSnapshotStore::new(pool)),
        options,
    );
    let app = strata_api::app(app_state);

    // Start server.
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))?;
    tracing::info!(snapshot_frequency = options.snapshot_frequency(), "Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}
