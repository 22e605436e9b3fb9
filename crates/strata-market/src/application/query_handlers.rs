//! Query handlers for the Market context.
//!
//! Markets are rehydrated through the repository (newest snapshot plus the
//! events after it) and returned as read-only view DTOs.

use serde::Serialize;
use strata_core::aggregate::AggregateRoot;
use strata_core::error::DomainError;
use strata_core::repository::Repository;
use tracing::instrument;

use crate::domain::aggregates::Market;
use crate::domain::events::Order;

/// Read-only view of a market aggregate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketView {
    /// The market identifier.
    pub market_id: String,
    /// The exchange the market trades on.
    pub exchange: String,
    /// Every order placed, oldest first.
    pub orders: Vec<Order>,
    /// Average price over all orders.
    pub price: f64,
    /// Current version (event count).
    pub version: i64,
    /// Version of the newest durable snapshot.
    pub snapshot_version: i64,
}

impl From<&Market> for MarketView {
    fn from(market: &Market) -> Self {
        Self {
            market_id: market.aggregate_id().unwrap_or_default().to_owned(),
            exchange: market.exchange().to_owned(),
            orders: market.orders().to_vec(),
            price: market.price(),
            version: market.version(),
            snapshot_version: market.snapshot_version(),
        }
    }
}

/// Retrieves a market by its aggregate ID.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the market has no history,
/// or any error raised while loading it.
#[instrument(skip(repo))]
pub async fn get_market_by_id(
    market_id: &str,
    repo: &Repository<Market>,
) -> Result<MarketView, DomainError> {
    repo.get(market_id)
        .await?
        .as_ref()
        .map(MarketView::from)
        .ok_or_else(|| DomainError::AggregateNotFound(market_id.to_owned()))
}

/// Retrieves many markets in one batch. `None` lists every market.
///
/// Unknown ids are skipped; the result follows the requested order.
///
/// # Errors
///
/// Returns any error raised while loading.
#[instrument(skip_all, fields(requested = market_ids.map(<[String]>::len)))]
pub async fn list_markets(
    market_ids: Option<&[String]>,
    repo: &Repository<Market>,
) -> Result<Vec<MarketView>, DomainError> {
    let markets = repo.get_all(market_ids).await?;
    Ok(markets.iter().map(MarketView::from).collect())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use strata_core::clock::Clock;
    use strata_core::error::DomainError;
    use strata_core::options::CommitOptions;
    use strata_core::repository::Repository;
    use strata_test_support::{FixedClock, InMemoryEventStore, InMemorySnapshotStore};
    use uuid::Uuid;

    use super::*;
    use crate::domain::events::Side;

    fn repository() -> (Arc<InMemorySnapshotStore>, Repository<Market>) {
        let snapshots = Arc::new(InMemorySnapshotStore::new());
        let repo = Repository::<Market>::new(Arc::new(InMemoryEventStore::new()), snapshots.clone());
        (snapshots, repo)
    }

    fn place(market: &mut Market, prices: &[f64], clock: &dyn Clock) {
        for (i, price) in prices.iter().enumerate() {
            let side = if i % 2 == 0 { Side::Buy } else { Side::Sell };
            market
                .create_order(
                    Order {
                        side,
                        price: *price,
                        quantity: 1000,
                    },
                    Uuid::new_v4(),
                    clock,
                )
                .unwrap();
        }
    }

    fn assert_price(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected price {expected}, got {actual}"
        );
    }

    #[tokio::test]
    async fn test_market_survives_snapshot_then_tail_replay() {
        // Arrange
        let clock = FixedClock::default();
        let (snapshots, repo) = repository();
        let mut market = Market::init("m-1", "XNYS", Uuid::new_v4(), &clock).unwrap();
        place(
            &mut market,
            &[90.0, 91.0, 92.0, 93.0, 94.0, 95.0, 90.0, 91.0, 92.0, 93.0, 94.0],
            &clock,
        );
        repo.commit(&mut market, CommitOptions::default())
            .await
            .unwrap();

        // Act
        let view = get_market_by_id("m-1", &repo).await.unwrap();

        // Assert
        assert_eq!(view.version, 12);
        assert_eq!(view.snapshot_version, 12);
        assert_price(view.price, 92.272_727_272_727_27);
        assert_eq!(snapshots.stored("Market").len(), 1);

        // Act: two more orders on the reloaded market
        let mut reloaded = repo.get("m-1").await.unwrap().unwrap();
        place(&mut reloaded, &[90.0, 91.0], &clock);
        repo.commit(&mut reloaded, CommitOptions::default())
            .await
            .unwrap();
        let view = get_market_by_id("m-1", &repo).await.unwrap();

        // Assert
        assert_eq!(view.version, 14);
        assert_eq!(view.snapshot_version, 12);
        assert_eq!(view.orders.len(), 13);
        assert_price(view.price, 92.0);
    }

    #[tokio::test]
    async fn test_forced_snapshot_at_version_two() {
        let clock = FixedClock::default();
        let (_, repo) = repository();
        let mut market = Market::init("m-1", "XNYS", Uuid::new_v4(), &clock).unwrap();
        place(&mut market, &[90.0], &clock);

        repo.commit(&mut market, CommitOptions::force_snapshot())
            .await
            .unwrap();

        let view = get_market_by_id("m-1", &repo).await.unwrap();
        assert_eq!(view.version, 2);
        assert_eq!(view.snapshot_version, 2);
        assert_price(view.price, 90.0);
    }

    #[tokio::test]
    async fn test_get_market_by_id_returns_not_found_when_no_history() {
        // Arrange
        let (_, repo) = repository();

        // Act
        let result = get_market_by_id("m-404", &repo).await;

        // Assert
        match result {
            Err(DomainError::AggregateNotFound(id)) => assert_eq!(id, "m-404"),
            other => panic!("expected AggregateNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_list_markets_skips_unknown_ids_and_keeps_order() {
        // Arrange
        let clock = FixedClock::default();
        let (_, repo) = repository();
        let mut batch = Vec::new();
        for (id, exchange) in [("m-1", "XNYS"), ("m-2", "XLON"), ("m-3", "XTKS")] {
            let mut market = Market::init(id, exchange, Uuid::new_v4(), &clock).unwrap();
            place(&mut market, &[100.0], &clock);
            batch.push(market);
        }
        repo.commit_all(&mut batch, CommitOptions::default())
            .await
            .unwrap();
        let ids = vec!["m-3".to_owned(), "missing".to_owned(), "m-1".to_owned()];

        // Act
        let views = list_markets(Some(&ids), &repo).await.unwrap();

        // Assert
        let found: Vec<(&str, &str)> = views
            .iter()
            .map(|v| (v.market_id.as_str(), v.exchange.as_str()))
            .collect();
        assert_eq!(found, vec![("m-3", "XTKS"), ("m-1", "XNYS")]);
    }

    #[tokio::test]
    async fn test_list_markets_without_ids_lists_everything() {
        let clock = FixedClock::default();
        let (_, repo) = repository();
        for id in ["m-2", "m-1"] {
            let mut market = Market::init(id, "XNYS", Uuid::new_v4(), &clock).unwrap();
            repo.commit(&mut market, CommitOptions::default())
                .await
                .unwrap();
        }

        let views = list_markets(None, &repo).await.unwrap();

        let ids: Vec<&str> = views.iter().map(|v| v.market_id.as_str()).collect();
        assert_eq!(ids, vec!["m-1", "m-2"]);
    }
}
