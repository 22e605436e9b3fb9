//! Command handlers for the Market context.
//!
//! Each handler loads the aggregate through the repository, executes the
//! command, and commits the result.

use strata_core::aggregate::AggregateRoot;
use strata_core::clock::Clock;
use strata_core::command::Command;
use strata_core::error::DomainError;
use strata_core::options::CommitOptions;
use strata_core::repository::Repository;
use tracing::instrument;

use crate::domain::aggregates::Market;
use crate::domain::commands::{CreateOrder, InitMarket};
use crate::domain::events::Order;

/// Result of a successfully handled command.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketCommandResult {
    /// The aggregate ID affected by the command.
    pub aggregate_id: String,
    /// Market version after the commit.
    pub version: i64,
    /// Version of the newest durable snapshot after the commit.
    pub snapshot_version: i64,
}

impl MarketCommandResult {
    fn from_market(market: &Market) -> Self {
        Self {
            aggregate_id: market.aggregate_id().unwrap_or_default().to_owned(),
            version: market.version(),
            snapshot_version: market.snapshot_version(),
        }
    }
}

/// Handles the `InitMarket` command: opens the market and commits it.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the command is invalid or the market
/// already exists, or any error raised by the repository.
#[instrument(skip_all, fields(command_type = command.command_type(), market_id = %command.market_id))]
pub async fn handle_init_market(
    command: &InitMarket,
    clock: &dyn Clock,
    repo: &Repository<Market>,
) -> Result<MarketCommandResult, DomainError> {
    let mut market = Market::init(
        &command.market_id,
        &command.exchange,
        command.correlation_id,
        clock,
    )?;

    if repo.get(&command.market_id).await?.is_some() {
        return Err(DomainError::Validation(format!(
            "market {} already exists",
            command.market_id
        )));
    }

    repo.commit(&mut market, CommitOptions::default()).await?;
    Ok(MarketCommandResult::from_market(&market))
}

/// Handles the `CreateOrder` command: loads the market, places the order,
/// and commits it, snapshotting when due or when forced.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the market does not exist,
/// `DomainError::Validation` if the order is invalid, or any error raised by
/// the repository.
#[instrument(skip_all, fields(command_type = command.command_type(), market_id = %command.market_id))]
pub async fn handle_create_order(
    command: &CreateOrder,
    clock: &dyn Clock,
    repo: &Repository<Market>,
) -> Result<MarketCommandResult, DomainError> {
    let mut market = repo
        .get(&command.market_id)
        .await?
        .ok_or_else(|| DomainError::AggregateNotFound(command.market_id.clone()))?;

    market.create_order(
        Order {
            side: command.side,
            price: command.price,
            quantity: command.quantity,
        },
        command.correlation_id,
        clock,
    )?;

    let options = CommitOptions {
        force_snapshot: command.force_snapshot,
    };
    repo.commit(&mut market, options).await?;
    Ok(MarketCommandResult::from_market(&market))
}
