//! Server configuration read from the environment.

use strata_core::options::{DEFAULT_SNAPSHOT_FREQUENCY, RepositoryOptions};

use crate::error::AppError;

/// Runtime configuration for the API server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// `PostgreSQL` connection string.
    pub database_url: String,
    /// Interface to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Events allowed between snapshots.
    pub snapshot_frequency: i64,
    /// Upper bound on pooled database connections.
    pub db_max_connections: u32,
}

impl Config {
    /// Reads configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `DATABASE_URL` is missing or a numeric
    /// variable does not parse.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`, applying defaults for every
    /// optional key.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `DATABASE_URL` is missing or a numeric
    /// variable does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let database_url = lookup("DATABASE_URL").ok_or_else(|| {
            AppError::Config("DATABASE_URL environment variable must be set".into())
        })?;
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_owned());
        let port = parse_or(&lookup, "PORT", 3000)?;
        let snapshot_frequency =
            parse_or(&lookup, "SNAPSHOT_FREQUENCY", DEFAULT_SNAPSHOT_FREQUENCY)?;
        let db_max_connections = parse_or(&lookup, "DB_MAX_CONNECTIONS", 10)?;

        Ok(Self {
            database_url,
            host,
            port,
            snapshot_frequency,
            db_max_connections,
        })
    }

    /// Repository options derived from this configuration.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the snapshot frequency is below 1.
    pub fn repository_options(&self) -> Result<RepositoryOptions, AppError> {
        RepositoryOptions::default()
            .with_snapshot_frequency(self.snapshot_frequency)
            .map_err(|e| AppError::Config(format!("SNAPSHOT_FREQUENCY: {e}")))
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .parse()
            .map_err(|e| AppError::Config(format!("{key} must be a valid number: {e}"))),
        None => Ok(default),
    }
}
