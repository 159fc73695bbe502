//! Database operations for the shop `PostgreSQL`.
//!
//! # Schema: `shop`
//!
//! ## Tables
//!
//! - `kit` - Catalog entries, including stock and the review aggregate
//! - `customer_order` - Orders with customer and line-item snapshots (JSONB)
//! - `review` - Guest reviews with the submitter IP used for rate limiting
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p circuit-sphere-cli -- migrate
//! ```

pub mod kits;
pub mod orders;
pub mod reviews;

use std::future::Future;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation.
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// A stock adjustment would have taken the level below zero.
    #[error("insufficient stock: {available} available, adjustment of {delta}")]
    InsufficientStock { available: i32, delta: i32 },

    /// A stock adjustment would have exceeded the largest storable level.
    #[error("stock adjustment of {delta} is out of range")]
    StockOverflow { delta: i32 },

    /// The store did not answer within the configured time budget.
    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// `PostgreSQL`-backed implementation of all three store traits.
///
/// Every call is bounded by `timeout`. A call that runs out of time is
/// dropped, which rolls back whatever statement it had in flight.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    timeout: Duration,
}

impl PgStore {
    /// Wrap an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run a store operation within the time budget.
    async fn bounded<T, F>(&self, op: F) -> Result<T, RepositoryError>
    where
        F: Future<Output = Result<T, RepositoryError>> + Send,
    {
        tokio::time::timeout(self.timeout, op)
            .await
            .map_err(|_| RepositoryError::Timeout(self.timeout))?
    }
}

/// Convert a pagination value to the `BIGINT` Postgres expects, clamped at 0.
const fn non_negative(value: i64) -> i64 {
    if value < 0 { 0 } else { value }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_negative_clamps() {
        assert_eq!(non_negative(-5), 0);
        assert_eq!(non_negative(0), 0);
        assert_eq!(non_negative(42), 42);
    }

    #[test]
    fn test_insufficient_stock_message() {
        let err = RepositoryError::InsufficientStock {
            available: 3,
            delta: -4,
        };
        assert_eq!(
            err.to_string(),
            "insufficient stock: 3 available, adjustment of -4"
        );
    }
}
