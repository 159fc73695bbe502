//! Store contracts for the three collections: kits, orders and reviews.
//!
//! Services only talk to these traits. Two implementations exist:
//!
//! - [`crate::db`] - `PostgreSQL` via sqlx (production)
//! - [`memory`] - process-local maps (tests and local development)
//!
//! Stores never read a clock. Callers pass `now` so that timestamps and the
//! review rate-limit window come from one injected source.

pub mod memory;

use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use circuit_sphere_core::{Email, KitId, OrderId, OrderStatus, RatingSummary, ReviewId};

pub use crate::db::RepositoryError;
use crate::models::{Kit, KitFilter, KitPatch, NewKit, NewOrder, NewReview, Order, Review};
pub use memory::InMemoryStore;

/// Catalog persistence.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Insert a kit with empty review aggregates.
    async fn insert_kit(&self, kit: NewKit, now: DateTime<Utc>) -> Result<Kit, RepositoryError>;

    /// Look up a kit by id.
    async fn find_kit(&self, id: KitId) -> Result<Option<Kit>, RepositoryError>;

    /// List kits matching a filter, newest first.
    async fn list_kits(&self, filter: &KitFilter) -> Result<Vec<Kit>, RepositoryError>;

    /// Apply a partial update. Returns `None` if the kit does not exist.
    async fn update_kit(
        &self,
        id: KitId,
        patch: &KitPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<Kit>, RepositoryError>;

    /// Add `delta` to the kit's stock.
    ///
    /// Fails with [`RepositoryError::InsufficientStock`] and leaves the stock
    /// untouched when the result would be negative, and with
    /// [`RepositoryError::NotFound`] when the kit does not exist.
    async fn adjust_stock(
        &self,
        id: KitId,
        delta: i32,
        now: DateTime<Utc>,
    ) -> Result<Kit, RepositoryError>;

    /// Overwrite the kit's derived review aggregate.
    async fn set_rating_summary(
        &self,
        id: KitId,
        summary: RatingSummary,
        now: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    /// Check that the backing store is reachable.
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

/// Order persistence.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert an order with status `Pending`.
    async fn insert_order(
        &self,
        order: NewOrder,
        now: DateTime<Utc>,
    ) -> Result<Order, RepositoryError>;

    /// Look up an order by id.
    async fn find_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// All orders, newest first.
    async fn list_orders(&self, skip: i64, limit: i64) -> Result<Vec<Order>, RepositoryError>;

    /// Orders placed with the given email, newest first.
    async fn orders_for_customer(&self, email: &Email) -> Result<Vec<Order>, RepositoryError>;

    /// Orders currently in `status`, newest first.
    async fn orders_with_status(
        &self,
        status: OrderStatus,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Order>, RepositoryError>;

    /// Move the order from `from` to `to` if it is still in `from`.
    ///
    /// Returns `None` if the order does not exist or its status is no
    /// longer `from`; nothing is written in either case.
    async fn set_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Order>, RepositoryError>;
}

/// Review persistence.
#[async_trait]
pub trait ReviewStore: Send + Sync {
    /// Insert a visible review.
    async fn insert_review(
        &self,
        review: NewReview,
        now: DateTime<Utc>,
    ) -> Result<Review, RepositoryError>;

    /// Count reviews of `kit_id` from `ip` created at or after `since`.
    async fn count_recent(
        &self,
        kit_id: KitId,
        ip: IpAddr,
        since: DateTime<Utc>,
    ) -> Result<i64, RepositoryError>;

    /// Visible reviews of a kit, newest first.
    async fn list_visible(
        &self,
        kit_id: KitId,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Review>, RepositoryError>;

    /// Aggregate over the kit's visible reviews.
    async fn rating_summary(&self, kit_id: KitId) -> Result<RatingSummary, RepositoryError>;

    /// Show or hide a review. Returns `None` if the review does not exist.
    async fn set_visibility(
        &self,
        id: ReviewId,
        visible: bool,
    ) -> Result<Option<Review>, RepositoryError>;
}

/// Handles to all three stores, built once at start-up.
#[derive(Clone)]
pub struct Stores {
    pub catalog: Arc<dyn CatalogStore>,
    pub orders: Arc<dyn OrderStore>,
    pub reviews: Arc<dyn ReviewStore>,
}

impl Stores {
    /// All three collections backed by one in-memory store.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_shared(Arc::new(InMemoryStore::new()))
    }

    /// All three collections backed by one shared implementation.
    #[must_use]
    pub fn from_shared<S>(store: Arc<S>) -> Self
    where
        S: CatalogStore + OrderStore + ReviewStore + 'static,
    {
        Self {
            catalog: store.clone(),
            orders: store.clone(),
            reviews: store,
        }
    }
}
