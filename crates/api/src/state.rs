//! Application state shared across handlers.

use std::sync::Arc;

use crate::services::{
    CatalogService, Clock, OrderNotifier, OrderService, ReviewService,
};
use crate::store::{CatalogStore, Stores};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. Everything in it is built
/// once at start-up from injected stores, clock and notifier.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    catalog: CatalogService,
    orders: OrderService,
    reviews: ReviewService,
    health: Arc<dyn CatalogStore>,
}

impl AppState {
    /// Wire the services together.
    ///
    /// # Arguments
    ///
    /// * `stores` - Kit, order and review stores
    /// * `notifier` - Sink for "new order" events
    /// * `clock` - Time source for timestamps and the review window
    /// * `review_window` - One review per IP and kit inside this window
    #[must_use]
    pub fn new(
        stores: Stores,
        notifier: Arc<dyn OrderNotifier>,
        clock: Arc<dyn Clock>,
        review_window: chrono::Duration,
    ) -> Self {
        let catalog = CatalogService::new(stores.catalog.clone(), clock.clone());
        let orders = OrderService::new(
            stores.catalog.clone(),
            stores.orders,
            notifier,
            clock.clone(),
        );
        let reviews = ReviewService::new(stores.catalog.clone(), stores.reviews, clock, review_window);

        Self {
            inner: Arc::new(AppStateInner {
                catalog,
                orders,
                reviews,
                health: stores.catalog,
            }),
        }
    }

    /// Get the catalog service.
    #[must_use]
    pub fn catalog(&self) -> &CatalogService {
        &self.inner.catalog
    }

    /// Get the order service.
    #[must_use]
    pub fn orders(&self) -> &OrderService {
        &self.inner.orders
    }

    /// Get the review service.
    #[must_use]
    pub fn reviews(&self) -> &ReviewService {
        &self.inner.reviews
    }

    /// Store handle used by the readiness probe.
    #[must_use]
    pub fn health(&self) -> &dyn CatalogStore {
        self.inner.health.as_ref()
    }
}
