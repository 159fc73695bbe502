//! Order placement and the order status state machine.
//!
//! Placement runs in three steps:
//!
//! 1. every line is checked against the catalog (exists, active, in stock)
//! 2. the order is persisted with status `pending`
//! 3. each line's quantity is deducted from stock
//!
//! Steps 2 and 3 are not atomic. A deduction that fails after the order is
//! stored is logged and the order stands; the store's stock guard keeps the
//! level from going negative.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::instrument;

use circuit_sphere_core::{Email, OrderId, OrderStatus};

use super::catalog::MAX_PAGE_SIZE;
use super::clock::Clock;
use super::error::{Result, ServiceError, ValidationError};
use super::notify::OrderNotifier;
use super::validate;
use crate::models::{
    CustomerInput, CustomerSnapshot, LineItem, NewOrder, Order, OrderPlaced, PlaceOrderRequest,
};
use crate::store::{CatalogStore, OrderStore};

const NOTES_MAX: usize = 1000;

/// Order workflows on top of the catalog and order stores.
#[derive(Clone)]
pub struct OrderService {
    kits: Arc<dyn CatalogStore>,
    orders: Arc<dyn OrderStore>,
    notifier: Arc<dyn OrderNotifier>,
    clock: Arc<dyn Clock>,
}

impl OrderService {
    /// Create a new order service.
    #[must_use]
    pub fn new(
        kits: Arc<dyn CatalogStore>,
        orders: Arc<dyn OrderStore>,
        notifier: Arc<dyn OrderNotifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            kits,
            orders,
            notifier,
            clock,
        }
    }

    /// Place an order.
    ///
    /// Returns the stored order with status `pending`.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` if the request is malformed or a
    /// line references an unknown kit.
    /// Returns `ServiceError::ProductUnavailable` if a kit is inactive.
    /// Returns `ServiceError::InsufficientStock` if a line asks for more
    /// than is on hand. Nothing is stored in any of these cases.
    #[instrument(skip(self, request), fields(items = request.items.len()))]
    pub async fn place_order(&self, request: PlaceOrderRequest) -> Result<Order> {
        let new_order = validate_request(request)?;
        self.check_stock(&new_order.items).await?;

        let computed = new_order.items.iter().try_fold(Decimal::ZERO, |sum, item| {
            item.unit_price
                .checked_times(item.quantity)
                .and_then(|line| sum.checked_add(line))
        });
        if computed != Some(new_order.total_amount.amount()) {
            tracing::warn!(
                submitted = %new_order.total_amount,
                computed = ?computed,
                "Order total does not match line items"
            );
        }

        let order = self.orders.insert_order(new_order, self.clock.now()).await?;
        tracing::info!(order_id = %order.id, total = %order.total_amount, "Order placed");

        self.deduct_stock(&order).await;
        self.notify(&order).await;

        Ok(order)
    }

    /// Check every line against the catalog without changing anything.
    ///
    /// Lines are checked in order and the first failure is returned.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::UnknownProduct`, `ServiceError::ProductUnavailable`
    /// or `ServiceError::InsufficientStock` for the first line that fails.
    pub async fn check_stock(&self, items: &[LineItem]) -> Result<()> {
        for item in items {
            let kit = self
                .kits
                .find_kit(item.kit_id)
                .await?
                .ok_or(ValidationError::UnknownProduct {
                    kit_id: item.kit_id,
                })?;

            if !kit.is_active {
                return Err(ServiceError::ProductUnavailable {
                    kit_id: kit.id,
                    title: kit.name,
                });
            }

            let available = kit.stock_quantity;
            if i64::from(available) < i64::from(item.quantity) {
                return Err(ServiceError::InsufficientStock {
                    kit_id: kit.id,
                    title: kit.name,
                    available,
                    requested: item.quantity,
                });
            }
        }
        Ok(())
    }

    async fn deduct_stock(&self, order: &Order) {
        for item in &order.items {
            let Ok(quantity) = i32::try_from(item.quantity) else {
                tracing::error!(order_id = %order.id, kit_id = %item.kit_id, "Line quantity out of range");
                continue;
            };

            if let Err(e) = self
                .kits
                .adjust_stock(item.kit_id, -quantity, self.clock.now())
                .await
            {
                tracing::error!(
                    order_id = %order.id,
                    kit_id = %item.kit_id,
                    quantity,
                    error = %e,
                    "Stock deduction failed after order was stored"
                );
            }
        }
    }

    async fn notify(&self, order: &Order) {
        let event = OrderPlaced::from(order);
        if let Err(e) = self.notifier.order_placed(&event).await {
            tracing::warn!(order_id = %order.id, error = %e, "Order notification failed");
        }
    }

    /// Move an order to `requested`.
    ///
    /// The store only writes if the order is still in the status the check
    /// was made against. When another update got there first the check is
    /// repeated against the new status; the transition graph has no cycles,
    /// so this ends after a handful of rounds.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the order does not exist.
    /// Returns `ValidationError::InvalidTransition` if the current status
    /// does not allow the move. The stored status is unchanged.
    #[instrument(skip(self), fields(order_id = %id, requested = %requested))]
    pub async fn update_status(&self, id: OrderId, requested: OrderStatus) -> Result<Order> {
        loop {
            let current = self.get_order(id).await?.status;

            if !current.can_transition_to(requested) {
                return Err(ValidationError::InvalidTransition {
                    current,
                    requested,
                    allowed: current.allowed_transitions(),
                }
                .into());
            }

            if let Some(order) = self
                .orders
                .set_status(id, current, requested, self.clock.now())
                .await?
            {
                tracing::info!(order_id = %id, from = %current, to = %requested, "Order status changed");
                return Ok(order);
            }

            tracing::debug!(order_id = %id, expected = %current, "Order status changed concurrently, re-checking");
        }
    }

    /// Fetch an order by id.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the order does not exist.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn get_order(&self, id: OrderId) -> Result<Order> {
        self.orders
            .find_order(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("order", id))
    }

    /// All orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Database` if the store fails.
    #[instrument(skip(self))]
    pub async fn list_orders(&self, skip: i64, limit: i64) -> Result<Vec<Order>> {
        Ok(self
            .orders
            .list_orders(skip.max(0), limit.clamp(0, MAX_PAGE_SIZE))
            .await?)
    }

    /// Orders placed with `email`, newest first. Matching ignores case.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` if `email` is not a valid address.
    #[instrument(skip(self, email))]
    pub async fn orders_for_customer(&self, email: &str) -> Result<Vec<Order>> {
        let email = Email::parse(email).map_err(|e| validate::invalid("email", e.to_string()))?;
        Ok(self.orders.orders_for_customer(&email).await?)
    }

    /// Orders in `status`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Database` if the store fails.
    #[instrument(skip(self), fields(status = %status))]
    pub async fn orders_by_status(
        &self,
        status: OrderStatus,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Order>> {
        Ok(self
            .orders
            .orders_with_status(status, skip.max(0), limit.clamp(0, MAX_PAGE_SIZE))
            .await?)
    }
}

fn validate_customer(input: CustomerInput) -> std::result::Result<CustomerSnapshot, ValidationError> {
    let email = Email::parse(&input.email)
        .map_err(|e| validate::invalid("customer.email", e.to_string()))?;

    Ok(CustomerSnapshot {
        first_name: validate::text("customer.first_name", &input.first_name, 1, 100)?,
        last_name: validate::text("customer.last_name", &input.last_name, 1, 100)?,
        email,
        phone: validate::text("customer.phone", &input.phone, 1, 30)?,
        address: validate::text("customer.address", &input.address, 1, 300)?,
        city: validate::text("customer.city", &input.city, 1, 100)?,
        zip: validate::text("customer.zip", &input.zip, 1, 20)?,
        country: validate::text("customer.country", &input.country, 1, 100)?,
    })
}

/// Turn a raw placement request into a storable order.
///
/// Pure: calling it twice on the same request gives the same outcome.
///
/// # Errors
///
/// Returns `ValidationError::InvalidInput` naming the first offending field.
pub fn validate_request(
    request: PlaceOrderRequest,
) -> std::result::Result<NewOrder, ValidationError> {
    if request.items.is_empty() {
        return Err(validate::invalid("items", "must contain at least one item"));
    }

    let customer = validate_customer(request.customer)?;

    let items = request
        .items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            let quantity = u32::try_from(item.quantity)
                .ok()
                .filter(|q| (1..=i32::MAX.unsigned_abs()).contains(q))
                .ok_or_else(|| {
                    validate::invalid(&format!("items[{i}].quantity"), "must be at least 1")
                })?;

            Ok(LineItem {
                kit_id: item.kit_id,
                title: validate::text(&format!("items[{i}].title"), &item.title, 1, 200)?,
                unit_price: validate::price(&format!("items[{i}].unit_price"), item.unit_price)?,
                quantity,
            })
        })
        .collect::<std::result::Result<Vec<_>, ValidationError>>()?;

    Ok(NewOrder {
        customer,
        items,
        total_amount: validate::price("total_amount", request.total_amount)?,
        payment_method: validate::text("payment_method", &request.payment_method, 1, 50)?,
        notes: validate::optional_text("notes", request.notes.as_deref(), NOTES_MAX)?,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use circuit_sphere_core::{KitId, Price};
    use tokio::sync::Mutex;

    use super::*;
    use crate::db::RepositoryError;
    use crate::models::{LineItemInput, NewKit};
    use crate::services::clock::ManualClock;
    use crate::services::notify::NotifyError;
    use crate::store::InMemoryStore;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<OrderPlaced>>,
    }

    #[async_trait]
    impl OrderNotifier for Recorder {
        async fn order_placed(&self, event: &OrderPlaced) -> std::result::Result<(), NotifyError> {
            self.events.lock().await.push(event.clone());
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl OrderNotifier for Failing {
        async fn order_placed(&self, _: &OrderPlaced) -> std::result::Result<(), NotifyError> {
            Err(NotifyError("smtp down".to_owned()))
        }
    }

    fn setup(notifier: Arc<dyn OrderNotifier>) -> (Arc<InMemoryStore>, OrderService) {
        let store = Arc::new(InMemoryStore::new());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
        ));
        let service = OrderService::new(store.clone(), store.clone(), notifier, clock);
        (store, service)
    }

    async fn kit(store: &InMemoryStore, stock: i32) -> KitId {
        let new_kit = NewKit {
            name: "Line Follower Robot".to_owned(),
            description: String::new(),
            category: "Robotics".to_owned(),
            price: Price::new(Decimal::new(2500, 2)).unwrap(),
            original_price: None,
            on_sale: false,
            specifications: BTreeMap::new(),
            spec_images: Vec::new(),
            image_urls: Vec::new(),
            components: Vec::new(),
            stock_quantity: stock,
        };
        store
            .insert_kit(new_kit, Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap())
            .await
            .unwrap()
            .id
    }

    fn request(kit_id: KitId, quantity: i64) -> PlaceOrderRequest {
        PlaceOrderRequest {
            customer: CustomerInput {
                first_name: "Grace".to_owned(),
                last_name: "Hopper".to_owned(),
                email: "grace@example.com".to_owned(),
                phone: "+1 555 0100".to_owned(),
                address: "1 Navy Way".to_owned(),
                city: "Arlington".to_owned(),
                zip: "22201".to_owned(),
                country: "US".to_owned(),
            },
            items: vec![LineItemInput {
                kit_id,
                title: "Line Follower Robot".to_owned(),
                unit_price: Decimal::new(2500, 2),
                quantity,
            }],
            payment_method: "cash_on_delivery".to_owned(),
            total_amount: Decimal::new(2500, 2) * Decimal::from(quantity),
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_place_order_deducts_and_notifies() {
        let recorder = Arc::new(Recorder::default());
        let (store, orders) = setup(recorder.clone());
        let kit_id = kit(&store, 5).await;

        let order = orders.place_order(request(kit_id, 2)).await.unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(store.find_kit(kit_id).await.unwrap().unwrap().stock_quantity, 3);

        let events = recorder.events.lock().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].order_id, order.id);
        assert_eq!(events[0].customer_name, "Grace Hopper");
        assert_eq!(events[0].customer_email.as_str(), "grace@example.com");
    }

    #[tokio::test]
    async fn test_notifier_failure_does_not_fail_placement() {
        let (store, orders) = setup(Arc::new(Failing));
        let kit_id = kit(&store, 1).await;

        let order = orders.place_order(request(kit_id, 1)).await.unwrap();
        assert!(orders.get_order(order.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_kit_is_a_validation_error() {
        let (_, orders) = setup(Arc::new(Recorder::default()));
        let err = orders
            .place_order(request(KitId::new(404), 1))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Validation(ValidationError::UnknownProduct { kit_id }) if kit_id == KitId::new(404)
        ));
    }

    #[tokio::test]
    async fn test_inactive_kit_is_unavailable() {
        let (store, orders) = setup(Arc::new(Recorder::default()));
        let kit_id = kit(&store, 5).await;
        let patch = crate::models::KitPatch {
            is_active: Some(false),
            ..Default::default()
        };
        store.update_kit(kit_id, &patch, Utc::now()).await.unwrap();

        let err = orders.place_order(request(kit_id, 1)).await.unwrap_err();
        assert!(matches!(err, ServiceError::ProductUnavailable { .. }));
        assert!(orders.list_orders(0, 10).await.unwrap().is_empty());
    }

    #[test]
    fn test_validate_request_rules() {
        let kit_id = KitId::new(1);

        let mut empty = request(kit_id, 1);
        empty.items.clear();
        assert!(matches!(
            validate_request(empty),
            Err(ValidationError::InvalidInput { ref field, .. }) if field == "items"
        ));

        assert!(matches!(
            validate_request(request(kit_id, 0)),
            Err(ValidationError::InvalidInput { ref field, .. }) if field == "items[0].quantity"
        ));

        let mut bad_email = request(kit_id, 1);
        bad_email.customer.email = "not-an-email".to_owned();
        assert!(matches!(
            validate_request(bad_email),
            Err(ValidationError::InvalidInput { ref field, .. }) if field == "customer.email"
        ));

        let mut free = request(kit_id, 1);
        free.total_amount = Decimal::ZERO;
        assert!(matches!(
            validate_request(free),
            Err(ValidationError::InvalidInput { ref field, .. }) if field == "total_amount"
        ));
    }

    #[tokio::test]
    async fn test_out_of_range_unit_price_is_rejected() {
        let (store, orders) = setup(Arc::new(Recorder::default()));
        let kit_id = kit(&store, 5).await;
        let mut huge = request(kit_id, 2);
        huge.items[0].unit_price = Decimal::MAX;
        huge.total_amount = Decimal::ONE;

        let err = orders.place_order(huge).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Validation(ValidationError::InvalidInput { ref field, .. })
                if field == "items[0].unit_price"
        ));
        assert_eq!(store.find_kit(kit_id).await.unwrap().unwrap().stock_quantity, 5);
    }

    #[tokio::test]
    async fn test_largest_line_total_does_not_overflow() {
        let (store, orders) = setup(Arc::new(Recorder::default()));
        let kit_id = kit(&store, i32::MAX).await;
        let mut large = request(kit_id, i64::from(i32::MAX));
        large.items[0].unit_price = Decimal::new(999_999_999_999, 2);
        large.total_amount = Decimal::ONE;

        let order = orders.place_order(large).await.unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
    }

    /// Lets the first two `find_order` calls through together so both
    /// updates check the same status before either writes.
    struct Lockstep {
        inner: Arc<InMemoryStore>,
        gate: tokio::sync::Barrier,
        reads: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl OrderStore for Lockstep {
        async fn insert_order(
            &self,
            order: NewOrder,
            now: chrono::DateTime<Utc>,
        ) -> std::result::Result<Order, RepositoryError> {
            self.inner.insert_order(order, now).await
        }

        async fn find_order(&self, id: OrderId) -> std::result::Result<Option<Order>, RepositoryError> {
            let found = self.inner.find_order(id).await;
            if self.reads.fetch_add(1, std::sync::atomic::Ordering::SeqCst) < 2 {
                self.gate.wait().await;
            }
            found
        }

        async fn list_orders(&self, skip: i64, limit: i64) -> std::result::Result<Vec<Order>, RepositoryError> {
            self.inner.list_orders(skip, limit).await
        }

        async fn orders_for_customer(
            &self,
            email: &Email,
        ) -> std::result::Result<Vec<Order>, RepositoryError> {
            self.inner.orders_for_customer(email).await
        }

        async fn orders_with_status(
            &self,
            status: OrderStatus,
            skip: i64,
            limit: i64,
        ) -> std::result::Result<Vec<Order>, RepositoryError> {
            self.inner.orders_with_status(status, skip, limit).await
        }

        async fn set_status(
            &self,
            id: OrderId,
            from: OrderStatus,
            to: OrderStatus,
            now: chrono::DateTime<Utc>,
        ) -> std::result::Result<Option<Order>, RepositoryError> {
            self.inner.set_status(id, from, to, now).await
        }
    }

    #[tokio::test]
    async fn test_concurrent_updates_cannot_leave_a_terminal_status() {
        let (store, seed) = setup(Arc::new(Recorder::default()));
        let kit_id = kit(&store, 5).await;
        let order = seed.place_order(request(kit_id, 1)).await.unwrap();

        let lockstep = Arc::new(Lockstep {
            inner: store.clone(),
            gate: tokio::sync::Barrier::new(2),
            reads: std::sync::atomic::AtomicUsize::new(0),
        });
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap()));
        let orders = OrderService::new(store.clone(), lockstep, Arc::new(Recorder::default()), clock);

        let (cancel, process) = tokio::join!(
            orders.update_status(order.id, OrderStatus::Cancelled),
            orders.update_status(order.id, OrderStatus::Processing),
        );

        // Either order of the two writes is a valid history, and both end cancelled.
        cancel.unwrap();
        if let Err(err) = process {
            assert!(matches!(
                err,
                ServiceError::Validation(ValidationError::InvalidTransition {
                    current: OrderStatus::Cancelled,
                    requested: OrderStatus::Processing,
                    ..
                })
            ));
        }
        let stored = store.find_order(order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_set_status_only_writes_from_expected_status() {
        let (store, orders) = setup(Arc::new(Recorder::default()));
        let kit_id = kit(&store, 5).await;
        let order = orders.place_order(request(kit_id, 1)).await.unwrap();

        let stale = store
            .set_status(order.id, OrderStatus::Processing, OrderStatus::Shipped, Utc::now())
            .await
            .unwrap();
        assert!(stale.is_none());
        assert_eq!(
            store.find_order(order.id).await.unwrap().unwrap().status,
            OrderStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_update_status_unknown_order() {
        let (_, orders) = setup(Arc::new(Recorder::default()));
        let err = orders
            .update_status(OrderId::new(1), OrderStatus::Processing)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { entity: "order", .. }));
    }
}
