//! In-memory store for tests and local development.
//!
//! One [`InMemoryStore`] implements all three store traits over a single
//! lock, so each call is atomic on its own. Multi-call sequences are not,
//! which matches what the services expect from the database.

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use circuit_sphere_core::{Email, KitId, OrderId, OrderStatus, RatingSummary, ReviewId};

use super::{CatalogStore, OrderStore, RepositoryError, ReviewStore};
use crate::models::{Kit, KitFilter, KitPatch, NewKit, NewOrder, NewReview, Order, Review};

#[derive(Default)]
struct Collections {
    kits: BTreeMap<KitId, Kit>,
    orders: BTreeMap<OrderId, Order>,
    reviews: BTreeMap<ReviewId, Review>,
    last_kit_id: i32,
    last_order_id: i32,
    last_review_id: i32,
}

/// Thread-safe in-memory store.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Collections>>,
}

impl InMemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Apply offset pagination to an already ordered iterator.
fn page<T>(items: impl Iterator<Item = T>, skip: i64, limit: i64) -> Vec<T> {
    let skip = usize::try_from(skip).unwrap_or(0);
    let limit = usize::try_from(limit).unwrap_or(0);
    items.skip(skip).take(limit).collect()
}

/// Sort newest first, breaking ties by id so pages are stable.
fn newest_first<T, K: Ord>(items: &mut [T], key: impl Fn(&T) -> (DateTime<Utc>, K)) {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn insert_kit(&self, kit: NewKit, now: DateTime<Utc>) -> Result<Kit, RepositoryError> {
        let mut db = self.inner.write().await;
        db.last_kit_id += 1;
        let id = KitId::new(db.last_kit_id);

        let kit = Kit {
            id,
            name: kit.name,
            description: kit.description,
            category: kit.category,
            price: kit.price,
            original_price: kit.original_price,
            on_sale: kit.on_sale,
            specifications: kit.specifications,
            spec_images: kit.spec_images,
            image_urls: kit.image_urls,
            components: kit.components,
            stock_quantity: kit.stock_quantity,
            is_active: true,
            average_rating: 0.0,
            total_reviews: 0,
            created_at: now,
            updated_at: now,
        };
        db.kits.insert(id, kit.clone());
        Ok(kit)
    }

    async fn find_kit(&self, id: KitId) -> Result<Option<Kit>, RepositoryError> {
        Ok(self.inner.read().await.kits.get(&id).cloned())
    }

    async fn list_kits(&self, filter: &KitFilter) -> Result<Vec<Kit>, RepositoryError> {
        let db = self.inner.read().await;
        let mut kits: Vec<Kit> = db
            .kits
            .values()
            .filter(|k| filter.matches(k))
            .cloned()
            .collect();
        newest_first(&mut kits, |k| (k.created_at, k.id));
        Ok(page(kits.into_iter(), filter.skip, filter.limit))
    }

    async fn update_kit(
        &self,
        id: KitId,
        patch: &KitPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<Kit>, RepositoryError> {
        let mut db = self.inner.write().await;
        let Some(kit) = db.kits.get_mut(&id) else {
            return Ok(None);
        };
        patch.apply_to(kit);
        kit.updated_at = now;
        Ok(Some(kit.clone()))
    }

    async fn adjust_stock(
        &self,
        id: KitId,
        delta: i32,
        now: DateTime<Utc>,
    ) -> Result<Kit, RepositoryError> {
        let mut db = self.inner.write().await;
        let kit = db.kits.get_mut(&id).ok_or(RepositoryError::NotFound)?;

        let new_quantity = kit
            .stock_quantity
            .checked_add(delta)
            .ok_or(RepositoryError::StockOverflow { delta })?;
        if new_quantity < 0 {
            return Err(RepositoryError::InsufficientStock {
                available: kit.stock_quantity,
                delta,
            });
        }

        kit.stock_quantity = new_quantity;
        kit.updated_at = now;
        Ok(kit.clone())
    }

    async fn set_rating_summary(
        &self,
        id: KitId,
        summary: RatingSummary,
        now: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut db = self.inner.write().await;
        let kit = db.kits.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        kit.average_rating = summary.average_rating;
        kit.total_reviews = summary.total_reviews;
        kit.updated_at = now;
        Ok(())
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn insert_order(
        &self,
        order: NewOrder,
        now: DateTime<Utc>,
    ) -> Result<Order, RepositoryError> {
        let mut db = self.inner.write().await;
        db.last_order_id += 1;
        let id = OrderId::new(db.last_order_id);

        let order = Order {
            id,
            customer: order.customer,
            items: order.items,
            total_amount: order.total_amount,
            payment_method: order.payment_method,
            status: OrderStatus::Pending,
            notes: order.notes,
            created_at: now,
            updated_at: now,
        };
        db.orders.insert(id, order.clone());
        Ok(order)
    }

    async fn find_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.inner.read().await.orders.get(&id).cloned())
    }

    async fn list_orders(&self, skip: i64, limit: i64) -> Result<Vec<Order>, RepositoryError> {
        let db = self.inner.read().await;
        let mut orders: Vec<Order> = db.orders.values().cloned().collect();
        newest_first(&mut orders, |o| (o.created_at, o.id));
        Ok(page(orders.into_iter(), skip, limit))
    }

    async fn orders_for_customer(&self, email: &Email) -> Result<Vec<Order>, RepositoryError> {
        let db = self.inner.read().await;
        let mut orders: Vec<Order> = db
            .orders
            .values()
            .filter(|o| o.customer.email.as_str().eq_ignore_ascii_case(email.as_str()))
            .cloned()
            .collect();
        newest_first(&mut orders, |o| (o.created_at, o.id));
        Ok(orders)
    }

    async fn orders_with_status(
        &self,
        status: OrderStatus,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Order>, RepositoryError> {
        let db = self.inner.read().await;
        let mut orders: Vec<Order> = db
            .orders
            .values()
            .filter(|o| o.status == status)
            .cloned()
            .collect();
        newest_first(&mut orders, |o| (o.created_at, o.id));
        Ok(page(orders.into_iter(), skip, limit))
    }

    async fn set_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Order>, RepositoryError> {
        let mut db = self.inner.write().await;
        let Some(order) = db.orders.get_mut(&id).filter(|o| o.status == from) else {
            return Ok(None);
        };
        order.status = to;
        order.updated_at = now;
        Ok(Some(order.clone()))
    }
}

#[async_trait]
impl ReviewStore for InMemoryStore {
    async fn insert_review(
        &self,
        review: NewReview,
        now: DateTime<Utc>,
    ) -> Result<Review, RepositoryError> {
        let mut db = self.inner.write().await;
        db.last_review_id += 1;
        let id = ReviewId::new(db.last_review_id);

        let review = Review {
            id,
            kit_id: review.kit_id,
            reviewer_name: review.reviewer_name,
            rating: review.rating,
            comment: review.comment,
            submitter_ip: review.submitter_ip,
            is_visible: true,
            created_at: now,
        };
        db.reviews.insert(id, review.clone());
        Ok(review)
    }

    async fn count_recent(
        &self,
        kit_id: KitId,
        ip: IpAddr,
        since: DateTime<Utc>,
    ) -> Result<i64, RepositoryError> {
        let db = self.inner.read().await;
        let count = db
            .reviews
            .values()
            .filter(|r| r.kit_id == kit_id && r.submitter_ip == ip && r.created_at >= since)
            .count();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }

    async fn list_visible(
        &self,
        kit_id: KitId,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Review>, RepositoryError> {
        let db = self.inner.read().await;
        let mut reviews: Vec<Review> = db
            .reviews
            .values()
            .filter(|r| r.kit_id == kit_id && r.is_visible)
            .cloned()
            .collect();
        newest_first(&mut reviews, |r| (r.created_at, r.id));
        Ok(page(reviews.into_iter(), skip, limit))
    }

    async fn rating_summary(&self, kit_id: KitId) -> Result<RatingSummary, RepositoryError> {
        let db = self.inner.read().await;
        Ok(RatingSummary::from_ratings(
            db.reviews
                .values()
                .filter(|r| r.kit_id == kit_id && r.is_visible)
                .map(|r| r.rating),
        ))
    }

    async fn set_visibility(
        &self,
        id: ReviewId,
        visible: bool,
    ) -> Result<Option<Review>, RepositoryError> {
        let mut db = self.inner.write().await;
        let Some(review) = db.reviews.get_mut(&id) else {
            return Ok(None);
        };
        review.is_visible = visible;
        Ok(Some(review.clone()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use circuit_sphere_core::{Price, Rating};
    use rust_decimal::Decimal;

    use super::*;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, minute, 0).unwrap()
    }

    fn new_kit(name: &str, stock: i32) -> NewKit {
        NewKit {
            name: name.to_owned(),
            description: format!("{name} description"),
            category: "IoT".to_owned(),
            price: Price::new(Decimal::new(4999, 2)).unwrap(),
            original_price: None,
            on_sale: false,
            specifications: BTreeMap::new(),
            spec_images: Vec::new(),
            image_urls: Vec::new(),
            components: Vec::new(),
            stock_quantity: stock,
        }
    }

    #[tokio::test]
    async fn test_adjust_stock_never_goes_negative() {
        let store = InMemoryStore::new();
        let kit = store.insert_kit(new_kit("ESP32", 5), at(0)).await.unwrap();

        let kit = store.adjust_stock(kit.id, -3, at(1)).await.unwrap();
        assert_eq!(kit.stock_quantity, 2);

        let err = store.adjust_stock(kit.id, -3, at(2)).await.unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::InsufficientStock {
                available: 2,
                delta: -3
            }
        ));

        let unchanged = store.find_kit(kit.id).await.unwrap().unwrap();
        assert_eq!(unchanged.stock_quantity, 2);
        assert_eq!(unchanged.updated_at, at(1));
    }

    #[tokio::test]
    async fn test_adjust_stock_overflow_is_not_insufficient_stock() {
        let store = InMemoryStore::new();
        let kit = store.insert_kit(new_kit("ESP32", 5), at(0)).await.unwrap();

        let err = store.adjust_stock(kit.id, i32::MAX, at(1)).await.unwrap_err();
        assert!(matches!(err, RepositoryError::StockOverflow { delta: i32::MAX }));
        assert_eq!(store.find_kit(kit.id).await.unwrap().unwrap().stock_quantity, 5);
    }

    #[tokio::test]
    async fn test_adjust_stock_unknown_kit() {
        let store = InMemoryStore::new();
        let err = store.adjust_stock(KitId::new(99), 1, at(0)).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_list_kits_newest_first_with_pagination() {
        let store = InMemoryStore::new();
        for (minute, name) in [(0, "A"), (1, "B"), (2, "C")] {
            store.insert_kit(new_kit(name, 1), at(minute)).await.unwrap();
        }

        let filter = KitFilter {
            skip: 1,
            limit: 5,
            ..KitFilter::default()
        };
        let names: Vec<_> = store
            .list_kits(&filter)
            .await
            .unwrap()
            .into_iter()
            .map(|k| k.name)
            .collect();
        assert_eq!(names, ["B", "A"]);
    }

    #[tokio::test]
    async fn test_count_recent_is_scoped_to_kit_ip_and_window() {
        let store = InMemoryStore::new();
        let ip: IpAddr = "203.0.113.7".parse().unwrap();
        let other_ip: IpAddr = "203.0.113.8".parse().unwrap();

        store
            .insert_review(
                NewReview {
                    kit_id: KitId::new(1),
                    reviewer_name: "Ada".to_owned(),
                    rating: Rating::new(5).unwrap(),
                    comment: "Great".to_owned(),
                    submitter_ip: ip,
                },
                at(10),
            )
            .await
            .unwrap();

        assert_eq!(store.count_recent(KitId::new(1), ip, at(5)).await.unwrap(), 1);
        assert_eq!(store.count_recent(KitId::new(1), ip, at(11)).await.unwrap(), 0);
        assert_eq!(store.count_recent(KitId::new(2), ip, at(5)).await.unwrap(), 0);
        assert_eq!(
            store.count_recent(KitId::new(1), other_ip, at(5)).await.unwrap(),
            0
        );
    }
}
