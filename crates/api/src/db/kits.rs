//! Kit repository.
//!
//! Stock changes go through a single conditional `UPDATE` so concurrent
//! orders can never drive `stock_quantity` below zero. The table's `CHECK`
//! constraint backs this up for any other writer.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;

use circuit_sphere_core::{KitId, Price, RatingSummary};

use super::{PgStore, RepositoryError, non_negative};
use crate::models::{Component, Kit, KitFilter, KitPatch, NewKit};
use crate::store::CatalogStore;

macro_rules! kit_columns {
    () => {
        "id, name, description, category, price, original_price, on_sale, \
         specifications, spec_images, image_urls, components, stock_quantity, \
         is_active, average_rating, total_reviews, created_at, updated_at"
    };
}

#[derive(sqlx::FromRow)]
struct KitRow {
    id: KitId,
    name: String,
    description: String,
    category: String,
    price: Decimal,
    original_price: Option<Decimal>,
    on_sale: bool,
    specifications: Json<BTreeMap<String, String>>,
    spec_images: Json<Vec<String>>,
    image_urls: Json<Vec<String>>,
    components: Json<Vec<Component>>,
    stock_quantity: i32,
    is_active: bool,
    average_rating: f64,
    total_reviews: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn stored_price(amount: Decimal) -> Result<Price, RepositoryError> {
    Price::new(amount)
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid price in database: {e}")))
}

impl TryFrom<KitRow> for Kit {
    type Error = RepositoryError;

    fn try_from(row: KitRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            name: row.name,
            description: row.description,
            category: row.category,
            price: stored_price(row.price)?,
            original_price: row.original_price.map(stored_price).transpose()?,
            on_sale: row.on_sale,
            specifications: row.specifications.0,
            spec_images: row.spec_images.0,
            image_urls: row.image_urls.0,
            components: row.components.0,
            stock_quantity: row.stock_quantity,
            is_active: row.is_active,
            average_rating: row.average_rating,
            total_reviews: row.total_reviews,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Escape `ILIKE` metacharacters so user search text matches literally.
fn like_pattern(search: &str) -> String {
    let mut escaped = String::with_capacity(search.len() + 2);
    escaped.push('%');
    for c in search.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Trimmed, non-empty filter text.
fn filter_text(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn insert_kit(&self, kit: NewKit, now: DateTime<Utc>) -> Result<Kit, RepositoryError> {
        self.bounded(async {
            let row = sqlx::query_as::<_, KitRow>(concat!(
                "INSERT INTO shop.kit (name, description, category, price, original_price, \
                 on_sale, specifications, spec_images, image_urls, components, stock_quantity, \
                 created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $12) \
                 RETURNING ",
                kit_columns!()
            ))
            .bind(&kit.name)
            .bind(&kit.description)
            .bind(&kit.category)
            .bind(kit.price.amount())
            .bind(kit.original_price.map(Price::amount))
            .bind(kit.on_sale)
            .bind(Json(&kit.specifications))
            .bind(Json(&kit.spec_images))
            .bind(Json(&kit.image_urls))
            .bind(Json(&kit.components))
            .bind(kit.stock_quantity)
            .bind(now)
            .fetch_one(&self.pool)
            .await?;

            Kit::try_from(row)
        })
        .await
    }

    async fn find_kit(&self, id: KitId) -> Result<Option<Kit>, RepositoryError> {
        self.bounded(async {
            let row = sqlx::query_as::<_, KitRow>(concat!(
                "SELECT ",
                kit_columns!(),
                " FROM shop.kit WHERE id = $1"
            ))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

            row.map(Kit::try_from).transpose()
        })
        .await
    }

    async fn list_kits(&self, filter: &KitFilter) -> Result<Vec<Kit>, RepositoryError> {
        let search = filter_text(filter.search.as_deref()).map(like_pattern);
        let category = filter_text(filter.category.as_deref());

        self.bounded(async {
            let rows = sqlx::query_as::<_, KitRow>(concat!(
                "SELECT ",
                kit_columns!(),
                " FROM shop.kit \
                 WHERE (NOT $1 OR is_active) \
                   AND ($2::text IS NULL OR name ILIKE $2 OR description ILIKE $2) \
                   AND ($3::text IS NULL OR lower(category) = lower($3)) \
                 ORDER BY created_at DESC, id DESC \
                 OFFSET $4 LIMIT $5"
            ))
            .bind(filter.active_only)
            .bind(search.as_deref())
            .bind(category)
            .bind(non_negative(filter.skip))
            .bind(non_negative(filter.limit))
            .fetch_all(&self.pool)
            .await?;

            rows.into_iter().map(Kit::try_from).collect()
        })
        .await
    }

    async fn update_kit(
        &self,
        id: KitId,
        patch: &KitPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<Kit>, RepositoryError> {
        self.bounded(async {
            let mut tx = self.pool.begin().await?;

            let current = sqlx::query_as::<_, KitRow>(concat!(
                "SELECT ",
                kit_columns!(),
                " FROM shop.kit WHERE id = $1 FOR UPDATE"
            ))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

            let Some(current) = current else {
                return Ok(None);
            };
            let mut kit = Kit::try_from(current)?;
            patch.apply_to(&mut kit);

            let row = sqlx::query_as::<_, KitRow>(concat!(
                "UPDATE shop.kit SET name = $2, description = $3, category = $4, price = $5, \
                 original_price = $6, on_sale = $7, specifications = $8, spec_images = $9, \
                 image_urls = $10, components = $11, stock_quantity = $12, is_active = $13, \
                 updated_at = $14 \
                 WHERE id = $1 \
                 RETURNING ",
                kit_columns!()
            ))
            .bind(id)
            .bind(&kit.name)
            .bind(&kit.description)
            .bind(&kit.category)
            .bind(kit.price.amount())
            .bind(kit.original_price.map(Price::amount))
            .bind(kit.on_sale)
            .bind(Json(&kit.specifications))
            .bind(Json(&kit.spec_images))
            .bind(Json(&kit.image_urls))
            .bind(Json(&kit.components))
            .bind(kit.stock_quantity)
            .bind(kit.is_active)
            .bind(now)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.is_check_violation()
                {
                    return RepositoryError::Conflict("stock quantity cannot be negative".to_owned());
                }
                RepositoryError::Database(e)
            })?;

            tx.commit().await?;
            Kit::try_from(row).map(Some)
        })
        .await
    }

    async fn adjust_stock(
        &self,
        id: KitId,
        delta: i32,
        now: DateTime<Utc>,
    ) -> Result<Kit, RepositoryError> {
        self.bounded(async {
            let row = sqlx::query_as::<_, KitRow>(concat!(
                "UPDATE shop.kit \
                 SET stock_quantity = stock_quantity + $2, updated_at = $3 \
                 WHERE id = $1 AND stock_quantity + $2 >= 0 \
                 RETURNING ",
                kit_columns!()
            ))
            .bind(id)
            .bind(delta)
            .bind(now)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                if is_out_of_range(&e) {
                    return RepositoryError::StockOverflow { delta };
                }
                RepositoryError::Database(e)
            })?;

            if let Some(row) = row {
                return Kit::try_from(row);
            }

            // Nothing updated: either the kit is gone or the guard refused.
            let available: Option<i32> =
                sqlx::query_scalar("SELECT stock_quantity FROM shop.kit WHERE id = $1")
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await?;

            match available {
                Some(available) => Err(RepositoryError::InsufficientStock { available, delta }),
                None => Err(RepositoryError::NotFound),
            }
        })
        .await
    }

    async fn set_rating_summary(
        &self,
        id: KitId,
        summary: RatingSummary,
        now: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        self.bounded(async {
            let result = sqlx::query(
                r"
                UPDATE shop.kit
                SET average_rating = $2, total_reviews = $3, updated_at = $4
                WHERE id = $1
                ",
            )
            .bind(id)
            .bind(summary.average_rating)
            .bind(summary.total_reviews)
            .bind(now)
            .execute(&self.pool)
            .await?;

            if result.rows_affected() == 0 {
                return Err(RepositoryError::NotFound);
            }
            Ok(())
        })
        .await
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        self.bounded(async {
            sqlx::query("SELECT 1").execute(&self.pool).await?;
            Ok(())
        })
        .await
    }
}

/// SQLSTATE `22003`, raised when integer arithmetic overflows.
fn is_out_of_range(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("22003"))
}
