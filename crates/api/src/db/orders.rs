//! Order repository.
//!
//! Customer and line items are stored as JSONB snapshots. The customer
//! email is duplicated into its own column for lookups.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;

use circuit_sphere_core::{Email, OrderId, OrderStatus, Price};

use super::{PgStore, RepositoryError, non_negative};
use crate::models::{CustomerSnapshot, LineItem, NewOrder, Order};
use crate::store::OrderStore;

macro_rules! order_columns {
    () => {
        "id, customer, items, total_amount, payment_method, status, notes, \
         created_at, updated_at"
    };
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    customer: Json<CustomerSnapshot>,
    items: Json<Vec<LineItem>>,
    total_amount: Decimal,
    payment_method: String,
    status: OrderStatus,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let total_amount = Price::new(row.total_amount).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid order total in database: {e}"))
        })?;
        let customer = row.customer.0;
        // The JSONB snapshot bypasses `Email::parse`; re-check it here.
        Email::parse(customer.email.as_str()).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            customer,
            items: row.items.0,
            total_amount,
            payment_method: row.payment_method,
            status: row.status,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_orders(rows: Vec<OrderRow>) -> Result<Vec<Order>, RepositoryError> {
    rows.into_iter().map(Order::try_from).collect()
}

#[async_trait]
impl OrderStore for PgStore {
    async fn insert_order(
        &self,
        order: NewOrder,
        now: DateTime<Utc>,
    ) -> Result<Order, RepositoryError> {
        self.bounded(async {
            let row = sqlx::query_as::<_, OrderRow>(concat!(
                "INSERT INTO shop.customer_order \
                 (customer, customer_email, items, total_amount, payment_method, status, notes, \
                  created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8) \
                 RETURNING ",
                order_columns!()
            ))
            .bind(Json(&order.customer))
            .bind(order.customer.email.as_str())
            .bind(Json(&order.items))
            .bind(order.total_amount.amount())
            .bind(&order.payment_method)
            .bind(OrderStatus::Pending)
            .bind(order.notes.as_deref())
            .bind(now)
            .fetch_one(&self.pool)
            .await?;

            Order::try_from(row)
        })
        .await
    }

    async fn find_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        self.bounded(async {
            let row = sqlx::query_as::<_, OrderRow>(concat!(
                "SELECT ",
                order_columns!(),
                " FROM shop.customer_order WHERE id = $1"
            ))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

            row.map(Order::try_from).transpose()
        })
        .await
    }

    async fn list_orders(&self, skip: i64, limit: i64) -> Result<Vec<Order>, RepositoryError> {
        self.bounded(async {
            let rows = sqlx::query_as::<_, OrderRow>(concat!(
                "SELECT ",
                order_columns!(),
                " FROM shop.customer_order \
                 ORDER BY created_at DESC, id DESC \
                 OFFSET $1 LIMIT $2"
            ))
            .bind(non_negative(skip))
            .bind(non_negative(limit))
            .fetch_all(&self.pool)
            .await?;

            into_orders(rows)
        })
        .await
    }

    async fn orders_for_customer(&self, email: &Email) -> Result<Vec<Order>, RepositoryError> {
        self.bounded(async {
            let rows = sqlx::query_as::<_, OrderRow>(concat!(
                "SELECT ",
                order_columns!(),
                " FROM shop.customer_order \
                 WHERE lower(customer_email) = lower($1) \
                 ORDER BY created_at DESC, id DESC"
            ))
            .bind(email.as_str())
            .fetch_all(&self.pool)
            .await?;

            into_orders(rows)
        })
        .await
    }

    async fn orders_with_status(
        &self,
        status: OrderStatus,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Order>, RepositoryError> {
        self.bounded(async {
            let rows = sqlx::query_as::<_, OrderRow>(concat!(
                "SELECT ",
                order_columns!(),
                " FROM shop.customer_order \
                 WHERE status = $1 \
                 ORDER BY created_at DESC, id DESC \
                 OFFSET $2 LIMIT $3"
            ))
            .bind(status)
            .bind(non_negative(skip))
            .bind(non_negative(limit))
            .fetch_all(&self.pool)
            .await?;

            into_orders(rows)
        })
        .await
    }

    async fn set_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Order>, RepositoryError> {
        self.bounded(async {
            let row = sqlx::query_as::<_, OrderRow>(concat!(
                "UPDATE shop.customer_order SET status = $3, updated_at = $4 \
                 WHERE id = $1 AND status = $2 \
                 RETURNING ",
                order_columns!()
            ))
            .bind(id)
            .bind(from)
            .bind(to)
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;

            row.map(Order::try_from).transpose()
        })
        .await
    }
}
