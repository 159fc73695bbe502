//! Order domain models.
//!
//! An order owns a snapshot of the customer's contact details and of each
//! line's title and unit price as they were at checkout. There is no
//! customer entity to point at.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use circuit_sphere_core::{Email, KitId, OrderId, OrderStatus, Price};

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Store-assigned id.
    pub id: OrderId,
    /// Contact and shipping details at order time.
    pub customer: CustomerSnapshot,
    /// Ordered lines, in the order the customer submitted them.
    pub items: Vec<LineItem>,
    /// Total as submitted by the client.
    pub total_amount: Price,
    /// Free-form payment method label, e.g. "cash_on_delivery".
    pub payment_method: String,
    /// Current lifecycle state.
    pub status: OrderStatus,
    /// Customer notes.
    pub notes: Option<String>,
    /// When the order was placed.
    pub created_at: DateTime<Utc>,
    /// When the order was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Customer details captured on the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerSnapshot {
    pub first_name: String,
    pub last_name: String,
    pub email: Email,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub zip: String,
    pub country: String,
}

impl CustomerSnapshot {
    /// "First Last", used in notifications.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_owned()
    }
}

/// One kit and quantity within an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Kit being bought.
    pub kit_id: KitId,
    /// Kit name at order time.
    pub title: String,
    /// Unit price at order time.
    pub unit_price: Price,
    /// Units ordered, at least 1.
    pub quantity: u32,
}

/// Validated input for persisting a new order.
///
/// The store sets the status to `Pending` and stamps both timestamps.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer: CustomerSnapshot,
    pub items: Vec<LineItem>,
    pub total_amount: Price,
    pub payment_method: String,
    pub notes: Option<String>,
}

// =============================================================================
// Request Types
// =============================================================================

/// Order placement request as submitted by the checkout.
///
/// Fields are kept raw so that each rule violation can be reported with
/// the offending field name.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlaceOrderRequest {
    pub customer: CustomerInput,
    pub items: Vec<LineItemInput>,
    pub payment_method: String,
    pub total_amount: Decimal,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Customer details as typed at checkout.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CustomerInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub zip: String,
    pub country: String,
}

/// One requested line.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LineItemInput {
    pub kit_id: KitId,
    pub title: String,
    pub unit_price: Decimal,
    pub quantity: i64,
}

/// Payload of the "new order" notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderPlaced {
    pub order_id: OrderId,
    pub customer_name: String,
    pub customer_email: Email,
    pub total_amount: Price,
}

impl From<&Order> for OrderPlaced {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.id,
            customer_name: order.customer.display_name(),
            customer_email: order.customer.email.clone(),
            total_amount: order.total_amount,
        }
    }
}
