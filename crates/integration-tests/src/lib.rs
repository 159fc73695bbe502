//! Shared harness for the Circuit Sphere integration tests.
//!
//! Most suites run the real services and router against the in-memory
//! store with a [`ManualClock`], so they need nothing running. The
//! `postgres` suite is `#[ignore]`d and needs a migrated database:
//!
//! ```bash
//! cargo run -p circuit-sphere-cli -- migrate
//! cargo test -p circuit-sphere-integration-tests -- --ignored
//! ```

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use axum::Router;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use tower::ServiceExt;

use circuit_sphere_api::models::{
    CustomerInput, Kit, LineItemInput, NewKit, OrderPlaced, PlaceOrderRequest,
    SubmitReviewRequest,
};
use circuit_sphere_api::routes;
use circuit_sphere_api::services::{ManualClock, NotifyError, OrderNotifier};
use circuit_sphere_api::state::AppState;
use circuit_sphere_api::store::Stores;
use circuit_sphere_core::{KitId, Price};

/// Rate-limit window used by the harness.
pub const REVIEW_WINDOW: chrono::Duration = chrono::Duration::minutes(10);

/// Keeps every "new order" event for later inspection.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<OrderPlaced>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<OrderPlaced> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl OrderNotifier for RecordingNotifier {
    async fn order_placed(&self, event: &OrderPlaced) -> Result<(), NotifyError> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
        Ok(())
    }
}

/// Services and router over a fresh in-memory store.
pub struct TestApp {
    pub state: AppState,
    pub clock: Arc<ManualClock>,
    pub notifier: Arc<RecordingNotifier>,
}

impl TestApp {
    #[must_use]
    pub fn new() -> Self {
        Self::with_stores(Stores::in_memory())
    }

    #[must_use]
    pub fn with_stores(stores: Stores) -> Self {
        let clock = Arc::new(ManualClock::new(start_time()));
        let notifier = Arc::new(RecordingNotifier::default());
        let state = AppState::new(stores, notifier.clone(), clock.clone(), REVIEW_WINDOW);
        Self {
            state,
            clock,
            notifier,
        }
    }

    #[must_use]
    pub fn router(&self) -> Router {
        routes::app(self.state.clone())
    }

    /// Create an active kit with the given stock.
    pub async fn kit(&self, name: &str, price: &str, stock: i32) -> Kit {
        self.state
            .catalog()
            .create_kit(new_kit(name, price, stock))
            .await
            .unwrap()
    }

    pub async fn stock_of(&self, id: KitId) -> i32 {
        self.state.catalog().get_kit(id).await.unwrap().stock_quantity
    }

    /// Send a request through the full router and decode the JSON body.
    ///
    /// Empty bodies decode as `Value::Null`.
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, body)
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// A fixed, readable start instant.
#[must_use]
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

#[must_use]
pub fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

#[must_use]
pub fn new_kit(name: &str, price: &str, stock: i32) -> NewKit {
    NewKit {
        name: name.to_string(),
        description: format!("{name} with everything needed to get started"),
        category: "IoT".to_string(),
        price: Price::new(dec(price)).unwrap(),
        original_price: None,
        on_sale: false,
        specifications: BTreeMap::from([("Voltage".to_string(), "5V".to_string())]),
        spec_images: Vec::new(),
        image_urls: Vec::new(),
        components: Vec::new(),
        stock_quantity: stock,
    }
}

#[must_use]
pub fn customer() -> CustomerInput {
    CustomerInput {
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        email: "ada@example.com".to_string(),
        phone: "+44 20 7946 0000".to_string(),
        address: "12 Analytical Row".to_string(),
        city: "London".to_string(),
        zip: "N1 7AA".to_string(),
        country: "UK".to_string(),
    }
}

/// An order for `quantity` of `kit` whose total matches the line.
#[must_use]
pub fn order_for(kit: &Kit, quantity: i64) -> PlaceOrderRequest {
    let unit_price = kit.price.amount();
    PlaceOrderRequest {
        customer: customer(),
        items: vec![LineItemInput {
            kit_id: kit.id,
            title: kit.name.clone(),
            unit_price,
            quantity,
        }],
        payment_method: "cash_on_delivery".to_string(),
        total_amount: unit_price * Decimal::from(quantity),
        notes: None,
    }
}

#[must_use]
pub fn review(name: &str, rating: i64) -> SubmitReviewRequest {
    SubmitReviewRequest {
        reviewer_name: name.to_string(),
        rating,
        comment: "Worked first time, clear instructions.".to_string(),
    }
}

#[must_use]
pub fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

#[must_use]
pub fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[must_use]
pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}
