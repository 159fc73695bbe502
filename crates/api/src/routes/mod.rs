//! HTTP routes.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                          - Liveness
//! GET    /health/ready                    - Readiness (store ping)
//!
//! # Kits
//! GET    /api/v1/kits                     - List (skip, limit, active_only, category, q)
//! POST   /api/v1/kits                     - Create
//! GET    /api/v1/kits/{id}                - Fetch
//! PUT    /api/v1/kits/{id}                - Partial update
//! DELETE /api/v1/kits/{id}                - Soft delete
//! PATCH  /api/v1/kits/{id}/toggle-sale    - Sale styling on/off
//! PUT    /api/v1/kits/{id}/specs          - Replace specifications
//! POST   /api/v1/kits/{id}/stock          - Adjust stock by a delta
//!
//! # Reviews
//! GET    /api/v1/kits/{id}/reviews        - Visible reviews, newest first
//! POST   /api/v1/kits/{id}/reviews        - Submit (rate limited per IP)
//! PATCH  /api/v1/reviews/{id}/visibility  - Moderation
//!
//! # Orders
//! GET    /api/v1/orders                   - List
//! POST   /api/v1/orders                   - Place
//! GET    /api/v1/orders/{id}              - Fetch
//! PATCH  /api/v1/orders/{id}/status       - Status transition
//! GET    /api/v1/orders/customer/{email}  - By customer email
//! GET    /api/v1/orders/status/{status}   - By status
//! ```

pub mod kits;
pub mod orders;
pub mod reviews;

use axum::{
    Router,
    extract::State,
    http::{HeaderValue, Method, Request, StatusCode, Uri},
    middleware,
    routing::{get, patch, post, put},
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::middleware::request_id_middleware;
use crate::state::AppState;

/// Versioned JSON API routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/kits", get(kits::list_kits).post(kits::create_kit))
        .route(
            "/kits/{id}",
            get(kits::get_kit)
                .put(kits::update_kit)
                .delete(kits::delete_kit),
        )
        .route("/kits/{id}/toggle-sale", patch(kits::toggle_sale))
        .route("/kits/{id}/specs", put(kits::update_specs))
        .route("/kits/{id}/stock", post(kits::adjust_stock))
        .route(
            "/kits/{id}/reviews",
            get(reviews::list_reviews).post(reviews::submit_review),
        )
        .route("/reviews/{id}/visibility", patch(reviews::set_visibility))
        .route("/orders", get(orders::list_orders).post(orders::place_order))
        .route("/orders/{id}", get(orders::get_order))
        .route("/orders/{id}/status", patch(orders::update_status))
        .route("/orders/customer/{email}", get(orders::orders_for_customer))
        .route("/orders/status/{status}", get(orders::orders_by_status))
}

/// The complete application router with tracing and request IDs.
///
/// CORS and Sentry layers depend on configuration and are added by the
/// binary.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api/v1", api_routes())
        .fallback(not_found)
        .with_state(state)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
}

/// CORS for the configured storefront origins.
#[must_use]
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([axum::http::header::CONTENT_TYPE])
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the store is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.health().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(uri.path().to_string())
}
