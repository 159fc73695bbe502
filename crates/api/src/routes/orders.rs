//! Order routes.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use tracing::instrument;

use circuit_sphere_core::{OrderId, OrderStatus};

use crate::error::{AppError, Result};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::models::{Order, PlaceOrderRequest};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

const fn default_limit() -> i64 {
    100
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
}

#[instrument(skip(state))]
pub async fn list_orders(
    State(state): State<AppState>,
    ApiQuery(page): ApiQuery<Page>,
) -> Result<Json<Vec<Order>>> {
    Ok(Json(state.orders().list_orders(page.skip, page.limit).await?))
}

#[instrument(skip(state, request))]
pub async fn place_order(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<Order>)> {
    let order = state.orders().place_order(request).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

#[instrument(skip(state))]
pub async fn get_order(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<OrderId>,
) -> Result<Json<Order>> {
    Ok(Json(state.orders().get_order(id).await?))
}

#[instrument(skip(state))]
pub async fn update_status(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<OrderId>,
    ApiJson(body): ApiJson<StatusUpdate>,
) -> Result<Json<Order>> {
    Ok(Json(state.orders().update_status(id, body.status).await?))
}

#[instrument(skip(state, email))]
pub async fn orders_for_customer(
    State(state): State<AppState>,
    ApiPath(email): ApiPath<String>,
) -> Result<Json<Vec<Order>>> {
    Ok(Json(state.orders().orders_for_customer(&email).await?))
}

#[instrument(skip(state))]
pub async fn orders_by_status(
    State(state): State<AppState>,
    ApiPath(status): ApiPath<String>,
    ApiQuery(page): ApiQuery<Page>,
) -> Result<Json<Vec<Order>>> {
    let status = status.parse::<OrderStatus>().map_err(AppError::BadRequest)?;
    let orders = state
        .orders()
        .orders_by_status(status, page.skip, page.limit)
        .await?;
    Ok(Json(orders))
}
