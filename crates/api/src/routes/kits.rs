//! Kit catalog routes.

use std::collections::BTreeMap;

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use tracing::instrument;

use circuit_sphere_core::KitId;

use crate::error::Result;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::models::{Kit, KitFilter, KitPatch, NewKit};
use crate::state::AppState;

/// Query parameters for `GET /kits`.
#[derive(Debug, Default, Deserialize)]
pub struct ListKitsQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    pub active_only: Option<bool>,
    pub category: Option<String>,
    /// Free-text search over name and description.
    pub q: Option<String>,
}

impl From<ListKitsQuery> for KitFilter {
    fn from(query: ListKitsQuery) -> Self {
        let defaults = Self::default();
        Self {
            search: query.q,
            category: query.category,
            active_only: query.active_only.unwrap_or(defaults.active_only),
            skip: query.skip.unwrap_or(defaults.skip),
            limit: query.limit.unwrap_or(defaults.limit),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SaleToggle {
    pub on_sale: bool,
}

#[derive(Debug, Deserialize)]
pub struct SpecsUpdate {
    pub specifications: BTreeMap<String, String>,
    #[serde(default)]
    pub spec_images: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct StockAdjustment {
    /// Units to add (negative to remove).
    pub delta: i32,
}

#[instrument(skip(state))]
pub async fn list_kits(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListKitsQuery>,
) -> Result<Json<Vec<Kit>>> {
    Ok(Json(state.catalog().list_kits(query.into()).await?))
}

#[instrument(skip(state, kit))]
pub async fn create_kit(
    State(state): State<AppState>,
    ApiJson(kit): ApiJson<NewKit>,
) -> Result<(StatusCode, Json<Kit>)> {
    let kit = state.catalog().create_kit(kit).await?;
    Ok((StatusCode::CREATED, Json(kit)))
}

#[instrument(skip(state))]
pub async fn get_kit(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<KitId>,
) -> Result<Json<Kit>> {
    Ok(Json(state.catalog().get_kit(id).await?))
}

#[instrument(skip(state, patch))]
pub async fn update_kit(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<KitId>,
    ApiJson(patch): ApiJson<KitPatch>,
) -> Result<Json<Kit>> {
    Ok(Json(state.catalog().update_kit(id, patch).await?))
}

/// Soft delete.
#[instrument(skip(state))]
pub async fn delete_kit(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<KitId>,
) -> Result<StatusCode> {
    state.catalog().deactivate_kit(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn toggle_sale(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<KitId>,
    ApiJson(body): ApiJson<SaleToggle>,
) -> Result<Json<Kit>> {
    Ok(Json(state.catalog().toggle_sale(id, body.on_sale).await?))
}

#[instrument(skip(state, body))]
pub async fn update_specs(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<KitId>,
    ApiJson(body): ApiJson<SpecsUpdate>,
) -> Result<Json<Kit>> {
    let kit = state
        .catalog()
        .update_specs(id, body.specifications, body.spec_images)
        .await?;
    Ok(Json(kit))
}

#[instrument(skip(state))]
pub async fn adjust_stock(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<KitId>,
    ApiJson(body): ApiJson<StockAdjustment>,
) -> Result<Json<Kit>> {
    Ok(Json(state.catalog().adjust_stock(id, body.delta).await?))
}
