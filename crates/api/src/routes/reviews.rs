//! Review routes.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use tracing::instrument;

use circuit_sphere_core::{KitId, ReviewId};

use crate::error::Result;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::ClientIp;
use crate::models::{Review, SubmitReviewRequest};
use crate::services::reviews::DEFAULT_PAGE_SIZE;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ReviewPage {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

const fn default_limit() -> i64 {
    DEFAULT_PAGE_SIZE
}

#[derive(Debug, Deserialize)]
pub struct VisibilityUpdate {
    pub is_visible: bool,
}

#[instrument(skip(state))]
pub async fn list_reviews(
    State(state): State<AppState>,
    ApiPath(kit_id): ApiPath<KitId>,
    ApiQuery(page): ApiQuery<ReviewPage>,
) -> Result<Json<Vec<Review>>> {
    let reviews = state
        .reviews()
        .list_reviews(kit_id, page.skip, page.limit)
        .await?;
    Ok(Json(reviews))
}

#[instrument(skip(state, request))]
pub async fn submit_review(
    State(state): State<AppState>,
    ApiPath(kit_id): ApiPath<KitId>,
    ClientIp(ip): ClientIp,
    ApiJson(request): ApiJson<SubmitReviewRequest>,
) -> Result<(StatusCode, Json<Review>)> {
    let review = state.reviews().submit_review(kit_id, request, ip).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

/// Moderation: show or hide a review.
#[instrument(skip(state))]
pub async fn set_visibility(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ReviewId>,
    ApiJson(body): ApiJson<VisibilityUpdate>,
) -> Result<Json<Review>> {
    let review = state
        .reviews()
        .set_review_visibility(id, body.is_visible)
        .await?;
    Ok(Json(review))
}
