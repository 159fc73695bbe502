//! Guest reviews: rate-limited submission, listing, moderation.
//!
//! A kit's `average_rating` and `total_reviews` are recomputed from all of
//! its visible reviews after every insert or visibility change.

use std::net::IpAddr;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::instrument;

use circuit_sphere_core::{KitId, Rating, RatingSummary, ReviewId};

use super::clock::Clock;
use super::error::{Result, ServiceError, ValidationError};
use super::validate;
use crate::models::{NewReview, Review, SubmitReviewRequest};
use crate::store::{CatalogStore, ReviewStore};

/// Reviews per page when the caller does not say.
pub const DEFAULT_PAGE_SIZE: i64 = 6;
/// Largest review page.
pub const MAX_PAGE_SIZE: i64 = 50;
/// One review per IP and kit inside this window.
pub const DEFAULT_RATE_LIMIT_WINDOW: Duration = Duration::minutes(10);

const NAME_MAX: usize = 50;
const COMMENT_MAX: usize = 1000;

/// Review workflows on top of the review and catalog stores.
#[derive(Clone)]
pub struct ReviewService {
    kits: Arc<dyn CatalogStore>,
    reviews: Arc<dyn ReviewStore>,
    clock: Arc<dyn Clock>,
    window: Duration,
}

impl ReviewService {
    /// Create a new review service with the given rate-limit window.
    #[must_use]
    pub fn new(
        kits: Arc<dyn CatalogStore>,
        reviews: Arc<dyn ReviewStore>,
        clock: Arc<dyn Clock>,
        window: Duration,
    ) -> Self {
        Self {
            kits,
            reviews,
            clock,
            window,
        }
    }

    /// Submit a guest review.
    ///
    /// # Arguments
    ///
    /// * `kit_id` - Kit being reviewed
    /// * `request` - Name, rating and comment as posted
    /// * `ip` - Submitter address, used only for the rate limit
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` if a field is out of range or the
    /// same IP already reviewed this kit inside the window.
    /// Returns `ServiceError::NotFound` if the kit does not exist.
    #[instrument(skip(self, request), fields(kit_id = %kit_id, ip = %ip))]
    pub async fn submit_review(
        &self,
        kit_id: KitId,
        request: SubmitReviewRequest,
        ip: IpAddr,
    ) -> Result<Review> {
        let review = validate_review(kit_id, request, ip)?;

        if self.kits.find_kit(kit_id).await?.is_none() {
            return Err(ServiceError::not_found("kit", kit_id));
        }

        let now = self.clock.now();
        let recent = self
            .reviews
            .count_recent(kit_id, ip, now - self.window)
            .await?;
        if recent > 0 {
            tracing::info!(kit_id = %kit_id, ip = %ip, "Review rate limited");
            return Err(ValidationError::RateLimited {
                kit_id,
                retry_after_secs: self.window.num_seconds().unsigned_abs(),
            }
            .into());
        }

        let review = self.reviews.insert_review(review, now).await?;
        self.recompute(kit_id, now).await?;

        tracing::info!(review_id = %review.id, rating = review.rating.value(), "Review submitted");
        Ok(review)
    }

    /// Visible reviews of a kit, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Database` if the store fails.
    #[instrument(skip(self), fields(kit_id = %kit_id))]
    pub async fn list_reviews(&self, kit_id: KitId, skip: i64, limit: i64) -> Result<Vec<Review>> {
        Ok(self
            .reviews
            .list_visible(kit_id, skip.max(0), limit.clamp(0, MAX_PAGE_SIZE))
            .await?)
    }

    /// Show or hide a review and refresh its kit's aggregate.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the review does not exist.
    #[instrument(skip(self), fields(review_id = %id))]
    pub async fn set_review_visibility(&self, id: ReviewId, visible: bool) -> Result<Review> {
        let review = self
            .reviews
            .set_visibility(id, visible)
            .await?
            .ok_or_else(|| ServiceError::not_found("review", id))?;

        self.recompute(review.kit_id, self.clock.now()).await?;
        tracing::info!(review_id = %id, visible, "Review visibility changed");
        Ok(review)
    }

    /// Recompute a kit's aggregate from its visible reviews.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the kit does not exist.
    pub async fn recompute_rating(&self, kit_id: KitId) -> Result<RatingSummary> {
        self.recompute(kit_id, self.clock.now()).await
    }

    async fn recompute(&self, kit_id: KitId, now: DateTime<Utc>) -> Result<RatingSummary> {
        let summary = self.reviews.rating_summary(kit_id).await?;
        self.kits
            .set_rating_summary(kit_id, summary, now)
            .await
            .map_err(|e| match e {
                crate::db::RepositoryError::NotFound => ServiceError::not_found("kit", kit_id),
                other => other.into(),
            })?;
        Ok(summary)
    }
}

fn validate_review(
    kit_id: KitId,
    request: SubmitReviewRequest,
    ip: IpAddr,
) -> std::result::Result<NewReview, ValidationError> {
    Ok(NewReview {
        kit_id,
        reviewer_name: validate::text("reviewer_name", &request.reviewer_name, 1, NAME_MAX)?,
        rating: Rating::new(request.rating).map_err(|e| validate::invalid("rating", e.to_string()))?,
        comment: validate::text("comment", &request.comment, 1, COMMENT_MAX)?,
        submitter_ip: ip,
    })
}
