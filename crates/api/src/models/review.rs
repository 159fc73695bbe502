//! Guest review domain models.

use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use circuit_sphere_core::{KitId, Rating, ReviewId};

/// A guest review of a kit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Review {
    /// Store-assigned id.
    pub id: ReviewId,
    /// Kit being reviewed.
    pub kit_id: KitId,
    /// Name the guest chose to display.
    pub reviewer_name: String,
    /// Star rating.
    pub rating: Rating,
    /// Review text.
    pub comment: String,
    /// Submitter address, kept for rate limiting only.
    #[serde(skip_serializing)]
    pub submitter_ip: IpAddr,
    /// Cleared by moderation to hide the review.
    pub is_visible: bool,
    /// When the review was submitted.
    pub created_at: DateTime<Utc>,
}

/// Validated input for persisting a review.
///
/// The store sets `is_visible` and stamps `created_at`.
#[derive(Debug, Clone)]
pub struct NewReview {
    pub kit_id: KitId,
    pub reviewer_name: String,
    pub rating: Rating,
    pub comment: String,
    pub submitter_ip: IpAddr,
}

/// Review form as posted by the product page.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubmitReviewRequest {
    pub reviewer_name: String,
    pub rating: i64,
    pub comment: String,
}
