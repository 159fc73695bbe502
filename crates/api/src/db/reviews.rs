//! Review repository.

use std::net::IpAddr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use circuit_sphere_core::{KitId, Rating, RatingSummary, ReviewId};

use super::{PgStore, RepositoryError, non_negative};
use crate::models::{NewReview, Review};
use crate::store::ReviewStore;

macro_rules! review_columns {
    () => {
        "id, kit_id, reviewer_name, rating, comment, submitter_ip, is_visible, created_at"
    };
}

#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: ReviewId,
    kit_id: KitId,
    reviewer_name: String,
    rating: i16,
    comment: String,
    submitter_ip: String,
    is_visible: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<ReviewRow> for Review {
    type Error = RepositoryError;

    fn try_from(row: ReviewRow) -> Result<Self, Self::Error> {
        let rating = Rating::new(i64::from(row.rating)).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid rating in database: {e}"))
        })?;
        let submitter_ip = row.submitter_ip.parse::<IpAddr>().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid submitter ip in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            kit_id: row.kit_id,
            reviewer_name: row.reviewer_name,
            rating,
            comment: row.comment,
            submitter_ip,
            is_visible: row.is_visible,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SummaryRow {
    average_rating: f64,
    total_reviews: i64,
}

#[async_trait]
impl ReviewStore for PgStore {
    async fn insert_review(
        &self,
        review: NewReview,
        now: DateTime<Utc>,
    ) -> Result<Review, RepositoryError> {
        self.bounded(async {
            let row = sqlx::query_as::<_, ReviewRow>(concat!(
                "INSERT INTO shop.review \
                 (kit_id, reviewer_name, rating, comment, submitter_ip, created_at) \
                 VALUES ($1, $2, $3, $4, $5, $6) \
                 RETURNING ",
                review_columns!()
            ))
            .bind(review.kit_id)
            .bind(&review.reviewer_name)
            .bind(i16::from(review.rating))
            .bind(&review.comment)
            .bind(review.submitter_ip.to_string())
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.is_foreign_key_violation()
                {
                    return RepositoryError::NotFound;
                }
                RepositoryError::Database(e)
            })?;

            Review::try_from(row)
        })
        .await
    }

    async fn count_recent(
        &self,
        kit_id: KitId,
        ip: IpAddr,
        since: DateTime<Utc>,
    ) -> Result<i64, RepositoryError> {
        self.bounded(async {
            let count: i64 = sqlx::query_scalar(
                r"
                SELECT COUNT(*)
                FROM shop.review
                WHERE kit_id = $1 AND submitter_ip = $2 AND created_at >= $3
                ",
            )
            .bind(kit_id)
            .bind(ip.to_string())
            .bind(since)
            .fetch_one(&self.pool)
            .await?;

            Ok(count)
        })
        .await
    }

    async fn list_visible(
        &self,
        kit_id: KitId,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Review>, RepositoryError> {
        self.bounded(async {
            let rows = sqlx::query_as::<_, ReviewRow>(concat!(
                "SELECT ",
                review_columns!(),
                " FROM shop.review \
                 WHERE kit_id = $1 AND is_visible \
                 ORDER BY created_at DESC, id DESC \
                 OFFSET $2 LIMIT $3"
            ))
            .bind(kit_id)
            .bind(non_negative(skip))
            .bind(non_negative(limit))
            .fetch_all(&self.pool)
            .await?;

            rows.into_iter().map(Review::try_from).collect()
        })
        .await
    }

    async fn rating_summary(&self, kit_id: KitId) -> Result<RatingSummary, RepositoryError> {
        self.bounded(async {
            let row = sqlx::query_as::<_, SummaryRow>(
                r"
                SELECT COALESCE(ROUND(AVG(rating)::numeric, 1), 0)::float8 AS average_rating,
                       COUNT(*) AS total_reviews
                FROM shop.review
                WHERE kit_id = $1 AND is_visible
                ",
            )
            .bind(kit_id)
            .fetch_one(&self.pool)
            .await?;

            Ok(RatingSummary {
                average_rating: row.average_rating,
                total_reviews: row.total_reviews,
            })
        })
        .await
    }

    async fn set_visibility(
        &self,
        id: ReviewId,
        visible: bool,
    ) -> Result<Option<Review>, RepositoryError> {
        self.bounded(async {
            let row = sqlx::query_as::<_, ReviewRow>(concat!(
                "UPDATE shop.review SET is_visible = $2 WHERE id = $1 RETURNING ",
                review_columns!()
            ))
            .bind(id)
            .bind(visible)
            .fetch_optional(&self.pool)
            .await?;

            row.map(Review::try_from).transpose()
        })
        .await
    }
}
