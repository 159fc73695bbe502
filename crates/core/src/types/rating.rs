//! Star ratings and their per-kit aggregate.

use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Rating`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("rating must be between {min} and {max} (got {got})", min = Rating::MIN, max = Rating::MAX)]
pub struct RatingError {
    /// The rejected value.
    pub got: i64,
}

/// A review's star rating, 1 to 5 inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i16")]
pub struct Rating(u8);

impl Rating {
    /// Lowest accepted rating.
    pub const MIN: u8 = 1;
    /// Highest accepted rating.
    pub const MAX: u8 = 5;

    /// Create a rating from any integer.
    ///
    /// # Errors
    ///
    /// Returns [`RatingError`] when the value is outside `1..=5`.
    pub fn new(value: i64) -> Result<Self, RatingError> {
        u8::try_from(value)
            .ok()
            .filter(|v| (Self::MIN..=Self::MAX).contains(v))
            .map(Self)
            .ok_or(RatingError { got: value })
    }

    /// The number of stars.
    #[must_use]
    pub const fn value(&self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Rating {
    type Error = RatingError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for i16 {
    fn from(rating: Rating) -> Self {
        Self::from(rating.0)
    }
}

/// Derived review aggregate stored on a kit.
///
/// Always recomputed from the full set of visible reviews, never adjusted
/// incrementally, so moderation changes cannot make it drift.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct RatingSummary {
    /// Mean rating rounded to one decimal place, `0.0` with no reviews.
    pub average_rating: f64,
    /// Number of visible reviews.
    pub total_reviews: i64,
}

impl RatingSummary {
    /// Compute the summary of a set of ratings.
    ///
    /// ```
    /// use circuit_sphere_core::{Rating, RatingSummary};
    ///
    /// let ratings = [5, 3, 4].map(|r| Rating::new(r).unwrap());
    /// let summary = RatingSummary::from_ratings(ratings);
    /// assert!((summary.average_rating - 4.0).abs() < f64::EPSILON);
    /// assert_eq!(summary.total_reviews, 3);
    /// ```
    #[must_use]
    pub fn from_ratings(ratings: impl IntoIterator<Item = Rating>) -> Self {
        let (sum, count) = ratings
            .into_iter()
            .fold((0_i64, 0_i64), |(sum, count), r| {
                (sum + i64::from(r.value()), count + 1)
            });

        if count == 0 {
            return Self::default();
        }

        #[allow(clippy::cast_precision_loss)] // review counts stay far below 2^52
        let mean = sum as f64 / count as f64;
        Self {
            average_rating: round_to_tenth(mean),
            total_reviews: count,
        }
    }
}

/// Round to one decimal place, halves away from zero.
#[must_use]
pub fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ratings(values: &[i64]) -> Vec<Rating> {
        values.iter().map(|v| Rating::new(*v).unwrap()).collect()
    }

    #[test]
    fn test_rating_bounds() {
        assert!(Rating::new(0).is_err());
        assert!(Rating::new(6).is_err());
        assert!(Rating::new(-3).is_err());
        assert_eq!(Rating::new(1).unwrap().value(), 1);
        assert_eq!(Rating::new(5).unwrap().value(), 5);
    }

    #[test]
    fn test_rating_deserialize_validates() {
        assert!(serde_json::from_str::<Rating>("4").is_ok());
        assert!(serde_json::from_str::<Rating>("7").is_err());
    }

    #[test]
    fn test_summary_empty() {
        let summary = RatingSummary::from_ratings(Vec::new());
        assert_eq!(summary, RatingSummary::default());
    }

    #[test]
    fn test_summary_rounds_to_one_decimal() {
        // 14 / 3 = 4.666..
        let summary = RatingSummary::from_ratings(ratings(&[5, 5, 4]));
        assert!((summary.average_rating - 4.7).abs() < 1e-9);
        assert_eq!(summary.total_reviews, 3);

        // 9 / 4 = 2.25 rounds away from zero
        let summary = RatingSummary::from_ratings(ratings(&[1, 2, 3, 3]));
        assert!((summary.average_rating - 2.3).abs() < 1e-9);
    }
}
