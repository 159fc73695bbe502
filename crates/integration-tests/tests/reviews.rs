//! Review rate limiting and rating aggregates.

#![allow(clippy::unwrap_used)]

use chrono::Duration;

use circuit_sphere_api::services::{ServiceError, ValidationError};
use circuit_sphere_core::KitId;
use circuit_sphere_integration_tests::{REVIEW_WINDOW, TestApp, ip, review};

fn assert_rate_limited(err: &ServiceError) {
    assert!(
        matches!(
            err,
            ServiceError::Validation(ValidationError::RateLimited { retry_after_secs: 600, .. })
        ),
        "expected rate limit, got {err:?}"
    );
}

#[tokio::test]
async fn test_same_ip_same_kit_is_limited_inside_window() {
    let app = TestApp::new();
    let kit = app.kit("Smart Home Starter Kit", "49.99", 5).await;
    let reviews = app.state.reviews();

    reviews
        .submit_review(kit.id, review("Grace", 5), ip("203.0.113.7"))
        .await
        .unwrap();

    app.clock.advance(Duration::minutes(9));
    let err = reviews
        .submit_review(kit.id, review("Grace again", 1), ip("203.0.113.7"))
        .await
        .unwrap_err();
    assert_rate_limited(&err);

    let kit = app.state.catalog().get_kit(kit.id).await.unwrap();
    assert_eq!(kit.total_reviews, 1);
}

#[tokio::test]
async fn test_other_ip_or_other_kit_is_not_limited() {
    let app = TestApp::new();
    let first = app.kit("Smart Home Starter Kit", "49.99", 5).await;
    let second = app.kit("Weather Station Kit", "29.50", 5).await;
    let reviews = app.state.reviews();

    reviews
        .submit_review(first.id, review("Grace", 5), ip("203.0.113.7"))
        .await
        .unwrap();
    reviews
        .submit_review(first.id, review("Alan", 4), ip("198.51.100.20"))
        .await
        .unwrap();
    reviews
        .submit_review(second.id, review("Grace", 3), ip("203.0.113.7"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_window_expires() {
    let app = TestApp::new();
    let kit = app.kit("Smart Home Starter Kit", "49.99", 5).await;
    let reviews = app.state.reviews();

    reviews
        .submit_review(kit.id, review("Grace", 5), ip("203.0.113.7"))
        .await
        .unwrap();

    app.clock.advance(REVIEW_WINDOW + Duration::seconds(1));
    reviews
        .submit_review(kit.id, review("Grace", 4), ip("203.0.113.7"))
        .await
        .unwrap();

    let kit = app.state.catalog().get_kit(kit.id).await.unwrap();
    assert_eq!(kit.total_reviews, 2);
}

#[tokio::test]
async fn test_aggregate_recomputed_on_submit_and_moderation() {
    let app = TestApp::new();
    let kit = app.kit("Smart Home Starter Kit", "49.99", 5).await;
    let reviews = app.state.reviews();

    let mut submitted = Vec::new();
    for (n, rating) in [5, 3, 4].into_iter().enumerate() {
        let review = reviews
            .submit_review(kit.id, review("Reviewer", rating), ip(&format!("192.0.2.{}", n + 1)))
            .await
            .unwrap();
        submitted.push(review);
    }

    let summary = app.state.catalog().get_kit(kit.id).await.unwrap().rating_summary();
    assert!((summary.average_rating - 4.0).abs() < f64::EPSILON);
    assert_eq!(summary.total_reviews, 3);

    // Hide the 3-star review: (5 + 4) / 2 = 4.5
    reviews
        .set_review_visibility(submitted[1].id, false)
        .await
        .unwrap();
    let summary = app.state.catalog().get_kit(kit.id).await.unwrap().rating_summary();
    assert!((summary.average_rating - 4.5).abs() < f64::EPSILON);
    assert_eq!(summary.total_reviews, 2);

    let visible = reviews.list_reviews(kit.id, 0, 10).await.unwrap();
    assert_eq!(visible.len(), 2);
    assert!(visible.iter().all(|r| r.id != submitted[1].id));

    reviews
        .set_review_visibility(submitted[1].id, true)
        .await
        .unwrap();
    let summary = app.state.catalog().get_kit(kit.id).await.unwrap().rating_summary();
    assert_eq!(summary.total_reviews, 3);
}

#[tokio::test]
async fn test_hiding_every_review_resets_aggregate() {
    let app = TestApp::new();
    let kit = app.kit("Smart Home Starter Kit", "49.99", 5).await;
    let only = app
        .state
        .reviews()
        .submit_review(kit.id, review("Grace", 2), ip("203.0.113.7"))
        .await
        .unwrap();

    app.state
        .reviews()
        .set_review_visibility(only.id, false)
        .await
        .unwrap();

    let summary = app.state.catalog().get_kit(kit.id).await.unwrap().rating_summary();
    assert!(summary.average_rating.abs() < f64::EPSILON);
    assert_eq!(summary.total_reviews, 0);
}

#[tokio::test]
async fn test_review_for_unknown_kit() {
    let app = TestApp::new();
    let err = app
        .state
        .reviews()
        .submit_review(KitId::new(77), review("Grace", 5), ip("203.0.113.7"))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { entity: "kit", .. }));
}

#[tokio::test]
async fn test_out_of_range_rating_is_rejected_before_rate_limit() {
    let app = TestApp::new();
    let kit = app.kit("Smart Home Starter Kit", "49.99", 5).await;

    for rating in [0, 6] {
        let err = app
            .state
            .reviews()
            .submit_review(kit.id, review("Grace", rating), ip("203.0.113.7"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Validation(ValidationError::InvalidInput { ref field, .. }) if field == "rating"
        ));
    }

    // Rejected submissions do not count against the window
    app.state
        .reviews()
        .submit_review(kit.id, review("Grace", 5), ip("203.0.113.7"))
        .await
        .unwrap();
}
