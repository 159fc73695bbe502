//! Order placement and the status state machine, end to end over the
//! services.

#![allow(clippy::unwrap_used)]

use chrono::Duration;
use tokio::task::JoinSet;

use circuit_sphere_api::services::{ServiceError, ValidationError};
use circuit_sphere_core::{KitId, OrderId, OrderStatus};
use circuit_sphere_integration_tests::{TestApp, order_for};

/// Statuses to step through from `pending` to reach `target`.
fn path_to(target: OrderStatus) -> &'static [OrderStatus] {
    use OrderStatus::{Cancelled, Delivered, Pending, Processing, Shipped};
    match target {
        Pending => &[],
        Processing => &[Processing],
        Shipped => &[Processing, Shipped],
        Delivered => &[Processing, Shipped, Delivered],
        Cancelled => &[Cancelled],
    }
}

async fn order_in(app: &TestApp, status: OrderStatus) -> OrderId {
    let kit = app.kit("Status Kit", "10.00", 100).await;
    let order = app.state.orders().place_order(order_for(&kit, 1)).await.unwrap();
    for &step in path_to(status) {
        app.state.orders().update_status(order.id, step).await.unwrap();
    }
    order.id
}

// ============================================================================
// Placement
// ============================================================================

#[tokio::test]
async fn test_order_deducts_stock_and_second_order_is_rejected() {
    let app = TestApp::new();
    let kit = app.kit("Smart Home Starter Kit", "49.99", 5).await;

    let order = app.state.orders().place_order(order_for(&kit, 2)).await.unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.items.len(), 1);
    assert_eq!(app.stock_of(kit.id).await, 3);

    let err = app
        .state
        .orders()
        .place_order(order_for(&kit, 4))
        .await
        .unwrap_err();
    match err {
        ServiceError::InsufficientStock {
            kit_id,
            title,
            available,
            requested,
        } => {
            assert_eq!(kit_id, kit.id);
            assert_eq!(title, "Smart Home Starter Kit");
            assert_eq!(available, 3);
            assert_eq!(requested, 4);
        }
        other => panic!("expected insufficient stock, got {other:?}"),
    }

    assert_eq!(app.stock_of(kit.id).await, 3);
    assert_eq!(app.state.orders().list_orders(0, 100).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_order_for_exact_stock_empties_kit() {
    let app = TestApp::new();
    let kit = app.kit("Weather Station Kit", "29.50", 2).await;

    app.state.orders().place_order(order_for(&kit, 2)).await.unwrap();
    assert_eq!(app.stock_of(kit.id).await, 0);
}

#[tokio::test]
async fn test_unknown_kit_stores_nothing() {
    let app = TestApp::new();
    let kit = app.kit("Real Kit", "10.00", 5).await;
    let mut request = order_for(&kit, 1);
    request.items[0].kit_id = KitId::new(9999);

    let err = app.state.orders().place_order(request).await.unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Validation(ValidationError::UnknownProduct { kit_id }) if kit_id == KitId::new(9999)
    ));
    assert!(app.state.orders().list_orders(0, 100).await.unwrap().is_empty());
    assert!(app.notifier.events().is_empty());
}

#[tokio::test]
async fn test_inactive_kit_is_unavailable() {
    let app = TestApp::new();
    let kit = app.kit("Retired Kit", "10.00", 5).await;
    app.state.catalog().deactivate_kit(kit.id).await.unwrap();

    let err = app
        .state
        .orders()
        .place_order(order_for(&kit, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ProductUnavailable { .. }));
    assert_eq!(app.stock_of(kit.id).await, 5);
}

#[tokio::test]
async fn test_failed_deduction_after_commit_keeps_order() {
    let app = TestApp::new();
    let kit = app.kit("Traffic Light Controller Kit", "12.50", 3).await;

    // Each line fits the stock on its own, together they do not.
    let mut request = order_for(&kit, 2);
    let line = request.items[0].clone();
    request.items.push(line);
    request.total_amount = kit.price.amount() * rust_decimal::Decimal::from(4);

    let order = app.state.orders().place_order(request).await.unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.items.len(), 2);

    let stored = app.state.orders().get_order(order.id).await.unwrap();
    assert_eq!(stored.status, OrderStatus::Pending);
    assert_eq!(app.stock_of(kit.id).await, 1);

    let events = app.notifier.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].order_id, order.id);
}

#[tokio::test]
async fn test_check_stock_has_no_side_effects() {
    let app = TestApp::new();
    let kit = app.kit("Line Follower Robot Kit", "35.00", 3).await;
    let ok = circuit_sphere_api::services::orders::validate_request(order_for(&kit, 3)).unwrap();
    let too_many =
        circuit_sphere_api::services::orders::validate_request(order_for(&kit, 4)).unwrap();

    for _ in 0..2 {
        app.state.orders().check_stock(&ok.items).await.unwrap();
        let err = app.state.orders().check_stock(&too_many.items).await.unwrap_err();
        assert!(matches!(err, ServiceError::InsufficientStock { available: 3, requested: 4, .. }));
    }
    assert_eq!(app.stock_of(kit.id).await, 3);
}

#[tokio::test]
async fn test_placed_order_notifies_once() {
    let app = TestApp::new();
    let kit = app.kit("Smart Home Starter Kit", "49.99", 5).await;

    let order = app.state.orders().place_order(order_for(&kit, 2)).await.unwrap();

    let events = app.notifier.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].order_id, order.id);
    assert_eq!(events[0].customer_name, "Ada Lovelace");
    assert_eq!(events[0].customer_email.as_str(), "ada@example.com");
    assert_eq!(events[0].total_amount, order.total_amount);
}

#[tokio::test]
async fn test_orders_found_by_customer_email_case_insensitively() {
    let app = TestApp::new();
    let kit = app.kit("Smart Home Starter Kit", "49.99", 5).await;
    app.state.orders().place_order(order_for(&kit, 1)).await.unwrap();

    let found = app
        .state
        .orders()
        .orders_for_customer("ADA@Example.com")
        .await
        .unwrap();
    assert_eq!(found.len(), 1);

    let err = app.state.orders().orders_for_customer("not-an-email").await.unwrap_err();
    assert!(matches!(err, ServiceError::Validation(ValidationError::InvalidInput { .. })));
}

// ============================================================================
// Stock guard under concurrency
// ============================================================================

#[tokio::test]
async fn test_concurrent_decrements_never_go_negative() {
    let app = TestApp::new();
    let kit = app.kit("Popular Kit", "10.00", 5).await;

    let kit_id = kit.id;
    let mut tasks = JoinSet::new();
    for _ in 0..20 {
        let state = app.state.clone();
        tasks.spawn(async move { state.catalog().adjust_stock(kit_id, -1).await });
    }

    let mut succeeded = 0;
    while let Some(result) = tasks.join_next().await {
        match result.unwrap() {
            Ok(kit) => {
                assert!(kit.stock_quantity >= 0);
                succeeded += 1;
            }
            Err(ServiceError::InsufficientStock { available, .. }) => assert_eq!(available, 0),
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(succeeded, 5);
    assert_eq!(app.stock_of(kit.id).await, 0);
}

// ============================================================================
// Status transitions
// ============================================================================

#[tokio::test]
async fn test_transition_table() {
    for from in OrderStatus::ALL {
        for to in OrderStatus::ALL {
            let app = TestApp::new();
            let id = order_in(&app, from).await;
            app.clock.advance(Duration::minutes(5));
            let before = app.state.orders().get_order(id).await.unwrap();

            let result = app.state.orders().update_status(id, to).await;

            if from.can_transition_to(to) {
                let order = result.unwrap();
                assert_eq!(order.status, to, "{from} -> {to}");
                assert!(order.updated_at > before.updated_at, "{from} -> {to}");
            } else {
                let err = result.unwrap_err();
                assert!(
                    matches!(
                        err,
                        ServiceError::Validation(ValidationError::InvalidTransition { current, requested, .. })
                            if current == from && requested == to
                    ),
                    "{from} -> {to}: {err:?}"
                );
                let after = app.state.orders().get_order(id).await.unwrap();
                assert_eq!(after, before, "{from} -> {to} must not change the order");
            }
        }
    }
}

#[tokio::test]
async fn test_delivered_is_terminal() {
    let app = TestApp::new();
    let id = order_in(&app, OrderStatus::Shipped).await;

    let order = app
        .state
        .orders()
        .update_status(id, OrderStatus::Delivered)
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Delivered);

    let err = app
        .state
        .orders()
        .update_status(id, OrderStatus::Processing)
        .await
        .unwrap_err();
    match err {
        ServiceError::Validation(ValidationError::InvalidTransition { allowed, .. }) => {
            assert!(allowed.is_empty());
        }
        other => panic!("expected invalid transition, got {other:?}"),
    }
}

#[tokio::test]
async fn test_orders_by_status() {
    let app = TestApp::new();
    let shipped = order_in(&app, OrderStatus::Shipped).await;
    order_in(&app, OrderStatus::Pending).await;

    let found = app
        .state
        .orders()
        .orders_by_status(OrderStatus::Shipped, 0, 100)
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, shipped);
}

#[tokio::test]
async fn test_unknown_order_is_not_found() {
    let app = TestApp::new();
    let err = app
        .state
        .orders()
        .update_status(OrderId::new(404), OrderStatus::Processing)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { entity: "order", .. }));
}
