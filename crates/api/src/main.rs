//! Circuit Sphere API - JSON backend for the kit store.
//!
//! This binary serves the `/api/v1` routes on port 8000.
//!
//! # Architecture
//!
//! - Axum web framework, JSON in and out
//! - `PostgreSQL` via sqlx for kits, orders and reviews
//! - Services receive their stores, clock and notifier at start-up
//!
//! Migrations are NOT run on startup. Run them explicitly via:
//! `cargo run -p circuit-sphere-cli -- migrate`

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::net::SocketAddr;
use std::sync::Arc;

use circuit_sphere_api::config::ApiConfig;
use circuit_sphere_api::db::{self, PgStore};
use circuit_sphere_api::routes;
use circuit_sphere_api::services::{SystemClock, TracingNotifier};
use circuit_sphere_api::state::AppState;
use circuit_sphere_api::store::Stores;
use circuit_sphere_api::telemetry;

#[tokio::main]
async fn main() {
    let config = ApiConfig::from_env().expect("Failed to load configuration");
    let _sentry_guard = telemetry::init(&config);
    tracing::debug!(?config, "Configuration loaded");

    let pool = db::create_pool(&config.database_url)
        .await
        .expect("Failed to create database pool");
    tracing::info!("Database pool created");

    let stores = Stores::from_shared(Arc::new(PgStore::new(
        pool.clone(),
        config.store_timeout,
    )));
    let review_window = chrono::Duration::from_std(config.review_window)
        .expect("Review window out of range");
    let state = AppState::new(
        stores,
        Arc::new(TracingNotifier),
        Arc::new(SystemClock),
        review_window,
    );

    let app = routes::app(state)
        .layer(routes::cors_layer(&config.allowed_origins))
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    let addr = config.socket_addr();
    tracing::info!("api listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Server error");

    pool.close().await;
    tracing::info!("Database pool closed");
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
