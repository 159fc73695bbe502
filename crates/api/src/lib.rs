//! Circuit Sphere API library.
//!
//! JSON backend for the kit store: catalog, order placement with stock
//! deduction, the order status state machine, and rate-limited guest
//! reviews. Exposed as a library so the CLI and the integration tests can
//! reuse the stores and services.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
pub mod telemetry;

/// Migrations for the `shop` schema, applied by `cs-cli migrate`.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
