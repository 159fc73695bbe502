//! Circuit Sphere Core - Shared domain types.
//!
//! This crate provides the types shared by every Circuit Sphere component:
//! - `api` - JSON backend for the kit catalog, orders and reviews
//! - `cli` - Command-line tools for migrations, seeding and stock fixes
//!
//! # Architecture
//!
//! The core crate contains only types and pure rules - no I/O, no database
//! access, no HTTP. Anything that needs a clock or a connection lives in the
//! `api` crate.
//!
//! # Modules
//!
//! - [`types`] - Typed ids, emails, prices, ratings and the order status machine

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
