//! Domain models for the kit store.
//!
//! These types are what services and routes work with. Database row types
//! stay private to the `db` module and convert into these.

pub mod kit;
pub mod order;
pub mod review;

pub use kit::{Component, Kit, KitFilter, KitPatch, NewKit};
pub use order::{
    CustomerInput, CustomerSnapshot, LineItem, LineItemInput, NewOrder, Order, OrderPlaced,
    PlaceOrderRequest,
};
pub use review::{NewReview, Review, SubmitReviewRequest};
