//! Business workflows.
//!
//! Services own `Arc` handles to the stores, the clock and the notifier,
//! all injected once at start-up. They never reach for global state.

pub mod catalog;
pub mod clock;
pub mod error;
pub mod notify;
pub mod orders;
pub mod reviews;
mod validate;

pub use catalog::CatalogService;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ServiceError, ValidationError};
pub use notify::{NotifyError, OrderNotifier, TracingNotifier};
pub use orders::OrderService;
pub use reviews::ReviewService;
