//! Order notifications.
//!
//! Placement hands an [`OrderPlaced`] event to an [`OrderNotifier`] once the
//! order is committed. Delivery failures are logged by the caller and never
//! undo the order.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::OrderPlaced;

/// A notification could not be delivered.
#[derive(Debug, Error)]
#[error("notification failed: {0}")]
pub struct NotifyError(pub String);

/// Sink for "new order" events.
#[async_trait]
pub trait OrderNotifier: Send + Sync {
    /// Deliver the event.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError`] if the event could not be delivered.
    async fn order_placed(&self, event: &OrderPlaced) -> Result<(), NotifyError>;
}

/// Emits each event as a structured log line.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

#[async_trait]
impl OrderNotifier for TracingNotifier {
    async fn order_placed(&self, event: &OrderPlaced) -> Result<(), NotifyError> {
        tracing::info!(
            order_id = %event.order_id,
            customer_name = %event.customer_name,
            customer_email = %event.customer_email,
            total_amount = %event.total_amount,
            "New order placed"
        );
        Ok(())
    }
}
