//! Workflow error types.

use thiserror::Error;

use circuit_sphere_core::{KitId, OrderStatus};

use crate::db::RepositoryError;

/// Errors returned by the catalog, order and review services.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// An entity looked up by id does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// Input was rejected by a business rule.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Stock cannot cover the requested quantity.
    #[error("insufficient stock for {title}: {available} available, {requested} requested")]
    InsufficientStock {
        kit_id: KitId,
        title: String,
        available: i32,
        requested: u32,
    },

    /// An order referenced a deactivated kit.
    #[error("{title} is no longer available")]
    ProductUnavailable { kit_id: KitId, title: String },

    /// The store failed for reasons unrelated to business rules.
    #[error("database error: {0}")]
    Database(#[from] RepositoryError),
}

impl ServiceError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub(crate) fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(ValidationError::InvalidInput {
            field: field.into(),
            message: message.into(),
        })
    }
}

/// Rule violations that map to a 4xx response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A field is missing, malformed or out of range.
    #[error("{field}: {message}")]
    InvalidInput { field: String, message: String },

    /// An order line references a kit that does not exist.
    #[error("kit {kit_id} does not exist")]
    UnknownProduct { kit_id: KitId },

    /// The order cannot move from its current status to the requested one.
    #[error("cannot change order status from {current} to {requested}")]
    InvalidTransition {
        current: OrderStatus,
        requested: OrderStatus,
        allowed: &'static [OrderStatus],
    },

    /// The submitter already reviewed this kit inside the window.
    #[error("you have already reviewed this kit recently, try again in {retry_after_secs}s")]
    RateLimited { kit_id: KitId, retry_after_secs: u64 },
}

/// Result type alias for service operations.
pub type Result<T> = std::result::Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_details() {
        let err = ServiceError::InsufficientStock {
            kit_id: KitId::new(1),
            title: "Smart Home Kit".to_owned(),
            available: 3,
            requested: 4,
        };
        assert_eq!(
            err.to_string(),
            "insufficient stock for Smart Home Kit: 3 available, 4 requested"
        );

        let err = ServiceError::from(ValidationError::InvalidTransition {
            current: OrderStatus::Delivered,
            requested: OrderStatus::Processing,
            allowed: OrderStatus::Delivered.allowed_transitions(),
        });
        assert_eq!(
            err.to_string(),
            "cannot change order status from delivered to processing"
        );
    }

    #[test]
    fn test_invalid_helper() {
        let err = ServiceError::invalid("items", "must not be empty");
        assert!(matches!(
            err,
            ServiceError::Validation(ValidationError::InvalidInput { ref field, .. }) if field == "items"
        ));
    }
}
