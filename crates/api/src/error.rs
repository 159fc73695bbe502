//! Unified error handling with Sentry integration.
//!
//! Route handlers return `Result<T, AppError>`. Every error renders as
//!
//! ```json
//! {"error": "insufficient_stock", "message": "...", "details": {...}}
//! ```
//!
//! Server errors are captured to Sentry and answered with a generic message.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use thiserror::Error;

use crate::services::{ServiceError, ValidationError};

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// A workflow rejected the request or failed.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// The request could not be parsed.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// No route matched.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::Service(err) => match err {
                ServiceError::NotFound { .. } => StatusCode::NOT_FOUND,
                ServiceError::Validation(ValidationError::RateLimited { .. }) => {
                    StatusCode::TOO_MANY_REQUESTS
                }
                ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
                ServiceError::InsufficientStock { .. } | ServiceError::ProductUnavailable { .. } => {
                    StatusCode::CONFLICT
                }
                ServiceError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    const fn kind(&self) -> &'static str {
        match self {
            Self::Service(err) => match err {
                ServiceError::NotFound { .. } => "not_found",
                ServiceError::Validation(v) => match v {
                    ValidationError::InvalidInput { .. } => "validation_error",
                    ValidationError::UnknownProduct { .. } => "unknown_product",
                    ValidationError::InvalidTransition { .. } => "invalid_transition",
                    ValidationError::RateLimited { .. } => "rate_limited",
                },
                ServiceError::InsufficientStock { .. } => "insufficient_stock",
                ServiceError::ProductUnavailable { .. } => "product_unavailable",
                ServiceError::Database(_) => "internal_error",
            },
            Self::BadRequest(_) => "bad_request",
            Self::NotFound(_) => "not_found",
            Self::Internal(_) => "internal_error",
        }
    }

    fn details(&self) -> Value {
        let Self::Service(err) = self else {
            return json!({});
        };
        match err {
            ServiceError::NotFound { entity, id } => json!({ "entity": entity, "id": id }),
            ServiceError::Validation(v) => match v {
                ValidationError::InvalidInput { field, .. } => json!({ "field": field }),
                ValidationError::UnknownProduct { kit_id } => json!({ "kit_id": kit_id }),
                ValidationError::InvalidTransition {
                    current,
                    requested,
                    allowed,
                } => json!({
                    "current": current,
                    "requested": requested,
                    "allowed": allowed,
                }),
                ValidationError::RateLimited {
                    kit_id,
                    retry_after_secs,
                } => json!({ "kit_id": kit_id, "retry_after_secs": retry_after_secs }),
            },
            ServiceError::InsufficientStock {
                kit_id,
                title,
                available,
                requested,
            } => json!({
                "kit_id": kit_id,
                "title": title,
                "available": available,
                "requested": requested,
            }),
            ServiceError::ProductUnavailable { kit_id, title } => {
                json!({ "kit_id": kit_id, "title": title })
            }
            ServiceError::Database(_) => json!({}),
        }
    }

    const fn retry_after(&self) -> Option<u64> {
        match self {
            Self::Service(ServiceError::Validation(ValidationError::RateLimited {
                retry_after_secs,
                ..
            })) => Some(*retry_after_secs),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        let message = if status.is_server_error() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = json!({
            "error": self.kind(),
            "message": message,
            "details": self.details(),
        });

        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = self.retry_after() {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
