//! Field validation shared by the services.

use rust_decimal::Decimal;

use circuit_sphere_core::Price;

use super::error::ValidationError;

/// Trim `value` and require its length (in characters) to be within `min..=max`.
pub fn text(field: &str, value: &str, min: usize, max: usize) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    let len = trimmed.chars().count();

    if len < min {
        let message = if min == 1 {
            "must not be empty".to_owned()
        } else {
            format!("must be at least {min} characters")
        };
        return Err(invalid(field, message));
    }
    if len > max {
        return Err(invalid(field, format!("must be at most {max} characters")));
    }
    Ok(trimmed.to_owned())
}

/// Optional free text: blank becomes `None`, otherwise at most `max` characters.
pub fn optional_text(
    field: &str,
    value: Option<&str>,
    max: usize,
) -> Result<Option<String>, ValidationError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => text(field, v, 1, max).map(Some),
        None => Ok(None),
    }
}

/// A strictly positive amount.
pub fn price(field: &str, amount: Decimal) -> Result<Price, ValidationError> {
    Price::new(amount).map_err(|e| invalid(field, e.to_string()))
}

/// A stock level, which may be zero but never negative.
pub fn stock(field: &str, quantity: i32) -> Result<i32, ValidationError> {
    if quantity < 0 {
        return Err(invalid(field, "must not be negative"));
    }
    Ok(quantity)
}

pub fn invalid(field: &str, message: impl Into<String>) -> ValidationError {
    ValidationError::InvalidInput {
        field: field.to_owned(),
        message: message.into(),
    }
}
