//! Input validation utilities.
//!
//! Centralized validation helpers used across API routes.

use validator::Validate;

use crate::error::HallError;

/// Validate a request body, returning a HallError::Validation on failure.
pub fn validate_request<T: Validate>(body: &T) -> Result<(), HallError> {
    body.validate().map_err(|e| HallError::Validation {
        message: format_validation_errors(e),
    })
}

/// Format validation errors into a human-readable string.
fn format_validation_errors(errors: validator::ValidationErrors) -> String {
    errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value for '{field}'"))
            })
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Reject empty or whitespace-only text (chat messages, post content).
pub fn require_text(text: &str, what: &str) -> Result<(), HallError> {
    if text.trim().is_empty() {
        return Err(HallError::Validation {
            message: format!("{what} cannot be empty or whitespace only"),
        });
    }
    Ok(())
}
