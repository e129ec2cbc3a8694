//! Validation utilities.

use crate::{BatchError, FieldError};
use validator::{Validate, ValidationErrors};

/// Extension trait for validation.
pub trait ValidateExt: Validate {
    /// Validates the struct and returns a `BatchError` on failure.
    fn validate_request(&self) -> Result<(), BatchError> {
        self.validate().map_err(validation_errors_to_batch_error)
    }
}

impl<T: Validate> ValidateExt for T {}

/// Flattens `validator::ValidationErrors` into field errors.
#[must_use]
pub fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    errors
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| FieldError {
                field: (*field).to_string(),
                message: error
                    .message
                    .as_ref()
                    .map_or_else(|| error.code.to_string(), |m| m.to_string()),
                code: error.code.to_string(),
            })
        })
        .collect()
}

/// Converts `validator::ValidationErrors` to `BatchError`.
#[must_use]
pub fn validation_errors_to_batch_error(errors: ValidationErrors) -> BatchError {
    let message = field_errors(&errors)
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ");

    BatchError::Validation(message)
}

/// Common validation functions.
pub mod rules {
    use validator::ValidationError;

    /// Validates that a string is not blank (not empty after trimming).
    pub fn not_blank(value: &str) -> Result<(), ValidationError> {
        if value.trim().is_empty() {
            return Err(ValidationError::new("not_blank"));
        }
        Ok(())
    }

    /// Validates that a string is a hyphenated UUID.
    pub fn valid_uuid(value: &str) -> Result<(), ValidationError> {
        if uuid::Uuid::parse_str(value.trim()).is_err() {
            return Err(ValidationError::new("invalid_uuid"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::rules::*;
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Sample {
        #[validate(custom(function = "not_blank"))]
        style_id: String,
        #[validate(range(min = 1, max = 100))]
        batch_size: u32,
    }

    #[test]
    fn test_not_blank() {
        assert!(not_blank("watercolor").is_ok());
        assert!(not_blank("   ").is_err());
        assert!(not_blank("").is_err());
    }

    #[test]
    fn test_valid_uuid() {
        assert!(valid_uuid("0190b6a4-8c5e-7a3b-9f3e-2b1c4d5e6f70").is_ok());
        assert!(valid_uuid("watercolor").is_err());
        assert!(valid_uuid("").is_err());
    }

    #[test]
    fn test_validate_request_collects_fields() {
        let sample = Sample {
            style_id: " ".to_string(),
            batch_size: 0,
        };
        let err = sample.validate_request().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("style_id"));
        assert!(msg.contains("batch_size"));
    }

    #[test]
    fn test_validate_request_ok() {
        let sample = Sample {
            style_id: "watercolor".to_string(),
            batch_size: 10,
        };
        assert!(sample.validate_request().is_ok());
    }
}
