//! # Error Handling
//!
//! Centralized error types for specguard core.
//! Uses `thiserror` for ergonomic error definitions.

use crate::validation::ValidateError;
use thiserror::Error;

/// Result type alias for specguard operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for the validation engine
///
/// Implements `From<ValidateError>`, so it can be used directly as the error
/// type of a wrapped request function.
#[derive(Error, Debug)]
pub enum Error {
    /// Path template could not be compiled
    #[error("Invalid route pattern: {pattern}: {reason}")]
    InvalidRoutePattern {
        /// The invalid template
        pattern: String,
        /// Reason for invalidity
        reason: String,
    },

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Response body could not be read
    #[error("Body error: {message}")]
    Body {
        /// Error message from the body reader
        message: String,
    },

    /// Request or response did not satisfy the endpoint contract
    #[error(transparent)]
    Validation(#[from] ValidateError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::{Reason, ValidatorError};

    #[test]
    fn test_invalid_route_pattern_error() {
        let err = Error::InvalidRoutePattern {
            pattern: "/users/{".to_string(),
            reason: "unclosed brace".to_string(),
        };
        assert!(err.to_string().contains("/users/{"));
    }

    #[test]
    fn test_validation_error_is_transparent() {
        let inner = ValidateError::pre_check(ValidatorError::PathNotFound {
            actual: "/nope".to_string(),
        });
        let err = Error::from(inner);
        assert!(err.to_string().contains("/nope"));
        match err {
            Error::Validation(e) => assert_eq!(e.reason(), Reason::PreCheck),
            other => panic!("unexpected error: {other}"),
        }
    }
}
