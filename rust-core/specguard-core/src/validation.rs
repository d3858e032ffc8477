//! # Validation Errors
//!
//! Error taxonomy shared by the validator generators and the orchestrator.
//!
//! - [`ValidatorError`]: structural (precheck) failures, raised when a
//!   descriptor cannot be resolved to any endpoint spec.
//! - [`ValidateError`]: what callers see under the `throw` policy and what
//!   the sink receives under `log`: a [`Reason`] plus the opaque error.

use serde::Serialize;
use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

/// Boxed error carried opaquely by [`ValidateError`]
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Structural error produced while resolving path and method
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "target", rename_all = "camelCase")]
pub enum ValidatorError {
    /// Method is not one of the supported HTTP verbs
    #[error("invalid method: {actual}")]
    MethodInvalid {
        /// The method exactly as received
        actual: String,
    },
    /// Path is not a key of the endpoint map
    #[error("path does not exist in endpoints: {actual}")]
    PathNotFound {
        /// The unresolved path
        actual: String,
    },
    /// Method is valid but not declared for the path
    #[error("method does not exist in endpoint: {actual}")]
    MethodNotFound {
        /// The lower-cased method
        actual: String,
    },
}

impl ValidatorError {
    /// The offending value
    #[must_use]
    pub fn actual(&self) -> &str {
        match self {
            Self::MethodInvalid { actual }
            | Self::PathNotFound { actual }
            | Self::MethodNotFound { actual } => actual,
        }
    }
}

/// A validated field of a request or response
///
/// Declaration order is the order fields are validated and reported in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    /// Path parameters (request only)
    Params,
    /// Query string (request only)
    Query,
    /// Decoded body
    Body,
    /// Lower-cased headers
    Headers,
}

impl Field {
    /// Fields validated on the request side
    pub const REQUEST: [Self; 4] = [Self::Params, Self::Query, Self::Body, Self::Headers];
    /// Fields validated on the response side
    pub const RESPONSE: [Self; 2] = [Self::Body, Self::Headers];

    /// Field name as used in error reports
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Params => "params",
            Self::Query => "query",
            Self::Body => "body",
            Self::Headers => "headers",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a validation failed: precheck or a specific field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reason {
    /// Path/method resolution failed
    PreCheck,
    /// A field failed schema validation
    Field(Field),
}

impl Serialize for Reason {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl From<Field> for Reason {
    fn from(field: Field) -> Self {
        Self::Field(field)
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PreCheck => f.write_str("preCheck"),
            Self::Field(field) => field.fmt(f),
        }
    }
}

/// A single validation failure surfaced by the orchestrator
#[derive(Error, Debug)]
#[error("validation error ({reason}): {source}")]
pub struct ValidateError {
    reason: Reason,
    source: BoxError,
}

impl ValidateError {
    /// Create a failure for `reason` carrying `error`
    pub fn new(reason: impl Into<Reason>, error: impl Into<BoxError>) -> Self {
        Self {
            reason: reason.into(),
            source: error.into(),
        }
    }

    /// Create a precheck failure
    #[must_use]
    pub fn pre_check(error: ValidatorError) -> Self {
        Self::new(Reason::PreCheck, error)
    }

    /// What failed
    #[must_use]
    pub const fn reason(&self) -> Reason {
        self.reason
    }

    /// The underlying adapter or structural error
    #[must_use]
    pub fn error(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.source.as_ref()
    }

    /// Downcast the underlying error to a concrete type
    #[must_use]
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.source.downcast_ref::<E>()
    }

    /// The structural error, if this is a precheck failure
    #[must_use]
    pub fn as_pre_check(&self) -> Option<&ValidatorError> {
        match self.reason {
            Reason::PreCheck => self.downcast_ref::<ValidatorError>(),
            Reason::Field(_) => None,
        }
    }

    /// Consume and return the boxed error
    #[must_use]
    pub fn into_error(self) -> BoxError {
        self.source
    }
}
