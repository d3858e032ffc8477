//! # Specguard Core
//!
//! Runtime validation of HTTP requests and responses against a declarative
//! endpoint contract, independent of any particular schema library.
//!
//! ## Architecture
//!
//! An [`EndpointMap`] describes the API: path templates, methods, and an
//! optional schema per request field and per response status. A
//! [`SchemaAdapter`] knows how to check a value against one schema. The
//! generators combine the two into deferred validators, and [`Validated`]
//! wraps a request function so every call runs them.
//!
//! ## Modules
//!
//! - `spec` - Endpoint contract model
//! - `matcher` - Concrete path to template matching using matchit
//! - `adapter` - Schema adapter contract
//! - `validator` - Request/response validator generators and reports
//! - `fetch` - Validation orchestrator with throw/log policy
//! - `descriptor` - Request and response snapshots
//! - `response` - Response abstraction
//! - `json` - Body decoding with simd-json
//! - `validation` - Structural and field error types
//! - `telemetry` - Subscriber setup
//! - `error` - Error types and handling

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod adapter;
pub mod descriptor;
pub mod error;
pub mod fetch;
pub mod json;
pub mod matcher;
pub mod response;
pub mod spec;
pub mod telemetry;
pub mod validation;
pub mod validator;

pub use adapter::{SchemaAdapter, Validator};
pub use descriptor::{RequestDescriptor, RequestInit, ResponseDescriptor};
pub use error::{Error, Result};
pub use fetch::{
    with_validation, BoxFuture, Fetch, Phase, Policy, TracingSink, Validated, ValidationConfig,
    ValidationSink,
};
pub use matcher::{MatchCandidate, PathMatcher};
pub use response::{Bytes, FetchResponse, ResponseLike};
pub use spec::{EndpointDef, EndpointMap, EndpointSpec, Method, ResponseSpec};
pub use telemetry::{init_tracing, LogFormat};
pub use validation::{Field, Reason, ValidateError, ValidatorError};
pub use validator::{
    build_request_validators, build_response_validators, FieldOutcome, RequestValidators,
    ResponseValidators, SpecValidator, ValidationReport,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
