//! # Validation Orchestrator
//!
//! Wraps a request-issuing function so that every call is checked against
//! the endpoint contract on the way out and on the way back.
//!
//! Per call:
//! 1. describe the request and run its validators
//! 2. apply the policy (`throw` aborts before the inner function runs)
//! 3. call the inner function
//! 4. duplicate the response, read the duplicate's body, run response
//!    validators and apply the policy again
//! 5. hand back the original response
//!
//! Errors from the inner function pass through untouched.

use crate::adapter::SchemaAdapter;
use crate::descriptor::{RequestDescriptor, RequestInit, ResponseDescriptor};
use crate::error::Result;
use crate::json::decode_body;
use crate::matcher::PathMatcher;
use crate::response::ResponseLike;
use crate::spec::EndpointMap;
use crate::validation::ValidateError;
use crate::validator::{SpecValidator, ValidationReport};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error};

/// Boxed, sendable future
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What to do with validation failures
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Policy {
    /// Fail the call with the first error
    #[default]
    Throw,
    /// Report every error to the sink and carry on
    Log,
}

impl Policy {
    /// Lower-case name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Throw => "throw",
            Self::Log => "log",
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Policy name that is neither `throw` nor `log`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown validation policy: {0}")]
pub struct UnknownPolicy(pub String);

impl FromStr for Policy {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "throw" => Ok(Self::Throw),
            "log" => Ok(Self::Log),
            _ => Err(UnknownPolicy(s.to_string())),
        }
    }
}

/// Orchestrator configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Failure policy
    pub policy: Policy,
}

impl ValidationConfig {
    /// Default configuration (`throw`)
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the policy
    #[must_use]
    pub const fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    /// Load from a JSON document such as `{"policy": "log"}`
    ///
    /// # Errors
    ///
    /// Returns `Error::Json` if the document is malformed.
    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }
}

/// Which side of the call a failure belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Before the inner function runs
    Request,
    /// After the response arrived
    Response,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Request => "request",
            Self::Response => "response",
        })
    }
}

/// Receives failures under the `log` policy
pub trait ValidationSink: Send + Sync {
    /// Called once per failure
    fn report(&self, phase: Phase, error: &ValidateError);

    /// Sink name for logging
    fn name(&self) -> &'static str {
        "Unknown"
    }
}

/// Default sink: one `tracing` error event per failure
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ValidationSink for TracingSink {
    fn report(&self, phase: Phase, err: &ValidateError) {
        error!(
            phase = %phase,
            reason = %err.reason(),
            error = %err.error(),
            "Contract validation failed"
        );
    }

    fn name(&self) -> &'static str {
        "TracingSink"
    }
}

/// A request-issuing function
///
/// Implemented for any `Fn(String, RequestInit) -> impl Future<Output =
/// Result<R, E>>`, and for [`Validated`] itself.
pub trait Fetch: Send + Sync {
    /// Response type
    type Response: ResponseLike;
    /// Error type
    type Error: Send + 'static;

    /// Issue a request
    fn fetch(
        &self,
        input: String,
        init: RequestInit,
    ) -> BoxFuture<'_, std::result::Result<Self::Response, Self::Error>>;
}

impl<F, Fut, R, E> Fetch for F
where
    F: Fn(String, RequestInit) -> Fut + Send + Sync,
    Fut: Future<Output = std::result::Result<R, E>> + Send + 'static,
    R: ResponseLike,
    E: Send + 'static,
{
    type Response = R;
    type Error = E;

    fn fetch(&self, input: String, init: RequestInit) -> BoxFuture<'_, std::result::Result<R, E>> {
        Box::pin(self(input, init))
    }
}

/// A request function checked against an endpoint contract
pub struct Validated<F, A: SchemaAdapter> {
    inner: F,
    validator: SpecValidator<A>,
    matcher: PathMatcher,
    config: ValidationConfig,
    sink: Arc<dyn ValidationSink>,
}

/// Wrap `inner` so every call is validated against `endpoints`
///
/// The result is a drop-in replacement: same arguments, same response,
/// same error type.
pub fn with_validation<F, A>(
    inner: F,
    endpoints: EndpointMap<A::Schema>,
    adapter: A,
    config: ValidationConfig,
) -> Validated<F, A>
where
    F: Fetch,
    F::Error: From<ValidateError>,
    A: SchemaAdapter,
{
    Validated::new(inner, SpecValidator::new(endpoints, adapter), config)
}

impl<F, A> Validated<F, A>
where
    F: Fetch,
    F::Error: From<ValidateError>,
    A: SchemaAdapter,
{
    /// Wrap `inner` with an existing validator
    pub fn new(inner: F, validator: SpecValidator<A>, config: ValidationConfig) -> Self {
        let matcher = PathMatcher::from_endpoints(validator.endpoints());
        debug!(
            templates = matcher.templates().len(),
            policy = %config.policy,
            "Validation enabled"
        );
        Self {
            inner,
            validator,
            matcher,
            config,
            sink: Arc::new(TracingSink),
        }
    }

    /// Replace the sink used under the `log` policy
    #[must_use]
    pub fn with_sink<S: ValidationSink + 'static>(mut self, sink: S) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    /// The bound validator
    pub const fn validator(&self) -> &SpecValidator<A> {
        &self.validator
    }

    /// The configuration
    pub const fn config(&self) -> ValidationConfig {
        self.config
    }

    /// Name of the current sink
    pub fn sink_name(&self) -> &'static str {
        self.sink.name()
    }

    async fn call(
        &self,
        input: String,
        init: RequestInit,
    ) -> std::result::Result<F::Response, F::Error> {
        let request = RequestDescriptor::from_fetch(&input, &init, &self.matcher);
        debug!(path = %request.path, method = %request.method, "Validating request");
        self.enforce(Phase::Request, self.validator.validate_request(&request))?;

        let response = self.inner.fetch(input, init).await?;

        let duplicate = response.duplicate();
        let mut described = ResponseDescriptor::from_response(&request, &duplicate, None);
        described.body = match duplicate.read_body().await {
            Ok(bytes) => decode_body(&bytes),
            Err(e) => {
                debug!(error = %e, "Response body unreadable, validating as absent");
                Value::Null
            }
        };
        self.enforce(Phase::Response, self.validator.validate_response(&described))?;

        Ok(response)
    }

    fn enforce(
        &self,
        phase: Phase,
        report: ValidationReport<A::Data, A::Error>,
    ) -> std::result::Result<(), ValidateError> {
        let mut failures = report.into_failures().into_iter();
        match self.config.policy {
            Policy::Throw => failures.next().map_or(Ok(()), Err),
            Policy::Log => {
                for failure in failures {
                    self.sink.report(phase, &failure);
                }
                Ok(())
            }
        }
    }
}

impl<F, A> Fetch for Validated<F, A>
where
    F: Fetch,
    F::Error: From<ValidateError>,
    A: SchemaAdapter,
{
    type Response = F::Response;
    type Error = F::Error;

    fn fetch(
        &self,
        input: String,
        init: RequestInit,
    ) -> BoxFuture<'_, std::result::Result<F::Response, F::Error>> {
        Box::pin(self.call(input, init))
    }
}
