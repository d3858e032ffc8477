//! # Responses
//!
//! What the orchestrator needs from a response: status, headers, a way to
//! duplicate it, and an async body read. The duplicate is consumed for
//! validation; the original goes back to the caller untouched.

use crate::error::{Error, Result};
use crate::fetch::BoxFuture;
use http_body_util::{BodyExt, Full};
pub use hyper::body::Bytes;
use hyper::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use hyper::{HeaderMap, Response, StatusCode};

/// A response the orchestrator can validate
pub trait ResponseLike: Send + Sized + 'static {
    /// Numeric status code
    fn status_code(&self) -> u16;

    /// Response headers
    fn headers(&self) -> &HeaderMap;

    /// An independent copy whose body can be consumed separately
    #[must_use]
    fn duplicate(&self) -> Self;

    /// Read the whole body
    fn read_body(self) -> BoxFuture<'static, Result<Bytes>>;
}

/// Fully buffered response
#[derive(Debug, Clone, Default)]
pub struct FetchResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl FetchResponse {
    /// Create an empty response with `status`
    ///
    /// Codes outside 100..=999 become 500.
    #[must_use]
    pub fn new(status: u16) -> Self {
        Self {
            status: StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Create a JSON response
    #[must_use]
    pub fn json(status: u16, body: &serde_json::Value) -> Self {
        Self::new(status)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
    }

    /// Create a text response
    #[must_use]
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self::new(status)
            .with_header("content-type", "text/plain")
            .with_body(body.into())
    }

    /// Append a header; invalid names or values are skipped
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(n), Ok(v)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(n, v);
        }
        self
    }

    /// Set the body
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// The status as a typed code
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// The raw body
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Content type, if set
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }
}

impl ResponseLike for FetchResponse {
    fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn duplicate(&self) -> Self {
        self.clone()
    }

    fn read_body(self) -> BoxFuture<'static, Result<Bytes>> {
        Box::pin(async move { Ok(self.body) })
    }
}

impl ResponseLike for Response<Full<Bytes>> {
    fn status_code(&self) -> u16 {
        self.status().as_u16()
    }

    fn headers(&self) -> &HeaderMap {
        Response::headers(self)
    }

    fn duplicate(&self) -> Self {
        let mut copy = Self::new(self.body().clone());
        *copy.status_mut() = self.status();
        *copy.version_mut() = self.version();
        copy.headers_mut().clone_from(Response::headers(self));
        copy
    }

    fn read_body(self) -> BoxFuture<'static, Result<Bytes>> {
        Box::pin(async move {
            self.into_body()
                .collect()
                .await
                .map(http_body_util::Collected::to_bytes)
                .map_err(|e| Error::Body {
                    message: e.to_string(),
                })
        })
    }
}
