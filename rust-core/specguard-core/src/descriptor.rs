//! # Request and Response Descriptors
//!
//! Raw, untyped snapshots of an in-flight request or response, built at the
//! boundary and handed to the validator generators.
//!
//! Normalization happens here and nowhere downstream:
//! - header names are lower-cased, repeated values joined with `", "`
//! - the query string is percent-decoded into an object
//! - bodies are decoded best-effort (undecodable means `null`)
//! - the concrete path is resolved to its first matching template

use crate::json::decode_body;
use crate::matcher::PathMatcher;
use crate::response::{Bytes, ResponseLike};
use hyper::header::{HeaderName, HeaderValue};
use hyper::{HeaderMap, Request};
use serde_json::{Map, Value};
use tracing::debug;
use url::{form_urlencoded, Url};

/// Method used when none is given
pub const DEFAULT_METHOD: &str = "get";

/// Options for one request, alongside its URL
#[derive(Debug, Clone, Default)]
pub struct RequestInit {
    /// HTTP method; `get` when absent
    pub method: Option<String>,
    /// Request headers
    pub headers: HeaderMap,
    /// Raw request body
    pub body: Option<Bytes>,
}

impl RequestInit {
    /// Empty init: default method, no headers, no body
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the method
    #[must_use]
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Append a header; invalid names or values are skipped
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(n), Ok(v)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(n, v);
        }
        self
    }

    /// Set a raw body
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set a JSON body and content type
    #[must_use]
    pub fn json(self, body: &Value) -> Self {
        self.header("content-type", "application/json")
            .body(body.to_string())
    }
}

/// Snapshot of a request, ready for validation
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    /// Matched path template, or `""` if nothing matched
    pub path: String,
    /// Method as received
    pub method: String,
    /// Path parameters extracted by the matched template
    pub params: Value,
    /// Parsed query string
    pub query: Value,
    /// Decoded body, `null` when absent
    pub body: Value,
    /// Lower-cased headers
    pub headers: Value,
}

impl RequestDescriptor {
    /// Create a descriptor for an already-resolved template
    #[must_use]
    pub fn new(path: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method: method.into(),
            params: Value::Object(Map::new()),
            query: Value::Object(Map::new()),
            body: Value::Null,
            headers: Value::Object(Map::new()),
        }
    }

    /// Set path parameters
    #[must_use]
    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }

    /// Set the query
    #[must_use]
    pub fn with_query(mut self, query: Value) -> Self {
        self.query = query;
        self
    }

    /// Set the body
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    /// Set the headers
    #[must_use]
    pub fn with_headers(mut self, headers: Value) -> Self {
        self.headers = headers;
        self
    }

    /// Derive a descriptor from the arguments of a request function
    ///
    /// `input` may be an absolute URL, an origin-form path, or a relative
    /// path. Input that cannot be parsed yields path `""`.
    #[must_use]
    pub fn from_fetch(input: &str, init: &RequestInit, matcher: &PathMatcher) -> Self {
        let (path, query) = split_url(input);
        Self::resolved(
            matcher,
            &path,
            init.method.as_deref().unwrap_or(DEFAULT_METHOD),
            query.as_deref(),
            &init.headers,
            init.body.as_deref(),
        )
    }

    /// Derive a descriptor from a server-side request
    ///
    /// The body is passed separately since collecting it is up to the caller.
    #[must_use]
    pub fn from_http_request<B>(
        req: &Request<B>,
        body: Option<&[u8]>,
        matcher: &PathMatcher,
    ) -> Self {
        let uri = req.uri();
        Self::resolved(
            matcher,
            uri.path(),
            req.method().as_str(),
            uri.query(),
            req.headers(),
            body,
        )
    }

    fn resolved(
        matcher: &PathMatcher,
        path: &str,
        method: &str,
        query: Option<&str>,
        headers: &HeaderMap,
        body: Option<&[u8]>,
    ) -> Self {
        let (template, params) = matcher.best_match(path).map_or_else(
            || (String::new(), Map::new()),
            |c| {
                let params = c
                    .params
                    .into_iter()
                    .map(|(k, v)| (k, Value::String(v)))
                    .collect();
                (c.template, params)
            },
        );

        Self {
            path: template,
            method: method.to_string(),
            params: Value::Object(params),
            query: parse_query_string(query),
            body: body.map_or(Value::Null, decode_body),
            headers: headers_to_value(headers),
        }
    }
}

/// Snapshot of a response, ready for validation
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseDescriptor {
    /// Path template of the originating request
    pub path: String,
    /// Method of the originating request
    pub method: String,
    /// Numeric status code
    pub status_code: u16,
    /// Decoded body, `null` when absent
    pub body: Value,
    /// Lower-cased headers
    pub headers: Value,
}

impl ResponseDescriptor {
    /// Create a descriptor with no body and no headers
    #[must_use]
    pub fn new(path: impl Into<String>, method: impl Into<String>, status_code: u16) -> Self {
        Self {
            path: path.into(),
            method: method.into(),
            status_code,
            body: Value::Null,
            headers: Value::Object(Map::new()),
        }
    }

    /// Set the body
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    /// Set the headers
    #[must_use]
    pub fn with_headers(mut self, headers: Value) -> Self {
        self.headers = headers;
        self
    }

    /// Derive a descriptor from a response and its already-read body
    #[must_use]
    pub fn from_response<R: ResponseLike>(
        request: &RequestDescriptor,
        response: &R,
        body: Option<&[u8]>,
    ) -> Self {
        Self {
            path: request.path.clone(),
            method: request.method.clone(),
            status_code: response.status_code(),
            body: body.map_or(Value::Null, decode_body),
            headers: headers_to_value(response.headers()),
        }
    }
}

/// Base that relative and origin-form inputs resolve against
const BASE_URL: &str = "http://localhost/";

/// Split a URL into path and raw query
///
/// Parsing is lenient in the way browsers are: spaces and other characters
/// that are not valid in a URI are percent-encoded rather than rejected.
fn split_url(input: &str) -> (String, Option<String>) {
    let parsed = Url::parse(BASE_URL)
        .and_then(|base| Url::options().base_url(Some(&base)).parse(input));
    match parsed {
        Ok(url) => (url.path().to_string(), url.query().map(String::from)),
        Err(e) => {
            debug!(input = %input, error = %e, "Request URL cannot be parsed");
            (String::new(), None)
        }
    }
}

/// Flatten headers into an object keyed by lower-cased name
///
/// Values that are not visible ASCII are skipped.
pub fn headers_to_value(headers: &HeaderMap) -> Value {
    let mut map = Map::new();
    for name in headers.keys() {
        let values: Vec<&str> = headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();
        if !values.is_empty() {
            map.insert(name.as_str().to_string(), Value::String(values.join(", ")));
        }
    }
    Value::Object(map)
}

/// Parse a query string into an object
///
/// `+` and percent escapes are decoded. A key seen once maps to a string,
/// a repeated key to an array of its values in order. Keys without `=` map
/// to `""`.
pub fn parse_query_string(query: Option<&str>) -> Value {
    let mut map = Map::new();
    for (key, value) in form_urlencoded::parse(query.unwrap_or("").as_bytes()) {
        let value = Value::String(value.into_owned());
        match map.get_mut(key.as_ref()) {
            Some(Value::Array(values)) => values.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                map.insert(key.into_owned(), value);
            }
        }
    }
    Value::Object(map)
}
