//! # Specguard JSON Schema
//!
//! JSON Schema support for specguard endpoint contracts, built on the
//! `jsonschema` crate.
//!
//! A whole contract can be loaded from one JSON document:
//!
//! ```json
//! {
//!   "/users/:id": {
//!     "get": {
//!       "params": { "type": "object", "required": ["id"] },
//!       "responses": { "200": { "body": { "type": "object" } } }
//!     }
//!   }
//! }
//! ```
//!
//! ## Modules
//!
//! - `schema` - Compiled schemas
//! - `adapter` - The `SchemaAdapter` implementation and its error type

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod adapter;
pub mod schema;

pub use adapter::{JsonSchemaAdapter, Violation, Violations};
pub use schema::{JsonSchema, SchemaError};

use specguard_core::{EndpointMap, Error, Result};

/// An endpoint contract whose schemas are JSON Schemas
pub type JsonEndpointMap = EndpointMap<JsonSchema>;

/// Load a contract from a JSON document, compiling every schema
///
/// # Errors
///
/// Returns `Error::Json` if the document is malformed, names an unknown
/// method, or holds an invalid schema.
pub fn load_contract(json: &str) -> Result<JsonEndpointMap> {
    let map: JsonEndpointMap = serde_json::from_str(json).map_err(Error::Json)?;
    tracing::debug!(endpoints = map.len(), "Contract loaded");
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::Full;
    use hyper::Response;
    use serde_json::json;
    use specguard_core::{
        build_response_validators, with_validation, Bytes, Fetch, FetchResponse, Field, PathMatcher,
        Phase, Policy, Reason, RequestDescriptor, RequestInit, ResponseDescriptor, SpecValidator,
        ValidateError, ValidationConfig, ValidationSink, ValidatorError,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    const CONTRACT: &str = r#"{
        "/users/:id": {
            "get": {
                "description": "fetch one user",
                "params": {
                    "type": "object",
                    "properties": { "id": { "type": "string" } },
                    "required": ["id"]
                },
                "responses": {
                    "200": {
                        "body": {
                            "type": "object",
                            "properties": {
                                "id": { "type": "string" },
                                "name": { "type": "string" }
                            },
                            "required": ["id", "name"]
                        }
                    }
                }
            }
        },
        "/search": {
            "get": {
                "query": { "type": "object", "required": ["q"] },
                "responses": { "200": {} }
            }
        },
        "/items": {
            "post": {
                "body": {
                    "type": "object",
                    "properties": { "name": { "type": "string" } },
                    "required": ["name"]
                },
                "responses": {
                    "201": { "headers": { "type": "object", "required": ["location"] } }
                }
            }
        }
    }"#;

    #[derive(Clone, Default)]
    struct Collect(Arc<Mutex<Vec<(Phase, Reason)>>>);

    impl ValidationSink for Collect {
        fn report(&self, phase: Phase, error: &ValidateError) {
            self.0.lock().unwrap().push((phase, error.reason()));
        }
    }

    fn contract() -> JsonEndpointMap {
        load_contract(CONTRACT).unwrap()
    }

    #[test]
    fn test_load_contract_keeps_order() {
        let map = contract();
        assert_eq!(map.templates().collect::<Vec<_>>(), vec!["/users/:id", "/search", "/items"]);
    }

    #[test]
    fn test_load_contract_rejects_bad_schema() {
        let doc = r#"{"/x": {"get": {"body": {"type": 1}, "responses": {}}}}"#;
        let err = load_contract(doc).unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_user_lookup_validates() {
        let sv = SpecValidator::new(contract(), JsonSchemaAdapter);
        let matcher = PathMatcher::from_endpoints(sv.endpoints());
        let request = RequestDescriptor::from_fetch("/users/42", &RequestInit::new(), &matcher);
        assert_eq!(request.params, json!({ "id": "42" }));

        let report = sv.validate_request(&request);
        assert!(report.pre_check.is_none());
        assert_eq!(report.outcome(Field::Params), Some(&Ok(json!({ "id": "42" }))));

        let response = ResponseDescriptor::new("/users/:id", "get", 200)
            .with_body(json!({ "id": "42", "name": "Ada" }));
        assert!(sv.validate_response(&response).is_ok());
    }

    #[test]
    fn test_undeclared_method_fails_pre_check() {
        let sv = SpecValidator::new(contract(), JsonSchemaAdapter);
        let request =
            RequestDescriptor::new("/users/:id", "post").with_params(json!({ "id": "42" }));
        let report = sv.validate_request(&request);
        assert_eq!(
            report.pre_check,
            Some(ValidatorError::MethodNotFound {
                actual: "post".to_string()
            })
        );
        assert!(report.fields.is_empty());
    }

    #[test]
    fn test_undeclared_status_has_no_validators() {
        let map = contract();
        let response = ResponseDescriptor::new("/users/:id", "get", 404)
            .with_body(json!({ "error": "gone" }));
        let validators = build_response_validators(&map, &JsonSchemaAdapter, &response).unwrap();
        assert!(validators.is_empty());
    }

    #[tokio::test]
    async fn test_missing_query_throws_before_call() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let client = with_validation(
            move |_input: String, _init: RequestInit| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, Error>(FetchResponse::json(200, &json!([]))) }
            },
            contract(),
            JsonSchemaAdapter,
            ValidationConfig::default(),
        );

        let err = client.fetch("/search?page=1".to_string(), RequestInit::new()).await.unwrap_err();
        let Error::Validation(err) = err else {
            panic!("expected a validation error");
        };
        assert_eq!(err.reason(), Reason::Field(Field::Query));
        let violations = err.downcast_ref::<Violations>().unwrap();
        assert_eq!(violations.violations()[0].schema_path, "/required");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_log_policy_returns_original_response() {
        let sink = Collect::default();
        let client = with_validation(
            |_input: String, _init: RequestInit| async {
                Ok::<_, Error>(FetchResponse::json(201, &json!({ "id": "9" })))
            },
            contract(),
            JsonSchemaAdapter,
            ValidationConfig::default().with_policy(Policy::Log),
        )
        .with_sink(sink.clone());

        let init = RequestInit::new().method("post").json(&json!({ "name": 3 }));
        let res = client.fetch("https://api.test/items".to_string(), init).await.unwrap();

        assert_eq!(
            *sink.0.lock().unwrap(),
            vec![
                (Phase::Request, Reason::Field(Field::Body)),
                (Phase::Response, Reason::Field(Field::Headers)),
            ]
        );
        assert_eq!(res.status(), 201);
        assert_eq!(res.body().as_ref(), br#"{"id":"9"}"#);
    }

    #[tokio::test]
    async fn test_hyper_responses_validate() {
        let client = with_validation(
            |_input: String, _init: RequestInit| async {
                let res = Response::builder()
                    .status(201)
                    .header("Location", "/items/1")
                    .body(Full::new(Bytes::from_static(b"{}")))
                    .map_err(|e| Error::Body { message: e.to_string() })?;
                Ok::<_, Error>(res)
            },
            contract(),
            JsonSchemaAdapter,
            ValidationConfig::default(),
        );

        let init = RequestInit::new().method("POST").json(&json!({ "name": "lamp" }));
        let res = client.fetch("/items".to_string(), init).await.unwrap();
        assert_eq!(res.status(), 201);
        assert_eq!(res.headers()["location"], "/items/1");
    }
}
