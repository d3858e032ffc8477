//! # Validator Generators
//!
//! Turn an endpoint map plus a descriptor into one deferred [`Validator`]
//! per declared field.
//!
//! Resolution happens first (method, path, method-on-path). A structural
//! failure short-circuits everything; otherwise only fields whose schema is
//! declared get a validator. An undeclared field has no validator at all,
//! which is not the same as one that always passes.
//!
//! Both generators are pure: they capture references and run nothing until
//! a validator is called.

use crate::adapter::{field_validator, SchemaAdapter, Validator};
use crate::descriptor::{RequestDescriptor, ResponseDescriptor};
use crate::spec::EndpointMap;
use crate::validation::{Field, ValidateError, ValidatorError};

/// Validators for the declared fields of a request
pub struct RequestValidators<'a, D, E> {
    /// Path parameter validator
    pub params: Option<Validator<'a, D, E>>,
    /// Query validator
    pub query: Option<Validator<'a, D, E>>,
    /// Body validator
    pub body: Option<Validator<'a, D, E>>,
    /// Headers validator
    pub headers: Option<Validator<'a, D, E>>,
}

impl<'a, D, E> RequestValidators<'a, D, E> {
    /// Validator for `field`, if declared
    #[must_use]
    pub fn get(&self, field: Field) -> Option<&Validator<'a, D, E>> {
        match field {
            Field::Params => self.params.as_ref(),
            Field::Query => self.query.as_ref(),
            Field::Body => self.body.as_ref(),
            Field::Headers => self.headers.as_ref(),
        }
    }

    /// Declared fields, in validation order
    #[must_use]
    pub fn fields(&self) -> Vec<Field> {
        Field::REQUEST.into_iter().filter(|f| self.get(*f).is_some()).collect()
    }

    /// Number of declared fields
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields().len()
    }

    /// Whether no field is declared
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Call every validator once, in field order
    #[must_use]
    pub fn run(&self) -> Vec<FieldOutcome<D, E>> {
        run_fields(&Field::REQUEST, |f| self.get(f))
    }
}

/// Validators for the declared fields of a response
pub struct ResponseValidators<'a, D, E> {
    /// Body validator
    pub body: Option<Validator<'a, D, E>>,
    /// Headers validator
    pub headers: Option<Validator<'a, D, E>>,
}

impl<'a, D, E> ResponseValidators<'a, D, E> {
    /// Validator set with nothing to check
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            body: None,
            headers: None,
        }
    }

    /// Validator for `field`, if declared
    #[must_use]
    pub fn get(&self, field: Field) -> Option<&Validator<'a, D, E>> {
        match field {
            Field::Body => self.body.as_ref(),
            Field::Headers => self.headers.as_ref(),
            Field::Params | Field::Query => None,
        }
    }

    /// Declared fields, in validation order
    #[must_use]
    pub fn fields(&self) -> Vec<Field> {
        Field::RESPONSE.into_iter().filter(|f| self.get(*f).is_some()).collect()
    }

    /// Number of declared fields
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields().len()
    }

    /// Whether no field is declared
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Call every validator once, in field order
    #[must_use]
    pub fn run(&self) -> Vec<FieldOutcome<D, E>> {
        run_fields(&Field::RESPONSE, |f| self.get(f))
    }
}

fn run_fields<'v, 'a: 'v, D: 'v, E: 'v>(
    order: &[Field],
    get: impl Fn(Field) -> Option<&'v Validator<'a, D, E>>,
) -> Vec<FieldOutcome<D, E>> {
    order
        .iter()
        .filter_map(|&field| {
            get(field).map(|validate| FieldOutcome {
                field,
                result: validate(),
            })
        })
        .collect()
}

/// Result of validating one field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldOutcome<D, E> {
    /// Which field
    pub field: Field,
    /// What the adapter returned
    pub result: Result<D, E>,
}

/// Everything one validation pass found
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport<D, E> {
    /// Structural failure; when set, no field was validated
    pub pre_check: Option<ValidatorError>,
    /// Per-field outcomes in field order
    pub fields: Vec<FieldOutcome<D, E>>,
}

impl<D, E> ValidationReport<D, E> {
    /// Report for a structural failure
    #[must_use]
    pub const fn failed_pre_check(error: ValidatorError) -> Self {
        Self {
            pre_check: Some(error),
            fields: Vec::new(),
        }
    }

    /// Whether nothing failed
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.pre_check.is_none() && self.fields.iter().all(|o| o.result.is_ok())
    }

    /// Outcome for `field`, if it was validated
    #[must_use]
    pub fn outcome(&self, field: Field) -> Option<&Result<D, E>> {
        self.fields.iter().find(|o| o.field == field).map(|o| &o.result)
    }

    /// Number of failures: precheck plus failed fields
    #[must_use]
    pub fn error_count(&self) -> usize {
        let failed = self.fields.iter().filter(|o| o.result.is_err()).count();
        usize::from(self.pre_check.is_some()) + failed
    }
}

impl<D, E> ValidationReport<D, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    /// All failures, precheck first, then fields in field order
    #[must_use]
    pub fn into_failures(self) -> Vec<ValidateError> {
        let pre = self.pre_check.map(ValidateError::pre_check);
        let fields = self
            .fields
            .into_iter()
            .filter_map(|o| o.result.err().map(|e| ValidateError::new(o.field, e)));
        pre.into_iter().chain(fields).collect()
    }
}

/// Request validators, or the structural error that prevented them
pub type RequestValidatorsResult<'a, A> = Result<
    RequestValidators<'a, <A as SchemaAdapter>::Data, <A as SchemaAdapter>::Error>,
    ValidatorError,
>;

/// Response validators, or the structural error that prevented them
pub type ResponseValidatorsResult<'a, A> = Result<
    ResponseValidators<'a, <A as SchemaAdapter>::Data, <A as SchemaAdapter>::Error>,
    ValidatorError,
>;

/// Build one validator per field declared for the request's endpoint
///
/// # Errors
///
/// Returns the structural error if the descriptor's method or path cannot
/// be resolved against `endpoints`.
pub fn build_request_validators<'a, A: SchemaAdapter>(
    endpoints: &'a EndpointMap<A::Schema>,
    adapter: &'a A,
    descriptor: &'a RequestDescriptor,
) -> RequestValidatorsResult<'a, A> {
    let (_, spec) = endpoints.resolve(&descriptor.path, &descriptor.method)?;
    let make = |schema: Option<&'a A::Schema>, value: &'a serde_json::Value| {
        schema.map(|s| field_validator(adapter, s, value))
    };

    Ok(RequestValidators {
        params: make(spec.params.as_ref(), &descriptor.params),
        query: make(spec.query.as_ref(), &descriptor.query),
        body: make(spec.body.as_ref(), &descriptor.body),
        headers: make(spec.headers.as_ref(), &descriptor.headers),
    })
}

/// Build one validator per field declared for the response's status code
///
/// An undocumented status code yields an empty set, not an error.
///
/// # Errors
///
/// Returns the structural error if the descriptor's method or path cannot
/// be resolved against `endpoints`.
pub fn build_response_validators<'a, A: SchemaAdapter>(
    endpoints: &'a EndpointMap<A::Schema>,
    adapter: &'a A,
    descriptor: &'a ResponseDescriptor,
) -> ResponseValidatorsResult<'a, A> {
    let (_, spec) = endpoints.resolve(&descriptor.path, &descriptor.method)?;
    let Some(response) = spec.response_for(descriptor.status_code) else {
        return Ok(ResponseValidators::empty());
    };
    let make = |schema: Option<&'a A::Schema>, value: &'a serde_json::Value| {
        schema.map(|s| field_validator(adapter, s, value))
    };

    Ok(ResponseValidators {
        body: make(response.body.as_ref(), &descriptor.body),
        headers: make(response.headers.as_ref(), &descriptor.headers),
    })
}

/// Run request validators, folding a structural error into the report
#[must_use]
pub fn run_request_validators<D, E>(
    validators: Result<RequestValidators<'_, D, E>, ValidatorError>,
) -> ValidationReport<D, E> {
    match validators {
        Ok(v) => ValidationReport {
            pre_check: None,
            fields: v.run(),
        },
        Err(e) => ValidationReport::failed_pre_check(e),
    }
}

/// Run response validators, folding a structural error into the report
#[must_use]
pub fn run_response_validators<D, E>(
    validators: Result<ResponseValidators<'_, D, E>, ValidatorError>,
) -> ValidationReport<D, E> {
    match validators {
        Ok(v) => ValidationReport {
            pre_check: None,
            fields: v.run(),
        },
        Err(e) => ValidationReport::failed_pre_check(e),
    }
}

/// An endpoint map bound to a schema adapter
pub struct SpecValidator<A: SchemaAdapter> {
    endpoints: EndpointMap<A::Schema>,
    adapter: A,
}

impl<A: SchemaAdapter> SpecValidator<A> {
    /// Bind `endpoints` to `adapter`
    pub const fn new(endpoints: EndpointMap<A::Schema>, adapter: A) -> Self {
        Self { endpoints, adapter }
    }

    /// The endpoint map
    pub const fn endpoints(&self) -> &EndpointMap<A::Schema> {
        &self.endpoints
    }

    /// The adapter
    pub const fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Build request validators for `descriptor`
    ///
    /// # Errors
    ///
    /// See [`build_request_validators`].
    pub fn request<'a>(
        &'a self,
        descriptor: &'a RequestDescriptor,
    ) -> RequestValidatorsResult<'a, A> {
        build_request_validators(&self.endpoints, &self.adapter, descriptor)
    }

    /// Build response validators for `descriptor`
    ///
    /// # Errors
    ///
    /// See [`build_response_validators`].
    pub fn response<'a>(
        &'a self,
        descriptor: &'a ResponseDescriptor,
    ) -> ResponseValidatorsResult<'a, A> {
        build_response_validators(&self.endpoints, &self.adapter, descriptor)
    }

    /// Build and run request validators
    pub fn validate_request(
        &self,
        descriptor: &RequestDescriptor,
    ) -> ValidationReport<A::Data, A::Error> {
        run_request_validators(self.request(descriptor))
    }

    /// Build and run response validators
    pub fn validate_response(
        &self,
        descriptor: &ResponseDescriptor,
    ) -> ValidationReport<A::Data, A::Error> {
        run_response_validators(self.response(descriptor))
    }
}

impl<A> std::fmt::Debug for SpecValidator<A>
where
    A: SchemaAdapter + std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpecValidator")
            .field("templates", &self.endpoints.templates().collect::<Vec<_>>())
            .field("adapter", &self.adapter)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::testing::{TestAdapter, TestSchema, TestSchemaError};
    use crate::spec::{EndpointDef, EndpointSpec, ResponseSpec};
    use crate::validation::Reason;
    use serde_json::json;

    fn users() -> EndpointMap<TestSchema> {
        EndpointMap::new()
            .endpoint(
                "/users/:id",
                EndpointDef::new().get(
                    EndpointSpec::new()
                        .params(TestSchema::StringAt("id"))
                        .response(
                            200,
                            ResponseSpec::new().body(TestSchema::Keys(vec!["id", "name"])),
                        )
                        .response(
                            201,
                            ResponseSpec::new()
                                .body(TestSchema::Any)
                                .headers(TestSchema::Keys(vec!["location"])),
                        )
                        .response(204, ResponseSpec::new()),
                ),
            )
            .endpoint(
                "/search",
                EndpointDef::new().get(
                    EndpointSpec::new()
                        .query(TestSchema::Keys(vec!["q"]))
                        .headers(TestSchema::Keys(vec!["x-api-key"])),
                ),
            )
    }

    #[test]
    fn test_request_validators_only_for_declared_fields() {
        let map = users();
        let desc = RequestDescriptor::new("/users/:id", "get").with_params(json!({ "id": "42" }));
        let v = build_request_validators(&map, &TestAdapter, &desc).unwrap();
        assert_eq!(v.fields(), vec![Field::Params]);
        assert!(v.query.is_none() && v.body.is_none() && v.headers.is_none());
        assert_eq!((v.params.as_ref().unwrap())(), Ok(json!({ "id": "42" })));
    }

    #[test]
    fn test_request_field_order() {
        let map = users();
        let desc = RequestDescriptor::new("/search", "GET");
        let v = build_request_validators(&map, &TestAdapter, &desc).unwrap();
        let outcomes = v.run();
        let fields: Vec<Field> = outcomes.iter().map(|o| o.field).collect();
        assert_eq!(fields, vec![Field::Query, Field::Headers]);
        assert!(outcomes.iter().all(|o| o.result.is_err()));
    }

    #[test]
    fn test_request_structural_errors() {
        let map = users();

        let desc = RequestDescriptor::new("/users/:id", "post");
        let err = build_request_validators(&map, &TestAdapter, &desc).err().unwrap();
        assert_eq!(err, ValidatorError::MethodNotFound { actual: "post".to_string() });

        let desc = RequestDescriptor::new("", "get");
        let err = build_request_validators(&map, &TestAdapter, &desc).err().unwrap();
        assert_eq!(err, ValidatorError::PathNotFound { actual: String::new() });

        let desc = RequestDescriptor::new("/users/:id", "TRACE");
        let err = build_request_validators(&map, &TestAdapter, &desc).err().unwrap();
        assert_eq!(err, ValidatorError::MethodInvalid { actual: "TRACE".to_string() });
    }

    #[test]
    fn test_validators_are_idempotent() {
        let map = users();
        let desc = RequestDescriptor::new("/search", "get").with_query(json!({ "page": "1" }));
        let v = build_request_validators(&map, &TestAdapter, &desc).unwrap();
        let query = v.query.as_ref().unwrap();
        assert_eq!(query(), query());
        assert_eq!(v.run(), v.run());
    }

    #[test]
    fn test_response_validators_per_status() {
        let map = users();

        let desc = ResponseDescriptor::new("/users/:id", "get", 200)
            .with_body(json!({ "id": "1", "name": "A" }));
        let v = build_response_validators(&map, &TestAdapter, &desc).unwrap();
        assert_eq!(v.fields(), vec![Field::Body]);
        assert!(v.run()[0].result.is_ok());

        let desc = ResponseDescriptor::new("/users/:id", "get", 201);
        let v = build_response_validators(&map, &TestAdapter, &desc).unwrap();
        assert_eq!(v.len(), 2);
    }

    #[test]
    fn test_documented_status_without_fields_is_empty() {
        let map = users();
        let desc = ResponseDescriptor::new("/users/:id", "get", 204);
        let v = build_response_validators(&map, &TestAdapter, &desc).unwrap();
        assert!(v.is_empty());
    }

    #[test]
    fn test_undocumented_status_is_empty_not_error() {
        let map = users();
        let desc = ResponseDescriptor::new("/users/:id", "get", 404).with_body(json!("nope"));
        let v = build_response_validators(&map, &TestAdapter, &desc).unwrap();
        assert!(v.is_empty());
        assert!(run_response_validators(Ok(v)).is_ok());
    }

    #[test]
    fn test_response_structural_error() {
        let map = users();
        let desc = ResponseDescriptor::new("/users/:id", "delete", 200);
        let report = run_response_validators(build_response_validators(&map, &TestAdapter, &desc));
        assert_eq!(
            report.pre_check,
            Some(ValidatorError::MethodNotFound { actual: "delete".to_string() })
        );
        assert!(report.fields.is_empty());
        assert_eq!(report.error_count(), 1);
    }

    #[test]
    fn test_report_failures_in_order() {
        let map = users();
        let desc = RequestDescriptor::new("/search", "get");
        let report = run_request_validators(build_request_validators(&map, &TestAdapter, &desc));
        assert!(!report.is_ok());
        assert_eq!(report.error_count(), 2);
        assert!(report.outcome(Field::Body).is_none());

        let failures = report.into_failures();
        let reasons: Vec<Reason> = failures.iter().map(ValidateError::reason).collect();
        assert_eq!(reasons, vec![Reason::Field(Field::Query), Reason::Field(Field::Headers)]);
        assert_eq!(
            failures[0].downcast_ref::<TestSchemaError>(),
            Some(&TestSchemaError("missing key 'q'".to_string()))
        );
    }

    #[test]
    fn test_pre_check_failure_comes_first() {
        let report: ValidationReport<(), TestSchemaError> =
            ValidationReport::failed_pre_check(ValidatorError::PathNotFound {
                actual: "/x".to_string(),
            });
        let failures = report.into_failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].reason(), Reason::PreCheck);
    }

    #[test]
    fn test_spec_validator() {
        let sv = SpecValidator::new(users(), TestAdapter);
        let ok = RequestDescriptor::new("/users/:id", "GET").with_params(json!({ "id": "7" }));
        assert!(sv.validate_request(&ok).is_ok());

        let bad = RequestDescriptor::new("/users/:id", "GET").with_params(json!({ "id": 7 }));
        let report = sv.validate_request(&bad);
        assert!(matches!(report.outcome(Field::Params), Some(Err(_))));

        let res = ResponseDescriptor::new("/users/:id", "get", 200).with_body(json!({ "id": "7" }));
        assert_eq!(sv.validate_response(&res).error_count(), 1);
        assert_eq!(sv.endpoints().len(), 2);
    }
}
