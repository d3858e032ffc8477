//! # Schema Adapter
//!
//! The one contract a schema-validation library must satisfy to plug into
//! the engine. The engine is generic over [`SchemaAdapter`] and never asks
//! which implementation it has; several adapters can coexist in a process.

use serde_json::Value;
use std::error::Error as StdError;

/// Pluggable schema validation
///
/// `Schema` is opaque to the engine: it is stored in the endpoint map and
/// handed back to [`SchemaAdapter::validate`] untouched.
pub trait SchemaAdapter: Send + Sync {
    /// Schema representation stored in the endpoint map
    type Schema: Send + Sync;
    /// Value produced by a successful validation
    type Data;
    /// Error produced by a failed validation
    type Error: StdError + Send + Sync + 'static;

    /// Validate `value` against `schema`
    ///
    /// # Errors
    ///
    /// Returns the adapter's own error when `value` does not conform.
    fn validate(&self, schema: &Self::Schema, value: &Value) -> Result<Self::Data, Self::Error>;
}

impl<A: SchemaAdapter + ?Sized> SchemaAdapter for &A {
    type Schema = A::Schema;
    type Data = A::Data;
    type Error = A::Error;

    fn validate(&self, schema: &Self::Schema, value: &Value) -> Result<Self::Data, Self::Error> {
        (**self).validate(schema, value)
    }
}

impl<A: SchemaAdapter + ?Sized> SchemaAdapter for std::sync::Arc<A> {
    type Schema = A::Schema;
    type Data = A::Data;
    type Error = A::Error;

    fn validate(&self, schema: &Self::Schema, value: &Value) -> Result<Self::Data, Self::Error> {
        (**self).validate(schema, value)
    }
}

/// Deferred validation of one field
///
/// Captures the adapter, the schema and the field value; calling it has no
/// side effects, so repeated calls return equal results.
pub type Validator<'a, D, E> = Box<dyn Fn() -> Result<D, E> + Send + Sync + 'a>;

/// Build the validator for one field
pub(crate) fn field_validator<'a, A: SchemaAdapter>(
    adapter: &'a A,
    schema: &'a A::Schema,
    value: &'a Value,
) -> Validator<'a, A::Data, A::Error> {
    Box::new(move || adapter.validate(schema, value))
}
