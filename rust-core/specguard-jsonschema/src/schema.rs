//! # Compiled JSON Schemas
//!
//! A [`JsonSchema`] is compiled once, when the contract is built or
//! deserialized, and shared by every validator that uses it.
//!
//! Remote `$ref`s are refused: contracts must be self-contained.

use jsonschema::{Draft, Retrieve, Uri, Validator};
use serde::de::{Deserialize, Deserializer, Error as _};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

/// Schema compilation failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// The document is not a valid JSON Schema
    #[error("invalid JSON Schema: {reason}")]
    Invalid {
        /// Message from the schema compiler
        reason: String,
    },
}

/// Retriever that resolves nothing
struct NoRemoteRefs;

impl Retrieve for NoRemoteRefs {
    fn retrieve(&self, uri: &Uri<&str>) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        Err(format!("remote reference not allowed: {}", uri.as_str()).into())
    }
}

/// A JSON Schema document and its compiled validator
#[derive(Clone)]
pub struct JsonSchema {
    source: Value,
    validator: Arc<Validator>,
}

impl JsonSchema {
    /// Compile `source`, detecting the draft from `$schema`
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::Invalid` if `source` is not a valid schema.
    pub fn new(source: Value) -> Result<Self, SchemaError> {
        Self::compile(source, None)
    }

    /// Compile `source` under a fixed draft
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::Invalid` if `source` is not a valid schema.
    pub fn with_draft(source: Value, draft: Draft) -> Result<Self, SchemaError> {
        Self::compile(source, Some(draft))
    }

    fn compile(source: Value, draft: Option<Draft>) -> Result<Self, SchemaError> {
        let mut opts = jsonschema::options();
        if let Some(draft) = draft {
            opts.with_draft(draft);
        }
        opts.with_retriever(NoRemoteRefs);

        let validator = opts.build(&source).map_err(|e| {
            warn!(error = %e, "Schema rejected");
            SchemaError::Invalid { reason: e.to_string() }
        })?;
        Ok(Self {
            source,
            validator: Arc::new(validator),
        })
    }

    /// The schema document
    #[must_use]
    pub const fn source(&self) -> &Value {
        &self.source
    }

    /// The compiled validator
    #[must_use]
    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    /// Whether `instance` conforms
    #[must_use]
    pub fn is_valid(&self, instance: &Value) -> bool {
        self.validator.is_valid(instance)
    }
}

impl fmt::Debug for JsonSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("JsonSchema").field(&self.source).finish()
    }
}

impl PartialEq for JsonSchema {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl<'de> Deserialize<'de> for JsonSchema {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source = Value::deserialize(deserializer)?;
        Self::new(source).map_err(D::Error::custom)
    }
}

impl TryFrom<Value> for JsonSchema {
    type Error = SchemaError;

    fn try_from(source: Value) -> Result<Self, Self::Error> {
        Self::new(source)
    }
}
