//! # JSON Schema Adapter
//!
//! [`SchemaAdapter`] over compiled [`JsonSchema`]s. A failed check reports
//! every violation, not just the first.

use crate::schema::JsonSchema;
use serde::Serialize;
use serde_json::Value;
use specguard_core::SchemaAdapter;
use std::fmt;

/// One place where an instance breaks its schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    /// JSON Pointer into the instance
    pub instance_path: String,
    /// JSON Pointer into the schema
    pub schema_path: String,
    /// What went wrong
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.instance_path.is_empty() {
            write!(f, "(root): {}", self.message)
        } else {
            write!(f, "{}: {}", self.instance_path, self.message)
        }
    }
}

/// Every violation found in one instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Violations {
    violations: Vec<Violation>,
}

impl Violations {
    /// Number of violations
    #[must_use]
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// Whether there are none
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// The violations, in the order the validator reported them
    #[must_use]
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Consume and return the inner list
    #[must_use]
    pub fn into_inner(self) -> Vec<Violation> {
        self.violations
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Violations {}

/// Validates values against [`JsonSchema`]s
///
/// Success hands back a copy of the validated value.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSchemaAdapter;

impl JsonSchemaAdapter {
    /// Create the adapter
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl SchemaAdapter for JsonSchemaAdapter {
    type Schema = JsonSchema;
    type Data = Value;
    type Error = Violations;

    fn validate(&self, schema: &JsonSchema, value: &Value) -> Result<Value, Violations> {
        let violations: Vec<Violation> = schema
            .validator()
            .iter_errors(value)
            .map(|e| Violation {
                instance_path: e.instance_path.to_string(),
                schema_path: e.schema_path.to_string(),
                message: e.to_string(),
            })
            .collect();

        if violations.is_empty() {
            Ok(value.clone())
        } else {
            Err(Violations { violations })
        }
    }
}
