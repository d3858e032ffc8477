//! # Endpoint Spec Model
//!
//! The declarative contract: path templates, methods, per-field schemas and
//! per-status-code response schemas. Pure data, generic over the schema type
//! `S`, which the engine never inspects.
//!
//! ```text
//! EndpointMap            "/users/:id" -> EndpointDef
//!   EndpointDef          get -> EndpointSpec
//!     EndpointSpec       params/query/body/headers + responses
//!       ResponseSpec     200 -> body/headers
//! ```

use crate::validation::ValidatorError;
use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::marker::PhantomData;

/// HTTP methods an endpoint may declare
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Deserialize, serde::Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// HTTP GET
    Get,
    /// HTTP POST
    Post,
    /// HTTP PUT
    Put,
    /// HTTP DELETE
    Delete,
    /// HTTP PATCH
    Patch,
    /// HTTP OPTIONS
    Options,
    /// HTTP HEAD
    Head,
}

impl Method {
    /// The closed verb set
    pub const ALL: [Self; 7] = [
        Self::Get,
        Self::Post,
        Self::Put,
        Self::Delete,
        Self::Patch,
        Self::Options,
        Self::Head,
    ];

    /// Parse a method name, ignoring case
    ///
    /// Returns `None` for anything outside the verb set.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "get" => Some(Self::Get),
            "post" => Some(Self::Post),
            "put" => Some(Self::Put),
            "delete" => Some(Self::Delete),
            "patch" => Some(Self::Patch),
            "options" => Some(Self::Options),
            "head" => Some(Self::Head),
            _ => None,
        }
    }

    /// Lower-case method name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Post => "post",
            Self::Put => "put",
            Self::Delete => "delete",
            Self::Patch => "patch",
            Self::Options => "options",
            Self::Head => "head",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Schemas for one documented response status
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(bound(deserialize = "S: Deserialize<'de>"))]
pub struct ResponseSpec<S> {
    /// Response body schema
    #[serde(default)]
    pub body: Option<S>,
    /// Response headers schema
    #[serde(default)]
    pub headers: Option<S>,
}

impl<S> Default for ResponseSpec<S> {
    fn default() -> Self {
        Self {
            body: None,
            headers: None,
        }
    }
}

impl<S> ResponseSpec<S> {
    /// Create a response spec with no field schemas
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the body schema
    #[must_use]
    pub fn body(mut self, schema: S) -> Self {
        self.body = Some(schema);
        self
    }

    /// Set the headers schema
    #[must_use]
    pub fn headers(mut self, schema: S) -> Self {
        self.headers = Some(schema);
        self
    }
}

/// Contract for one path + method
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(bound(deserialize = "S: Deserialize<'de>"))]
pub struct EndpointSpec<S> {
    /// Path parameter schema
    #[serde(default)]
    pub params: Option<S>,
    /// Query schema
    #[serde(default)]
    pub query: Option<S>,
    /// Request body schema
    #[serde(default)]
    pub body: Option<S>,
    /// Request headers schema
    #[serde(default)]
    pub headers: Option<S>,
    /// Documented responses by status code
    pub responses: BTreeMap<u16, ResponseSpec<S>>,
}

impl<S> Default for EndpointSpec<S> {
    fn default() -> Self {
        Self {
            params: None,
            query: None,
            body: None,
            headers: None,
            responses: BTreeMap::new(),
        }
    }
}

impl<S> EndpointSpec<S> {
    /// Create an endpoint spec with no schemas and no responses
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the path parameter schema
    #[must_use]
    pub fn params(mut self, schema: S) -> Self {
        self.params = Some(schema);
        self
    }

    /// Set the query schema
    #[must_use]
    pub fn query(mut self, schema: S) -> Self {
        self.query = Some(schema);
        self
    }

    /// Set the request body schema
    #[must_use]
    pub fn body(mut self, schema: S) -> Self {
        self.body = Some(schema);
        self
    }

    /// Set the request headers schema
    #[must_use]
    pub fn headers(mut self, schema: S) -> Self {
        self.headers = Some(schema);
        self
    }

    /// Document a response status
    #[must_use]
    pub fn response(mut self, status: u16, response: ResponseSpec<S>) -> Self {
        self.responses.insert(status, response);
        self
    }

    /// Response spec for a status code, if documented
    #[must_use]
    pub fn response_for(&self, status: u16) -> Option<&ResponseSpec<S>> {
        self.responses.get(&status)
    }
}

/// Method table for one path template
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(transparent, bound(deserialize = "S: Deserialize<'de>"))]
pub struct EndpointDef<S> {
    methods: HashMap<Method, EndpointSpec<S>>,
}

impl<S> Default for EndpointDef<S> {
    fn default() -> Self {
        Self {
            methods: HashMap::new(),
        }
    }
}

impl<S> EndpointDef<S> {
    /// Create an empty method table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `spec` for `method`, replacing any previous declaration
    #[must_use]
    pub fn method(mut self, method: Method, spec: EndpointSpec<S>) -> Self {
        self.methods.insert(method, spec);
        self
    }

    /// Declare a GET endpoint
    #[must_use]
    pub fn get(self, spec: EndpointSpec<S>) -> Self {
        self.method(Method::Get, spec)
    }

    /// Declare a POST endpoint
    #[must_use]
    pub fn post(self, spec: EndpointSpec<S>) -> Self {
        self.method(Method::Post, spec)
    }

    /// Declare a PUT endpoint
    #[must_use]
    pub fn put(self, spec: EndpointSpec<S>) -> Self {
        self.method(Method::Put, spec)
    }

    /// Declare a DELETE endpoint
    #[must_use]
    pub fn delete(self, spec: EndpointSpec<S>) -> Self {
        self.method(Method::Delete, spec)
    }

    /// Declare a PATCH endpoint
    #[must_use]
    pub fn patch(self, spec: EndpointSpec<S>) -> Self {
        self.method(Method::Patch, spec)
    }

    /// Declare an OPTIONS endpoint
    #[must_use]
    pub fn options(self, spec: EndpointSpec<S>) -> Self {
        self.method(Method::Options, spec)
    }

    /// Declare a HEAD endpoint
    #[must_use]
    pub fn head(self, spec: EndpointSpec<S>) -> Self {
        self.method(Method::Head, spec)
    }

    /// Spec declared for `method`
    #[must_use]
    pub fn get_spec(&self, method: Method) -> Option<&EndpointSpec<S>> {
        self.methods.get(&method)
    }

    /// Declared methods, in verb-set order
    #[must_use]
    pub fn methods(&self) -> Vec<Method> {
        let mut methods: Vec<Method> = self.methods.keys().copied().collect();
        methods.sort();
        methods
    }
}

/// The whole contract, keyed by path template
///
/// Keys are unique and keep insertion order; the path matcher reports
/// candidates in this order.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointMap<S> {
    entries: Vec<(String, EndpointDef<S>)>,
    index: HashMap<String, usize>,
}

impl<S> Default for EndpointMap<S> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<S> EndpointMap<S> {
    /// Create an empty endpoint map
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an endpoint (builder form of [`EndpointMap::insert`])
    #[must_use]
    pub fn endpoint(mut self, template: impl Into<String>, def: EndpointDef<S>) -> Self {
        self.insert(template, def);
        self
    }

    /// Insert an endpoint
    ///
    /// A template that is already present keeps its position and has its
    /// definition replaced; the previous definition is returned.
    pub fn insert(
        &mut self,
        template: impl Into<String>,
        def: EndpointDef<S>,
    ) -> Option<EndpointDef<S>> {
        let template = template.into();
        if let Some(&i) = self.index.get(&template) {
            return Some(std::mem::replace(&mut self.entries[i].1, def));
        }
        self.index.insert(template.clone(), self.entries.len());
        self.entries.push((template, def));
        None
    }

    /// Definition for an exact template
    #[must_use]
    pub fn get(&self, template: &str) -> Option<&EndpointDef<S>> {
        self.index.get(template).map(|&i| &self.entries[i].1)
    }

    /// Whether `template` is declared
    #[must_use]
    pub fn contains(&self, template: &str) -> bool {
        self.index.contains_key(template)
    }

    /// Templates in declaration order
    pub fn templates(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|(t, _)| t.as_str())
    }

    /// Entries in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &EndpointDef<S>)> + '_ {
        self.entries.iter().map(|(t, d)| (t.as_str(), d))
    }

    /// Number of templates
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no template is declared
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve a path and raw method to the declared spec
    ///
    /// The method is lower-cased once here. Checks run in a fixed order:
    /// verb set, then path, then method.
    ///
    /// # Errors
    ///
    /// - `MethodInvalid` carrying the raw method if it is not a known verb
    /// - `PathNotFound` if `path` is not a declared template
    /// - `MethodNotFound` if the template does not declare the method
    pub fn resolve(
        &self,
        path: &str,
        method: &str,
    ) -> Result<(Method, &EndpointSpec<S>), ValidatorError> {
        let verb = Method::parse(method).ok_or_else(|| ValidatorError::MethodInvalid {
            actual: method.to_string(),
        })?;
        let def = self.get(path).ok_or_else(|| ValidatorError::PathNotFound {
            actual: path.to_string(),
        })?;
        let spec = def.get_spec(verb).ok_or_else(|| ValidatorError::MethodNotFound {
            actual: verb.to_string(),
        })?;
        Ok((verb, spec))
    }
}

impl<'de, S: Deserialize<'de>> Deserialize<'de> for EndpointMap<S> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MapVisitor<S>(PhantomData<S>);

        impl<'de, S: Deserialize<'de>> Visitor<'de> for MapVisitor<S> {
            type Value = EndpointMap<S>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of path templates to endpoint definitions")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut map = EndpointMap::new();
                while let Some((template, def)) = access.next_entry::<String, EndpointDef<S>>()? {
                    map.insert(template, def);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(MapVisitor(PhantomData))
    }
}

impl<S> FromIterator<(String, EndpointDef<S>)> for EndpointMap<S> {
    fn from_iter<I: IntoIterator<Item = (String, EndpointDef<S>)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (template, def) in iter {
            map.insert(template, def);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn users_map() -> EndpointMap<&'static str> {
        EndpointMap::new()
            .endpoint(
                "/users/:id",
                EndpointDef::new().get(
                    EndpointSpec::new()
                        .params("id:string")
                        .response(200, ResponseSpec::new().body("user")),
                ),
            )
            .endpoint("/users", EndpointDef::new().post(EndpointSpec::new().body("new-user")))
    }

    #[test]
    fn test_method_parse_case_insensitive() {
        assert_eq!(Method::parse("GET"), Some(Method::Get));
        assert_eq!(Method::parse("Patch"), Some(Method::Patch));
        assert_eq!(Method::parse("options"), Some(Method::Options));
        assert_eq!(Method::parse("connect"), None);
        assert_eq!(Method::parse(""), None);
        assert_eq!(Method::Delete.to_string(), "delete");
    }

    #[test]
    fn test_options_and_head_builders() {
        let map = EndpointMap::new().endpoint(
            "/health",
            EndpointDef::new()
                .head(EndpointSpec::new().headers("x-health"))
                .options(EndpointSpec::new()),
        );
        let def = map.get("/health").unwrap();
        assert_eq!(def.methods(), vec![Method::Options, Method::Head]);
        assert_eq!(map.resolve("/health", "HEAD").unwrap().1.headers, Some("x-health"));
        assert!(map.resolve("/health", "options").is_ok());
        assert!(map.resolve("/health", "get").is_err());
    }

    #[test]
    fn test_insertion_order_and_replace() {
        let mut map = users_map();
        assert_eq!(map.templates().collect::<Vec<_>>(), vec!["/users/:id", "/users"]);

        let previous = map.insert("/users/:id", EndpointDef::new());
        assert!(previous.is_some());
        assert_eq!(map.len(), 2);
        assert_eq!(map.templates().next(), Some("/users/:id"));
        assert!(map.get("/users/:id").unwrap().methods().is_empty());
    }

    #[test]
    fn test_resolve_success() {
        let map = users_map();
        let (method, spec) = map.resolve("/users/:id", "GET").unwrap();
        assert_eq!(method, Method::Get);
        assert_eq!(spec.params, Some("id:string"));
        assert_eq!(spec.response_for(200).and_then(|r| r.body), Some("user"));
        assert!(spec.response_for(404).is_none());
    }

    #[test]
    fn test_resolve_method_invalid_keeps_raw_method() {
        let map = users_map();
        let err = map.resolve("/users/:id", "FETCH").unwrap_err();
        assert_eq!(
            err,
            ValidatorError::MethodInvalid {
                actual: "FETCH".to_string()
            }
        );
    }

    #[test]
    fn test_resolve_path_not_found() {
        let map = users_map();
        let err = map.resolve("/posts", "get").unwrap_err();
        assert_eq!(
            err,
            ValidatorError::PathNotFound {
                actual: "/posts".to_string()
            }
        );
    }

    #[test]
    fn test_resolve_method_not_found_is_lower_cased() {
        let map = users_map();
        let err = map.resolve("/users/:id", "POST").unwrap_err();
        assert_eq!(
            err,
            ValidatorError::MethodNotFound {
                actual: "post".to_string()
            }
        );
    }

    #[test]
    fn test_method_checked_before_path() {
        let map = users_map();
        let err = map.resolve("/unknown", "brew").unwrap_err();
        assert!(matches!(err, ValidatorError::MethodInvalid { .. }));
    }

    #[test]
    fn test_deserialize_from_json_keeps_order() {
        let text = r#"{
            "/b": { "get": { "responses": { "200": { "body": { "type": "object" } } } } },
            "/a/:id": {
                "post": {
                    "params": { "type": "object" },
                    "description": "ignored",
                    "responses": {}
                }
            }
        }"#;
        let map: EndpointMap<Value> = serde_json::from_str(text).unwrap();

        assert_eq!(map.templates().collect::<Vec<_>>(), vec!["/b", "/a/:id"]);
        let (_, spec) = map.resolve("/b", "get").unwrap();
        assert_eq!(spec.response_for(200).unwrap().body, Some(json!({ "type": "object" })));
        assert!(spec.query.is_none());
        let (_, spec) = map.resolve("/a/:id", "post").unwrap();
        assert!(spec.params.is_some());
        assert!(spec.responses.is_empty());
    }

    #[test]
    fn test_deserialize_rejects_unknown_method() {
        let text = r#"{ "/x": { "fetch": { "responses": {} } } }"#;
        let result: std::result::Result<EndpointMap<Value>, _> = serde_json::from_str(text);
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_requires_responses() {
        let text = r#"{ "/x": { "get": { "query": {} } } }"#;
        let result: std::result::Result<EndpointMap<Value>, _> = serde_json::from_str(text);
        assert!(result.is_err());
    }
}
