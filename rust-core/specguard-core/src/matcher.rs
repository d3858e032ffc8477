//! # Path Matcher
//!
//! Resolves a concrete path (`/users/42`) to the declared templates
//! (`/users/:id`) it matches, extracting named parameters.
//!
//! Each template is compiled into a single-route `matchit` router, so a
//! `:name` segment binds exactly one path segment. Compiled templates live
//! in a process-wide cache keyed by template string. Compilation is a pure
//! function of the template, so racing inserts of the same key are harmless.
//!
//! All matching templates are returned in declaration order. There is no
//! specificity ranking: callers that need one template take the first.

use crate::error::{Error, Result};
use crate::spec::EndpointMap;
use matchit::Router as MatchitRouter;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, OnceLock, RwLock};
use tracing::warn;

/// Parameter marker for template segments
pub const PARAM_MARKER: char = ':';

/// Compiled template cache, shared by every matcher in the process
static COMPILED: OnceLock<RwLock<HashMap<String, Arc<CompiledTemplate>>>> = OnceLock::new();

/// A template that matched a concrete path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchCandidate {
    /// The declared template (e.g. `/users/:id`)
    pub template: String,
    /// Parameter name (marker stripped) to raw segment value
    pub params: BTreeMap<String, String>,
}

/// One template, compiled for matching
pub struct CompiledTemplate {
    template: String,
    separators: usize,
    router: Option<MatchitRouter<()>>,
}

impl std::fmt::Debug for CompiledTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledTemplate")
            .field("template", &self.template)
            .field("separators", &self.separators)
            .field("valid", &self.router.is_some())
            .finish()
    }
}

impl CompiledTemplate {
    /// Compile a template
    ///
    /// A template matchit rejects still yields a value, one that never
    /// matches; the failure is logged.
    #[must_use]
    pub fn compile(template: &str) -> Self {
        let router = match to_matchit_route(template) {
            Ok(route) => {
                let mut router = MatchitRouter::new();
                match router.insert(route, ()) {
                    Ok(()) => Some(router),
                    Err(e) => {
                        warn!(template = %template, error = %e, "Template cannot be compiled");
                        None
                    }
                }
            }
            Err(e) => {
                warn!(template = %template, error = %e, "Template cannot be compiled");
                None
            }
        };

        Self {
            template: template.to_string(),
            separators: count_separators(template),
            router,
        }
    }

    /// The source template
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Whether compilation succeeded
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.router.is_some()
    }

    /// Match a concrete path
    ///
    /// Paths with a different number of separators never match.
    #[must_use]
    pub fn match_path(&self, path: &str) -> Option<MatchCandidate> {
        if count_separators(path) != self.separators {
            return None;
        }
        let matched = self.router.as_ref()?.at(path).ok()?;
        let params = matched
            .params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Some(MatchCandidate {
            template: self.template.clone(),
            params,
        })
    }
}

/// Fetch a compiled template from the cache, compiling on first use
#[must_use]
pub fn compiled(template: &str) -> Arc<CompiledTemplate> {
    let cache = COMPILED.get_or_init(|| RwLock::new(HashMap::new()));

    if let Ok(read) = cache.read() {
        if let Some(hit) = read.get(template) {
            return Arc::clone(hit);
        }
    }

    let fresh = Arc::new(CompiledTemplate::compile(template));
    match cache.write() {
        Ok(mut write) => Arc::clone(
            write
                .entry(template.to_string())
                .or_insert_with(|| Arc::clone(&fresh)),
        ),
        Err(_) => fresh,
    }
}

/// Match `path` against every template, in the given order
pub fn match_templates<'t, I>(templates: I, path: &str) -> Vec<MatchCandidate>
where
    I: IntoIterator<Item = &'t str>,
{
    templates
        .into_iter()
        .filter_map(|t| compiled(t).match_path(path))
        .collect()
}

/// Ordered set of templates to match concrete paths against
#[derive(Debug, Clone, Default)]
pub struct PathMatcher {
    templates: Vec<String>,
}

impl PathMatcher {
    /// Create a matcher over `templates`, keeping their order
    pub fn new<I, T>(templates: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            templates: templates.into_iter().map(Into::into).collect(),
        }
    }

    /// Create a matcher over the templates of an endpoint map
    #[must_use]
    pub fn from_endpoints<S>(endpoints: &EndpointMap<S>) -> Self {
        Self::new(endpoints.templates())
    }

    /// All candidates for `path`, in declaration order
    #[must_use]
    pub fn match_path(&self, path: &str) -> Vec<MatchCandidate> {
        match_templates(self.templates.iter().map(String::as_str), path)
    }

    /// First candidate for `path`
    #[must_use]
    pub fn best_match(&self, path: &str) -> Option<MatchCandidate> {
        self.templates
            .iter()
            .find_map(|t| compiled(t).match_path(path))
    }

    /// Templates in match order
    #[must_use]
    pub fn templates(&self) -> &[String] {
        &self.templates
    }
}

fn count_separators(s: &str) -> usize {
    s.bytes().filter(|&b| b == b'/').count()
}

/// Rewrite `:name` segments as matchit `{name}` parameters
///
/// Literal braces in static segments are escaped.
fn to_matchit_route(template: &str) -> Result<String> {
    let mut route = String::with_capacity(template.len() + 8);
    for (i, segment) in template.split('/').enumerate() {
        if i > 0 {
            route.push('/');
        }
        if let Some(name) = segment.strip_prefix(PARAM_MARKER) {
            if name.is_empty() {
                return Err(Error::InvalidRoutePattern {
                    pattern: template.to_string(),
                    reason: "parameter without a name".to_string(),
                });
            }
            if name.contains(['{', '}']) {
                return Err(Error::InvalidRoutePattern {
                    pattern: template.to_string(),
                    reason: format!("invalid parameter name '{name}'"),
                });
            }
            route.push('{');
            route.push_str(name);
            route.push('}');
        } else {
            route.push_str(&segment.replace('{', "{{").replace('}', "}}"));
        }
    }
    Ok(route)
}
