//! A single compiled route.
//!
//! A [`Route`] owns one [`Template`] plus the parameter sets it was connected
//! with, and works in both directions:
//!
//! - [`Route::parse`]: request path → parameters
//! - [`Route::generate_url`]: parameters → URL
//!
//! Neither direction treats a mismatch as an error; both return `None` so a
//! router can move on to the next candidate.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::trace;

use crate::error::RouteError;
use crate::params::{Params, Value};
use crate::path::normalize_path;
use crate::request::Request;
use crate::template::{Matcher, Template, ARGS};
use crate::transform::Transforms;

/// Meta key holding the accepted HTTP method(s).
pub const HTTP_METHOD: &str = "http:method";

/// Opaque value returned by a route handler.
pub type HandlerOutput = Box<dyn Any + Send>;

/// Callback that short-circuits dispatch once its route has matched.
pub type Handler = Arc<dyn Fn(&Request) -> HandlerOutput + Send + Sync>;

// ============================================================================
// Options
// ============================================================================

/// Connect-time options of a route.
#[derive(Clone, Default)]
pub struct RouteOptions {
    pub(crate) continuation: bool,
    pub(crate) persist: Vec<String>,
    pub(crate) handler: Option<Handler>,
    pub(crate) scope: Option<String>,
}

impl RouteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the route as a continuation: it matches a prefix and hands the
    /// remainder of the path to the routes connected after it.
    pub fn with_continue(mut self, continuation: bool) -> Self {
        self.continuation = continuation;
        self
    }

    /// Parameters copied into URLs generated with a request routed by this route.
    pub fn with_persist<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.persist = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_handler<F, T>(mut self, handler: F) -> Self
    where
        F: Fn(&Request) -> T + Send + Sync + 'static,
        T: Any + Send,
    {
        self.handler = Some(Arc::new(move |request: &Request| {
            Box::new(handler(request)) as HandlerOutput
        }));
        self
    }

    /// Registers the route in the named scope instead of the router's current one.
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }
}

impl fmt::Debug for RouteOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteOptions")
            .field("continuation", &self.continuation)
            .field("persist", &self.persist)
            .field("handler", &self.handler.is_some())
            .field("scope", &self.scope)
            .finish()
    }
}

// ============================================================================
// Parse result
// ============================================================================

/// Outcome of a successful parse.
pub enum Parsed {
    /// The request with routing params and persist keys filled in.
    Request(Request),
    /// Whatever the route's handler returned.
    Handled(HandlerOutput),
}

impl Parsed {
    pub fn request(&self) -> Option<&Request> {
        match self {
            Parsed::Request(request) => Some(request),
            Parsed::Handled(_) => None,
        }
    }

    pub fn into_request(self) -> Option<Request> {
        match self {
            Parsed::Request(request) => Some(request),
            Parsed::Handled(_) => None,
        }
    }

    pub fn params(&self) -> Option<&IndexMap<String, Value>> {
        self.request().map(|request| &request.params)
    }

    pub fn is_handled(&self) -> bool {
        matches!(self, Parsed::Handled(_))
    }

    /// Downcasts a handler result.
    pub fn into_handled<T: Any>(self) -> Option<T> {
        match self {
            Parsed::Handled(output) => output.downcast::<T>().ok().map(|boxed| *boxed),
            Parsed::Request(_) => None,
        }
    }
}

impl fmt::Debug for Parsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Parsed::Request(request) => f.debug_tuple("Request").field(request).finish(),
            Parsed::Handled(_) => f.debug_tuple("Handled").field(&"..").finish(),
        }
    }
}

// ============================================================================
// Route
// ============================================================================

/// One compiled template with its defaults, static params and meta conditions.
///
/// # Examples
///
/// ```
/// use waypost_router::{Params, Route, RouteOptions, Value};
///
/// let route = Route::new(
///     "/{:controller}/{:action}/{:id:\\d+}",
///     Params::from([("action", "view")]),
///     RouteOptions::new(),
/// )
/// .unwrap();
///
/// let params = route.parse_path("/blog_posts/edit/5").unwrap();
/// assert_eq!(params["controller"], Value::from("BlogPosts"));
/// assert_eq!(params["id"], Value::from("5"));
///
/// let url = route.generate_url(Params::from([
///     ("controller", "BlogPosts"),
///     ("action", "view"),
///     ("id", "5"),
/// ]));
/// assert_eq!(url.as_deref(), Some("/blog_posts/view/5"));
/// ```
#[derive(Clone)]
pub struct Route {
    template: Template,
    matcher: Matcher,
    defaults: IndexMap<String, Value>,
    static_params: IndexMap<String, Value>,
    meta: IndexMap<String, Value>,
    persist: Vec<String>,
    continuation: bool,
    handler: Option<Handler>,
    transforms: Arc<Transforms>,
}

impl Route {
    /// Compiles `template` with the built-in transforms.
    ///
    /// `params` are split three ways: keys containing `:` become meta
    /// conditions, keys that are also template tokens become defaults, and
    /// the rest must be matched exactly when generating URLs. Terminal routes
    /// get `action = "index"` unless one was supplied.
    pub fn new(
        template: &str,
        params: impl Into<Params>,
        options: RouteOptions,
    ) -> Result<Self, RouteError> {
        let params = params.into();
        let source = format!("/{}", template.trim_matches('/'));
        let mut template = Template::parse(&source)?;
        if options.continuation && !template.has_args() {
            template = Template::parse(&format!("{}/{{:{}}}", source.trim_end_matches('/'), ARGS))?;
        }

        let mut meta = IndexMap::new();
        let mut static_params = IndexMap::new();
        for (key, value) in params.iter() {
            if key.contains(':') {
                meta.insert(key.clone(), value.clone());
            } else {
                static_params.insert(key.clone(), value.clone());
            }
        }

        if !options.continuation && !static_params.contains_key("action") {
            static_params.insert("action".to_string(), Value::from("index"));
        }

        let mut defaults = IndexMap::new();
        for key in template.keys() {
            if let Some(value) = static_params.shift_remove(key) {
                defaults.insert(key.clone(), value);
            }
        }

        let matcher = template.compile(|key| defaults.contains_key(key))?;

        Ok(Self {
            template,
            matcher,
            defaults,
            static_params,
            meta,
            persist: options.persist,
            continuation: options.continuation,
            handler: options.handler,
            transforms: Arc::new(Transforms::default()),
        })
    }

    /// Replaces the modifier/formatter registry used by this route.
    pub fn with_transforms(mut self, transforms: Arc<Transforms>) -> Self {
        self.transforms = transforms;
        self
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn template(&self) -> &str {
        self.template.source()
    }

    /// The compiled regular expression.
    pub fn pattern(&self) -> &str {
        self.matcher.as_str()
    }

    pub fn keys(&self) -> &[String] {
        self.template.keys()
    }

    pub fn defaults(&self) -> &IndexMap<String, Value> {
        &self.defaults
    }

    pub fn static_params(&self) -> &IndexMap<String, Value> {
        &self.static_params
    }

    pub fn meta(&self) -> &IndexMap<String, Value> {
        &self.meta
    }

    pub fn sub_patterns(&self) -> &IndexMap<String, String> {
        self.template.sub_patterns()
    }

    pub fn persist(&self) -> &[String] {
        &self.persist
    }

    pub fn is_continuation(&self) -> bool {
        self.continuation
    }

    pub fn has_handler(&self) -> bool {
        self.handler.is_some()
    }

    /// Keys a continuation route takes out of a parameter set before the
    /// next route sees it.
    pub(crate) fn consumed_keys(&self) -> impl Iterator<Item = &String> {
        self.static_params
            .keys()
            .chain(self.template.keys())
            .chain(self.defaults.keys())
            .filter(|key| key.as_str() != ARGS)
    }

    /// Serializable summary of the route.
    pub fn export(&self) -> RouteExport {
        RouteExport {
            template: self.template.source().to_string(),
            pattern: self.matcher.as_str().to_string(),
            keys: self.template.keys().to_vec(),
            defaults: self.defaults.clone(),
            params: self.static_params.clone(),
            meta: self.meta.clone(),
            sub_patterns: self.template.sub_patterns().clone(),
            persist: self.persist.clone(),
            continuation: self.continuation,
            handler: self.handler.is_some(),
        }
    }

    // ------------------------------------------------------------------------
    // Parsing
    // ------------------------------------------------------------------------

    /// Attempts to route `request`.
    ///
    /// On success the returned request carries this route's params merged
    /// over whatever earlier continuation routes contributed, and its
    /// persist list is extended with this route's.
    pub fn parse(&self, request: &Request) -> Option<Parsed> {
        let path = normalize_path(&request.path);
        let captures = self.matcher.captures(&path)?;

        for (key, expected) in &self.meta {
            let accepted = request
                .get(key)
                .map_or(false, |actual| expected.accepts(actual));
            if !accepted {
                trace!(template = self.template(), condition = %key, "meta condition failed");
                return None;
            }
        }

        let mut result = IndexMap::new();
        for key in self.template.keys() {
            let value = match captures.get(key) {
                Some(raw) => self.transforms.modify(key, Value::Text(raw.clone())),
                None if key == ARGS => Value::List(Vec::new()),
                None => continue,
            };
            if !value.is_empty_text() {
                result.insert(key.clone(), value);
            }
        }
        for (key, value) in &self.defaults {
            result.entry(key.clone()).or_insert_with(|| value.clone());
        }
        for (key, value) in &self.static_params {
            result.insert(key.clone(), value.clone());
        }

        let mut request = request.clone();
        request.merge_params(result);
        request.add_persist(&self.persist);

        match &self.handler {
            Some(handler) => Some(Parsed::Handled(handler(&request))),
            None => Some(Parsed::Request(request)),
        }
    }

    /// Parses a bare `GET` path and returns only the params.
    pub fn parse_path(&self, path: &str) -> Option<IndexMap<String, Value>> {
        self.parse(&Request::new(path))?
            .into_request()
            .map(|request| request.params)
    }

    // ------------------------------------------------------------------------
    // Generation
    // ------------------------------------------------------------------------

    /// Generates a URL for `params`, including its query and fragment.
    ///
    /// For a continuation route this is the fragment with a literal `{:args}`
    /// left in place for the next route.
    pub fn generate_url(&self, params: impl Into<Params>) -> Option<String> {
        let params = params.into();
        let mut url = self.generate_fragment(&params, &[])?;

        if !self.continuation {
            if let Some(query) = params.query.as_ref().and_then(|query| query.render()) {
                url.push_str(&query);
            }
            if let Some(fragment) = &params.fragment {
                url.push('#');
                url.push_str(fragment);
            }
        }

        Some(url)
    }

    /// Reverse match without the query/fragment suffix.
    ///
    /// `allowed` lists extra keys a terminal route tolerates (the token names
    /// of the enclosing scope).
    pub(crate) fn generate_fragment(&self, params: &Params, allowed: &[String]) -> Option<String> {
        let mut values = params.values().clone();

        if !self.continuation {
            values
                .entry("action".to_string())
                .or_insert_with(|| Value::from("index"));
            values
                .entry(HTTP_METHOD.to_string())
                .or_insert_with(|| Value::from("GET"));
        }

        if let Some(method) = values.shift_remove(HTTP_METHOD) {
            if let Some(expected) = self.meta.get(HTTP_METHOD) {
                if !method.as_text().map_or(false, |method| expected.accepts(method)) {
                    return None;
                }
            }
        }
        values.retain(|key, _| !key.contains(':'));

        if self
            .static_params
            .iter()
            .any(|(key, expected)| values.get(key) != Some(expected))
        {
            return None;
        }

        if self.continuation {
            let missing = self
                .template
                .keys()
                .iter()
                .any(|key| key != ARGS && !values.contains_key(key));
            if missing {
                return None;
            }
        } else {
            let unknown = values.keys().any(|key| {
                !self.static_params.contains_key(key)
                    && !self.template.has_key(key)
                    && !allowed.contains(key)
            });
            if unknown {
                return None;
            }

            for (key, value) in &self.defaults {
                values.entry(key.clone()).or_insert_with(|| value.clone());
            }
            let missing = self
                .template
                .keys()
                .iter()
                .any(|key| key != ARGS && !values.contains_key(key));
            if missing {
                return None;
            }
        }

        for (key, value) in values.iter_mut() {
            if !value.is_null() {
                *value = self.transforms.format(key, std::mem::replace(value, Value::Null));
            }
        }

        for key in self.template.sub_patterns().keys() {
            if let Some(text) = values.get(key).and_then(Value::render) {
                if !self.template.satisfies(key, &text) {
                    return None;
                }
            }
        }

        if self.continuation {
            values.insert(ARGS.to_string(), Value::from("{:args}"));
            Some(self.template.write(&values, &self.defaults))
        } else {
            let mut defaults = self.defaults.clone();
            defaults
                .entry("action".to_string())
                .or_insert_with(|| Value::from("index"));
            defaults
                .entry(ARGS.to_string())
                .or_insert_with(|| Value::from(""));
            if self.template.has_args() {
                values
                    .entry(ARGS.to_string())
                    .or_insert_with(|| Value::from(""));
            }
            Some(self.template.write(&values, &defaults))
        }
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("template", &self.template.source())
            .field("pattern", &self.matcher.as_str())
            .field("defaults", &self.defaults)
            .field("static_params", &self.static_params)
            .field("meta", &self.meta)
            .field("persist", &self.persist)
            .field("continuation", &self.continuation)
            .field("handler", &self.handler.is_some())
            .finish()
    }
}

/// Serializable view of a [`Route`], as returned by [`Route::export`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteExport {
    pub template: String,
    pub pattern: String,
    pub keys: Vec<String>,
    pub defaults: IndexMap<String, Value>,
    pub params: IndexMap<String, Value>,
    pub meta: IndexMap<String, Value>,
    pub sub_patterns: IndexMap<String, String>,
    pub persist: Vec<String>,
    pub continuation: bool,
    pub handler: bool,
}
