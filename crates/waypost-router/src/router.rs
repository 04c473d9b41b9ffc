//! The route registry.
//!
//! A [`Router`] holds routes grouped by scope (the root scope is `""`),
//! the compiled scope attachments, a current-scope pointer and the
//! modifier/formatter registry. It is an ordinary value: build one per
//! configuration, share it behind an `Arc` if needed, and use
//! [`Router::resolve`] when it must not be mutated.

use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::error::{RouteError, RoutingError};
use crate::params::{Params, UrlTarget, Value};
use crate::path::join_base;
use crate::request::Request;
use crate::route::{Parsed, Route, RouteOptions};
use crate::scope::{Attachment, ResolvedScope, Scope};
use crate::template::ARGS;
use crate::transform::Transforms;

// ============================================================================
// Options
// ============================================================================

/// Options for [`Router::url_for`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchOptions {
    /// Prepend scheme and host even when the scope is not absolute.
    pub absolute: bool,
    /// Scope to generate in, instead of the router's current scope.
    pub scope: Option<String>,
    /// Host and scheme token values, overriding the attachment's.
    pub scope_values: IndexMap<String, String>,
    pub scheme: Option<String>,
    pub host: Option<String>,
    pub base: Option<String>,
}

impl MatchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_absolute(mut self, absolute: bool) -> Self {
        self.absolute = absolute;
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn with_scope_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.scope_values.insert(key.into(), value.into());
        self
    }

    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = Some(scheme.into());
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }
}

/// Where a generated URL is mounted.
#[derive(Debug)]
struct Prefix {
    absolute: bool,
    scheme: String,
    host: String,
    base: String,
}

impl Prefix {
    fn apply(&self, path: &str) -> String {
        let path = join_base(&self.base, path);
        if self.absolute {
            format!("{}://{}{}", self.scheme, self.host, path)
        } else {
            path
        }
    }
}

// ============================================================================
// Router
// ============================================================================

/// Ordered route registry with scopes.
///
/// # Examples
///
/// ```
/// use waypost_router::{MatchOptions, Params, Request, RouteOptions, Router, Value};
///
/// let mut router = Router::new();
/// router
///     .connect("/{:locale:en|de}/{:args}", Params::new(), RouteOptions::new().with_continue(true))
///     .unwrap();
/// router
///     .connect("/{:controller}/{:action}/{:id:\\d+}", Params::new(), RouteOptions::new())
///     .unwrap();
///
/// let parsed = router.parse(&Request::new("/en/posts/view/5")).unwrap();
/// let params = parsed.params().unwrap();
/// assert_eq!(params["locale"], Value::from("en"));
/// assert_eq!(params["controller"], Value::from("Posts"));
///
/// let url = router
///     .url_for(
///         Params::from([("locale", "en"), ("controller", "Posts"), ("action", "view"), ("id", "5")]),
///         None,
///         &MatchOptions::new(),
///     )
///     .unwrap();
/// assert_eq!(url, "/en/posts/view/5");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Router {
    routes: IndexMap<String, Vec<Route>>,
    scopes: IndexMap<String, Scope>,
    current_scope: Option<String>,
    transforms: Arc<Transforms>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    // ------------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------------

    /// Compiles and registers a route in the current scope, or in the scope
    /// named by the options.
    ///
    /// The route takes a snapshot of the modifiers and formatters registered
    /// at this point.
    pub fn connect(
        &mut self,
        template: &str,
        params: impl Into<Params>,
        options: RouteOptions,
    ) -> Result<&Route, RouteError> {
        let scope = options
            .scope
            .clone()
            .or_else(|| self.current_scope.clone())
            .unwrap_or_default();
        let route = Route::new(template, params, options)?.with_transforms(self.transforms.clone());

        debug!(
            scope = %scope,
            template = route.template(),
            pattern = route.pattern(),
            continuation = route.is_continuation(),
            "connected route"
        );

        let routes = self.routes.entry(scope).or_default();
        routes.push(route);
        Ok(&routes[routes.len() - 1])
    }

    /// Registers an already compiled route in the current scope.
    pub fn add_route(&mut self, route: Route) {
        let scope = self.current_scope.clone().unwrap_or_default();
        self.routes.entry(scope).or_default().push(route);
    }

    /// Compiles and registers a scope attachment, replacing any previous one.
    pub fn attach(&mut self, name: &str, attachment: Attachment) -> Result<(), RouteError> {
        let scope = Scope::compile(name, attachment)?;
        debug!(scope = name, pattern = scope.pattern(), "attached scope");
        self.scopes.insert(name.to_string(), scope);
        Ok(())
    }

    /// Removes a scope attachment. Routes connected in the scope stay registered.
    pub fn detach(&mut self, name: &str) -> Option<Attachment> {
        self.scopes
            .shift_remove(name)
            .map(|scope| scope.attachment().clone())
    }

    /// Resolves the attachment of `name` against token values.
    pub fn attached(&self, name: &str, values: &IndexMap<String, String>) -> Option<ResolvedScope> {
        self.scopes.get(name).map(|scope| scope.resolve(values))
    }

    /// Replaces the token values of an attached scope and recompiles it.
    /// Returns `false` if no such scope is attached.
    pub fn set_scope_values(
        &mut self,
        name: &str,
        values: IndexMap<String, String>,
    ) -> Result<bool, RouteError> {
        let Some(scope) = self.scopes.get(name) else {
            return Ok(false);
        };
        let scope = scope.clone().with_values(values)?;
        self.scopes.insert(name.to_string(), scope);
        Ok(true)
    }

    /// Sets the current scope and returns the previous one. `None` and
    /// `Some("")` both select the root scope.
    pub fn scope(&mut self, name: Option<&str>) -> Option<String> {
        let next = name.filter(|name| !name.is_empty()).map(String::from);
        std::mem::replace(&mut self.current_scope, next)
    }

    /// Runs `f` with `name` as the current scope, then restores the previous one.
    pub fn scoped<T>(&mut self, name: &str, f: impl FnOnce(&mut Router) -> T) -> T {
        let previous = self.scope(Some(name));
        let result = f(self);
        self.current_scope = previous;
        result
    }

    pub fn current_scope(&self) -> Option<&str> {
        self.current_scope.as_deref()
    }

    /// Registers a parse-direction transform. Affects routes connected afterwards.
    pub fn set_modifier<F>(&mut self, name: impl Into<String>, modifier: F)
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        Arc::make_mut(&mut self.transforms).set_modifier(name, modifier);
    }

    /// Registers a generate-direction transform. Affects routes connected afterwards.
    pub fn set_formatter<F>(&mut self, name: impl Into<String>, formatter: F)
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        Arc::make_mut(&mut self.transforms).set_formatter(name, formatter);
    }

    pub fn transforms(&self) -> &Transforms {
        &self.transforms
    }

    /// Clears routes, scopes and the current scope, and restores the
    /// built-in transforms.
    pub fn reset(&mut self) {
        *self = Self::default();
        debug!("router reset");
    }

    // ------------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------------

    /// Routes of `scope` (the current scope when `None`).
    pub fn routes(&self, scope: Option<&str>) -> &[Route] {
        let scope = scope.or(self.current_scope.as_deref()).unwrap_or("");
        self.routes.get(scope).map_or(&[], Vec::as_slice)
    }

    pub fn route(&self, index: usize, scope: Option<&str>) -> Option<&Route> {
        self.routes(scope).get(index)
    }

    /// Scopes that have routes, in registration order.
    pub fn route_scopes(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    /// Names of attached scopes, in attachment order.
    pub fn scope_names(&self) -> impl Iterator<Item = &str> {
        self.scopes.keys().map(String::as_str)
    }

    pub fn get_scope(&self, name: &str) -> Option<&Scope> {
        self.scopes.get(name)
    }

    // ------------------------------------------------------------------------
    // Parsing
    // ------------------------------------------------------------------------

    /// Routes `request` and records the winning scope as current.
    pub fn parse(&mut self, request: &Request) -> Option<Parsed> {
        let (parsed, scope) = self.resolve(request)?;
        self.current_scope = scope;
        Some(parsed)
    }

    /// Routes `request` without touching the current scope. Returns the
    /// result together with the winning scope (`None` for the root scope).
    pub fn resolve(&self, request: &Request) -> Option<(Parsed, Option<String>)> {
        for (name, routes) in &self.routes {
            let Some(mut request) = self.enter_scope(name, request) else {
                continue;
            };

            for route in routes {
                trace!(scope = %name, template = route.template(), path = %request.path, "trying route");

                match route.parse(&request) {
                    None => continue,
                    Some(Parsed::Request(next)) if route.is_continuation() => {
                        request = next;
                        let args = request.params.shift_remove(ARGS);
                        request.path = format!("/{}", remainder(args));
                    }
                    Some(parsed) => {
                        debug!(scope = %name, template = route.template(), "resolved request");
                        let scope = Some(name.clone()).filter(|name| !name.is_empty());
                        return Some((parsed, scope));
                    }
                }
            }
        }

        debug!(path = %request.path, "request did not resolve");
        None
    }

    /// Prepares a copy of `request` for routing inside scope `name`, or
    /// returns `None` if the scope does not recognize it.
    fn enter_scope(&self, name: &str, request: &Request) -> Option<Request> {
        let mut request = request.clone();
        if name.is_empty() {
            return Some(request);
        }

        request.params = IndexMap::new();
        match self.scopes.get(name) {
            Some(scope) => {
                let captures = scope.recognize(&request)?;
                request
                    .params
                    .insert("library".to_string(), Value::from(scope.library()));
                for (key, value) in captures {
                    request.params.insert(key, Value::from(value));
                }
                request.path = scope.strip_prefix(&request.path);
            }
            None => {
                request
                    .params
                    .insert("library".to_string(), Value::from(name));
            }
        }
        Some(request)
    }

    // ------------------------------------------------------------------------
    // Generation
    // ------------------------------------------------------------------------

    /// Generates a URL.
    ///
    /// `target` is a parameter set, a `Controller::action` shorthand, or a
    /// literal path. Parameters persisted by `context` are carried over
    /// unless the target sets them to [`Value::Null`].
    pub fn url_for(
        &self,
        target: impl Into<UrlTarget>,
        context: Option<&Request>,
        options: &MatchOptions,
    ) -> Result<String, RoutingError> {
        let scope = options
            .scope
            .clone()
            .or_else(|| self.current_scope.clone())
            .unwrap_or_default();
        let prefix = self.prefix(&scope, context, options);

        match target.into() {
            UrlTarget::Path(path) => Ok(self.literal_url(&path, context, &prefix)),
            UrlTarget::Params(params) => self.reverse(params, context, &scope, &prefix),
        }
    }

    fn reverse(
        &self,
        mut params: Params,
        context: Option<&Request>,
        scope: &str,
        prefix: &Prefix,
    ) -> Result<String, RoutingError> {
        if !scope.is_empty() {
            params.remove("library");
        }

        if let Some(context) = context {
            for key in &context.persist {
                match params.get(key) {
                    Some(Value::Null) => {
                        params.remove(key);
                    }
                    Some(_) => {}
                    None => {
                        if let Some(value) = context.params.get(key) {
                            params.insert(key.clone(), value.clone());
                        }
                    }
                }
            }
        }

        if !params.contains_key("action") {
            params.insert("action", "index");
        }

        let query = params.query.take();
        let fragment = params.fragment.take();
        let described = params.describe();
        let allowed = self
            .scopes
            .get(scope)
            .map(Scope::params)
            .unwrap_or_default();

        let mut stack: Vec<String> = Vec::new();
        let mut remaining = params;

        for route in self.routes.get(scope).into_iter().flatten() {
            let Some(url) = route.generate_fragment(&remaining, &allowed) else {
                continue;
            };

            if route.is_continuation() {
                trace!(template = route.template(), fragment = %url, "stacked continuation");
                let consumed: Vec<String> = route.consumed_keys().cloned().collect();
                for key in &consumed {
                    remaining.remove(key);
                }
                stack.push(url);
                continue;
            }

            let composed = stack.iter().rev().fold(url, |inner, outer| {
                let inner = inner.strip_prefix('/').unwrap_or(&inner);
                outer.replacen("{:args}", inner, 1)
            });

            let mut url = prefix.apply(&composed);
            if let Some(query) = query.as_ref().and_then(|query| query.render()) {
                url.push_str(&query);
            }
            if let Some(fragment) = fragment {
                url.push('#');
                url.push_str(&fragment);
            }

            debug!(scope = %scope, template = route.template(), url = %url, "generated url");
            return Ok(url);
        }

        Err(RoutingError::no_match(described, scope))
    }

    fn literal_url(&self, path: &str, context: Option<&Request>, prefix: &Prefix) -> String {
        let verbatim = path.contains("://")
            || path.starts_with('#')
            || path.starts_with("//")
            || path.starts_with("mailto");
        if verbatim {
            return path.to_string();
        }

        if path.starts_with('/') {
            return prefix.apply(path);
        }

        let controller = context
            .and_then(|context| context.params.get("controller"))
            .cloned()
            .map(|controller| self.transforms.format("controller", controller))
            .and_then(|controller| controller.as_text().map(String::from));

        match controller {
            Some(controller) => prefix.apply(&format!("/{}/{}", controller, path)),
            None => prefix.apply(&format!("/{}", path)),
        }
    }

    /// Scheme, host and base for URLs generated in `scope`.
    fn prefix(&self, scope: &str, context: Option<&Request>, options: &MatchOptions) -> Prefix {
        let scheme = options
            .scheme
            .clone()
            .or_else(|| context.map(|context| context.scheme.clone()))
            .unwrap_or_else(|| "http".to_string());
        let host = options
            .host
            .clone()
            .or_else(|| context.map(|context| context.host.clone()))
            .unwrap_or_else(|| "localhost".to_string());
        let base = options
            .base
            .clone()
            .or_else(|| context.map(|context| context.base.clone()))
            .unwrap_or_default();

        let resolved = if scope.is_empty() {
            None
        } else {
            self.attached(scope, &options.scope_values)
        };

        let Some(resolved) = resolved else {
            return Prefix {
                absolute: options.absolute,
                scheme,
                host,
                base: base.trim_end_matches('/').to_string(),
            };
        };

        let mut base = match &resolved.base {
            Some(scope_base) => format!("/{}", scope_base.trim_matches('/')),
            None => base,
        };
        let scope_prefix = resolved.prefix.trim_matches('/');
        if !scope_prefix.is_empty() {
            base = format!("{}/{}", base.trim_end_matches('/'), scope_prefix);
        }
        if resolved.absolute {
            base = format!("/{}", base.trim_matches('/'));
        }

        Prefix {
            absolute: resolved.absolute || options.absolute,
            scheme: resolved.scheme.unwrap_or(scheme),
            host: resolved.host.unwrap_or(host),
            base: base.trim_end_matches('/').to_string(),
        }
    }
}

/// Joins the wildcard remainder of a continuation match back into a path.
fn remainder(args: Option<Value>) -> String {
    match args {
        Some(Value::List(items)) => items.join("/"),
        Some(Value::Text(text)) => text,
        Some(Value::Null) | None => String::new(),
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builds a [`Router`], deferring registration errors to [`RouterBuilder::build`].
///
/// # Examples
///
/// ```
/// use waypost_router::{Attachment, Params, Router, RouteOptions};
///
/// let router = Router::builder()
///     .attach("admin", Attachment::new().with_prefix("admin"))
///     .scope("admin")
///     .connect("/{:controller}/{:action}", Params::new(), RouteOptions::new())
///     .build()
///     .unwrap();
///
/// assert_eq!(router.routes(Some("admin")).len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct RouterBuilder {
    router: Router,
    error: Option<RouteError>,
}

impl RouterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(mut self, name: &str, attachment: Attachment) -> Self {
        if self.error.is_none() {
            if let Err(err) = self.router.attach(name, attachment) {
                self.error = Some(err);
            }
        }
        self
    }

    /// Selects the scope subsequent routes are connected in. `""` is the root scope.
    pub fn scope(mut self, name: &str) -> Self {
        self.router.scope(Some(name));
        self
    }

    pub fn connect(mut self, template: &str, params: impl Into<Params>, options: RouteOptions) -> Self {
        if self.error.is_none() {
            if let Err(err) = self.router.connect(template, params, options) {
                self.error = Some(err);
            }
        }
        self
    }

    pub fn modifier<F>(mut self, name: impl Into<String>, modifier: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.router.set_modifier(name, modifier);
        self
    }

    pub fn formatter<F>(mut self, name: impl Into<String>, formatter: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.router.set_formatter(name, formatter);
        self
    }

    /// Returns the router with the current scope reset to the root scope,
    /// or the first registration error.
    pub fn build(self) -> Result<Router, RouteError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let mut router = self.router;
        router.scope(None);
        Ok(router)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_connect_uses_current_scope() {
        let mut router = Router::new();
        router.scope(Some("admin"));
        router
            .connect("/{:controller}", Params::new(), RouteOptions::new())
            .unwrap();
        router
            .connect("/", Params::from("Pages"), RouteOptions::new().with_scope(""))
            .unwrap();

        assert_eq!(router.routes(Some("admin")).len(), 1);
        assert_eq!(router.routes(Some("")).len(), 1);
        assert_eq!(router.route_scopes().collect::<Vec<_>>(), vec!["admin", ""]);
    }

    #[test]
    fn test_scoped_restores_previous_scope() {
        let mut router = Router::new();
        let count = router.scoped("admin", |router| {
            assert_eq!(router.current_scope(), Some("admin"));
            router
                .connect("/dashboard", Params::from("Dashboard"), RouteOptions::new())
                .unwrap();
            router.routes(None).len()
        });

        assert_eq!(count, 1);
        assert_eq!(router.current_scope(), None);
        assert!(router.routes(None).is_empty());
    }

    #[test]
    fn test_scope_returns_previous() {
        let mut router = Router::new();
        assert_eq!(router.scope(Some("app")), None);
        assert_eq!(router.scope(Some("")), Some("app".to_string()));
        assert_eq!(router.current_scope(), None);
    }

    #[test]
    fn test_modifiers_are_snapshotted_at_connect() {
        let mut router = Router::new();
        router
            .connect("/a/{:controller}", Params::new(), RouteOptions::new())
            .unwrap();
        router.set_modifier("controller", |value| value);
        router
            .connect("/b/{:controller}", Params::new(), RouteOptions::new())
            .unwrap();

        let first = router.route(0, None).unwrap().parse_path("/a/blog_posts").unwrap();
        let second = router.route(1, None).unwrap().parse_path("/b/blog_posts").unwrap();
        assert_eq!(first["controller"], Value::from("BlogPosts"));
        assert_eq!(second["controller"], Value::from("blog_posts"));
    }

    #[test]
    fn test_add_route_registers_in_current_scope() {
        let mut router = Router::new();
        router.scope(Some("admin"));
        let route = Route::new("/dashboard", Params::from("Dashboard"), RouteOptions::new()).unwrap();
        router.add_route(route);

        assert_eq!(router.routes(Some("admin")).len(), 1);
        assert_eq!(router.route(0, Some("admin")).map(Route::template), Some("/dashboard"));
        assert!(router.routes(Some("")).is_empty());
    }

    #[test]
    fn test_detach_keeps_routes() {
        let mut router = Router::new();
        router
            .attach("admin", Attachment::new().with_prefix("admin"))
            .unwrap();
        router
            .connect("/{:controller}", Params::new(), RouteOptions::new().with_scope("admin"))
            .unwrap();

        let detached = router.detach("admin").unwrap();
        assert_eq!(detached.prefix, "admin");
        assert!(router.get_scope("admin").is_none());
        assert!(router.detach("admin").is_none());
        assert_eq!(router.routes(Some("admin")).len(), 1);

        // Without an attachment the scope matches every path.
        let (parsed, scope) = router.resolve(&Request::new("/posts")).unwrap();
        assert_eq!(scope.as_deref(), Some("admin"));
        assert_eq!(parsed.params().unwrap()["library"], Value::from("admin"));
    }

    #[test]
    fn test_builder_reports_first_error() {
        let result = Router::builder()
            .connect("/{:id}/{:id}", Params::new(), RouteOptions::new())
            .connect("/{:x}/{:x}", Params::new(), RouteOptions::new())
            .build();

        let err = result.unwrap_err();
        assert!(matches!(err, RouteError::DuplicateParam { ref name, .. } if name == "id"));
    }

    #[test]
    fn test_prefix_for_scope_with_base_and_prefix() {
        let mut router = Router::new();
        router
            .attach("admin", Attachment::new().with_prefix("admin").with_base("app"))
            .unwrap();

        let prefix = router.prefix("admin", None, &MatchOptions::new());
        assert_eq!(prefix.base, "/app/admin");
        assert!(!prefix.absolute);
    }

    #[test]
    fn test_remainder() {
        assert_eq!(remainder(Some(Value::from(vec!["a", "b"]))), "a/b");
        assert_eq!(remainder(Some(Value::from("x"))), "x");
        assert_eq!(remainder(None), "");
    }
}
