//! The request view the router reads from and writes routing results into.
//!
//! The router never parses HTTP itself. Callers build a [`Request`] from
//! whatever server they run and hand it over; parsing returns a copy with
//! `params` and `persist` filled in.

use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;

use crate::params::{Params, Value};

/// Inbound request as seen by the router.
#[derive(Clone, PartialEq, Eq)]
pub struct Request {
    /// Application-relative path, e.g. `/posts/view/1`.
    pub path: String,
    /// Upper-case HTTP method.
    pub method: String,
    /// Scheme without `://`, e.g. `https`.
    pub scheme: String,
    pub host: String,
    /// Mount point of the application, used as the default base when generating URLs.
    pub base: String,
    headers: HashMap<String, String>,
    attributes: HashMap<String, String>,
    /// Parameters resolved by routing.
    pub params: IndexMap<String, Value>,
    /// Names of parameters to carry into URLs generated with this request as context.
    pub persist: Vec<String>,
}

impl Request {
    /// Creates a `GET http://localhost{path}` request.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method: "GET".to_string(),
            scheme: "http".to_string(),
            host: "localhost".to_string(),
            base: String::new(),
            headers: HashMap::new(),
            attributes: HashMap::new(),
            params: IndexMap::new(),
            persist: Vec::new(),
        }
    }

    pub fn with_method(mut self, method: impl AsRef<str>) -> Self {
        self.method = method.as_ref().to_ascii_uppercase();
        self
    }

    pub fn with_scheme(mut self, scheme: impl AsRef<str>) -> Self {
        self.scheme = scheme.as_ref().trim_end_matches("://").to_string();
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = base.into();
        self
    }

    /// Header names are matched case-insensitively.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Arbitrary key/value data consulted by meta conditions (detector flags,
    /// environment values and the like).
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Pre-populated routing params, e.g. for a context request built by hand.
    pub fn with_params(mut self, params: impl Into<Params>) -> Self {
        self.params = params.into().into_values();
        self
    }

    pub fn with_persist<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.persist = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Looks up a meta-condition key.
    ///
    /// - `http:method`, `http:host`, `http:scheme` read the request line.
    /// - `http:<name>` reads a header.
    /// - anything else reads an attribute.
    ///
    /// # Examples
    ///
    /// ```
    /// use waypost_router::Request;
    ///
    /// let request = Request::new("/")
    ///     .with_method("post")
    ///     .with_header("Accept", "application/json")
    ///     .with_attribute("ajax", "1");
    ///
    /// assert_eq!(request.get("http:method"), Some("POST"));
    /// assert_eq!(request.get("http:accept"), Some("application/json"));
    /// assert_eq!(request.get("ajax"), Some("1"));
    /// assert_eq!(request.get("missing"), None);
    /// ```
    pub fn get(&self, key: &str) -> Option<&str> {
        match key.strip_prefix("http:") {
            Some("method") => Some(&self.method),
            Some("host") => Some(&self.host),
            Some("scheme") => Some(&self.scheme),
            Some(header) => self
                .headers
                .get(&header.to_ascii_lowercase())
                .map(String::as_str),
            None => self.attributes.get(key).map(String::as_str),
        }
    }

    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    /// The routed controller name, if any.
    pub fn controller(&self) -> Option<&str> {
        self.params.get("controller").and_then(Value::as_text)
    }

    /// Prepends `params` to the current params; on key collisions the new value wins.
    pub(crate) fn merge_params(&mut self, params: IndexMap<String, Value>) {
        let previous = std::mem::replace(&mut self.params, params);
        for (key, value) in previous {
            self.params.entry(key).or_insert(value);
        }
    }

    pub(crate) fn add_persist(&mut self, keys: &[String]) {
        for key in keys {
            if !self.persist.contains(key) {
                self.persist.push(key.clone());
            }
        }
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("url", &format!("{}://{}{}", self.scheme, self.host, self.path))
            .field("params", &self.params)
            .field("persist", &self.persist)
            .finish()
    }
}
