//! Scope attachments.
//!
//! A scope binds a group of routes to a path prefix and, for absolute
//! scopes, to a host and scheme. Host and scheme are templates that use the
//! same `{:name[:regex]}` tokens as route templates:
//!
//! ```text
//! host   = "{:subdomain}.example.{:tld}"
//! scheme = "{:scheme:https?}"
//! ```
//!
//! Tokens capture `[^/]+?` unless they carry their own sub-pattern. A token
//! that has a value in [`Attachment::values`] only recognizes that value.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::RouteError;
use crate::path::normalize_path;
use crate::request::Request;

static SCOPE_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{:([^:}]+):?((?:[^{]+?(?:\{[0-9,]+\}){0,1})*?)\}")
        .expect("scope token pattern is valid")
});

const HOST_SEGMENT: &str = "[^/]+?";
const ANY_SCHEME: &str = "(?:[a-zA-Z][a-zA-Z0-9+.-]*:)?//";
const DEFAULT_HOST: &str = "localhost";

// ============================================================================
// Attachment
// ============================================================================

/// Configuration of a named scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Attachment {
    /// Generated URLs include scheme and host, and requests are recognized
    /// by scheme and host as well as by path prefix.
    pub absolute: bool,
    pub host: Option<String>,
    pub scheme: Option<String>,
    /// Mount point used when generating URLs inside the scope.
    pub base: Option<String>,
    /// Path prefix shared by every route of the scope.
    pub prefix: String,
    /// Value of the `library` param for requests routed inside the scope.
    /// Defaults to the scope name.
    pub library: Option<String>,
    /// Host and scheme token values.
    pub values: IndexMap<String, String>,
}

impl Attachment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_absolute(mut self, absolute: bool) -> Self {
        self.absolute = absolute;
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = Some(scheme.into());
        self
    }

    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_library(mut self, library: impl Into<String>) -> Self {
        self.library = Some(library.into());
        self
    }

    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

// ============================================================================
// Scope
// ============================================================================

#[derive(Debug, Clone)]
struct ScopeToken {
    name: String,
    /// Anchored version of the token's capture pattern.
    check: Regex,
}

/// A compiled attachment.
#[derive(Debug, Clone)]
pub struct Scope {
    name: String,
    attachment: Attachment,
    pattern: Regex,
    groups: Vec<(String, String)>,
    tokens: Vec<ScopeToken>,
}

impl Scope {
    /// Compiles `attachment` into a recognition pattern.
    ///
    /// # Examples
    ///
    /// ```
    /// use waypost_router::{Attachment, Request, Scope};
    ///
    /// let scope = Scope::compile(
    ///     "admin",
    ///     Attachment::new()
    ///         .with_absolute(true)
    ///         .with_host("{:subdomain}.example.{:tld}")
    ///         .with_value("subdomain", "admin")
    ///         .with_value("tld", "com"),
    /// )
    /// .unwrap();
    ///
    /// assert!(scope.recognize(&Request::new("/").with_host("admin.example.com")).is_some());
    /// assert!(scope.recognize(&Request::new("/").with_host("other.example.com")).is_none());
    /// ```
    pub fn compile(name: &str, attachment: Attachment) -> Result<Self, RouteError> {
        let prefix = attachment.prefix.trim_matches('/');
        let prefix = if prefix.is_empty() {
            String::new()
        } else {
            format!("/{}", regex::escape(prefix))
        };

        let mut groups = Vec::new();
        let mut tokens = Vec::new();

        let pattern = if attachment.absolute {
            let host_template = attachment.host.as_deref().unwrap_or(DEFAULT_HOST);
            let host = compile_part(host_template, &attachment.values, &mut groups, &mut tokens)
                .map_err(|source| RouteError::InvalidScope {
                    name: name.to_string(),
                    source,
                })?;
            let scheme = match attachment.scheme.as_deref() {
                Some(template) => {
                    let scheme = compile_part(template, &attachment.values, &mut groups, &mut tokens)
                        .map_err(|source| RouteError::InvalidScope {
                            name: name.to_string(),
                            source,
                        })?;
                    format!("{}://", scheme)
                }
                None => ANY_SCHEME.to_string(),
            };
            format!("^{}{}{}/", scheme, host, prefix)
        } else {
            format!("^{}/", prefix)
        };

        let pattern = Regex::new(&pattern).map_err(|source| RouteError::InvalidScope {
            name: name.to_string(),
            source,
        })?;

        Ok(Self {
            name: name.to_string(),
            attachment,
            pattern,
            groups,
            tokens,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attachment(&self) -> &Attachment {
        &self.attachment
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// Names of the host and scheme tokens, in template order.
    pub fn params(&self) -> Vec<String> {
        self.tokens.iter().map(|token| token.name.clone()).collect()
    }

    /// Library param value for requests routed inside this scope.
    pub fn library(&self) -> &str {
        self.attachment.library.as_deref().unwrap_or(&self.name)
    }

    /// Recompiles the scope with new token values.
    pub fn with_values(self, values: IndexMap<String, String>) -> Result<Self, RouteError> {
        let mut attachment = self.attachment;
        attachment.values = values;
        Scope::compile(&self.name, attachment)
    }

    /// Matches a request against the scope. Returns the host and scheme
    /// token captures on success.
    pub fn recognize(&self, request: &Request) -> Option<IndexMap<String, String>> {
        let path = request.path.trim_matches('/');
        let path = if path.is_empty() {
            "/".to_string()
        } else {
            format!("/{}/", path)
        };
        let url = if self.attachment.absolute {
            format!("{}://{}{}", request.scheme, request.host, path)
        } else {
            path
        };

        let caps = self.pattern.captures(&url)?;
        Some(
            self.groups
                .iter()
                .filter_map(|(group, name)| {
                    caps.name(group).map(|m| (name.clone(), m.as_str().to_string()))
                })
                .collect(),
        )
    }

    /// Removes the scope's path prefix from `path`.
    pub fn strip_prefix(&self, path: &str) -> String {
        let path = normalize_path(path);
        let prefix = self.attachment.prefix.trim_matches('/');
        if prefix.is_empty() {
            return path.into_owned();
        }

        let rest = path
            .strip_prefix('/')
            .and_then(|rest| rest.strip_prefix(prefix))
            .unwrap_or(&path);
        normalize_path(rest).into_owned()
    }

    /// Resolves the attachment against token values. `values` take
    /// precedence over the attachment's own values. A value only replaces its
    /// token when it satisfies the token's sub-pattern; unresolved tokens are
    /// left in place.
    pub fn resolve(&self, values: &IndexMap<String, String>) -> ResolvedScope {
        let lookup = |name: &str| -> Option<String> {
            values
                .get(name)
                .or_else(|| self.attachment.values.get(name))
                .filter(|value| {
                    self.tokens
                        .iter()
                        .find(|token| token.name == name)
                        .map_or(true, |token| token.check.is_match(value))
                })
                .cloned()
        };

        ResolvedScope {
            name: self.name.clone(),
            absolute: self.attachment.absolute,
            host: self
                .attachment
                .host
                .as_deref()
                .map(|host| substitute(host, &lookup)),
            scheme: self
                .attachment
                .scheme
                .as_deref()
                .map(|scheme| substitute(scheme, &lookup)),
            base: self.attachment.base.clone(),
            prefix: self.attachment.prefix.clone(),
            library: self.library().to_string(),
        }
    }
}

/// An attachment with its host and scheme tokens substituted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedScope {
    pub name: String,
    pub absolute: bool,
    pub host: Option<String>,
    pub scheme: Option<String>,
    pub base: Option<String>,
    pub prefix: String,
    pub library: String,
}

/// Compiles a host or scheme template into a regex fragment, registering
/// one capture group per token.
fn compile_part(
    template: &str,
    values: &IndexMap<String, String>,
    groups: &mut Vec<(String, String)>,
    tokens: &mut Vec<ScopeToken>,
) -> Result<String, regex::Error> {
    let mut pattern = String::new();
    let mut cursor = 0;

    for caps in SCOPE_TOKEN.captures_iter(template) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        pattern.push_str(&regex::escape(&template[cursor..whole.start()]));
        cursor = whole.end();

        let name = caps.get(1).map_or("", |m| m.as_str()).to_string();
        let capture = caps
            .get(2)
            .map(|m| m.as_str())
            .filter(|capture| !capture.is_empty())
            .unwrap_or(HOST_SEGMENT);
        let check = Regex::new(&format!("^(?:{})$", capture))?;

        let capture = match values.get(&name) {
            Some(value) if check.is_match(value) => regex::escape(value),
            _ => capture.to_string(),
        };

        let group = format!("s{}", groups.len());
        pattern.push_str(&format!("(?P<{}>{})", group, capture));
        groups.push((group, name.clone()));
        tokens.push(ScopeToken { name, check });
    }

    pattern.push_str(&regex::escape(&template[cursor..]));
    Ok(pattern)
}

/// Replaces each token of `template` whose name `lookup` resolves.
fn substitute(template: &str, lookup: &impl Fn(&str) -> Option<String>) -> String {
    SCOPE_TOKEN
        .replace_all(template, |caps: &regex::Captures<'_>| {
            let name = caps.get(1).map_or("", |m| m.as_str());
            lookup(name).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}
