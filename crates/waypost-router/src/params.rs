//! Parameter values and the canonical parameter set.
//!
//! Everything that enters the router (connect-time static params, reverse
//! routing targets, parsed request params) is normalized into [`Params`]:
//! an insertion-ordered map of names to [`Value`]s plus a query/fragment
//! side channel. Shorthand forms such as `"Posts::index"` are expanded here,
//! at the boundary, so the route and router code only ever see one shape.

use std::borrow::Cow;
use std::fmt;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static SHORTHAND: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._\\]+::[A-Za-z0-9_]+$").expect("shorthand pattern is valid")
});

// ============================================================================
// Value
// ============================================================================

/// A single parameter value.
///
/// `Null` is an explicit absence: it clears a persisted parameter and drops
/// an optional placeholder when generating a URL. `List` is what the `args`
/// modifier produces from a wildcard capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Text(String),
    List(Vec<String>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the text if this is a `Text` value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the list if this is a `List` value.
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Renders the value as it appears in a URL: lists are slash-joined,
    /// `Null` renders as nothing.
    pub fn render(&self) -> Option<Cow<'_, str>> {
        match self {
            Value::Null => None,
            Value::Text(text) => Some(Cow::Borrowed(text)),
            Value::List(items) => Some(Cow::Owned(items.join("/"))),
        }
    }

    pub(crate) fn is_empty_text(&self) -> bool {
        matches!(self, Value::Text(text) if text.is_empty())
    }

    /// Checks a meta condition: set membership for lists, equality otherwise.
    pub fn accepts(&self, candidate: &str) -> bool {
        match self {
            Value::List(allowed) => allowed.iter().any(|item| item == candidate),
            Value::Text(expected) => expected == candidate,
            Value::Null => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Text(text) => write!(f, "{}", text),
            Value::List(items) => write!(f, "[{}]", items.join(", ")),
        }
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::Text(text.to_string())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::Text(text)
    }
}

impl From<&String> for Value {
    fn from(text: &String) -> Self {
        Value::Text(text.clone())
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Value::List(items)
    }
}

impl From<Vec<&str>> for Value {
    fn from(items: Vec<&str>) -> Self {
        Value::List(items.into_iter().map(String::from).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

// ============================================================================
// Query
// ============================================================================

/// The `?` side channel of a parameter set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Query {
    /// Pre-encoded query text, with or without the leading `?`.
    Raw(String),
    /// Key/value pairs, percent-encoded when rendered.
    Pairs(Vec<(String, String)>),
}

impl Query {
    /// Renders the query including its leading `?`, or `None` when empty.
    pub fn render(&self) -> Option<String> {
        let body = match self {
            Query::Raw(raw) => raw.trim_start_matches('?').to_string(),
            Query::Pairs(pairs) => pairs
                .iter()
                .map(|(key, value)| {
                    format!("{}={}", urlencoding::encode(key), urlencoding::encode(value))
                })
                .collect::<Vec<_>>()
                .join("&"),
        };

        if body.is_empty() {
            None
        } else {
            Some(format!("?{}", body))
        }
    }
}

impl From<&str> for Query {
    fn from(raw: &str) -> Self {
        Query::Raw(raw.to_string())
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for Query {
    fn from(pairs: [(K, V); N]) -> Self {
        Query::Pairs(
            pairs
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

// ============================================================================
// Params
// ============================================================================

/// Canonical parameter set: ordered name → value map plus query/fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Params {
    #[serde(flatten)]
    values: IndexMap<String, Value>,
    #[serde(skip)]
    pub query: Option<Query>,
    #[serde(skip)]
    pub fragment: Option<String>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expands `Controller::action` (optionally `library.Controller::action`).
    ///
    /// Returns `None` for anything that is not a shorthand.
    ///
    /// # Examples
    ///
    /// ```
    /// use waypost_router::{Params, Value};
    ///
    /// let params = Params::from_shorthand("Posts::view").unwrap();
    /// assert_eq!(params.get("controller"), Some(&Value::from("Posts")));
    /// assert_eq!(params.get("action"), Some(&Value::from("view")));
    ///
    /// assert!(Params::from_shorthand("/posts/view").is_none());
    /// ```
    pub fn from_shorthand(text: &str) -> Option<Self> {
        if !SHORTHAND.is_match(text) {
            return None;
        }

        let (controller, action) = text.split_once("::")?;
        let mut params = Params::new();

        match controller.split_once('.') {
            Some((library, controller)) => {
                params.insert("controller", controller);
                params.insert("action", action);
                params.insert("library", library);
            }
            None => {
                params.insert("controller", controller);
                params.insert("action", action);
            }
        }

        Some(params)
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn with_query(mut self, query: impl Into<Query>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_fragment(mut self, fragment: impl Into<String>) -> Self {
        self.fragment = Some(fragment.into());
        self
    }

    /// Inserts or replaces a value, keeping the original position of an existing key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Shortcut for the text of a value.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_text)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Value> {
        self.values.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn values(&self) -> &IndexMap<String, Value> {
        &self.values
    }

    pub fn into_values(self) -> IndexMap<String, Value> {
        self.values
    }

    /// Human-readable rendering used in routing errors: `[key => value, ...]`.
    pub fn describe(&self) -> String {
        let entries: Vec<String> = self
            .values
            .iter()
            .map(|(key, value)| format!("{} => {}", key, value))
            .collect();
        format!("[{}]", entries.join(", "))
    }
}

impl From<IndexMap<String, Value>> for Params {
    fn from(values: IndexMap<String, Value>) -> Self {
        Params {
            values,
            query: None,
            fragment: None,
        }
    }
}

/// `"Controller::action"` expands to both keys; any other text is taken as
/// a bare controller name.
impl From<&str> for Params {
    fn from(text: &str) -> Self {
        Params::from_shorthand(text).unwrap_or_else(|| Params::new().with("controller", text))
    }
}

impl<K: Into<String>, V: Into<Value>, const N: usize> From<[(K, V); N]> for Params {
    fn from(entries: [(K, V); N]) -> Self {
        entries.into_iter().collect()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let values: IndexMap<String, Value> = iter
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        Params::from(values)
    }
}

impl<'a> IntoIterator for &'a Params {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

// ============================================================================
// UrlTarget
// ============================================================================

/// What a caller asks the router to generate a URL for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlTarget {
    /// Reverse-route a parameter set.
    Params(Params),
    /// A literal path or URL; only prefixed, never routed.
    Path(String),
}

impl From<Params> for UrlTarget {
    fn from(params: Params) -> Self {
        UrlTarget::Params(params)
    }
}

impl From<&str> for UrlTarget {
    fn from(text: &str) -> Self {
        match Params::from_shorthand(text) {
            Some(params) => UrlTarget::Params(params),
            None => UrlTarget::Path(text.to_string()),
        }
    }
}

impl From<String> for UrlTarget {
    fn from(text: String) -> Self {
        UrlTarget::from(text.as_str())
    }
}

/// A shorthand followed by extra parameters, e.g. `("Posts::view", id=5)`.
/// The extra parameters override the shorthand's keys.
impl From<(&str, Params)> for UrlTarget {
    fn from((shorthand, extra): (&str, Params)) -> Self {
        let mut params = Params::from_shorthand(shorthand).unwrap_or_default();
        for (key, value) in extra.values {
            params.insert(key, value);
        }
        params.query = extra.query;
        params.fragment = extra.fragment;
        UrlTarget::Params(params)
    }
}
