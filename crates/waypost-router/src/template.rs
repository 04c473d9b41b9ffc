//! Template compiler.
//!
//! A template is literal text interleaved with tokens:
//!
//! - `{:name}` captures one path segment (`[^/]+`)
//! - `{:name:regex}` captures with a custom sub-pattern
//! - `{:args}` captures the rest of the path (`.*`)
//!
//! A token may be preceded by `/` (segment) or `.` (extension). The
//! separator belongs to the token: optional tokens make it optional too, and
//! trimming a token while writing a URL removes it.
//!
//! Parsing a template is split in two steps because whether a token is
//! optional depends on the route's defaults, which in turn depend on the
//! template's keys: [`Template::parse`] scans the tokens, then
//! [`Template::compile`] builds the matcher once the defaults are known.

use std::collections::HashMap;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::RouteError;
use crate::params::Value;

/// Matches one token together with its preceding separator. The sub-pattern
/// part tolerates `{m,n}` quantifiers so `{:id:\d{2,3}}` is a single token.
static TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([/.])?\{:([^:}]+):?((?:[^{]+?(?:\{[0-9,]+\}){0,1})*?)\}")
        .expect("token pattern is valid")
});

/// Name of the wildcard token that captures the unconsumed remainder.
pub const ARGS: &str = "args";

const SEGMENT: &str = "[^/]+";
const REMAINDER: &str = ".*";

// ============================================================================
// Pieces
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Separator {
    Slash,
    Dot,
}

impl Separator {
    fn as_str(self) -> &'static str {
        match self {
            Separator::Slash => "/",
            Separator::Dot => ".",
        }
    }
}

/// A `{:name[:regex]}` placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub name: String,
    pub separator: Option<Separator>,
    /// Custom sub-pattern, if one was given.
    pub pattern: Option<String>,
}

impl Token {
    fn capture_pattern(&self) -> &str {
        match &self.pattern {
            Some(pattern) => pattern,
            None if self.name == ARGS => REMAINDER,
            None => SEGMENT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Piece {
    Literal(String),
    Token(Token),
}

// ============================================================================
// Template
// ============================================================================

/// A scanned template: its pieces, ordered keys and anchored sub-pattern checks.
#[derive(Debug, Clone)]
pub struct Template {
    source: String,
    pieces: Vec<Piece>,
    keys: Vec<String>,
    sub_patterns: IndexMap<String, String>,
    checks: HashMap<String, Regex>,
}

impl Template {
    /// Scans `source` into literal and token pieces.
    ///
    /// Rejects duplicate token names and custom sub-patterns that can match
    /// `/` anywhere but in the last token.
    ///
    /// # Examples
    ///
    /// ```
    /// use waypost_router::template::Template;
    ///
    /// let template = Template::parse("/{:controller}/{:action}/{:id:\\d+}").unwrap();
    /// assert_eq!(template.keys(), ["controller", "action", "id"]);
    /// assert_eq!(template.sub_pattern("id"), Some("\\d+"));
    ///
    /// assert!(Template::parse("/{:id}/{:id}").is_err());
    /// ```
    pub fn parse(source: &str) -> Result<Self, RouteError> {
        let mut pieces = Vec::new();
        let mut keys: Vec<String> = Vec::new();
        let mut sub_patterns = IndexMap::new();
        let mut checks = HashMap::new();
        let mut cursor = 0;

        for caps in TOKEN.captures_iter(source) {
            let whole = caps.get(0).map_or(0..0, |m| m.range());
            if whole.start > cursor {
                pieces.push(Piece::Literal(source[cursor..whole.start].to_string()));
            }
            cursor = whole.end;

            let name = caps.get(2).map_or("", |m| m.as_str()).to_string();
            if keys.contains(&name) {
                return Err(RouteError::DuplicateParam {
                    template: source.to_string(),
                    name,
                });
            }

            let separator = caps.get(1).map(|m| match m.as_str() {
                "." => Separator::Dot,
                _ => Separator::Slash,
            });
            let pattern = caps
                .get(3)
                .map(|m| m.as_str())
                .filter(|pattern| !pattern.is_empty())
                .map(String::from);

            if let Some(pattern) = &pattern {
                let check = Regex::new(&format!("^(?:{})$", pattern)).map_err(|source_err| {
                    RouteError::InvalidTemplate {
                        template: source.to_string(),
                        source: source_err,
                    }
                })?;
                checks.insert(name.clone(), check);
                sub_patterns.insert(name.clone(), pattern.clone());
            }

            keys.push(name.clone());
            pieces.push(Piece::Token(Token {
                name,
                separator,
                pattern,
            }));
        }

        if cursor < source.len() {
            pieces.push(Piece::Literal(source[cursor..].to_string()));
        }

        let last = keys.last().cloned();
        if let Some((name, _)) = sub_patterns
            .iter()
            .find(|(name, pattern)| matches_slash(pattern) && Some(*name) != last.as_ref())
        {
            return Err(RouteError::SlashInSubPattern {
                template: source.to_string(),
                name: name.clone(),
            });
        }

        Ok(Self {
            source: source.to_string(),
            pieces,
            keys,
            sub_patterns,
            checks,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    /// Token names in declaration order.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
    }

    pub fn has_args(&self) -> bool {
        self.has_key(ARGS)
    }

    pub fn sub_pattern(&self, key: &str) -> Option<&str> {
        self.sub_patterns.get(key).map(String::as_str)
    }

    pub fn sub_patterns(&self) -> &IndexMap<String, String> {
        &self.sub_patterns
    }

    /// Whether `value` satisfies the custom sub-pattern of `key`.
    /// Keys without a sub-pattern accept anything.
    pub fn satisfies(&self, key: &str, value: &str) -> bool {
        self.checks
            .get(key)
            .map_or(true, |check| check.is_match(value))
    }

    fn precedes_extension(&self, index: usize) -> bool {
        matches!(
            self.pieces.get(index + 1),
            Some(Piece::Token(Token {
                separator: Some(Separator::Dot),
                ..
            }))
        )
    }

    fn is_root(&self) -> bool {
        self.source.trim_matches('/').is_empty()
    }

    /// Builds the anchored matcher. `optional` decides which tokens may be
    /// omitted from a path (in practice: tokens with a default).
    /// The wildcard is always optional.
    pub fn compile(&self, optional: impl Fn(&str) -> bool) -> Result<Matcher, RouteError> {
        if self.is_root() {
            let regex = Regex::new("^/*$").map_err(|source| RouteError::InvalidTemplate {
                template: self.source.clone(),
                source,
            })?;
            return Ok(Matcher {
                regex,
                groups: Vec::new(),
            });
        }

        let mut pattern = String::from("^");
        let mut groups = Vec::with_capacity(self.keys.len());

        for (index, piece) in self.pieces.iter().enumerate() {
            match piece {
                Piece::Literal(text) => pattern.push_str(&regex::escape(text)),
                Piece::Token(token) => {
                    let group = format!("k{}", groups.len());
                    // Leave a following extension token its chance to match.
                    let lazy = token.pattern.is_none() && self.precedes_extension(index);
                    let capture = if lazy {
                        format!("(?P<{}>{}?)", group, token.capture_pattern())
                    } else {
                        format!("(?P<{}>{})", group, token.capture_pattern())
                    };
                    let is_optional = token.name == ARGS || optional(token.name.as_str());

                    match (token.separator, is_optional) {
                        (Some(Separator::Slash), true) => {
                            pattern.push_str(&format!("(?:/{}?)?", capture))
                        }
                        (Some(Separator::Slash), false) => pattern.push_str(&format!("/{}", capture)),
                        (Some(Separator::Dot), true) => {
                            pattern.push_str(&format!(r"(?:\.{})?", capture))
                        }
                        (Some(Separator::Dot), false) => pattern.push_str(&format!(r"\.{}", capture)),
                        (None, _) => pattern.push_str(&capture),
                    }
                    groups.push((group, token.name.clone()));
                }
            }
        }
        pattern.push('$');

        let regex = Regex::new(&pattern).map_err(|source| RouteError::InvalidTemplate {
            template: self.source.clone(),
            source,
        })?;

        Ok(Matcher { regex, groups })
    }

    /// Writes a URL fragment from formatted `values`.
    ///
    /// Tokens are visited from last to first. While still at the tail of
    /// the template, a token whose value equals its entry in `defaults` is
    /// dropped together with its separator. `Null` always drops the token.
    /// Any other value is written and ends trimming, except for the
    /// wildcard, which never blocks trimming of the keys before it.
    ///
    /// # Examples
    ///
    /// ```
    /// use indexmap::IndexMap;
    /// use waypost_router::template::Template;
    /// use waypost_router::Value;
    ///
    /// let template = Template::parse("/{:controller}/{:action}").unwrap();
    /// let defaults: IndexMap<String, Value> =
    ///     [("action".to_string(), Value::from("index"))].into_iter().collect();
    ///
    /// let values: IndexMap<String, Value> = [
    ///     ("controller".to_string(), Value::from("posts")),
    ///     ("action".to_string(), Value::from("index")),
    /// ]
    /// .into_iter()
    /// .collect();
    ///
    /// assert_eq!(template.write(&values, &defaults), "/posts");
    /// ```
    pub fn write(&self, values: &IndexMap<String, Value>, defaults: &IndexMap<String, Value>) -> String {
        let mut rendered: Vec<String> = self
            .pieces
            .iter()
            .map(|piece| match piece {
                Piece::Literal(text) => text.clone(),
                Piece::Token(_) => String::new(),
            })
            .collect();
        let mut trimming = true;

        for (index, piece) in self.pieces.iter().enumerate().rev() {
            let Piece::Token(token) = piece else {
                continue;
            };

            let value = values.get(&token.name).unwrap_or(&Value::Null);
            let at_tail = rendered[index + 1..].iter().all(String::is_empty);

            if trimming && at_tail && defaults.get(&token.name) == Some(value) {
                continue;
            }

            match value.render() {
                None => continue,
                Some(text) if text.is_empty() => {}
                Some(text) => {
                    let separator = token.separator.map_or("", Separator::as_str);
                    rendered[index] = format!("{}{}", separator, text);
                }
            }

            if token.name != ARGS {
                trimming = false;
            }
        }

        let url = rendered.concat();
        if url.is_empty() {
            "/".to_string()
        } else {
            url
        }
    }
}

/// Whether a sub-pattern names a literal `/` outside a negated class such
/// as `[^/.]`.
fn matches_slash(pattern: &str) -> bool {
    let mut chars = pattern.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if chars.next() == Some('/') {
                    return true;
                }
            }
            '[' if chars.peek() == Some(&'^') => {
                chars.next();
                // A leading `]` is a member of the class.
                if chars.peek() == Some(&']') {
                    chars.next();
                }
                while let Some(c) = chars.next() {
                    match c {
                        '\\' => {
                            chars.next();
                        }
                        ']' => break,
                        _ => {}
                    }
                }
            }
            '/' => return true,
            _ => {}
        }
    }

    false
}

// ============================================================================
// Matcher
// ============================================================================

/// Compiled, anchored route pattern.
#[derive(Debug, Clone)]
pub struct Matcher {
    regex: Regex,
    /// Generated group name paired with the token name it captures.
    groups: Vec<(String, String)>,
}

impl Matcher {
    /// Matches a normalized path and returns the captured values by key.
    /// Tokens that did not participate in the match are absent.
    pub fn captures(&self, path: &str) -> Option<IndexMap<String, String>> {
        let caps = self.regex.captures(path)?;

        Some(
            self.groups
                .iter()
                .filter_map(|(group, key)| {
                    caps.name(group)
                        .map(|m| (key.clone(), m.as_str().to_string()))
                })
                .collect(),
        )
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}
