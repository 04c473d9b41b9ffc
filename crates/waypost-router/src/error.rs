//! Error types for route registration and URL generation.
//!
//! Failing to parse a request or failing to satisfy a single route's
//! constraints is not an error: those paths return `None` so the router can
//! move on to the next candidate. The types here cover the two cases that
//! are surfaced to callers:
//!
//! - [`RouteError`]: a template or scope attachment could not be compiled.
//! - [`RoutingError`]: no route in the selected scope could produce a URL
//!   for the supplied parameters.

use thiserror::Error;

/// Registration-time failures.
#[derive(Debug, Error)]
pub enum RouteError {
    /// The same `{:name}` token appears twice in one template.
    #[error("duplicate parameter `{name}` in template `{template}`")]
    DuplicateParam { template: String, name: String },

    /// A custom sub-pattern matches literal slashes but is not the trailing token.
    #[error(
        "sub-pattern for `{name}` in template `{template}` may only contain `/` in the last token"
    )]
    SlashInSubPattern { template: String, name: String },

    /// The generated regular expression was rejected by the regex engine.
    #[error("failed to compile template `{template}`: {source}")]
    InvalidTemplate {
        template: String,
        #[source]
        source: regex::Error,
    },

    /// A host or scheme template of a scope attachment could not be compiled.
    #[error("failed to compile scope `{name}`: {source}")]
    InvalidScope {
        name: String,
        #[source]
        source: regex::Error,
    },
}

/// Reverse routing failures returned by [`Router::url_for`](crate::Router::url_for).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    #[error("No parameter match found for URL `{params}`.")]
    NoMatch { params: String },

    #[error("No parameter match found for URL `{params}` in `{scope}` scope.")]
    NoMatchInScope { params: String, scope: String },
}

impl RoutingError {
    pub(crate) fn no_match(params: String, scope: &str) -> Self {
        if scope.is_empty() {
            RoutingError::NoMatch { params }
        } else {
            RoutingError::NoMatchInScope {
                params,
                scope: scope.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_match_message_root_scope() {
        let err = RoutingError::no_match("[controller => Posts]".to_string(), "");
        assert_eq!(
            err.to_string(),
            "No parameter match found for URL `[controller => Posts]`."
        );
    }

    #[test]
    fn test_no_match_message_named_scope() {
        let err = RoutingError::no_match("[controller => Posts]".to_string(), "admin");
        assert_eq!(
            err.to_string(),
            "No parameter match found for URL `[controller => Posts]` in `admin` scope."
        );
    }
}
