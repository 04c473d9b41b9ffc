// File: src/config.rs
// Purpose: Routing table loaded from a TOML file

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::params::{Params, Value};
use crate::route::RouteOptions;
use crate::router::{Router, RouterBuilder};
use crate::scope::Attachment;

/// Routing table: scope attachments and routes, in registration order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingConfig {
    #[serde(default)]
    pub scopes: Vec<ScopeConfig>,

    #[serde(default)]
    pub routes: Vec<RouteConfig>,
}

/// A named scope attachment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeConfig {
    pub name: String,

    #[serde(flatten)]
    pub attachment: Attachment,
}

/// A single route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteConfig {
    pub template: String,

    /// Static params, defaults and meta conditions
    #[serde(default)]
    pub params: IndexMap<String, Value>,

    /// `Controller::action` shorthand, merged under `params`
    #[serde(default)]
    pub to: Option<String>,

    /// Scope to register in (root scope when absent)
    #[serde(default)]
    pub scope: Option<String>,

    #[serde(default, rename = "continue")]
    pub continuation: bool,

    #[serde(default)]
    pub persist: Vec<String>,
}

impl RouteConfig {
    /// The route's params with the `to` shorthand expanded.
    pub fn params(&self) -> Params {
        let mut params = self
            .to
            .as_deref()
            .map(Params::from)
            .unwrap_or_default();
        for (key, value) in &self.params {
            params.insert(key.clone(), value.clone());
        }
        params
    }

    fn options(&self) -> RouteOptions {
        let options = RouteOptions::new()
            .with_continue(self.continuation)
            .with_persist(self.persist.iter().cloned());
        match &self.scope {
            Some(scope) => options.with_scope(scope.clone()),
            None => options,
        }
    }
}

impl RoutingConfig {
    /// Load the routing table from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        // A missing or empty file is an empty routing table
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read routing config: {:?}", path))?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        Self::from_toml(&content).with_context(|| format!("Failed to parse routing config: {:?}", path))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: RoutingConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Builds a router: scopes are attached first, then routes are
    /// connected in file order.
    pub fn into_router(self) -> Result<Router> {
        let mut builder = RouterBuilder::new();
        for scope in self.scopes {
            builder = builder.attach(&scope.name, scope.attachment);
        }
        for route in &self.routes {
            builder = builder.connect(&route.template, route.params(), route.options());
        }

        builder.build().context("Failed to compile routing config")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Request;

    const SAMPLE: &str = r#"
        [[scopes]]
        name = "admin"
        prefix = "admin"
        library = "backend"

        [[routes]]
        template = "/"
        to = "Pages::home"

        [[routes]]
        template = "/{:controller}/{:action}/{:id:\\d+}"
        params = { action = "view" }

        [[routes]]
        template = "/{:controller}/{:action}"
        scope = "admin"
        persist = ["controller"]

        [[routes]]
        template = "/login"
        to = "Sessions::add"
        params = { "http:method" = "POST" }
    "#;

    #[test]
    fn test_empty_config() {
        let config = RoutingConfig::from_toml("").unwrap();
        assert!(config.scopes.is_empty());
        assert!(config.routes.is_empty());
    }

    #[test]
    fn test_missing_file_is_default() {
        let config = RoutingConfig::load("does/not/exist/routes.toml").unwrap();
        assert_eq!(config, RoutingConfig::default());
    }

    #[test]
    fn test_parse_sample() {
        let config = RoutingConfig::from_toml(SAMPLE).unwrap();
        assert_eq!(config.scopes.len(), 1);
        assert_eq!(config.scopes[0].attachment.prefix, "admin");
        assert_eq!(config.scopes[0].attachment.library.as_deref(), Some("backend"));
        assert_eq!(config.routes.len(), 4);
        assert_eq!(config.routes[2].scope.as_deref(), Some("admin"));

        let params = config.routes[0].params();
        assert_eq!(params.text("controller"), Some("Pages"));
        assert_eq!(params.text("action"), Some("home"));
    }

    #[test]
    fn test_into_router() {
        let mut router = RoutingConfig::from_toml(SAMPLE).unwrap().into_router().unwrap();
        assert_eq!(router.routes(Some("")).len(), 3);
        assert_eq!(router.routes(Some("admin")).len(), 1);

        let parsed = router.parse(&Request::new("/login").with_method("POST")).unwrap();
        assert_eq!(parsed.params().unwrap()["controller"], Value::from("Sessions"));
    }

    #[test]
    fn test_into_router_reports_bad_template() {
        let config = RoutingConfig::from_toml(
            r#"
            [[routes]]
            template = "/{:id}/{:id}"
            "#,
        )
        .unwrap();
        assert!(config.into_router().is_err());
    }
}
