pub mod parse;
pub mod routes;
pub mod url;

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;
use waypost_router::{Router, RoutingConfig};

/// Loads the routing table and compiles it into a router.
pub fn load_router(path: &Path) -> Result<Router> {
    if !path.exists() {
        eprintln!(
            "{} {} not found, using an empty routing table",
            "⚠".yellow(),
            path.display()
        );
    }

    let config = RoutingConfig::load(path)?;
    config
        .into_router()
        .with_context(|| format!("Failed to build router from {}", path.display()))
}

/// Splits `key=value`.
pub fn split_pair(pair: &str) -> Result<(&str, &str)> {
    pair.split_once('=')
        .with_context(|| format!("Expected key=value, got '{}'", pair))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_pair() {
        assert_eq!(split_pair("id=5").unwrap(), ("id", "5"));
        assert_eq!(split_pair("locale=").unwrap(), ("locale", ""));
        assert_eq!(split_pair("q=a=b").unwrap(), ("q", "a=b"));
        assert!(split_pair("id").is_err());
    }
}
