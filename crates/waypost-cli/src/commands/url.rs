use anyhow::Result;
use waypost_router::{MatchOptions, Params, Query, Router, UrlTarget, Value};

use super::split_pair;

/// Turns CLI arguments into a URL target.
///
/// A shorthand or a target with params is reverse-routed; anything else is
/// a literal path.
pub fn build_target(
    target: &str,
    params: &[String],
    query: &[String],
    fragment: Option<String>,
) -> Result<UrlTarget> {
    if params.is_empty() && query.is_empty() && fragment.is_none() {
        return Ok(UrlTarget::from(target));
    }
    if target.starts_with('/') || target.contains("://") {
        anyhow::bail!("Params cannot be applied to literal path '{}'", target);
    }

    let mut extra = Params::new();
    for pair in params {
        let (key, value) = split_pair(pair)?;
        let value = if value.is_empty() {
            Value::Null
        } else {
            Value::from(value)
        };
        extra.insert(key, value);
    }

    if !query.is_empty() {
        let pairs = query
            .iter()
            .map(|pair| split_pair(pair).map(|(key, value)| (key.to_string(), value.to_string())))
            .collect::<Result<Vec<_>>>()?;
        extra = extra.with_query(Query::Pairs(pairs));
    }
    if let Some(fragment) = fragment {
        extra = extra.with_fragment(fragment);
    }

    match Params::from_shorthand(target) {
        Some(_) => Ok(UrlTarget::from((target, extra))),
        None => {
            let mut params = Params::from(target);
            for (key, value) in extra.iter() {
                params.insert(key.clone(), value.clone());
            }
            params.query = extra.query;
            params.fragment = extra.fragment;
            Ok(UrlTarget::Params(params))
        }
    }
}

pub fn build_options(
    scope: Option<String>,
    absolute: bool,
    host: Option<String>,
    scheme: Option<String>,
    base: Option<String>,
) -> MatchOptions {
    MatchOptions {
        absolute,
        scope,
        scheme,
        host,
        base,
        ..MatchOptions::default()
    }
}

pub fn execute(router: &Router, target: UrlTarget, options: &MatchOptions) -> Result<()> {
    let url = router.url_for(target, None, options)?;
    println!("{}", url);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_target() {
        let target = build_target("/about", &[], &[], None).unwrap();
        assert_eq!(target, UrlTarget::Path("/about".to_string()));
    }

    #[test]
    fn test_literal_target_rejects_params() {
        assert!(build_target("/about", &["id=5".to_string()], &[], None).is_err());
    }

    #[test]
    fn test_shorthand_target_with_params() {
        let target = build_target(
            "Posts::view",
            &["id=5".to_string(), "locale=".to_string()],
            &["page=2".to_string()],
            Some("top".to_string()),
        )
        .unwrap();

        let UrlTarget::Params(params) = target else {
            panic!("expected params");
        };
        assert_eq!(params.text("controller"), Some("Posts"));
        assert_eq!(params.text("id"), Some("5"));
        assert_eq!(params.get("locale"), Some(&Value::Null));
        assert_eq!(params.fragment.as_deref(), Some("top"));
        assert!(params.query.is_some());
    }

    #[test]
    fn test_controller_target_with_params() {
        let target = build_target("Posts", &["action=edit".to_string()], &[], None).unwrap();
        let UrlTarget::Params(params) = target else {
            panic!("expected params");
        };
        assert_eq!(params.text("controller"), Some("Posts"));
        assert_eq!(params.text("action"), Some("edit"));
    }
}
