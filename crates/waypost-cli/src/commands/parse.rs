use anyhow::Result;
use colored::Colorize;
use waypost_router::{Parsed, Request, Router};

use super::split_pair;

pub fn build_request(
    path: &str,
    method: &str,
    host: &str,
    scheme: &str,
    headers: &[String],
) -> Result<Request> {
    let mut request = Request::new(path)
        .with_method(method)
        .with_host(host)
        .with_scheme(scheme);

    for header in headers {
        let (name, value) = split_pair(header)?;
        request = request.with_header(name, value);
    }

    Ok(request)
}

pub fn execute(mut router: Router, request: &Request, json: bool) -> Result<()> {
    let Some(parsed) = router.parse(request) else {
        anyhow::bail!("No route matches {} {}", request.method, request.path);
    };

    let Parsed::Request(resolved) = parsed else {
        println!("{}", "Handled by route handler".yellow());
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&resolved.params)?);
        return Ok(());
    }

    let scope = router.current_scope().unwrap_or("(root)");
    println!("{} {}", "Matched in scope".green().bold(), scope.cyan());
    println!();

    for (key, value) in &resolved.params {
        println!("  {:<12} {}", key.bold(), value);
    }
    if !resolved.persist.is_empty() {
        println!();
        println!("  {:<12} {}", "persist".dimmed(), resolved.persist.join(", "));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_request() {
        let request = build_request(
            "/posts",
            "post",
            "example.com",
            "https",
            &["Accept=application/json".to_string()],
        )
        .unwrap();

        assert_eq!(request.get("http:method"), Some("POST"));
        assert_eq!(request.get("http:host"), Some("example.com"));
        assert_eq!(request.get("http:accept"), Some("application/json"));
    }

    #[test]
    fn test_build_request_rejects_bad_header() {
        assert!(build_request("/", "GET", "localhost", "http", &["Accept".to_string()]).is_err());
    }
}
