//! Path utilities for normalization
//!
//! All functions are **pure**: given same input, always produce same output with no side effects.

use std::borrow::Cow;

/// Checks if a path is already in canonical routing form
///
/// # Rules
///
/// - Must start with exactly one `/`
/// - Must not end with `/` (except root `/`)
///
/// # Examples
///
/// ```
/// use waypost_router::path::is_normalized;
///
/// assert!(is_normalized("/"));
/// assert!(is_normalized("/posts/view/1"));
///
/// assert!(!is_normalized(""));
/// assert!(!is_normalized("posts"));
/// assert!(!is_normalized("/posts/"));
/// assert!(!is_normalized("//posts"));
/// ```
pub fn is_normalized(path: &str) -> bool {
    if path == "/" {
        return true;
    }

    path.starts_with('/') && !path.starts_with("//") && !path.ends_with('/')
}

/// Normalize a path to a single leading slash and no trailing slash
///
/// Returns `Cow::Borrowed` when input is already canonical (zero allocations).
/// Interior slashes are left untouched so wildcard captures see the path as sent.
///
/// # Examples
///
/// ```
/// use waypost_router::path::normalize_path;
/// use std::borrow::Cow;
///
/// assert!(matches!(normalize_path("/posts"), Cow::Borrowed("/posts")));
/// assert_eq!(normalize_path("posts/view/"), "/posts/view");
/// assert_eq!(normalize_path("///"), "/");
/// assert_eq!(normalize_path(""), "/");
/// ```
pub fn normalize_path(path: &str) -> Cow<'_, str> {
    if is_normalized(path) {
        return Cow::Borrowed(path);
    }

    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        Cow::Borrowed("/")
    } else {
        Cow::Owned(format!("/{}", trimmed))
    }
}

/// Joins a base path and a path fragment, collapsing the slash between them
/// and dropping a trailing slash (root stays `/`).
pub(crate) fn join_base(base: &str, path: &str) -> String {
    let joined = format!("{}{}", base.trim_end_matches('/'), path);
    let trimmed = joined.trim_end_matches('/');

    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_normalized() {
        assert!(is_normalized("/"));
        assert!(is_normalized("/about"));
        assert!(is_normalized("/users/123"));

        assert!(!is_normalized(""));
        assert!(!is_normalized("about"));
        assert!(!is_normalized("/about/"));
        assert!(!is_normalized("//about"));
    }

    #[test]
    fn test_normalize_path_valid() {
        let path = normalize_path("/about");
        assert!(matches!(path, Cow::Borrowed("/about")));

        let path = normalize_path("/");
        assert!(matches!(path, Cow::Borrowed("/")));
    }

    #[test]
    fn test_normalize_path_trailing_and_leading() {
        assert_eq!(normalize_path("/about/"), "/about");
        assert_eq!(normalize_path("users/123"), "/users/123");
        assert_eq!(normalize_path("//users/123//"), "/users/123");
    }

    #[test]
    fn test_normalize_path_keeps_interior_slashes() {
        assert_eq!(normalize_path("/files/a//b/"), "/files/a//b");
    }

    #[test]
    fn test_join_base() {
        assert_eq!(join_base("", "/posts"), "/posts");
        assert_eq!(join_base("/app", "/posts/"), "/app/posts");
        assert_eq!(join_base("/app/", "/"), "/app");
        assert_eq!(join_base("", "/"), "/");
    }
}
