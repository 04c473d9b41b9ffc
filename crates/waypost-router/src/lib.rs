//! # Waypost Router
//!
//! A two-way URL routing engine. Templates are compiled into matchers that
//! turn request paths into parameter sets, and the same templates turn
//! parameter sets back into canonical URLs.
//!
//! - Named tokens (`/{:controller}/{:action}`)
//! - Custom sub-patterns (`/{:id:\d+}`, `/{:year:\d{4}}`)
//! - Optional segments through defaults, trimmed from generated URLs
//! - Extension tokens (`/{:id}.{:type}`)
//! - Meta conditions on method, headers and request attributes
//! - Continuation routes that chain a prefix (`/{:locale}/{:args}`) with later routes
//! - Scopes bound to a path prefix, host and scheme
//! - Parameter persistence across generated URLs
//!
//! ## Example
//!
//! ```
//! use waypost_router::{MatchOptions, Params, Request, RouteOptions, Router, Value};
//!
//! let mut router = Router::new();
//! router
//!     .connect("/", Params::from("Pages::home"), RouteOptions::new())
//!     .unwrap();
//! router
//!     .connect("/{:controller}/{:action}/{:id}", Params::from([("id", "")]), RouteOptions::new())
//!     .unwrap();
//!
//! let parsed = router.parse(&Request::new("/blog_posts/edit/3")).unwrap();
//! let params = parsed.params().unwrap();
//! assert_eq!(params["controller"], Value::from("BlogPosts"));
//! assert_eq!(params["action"], Value::from("edit"));
//!
//! let url = router
//!     .url_for(Params::from([("controller", "BlogPosts")]), None, &MatchOptions::new())
//!     .unwrap();
//! assert_eq!(url, "/blog_posts");
//!
//! let url = router.url_for("Pages::home", None, &MatchOptions::new()).unwrap();
//! assert_eq!(url, "/");
//! ```

// ============================================================================
// Module Declarations
// ============================================================================

pub mod config;
mod error;
mod params;
pub mod path;
mod request;
mod route;
mod router;
mod scope;
pub mod template;
mod transform;

pub use config::{RouteConfig, RoutingConfig, ScopeConfig};
pub use error::{RouteError, RoutingError};
pub use params::{Params, Query, UrlTarget, Value};
pub use request::Request;
pub use route::{Handler, HandlerOutput, Parsed, Route, RouteExport, RouteOptions, HTTP_METHOD};
pub use router::{MatchOptions, Router, RouterBuilder};
pub use scope::{Attachment, ResolvedScope, Scope};
pub use transform::{Transform, Transforms};
