//! # Method Tree Table
//!
//! One independent radix tree per HTTP method. The route space is never
//! shared across methods: registering `GET /ping` says nothing about
//! `POST /ping`. Trees are created lazily on the first registration for
//! their method and are treated as read-only once traffic starts.
//!
//! A lookup miss is an ordinary outcome, not an error; [`Resolution`]
//! carries the trailing-slash-redirect hint so the caller can decide
//! whether to redirect instead of replying not-found.

use crate::context::HandlerChain;
use crate::error::{Error, Result};
use crate::tree::{Node, Params};

/// Validate an HTTP method token: non-empty, ASCII uppercase only
pub(crate) fn validate_method(method: &str) -> Result<()> {
    if method.is_empty() || !method.bytes().all(|b| b.is_ascii_uppercase()) {
        return Err(Error::InvalidMethod {
            method: method.to_string(),
        });
    }
    Ok(())
}

struct MethodTree {
    method: String,
    root: Node,
}

/// A successful route resolution
pub struct RouteMatch<'a> {
    /// The handler chain registered for the matched route
    pub handlers: &'a HandlerChain,
    /// Parameters captured along the path, in match order
    pub params: Params,
    /// The registered pattern that matched, for diagnostics
    pub full_path: &'a str,
}

/// Outcome of resolving a method + path against the table
pub enum Resolution<'a> {
    /// A route matched
    Matched(RouteMatch<'a>),
    /// No route matched; `tsr` signals that toggling a trailing slash
    /// would produce a match
    NotFound {
        /// Trailing-slash-redirect hint
        tsr: bool,
    },
}

/// Registered-route metadata for introspection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
    /// HTTP method the route is registered under
    pub method: String,
    /// Registered path pattern
    pub path: String,
    /// Length of the handler chain, middleware included
    pub num_handlers: usize,
}

/// Per-method routing table
#[derive(Default)]
pub struct Router {
    trees: Vec<MethodTree>,
}

impl Router {
    /// Create an empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn root(&self, method: &str) -> Option<&Node> {
        self.trees
            .iter()
            .find(|tree| tree.method == method)
            .map(|tree| &tree.root)
    }

    /// Register `handlers` for `method` + `path`, creating the method's
    /// tree on first use
    pub(crate) fn add_route(
        &mut self,
        method: &str,
        path: &str,
        handlers: HandlerChain,
    ) -> Result<()> {
        validate_method(method)?;

        let pos = match self.trees.iter().position(|tree| tree.method == method) {
            Some(pos) => pos,
            None => {
                self.trees.push(MethodTree {
                    method: method.to_string(),
                    root: Node::default(),
                });
                self.trees.len() - 1
            }
        };
        self.trees[pos].root.add_route(path, handlers)
    }

    /// Resolve a request method + path to a handler chain and parameters
    pub fn resolve(&self, method: &str, path: &str) -> Resolution<'_> {
        let Some(root) = self.root(method) else {
            return Resolution::NotFound { tsr: false };
        };

        let mut params = Params::with_capacity(usize::from(root.max_params));
        let value = root.get_value(path, &mut params);
        match value.handlers {
            Some(handlers) => Resolution::Matched(RouteMatch {
                handlers,
                params,
                full_path: value.full_path,
            }),
            None => Resolution::NotFound { tsr: value.tsr },
        }
    }

    /// True when the path matches under any method other than `method`;
    /// drives 405 responses
    pub(crate) fn allowed_elsewhere(&self, method: &str, path: &str) -> bool {
        self.trees
            .iter()
            .filter(|tree| tree.method != method)
            .any(|tree| {
                let mut params = Params::default();
                tree.root.get_value(path, &mut params).handlers.is_some()
            })
    }

    /// All registered routes, grouped by method in registration order
    #[must_use]
    pub fn routes(&self) -> Vec<RouteInfo> {
        let mut out = Vec::new();
        for tree in &self.trees {
            let mut terminals = Vec::new();
            tree.root.collect_routes(&mut terminals);
            for (path, num_handlers) in terminals {
                out.push(RouteInfo {
                    method: tree.method.clone(),
                    path,
                    num_handlers,
                });
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{handler, Context};

    fn chain(len: usize) -> HandlerChain {
        (0..len).map(|_| handler(|_c: &mut Context| {})).collect()
    }

    #[test]
    fn test_method_validation() {
        assert!(validate_method("GET").is_ok());
        assert!(validate_method("PURGE").is_ok());
        assert!(validate_method("").is_err());
        assert!(validate_method("get").is_err());
        assert!(validate_method("GET ").is_err());
        assert!(validate_method("G3T").is_err());
    }

    #[test]
    fn test_methods_are_independent() {
        let mut router = Router::new();
        router.add_route("GET", "/users", chain(1)).unwrap();
        router.add_route("POST", "/users", chain(2)).unwrap();

        match router.resolve("GET", "/users") {
            Resolution::Matched(m) => assert_eq!(m.handlers.len(), 1),
            Resolution::NotFound { .. } => panic!("GET /users must match"),
        }
        match router.resolve("POST", "/users") {
            Resolution::Matched(m) => assert_eq!(m.handlers.len(), 2),
            Resolution::NotFound { .. } => panic!("POST /users must match"),
        }
        assert!(matches!(
            router.resolve("DELETE", "/users"),
            Resolution::NotFound { tsr: false }
        ));
    }

    #[test]
    fn test_resolve_params() {
        let mut router = Router::new();
        router.add_route("GET", "/users/:id", chain(1)).unwrap();

        match router.resolve("GET", "/users/7") {
            Resolution::Matched(m) => {
                assert_eq!(m.params.by_name("id"), "7");
                assert_eq!(m.full_path, "/users/:id");
            }
            Resolution::NotFound { .. } => panic!("must match"),
        }
    }

    #[test]
    fn test_allowed_elsewhere() {
        let mut router = Router::new();
        router.add_route("GET", "/users", chain(1)).unwrap();

        assert!(router.allowed_elsewhere("POST", "/users"));
        assert!(!router.allowed_elsewhere("GET", "/users"));
        assert!(!router.allowed_elsewhere("POST", "/missing"));
    }

    #[test]
    fn test_routes_introspection() {
        let mut router = Router::new();
        router.add_route("GET", "/ping", chain(2)).unwrap();
        router.add_route("POST", "/submit", chain(3)).unwrap();

        let mut routes = router.routes();
        routes.sort_by(|a, b| a.method.cmp(&b.method));
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].method, "GET");
        assert_eq!(routes[0].path, "/ping");
        assert_eq!(routes[0].num_handlers, 2);
        assert_eq!(routes[1].method, "POST");
        assert_eq!(routes[1].num_handlers, 3);
    }
}
