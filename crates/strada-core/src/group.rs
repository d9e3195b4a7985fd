//! # Route Groups
//!
//! Builder for registering routes under a shared path prefix and
//! middleware chain. A child group snapshots its parent's chain at
//! creation time; middleware added to the parent afterwards does not
//! retroactively reach already-created children.
//!
//! Registration failures are programmer errors (duplicate route,
//! malformed pattern, invalid method, oversized chain) and abort the
//! process: a service with a broken route table must not start.

use crate::context::{HandlerChain, MAX_HANDLERS};
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::router::validate_method;

/// Methods covered by [`RouterGroup::any`]
pub const ANY_METHODS: [&str; 7] = ["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS"];

/// Join a group base path with a relative path, preserving a trailing
/// slash on the relative part
pub(crate) fn join_paths(absolute: &str, relative: &str) -> String {
    if relative.is_empty() {
        return absolute.to_string();
    }
    let mut joined = String::with_capacity(absolute.len() + relative.len() + 1);
    joined.push_str(absolute.trim_end_matches('/'));
    joined.push('/');
    joined.push_str(relative.trim_start_matches('/'));
    if relative.ends_with('/') && !joined.ends_with('/') {
        joined.push('/');
    }
    joined
}

/// A registration scope with a base path and inherited middleware
///
/// Created from [`Engine::group`] or by nesting; borrows the engine
/// mutably for its lifetime, which pins all registration to the setup
/// phase.
pub struct RouterGroup<'e> {
    pub(crate) engine: &'e mut Engine,
    pub(crate) handlers: HandlerChain,
    pub(crate) base_path: String,
}

impl<'e> RouterGroup<'e> {
    /// The absolute prefix routes in this group are registered under
    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Append middleware to this group's chain
    ///
    /// Affects routes and child groups created after this call only.
    pub fn use_middleware(&mut self, middleware: HandlerChain) -> &mut Self {
        self.handlers.extend(middleware);
        self
    }

    /// Create a child group
    ///
    /// The child's chain is this group's chain plus `middleware`, frozen
    /// at this moment; its base path is the joined prefix.
    pub fn group(&mut self, relative_path: &str, middleware: HandlerChain) -> RouterGroup<'_> {
        let mut handlers = self.handlers.clone();
        handlers.extend(middleware);
        let base_path = join_paths(&self.base_path, relative_path);
        RouterGroup {
            engine: &mut *self.engine,
            handlers,
            base_path,
        }
    }

    /// Register `handlers` for an arbitrary method and relative path
    ///
    /// # Panics
    ///
    /// Panics on any registration error; see the module docs.
    pub fn handle(&mut self, method: &str, relative_path: &str, handlers: HandlerChain) -> &mut Self {
        if let Err(err) = self.try_handle(method, relative_path, handlers) {
            panic!("{err}");
        }
        self
    }

    pub(crate) fn try_handle(
        &mut self,
        method: &str,
        relative_path: &str,
        handlers: HandlerChain,
    ) -> Result<()> {
        validate_method(method)?;
        let absolute_path = join_paths(&self.base_path, relative_path);
        if handlers.is_empty() {
            return Err(Error::EmptyChain {
                path: absolute_path,
            });
        }
        let combined = self.combine_handlers(handlers, &absolute_path)?;
        self.engine.register(method, &absolute_path, combined)
    }

    fn combine_handlers(&self, handlers: HandlerChain, path: &str) -> Result<HandlerChain> {
        let total = self.handlers.len() + handlers.len();
        if total > MAX_HANDLERS {
            return Err(Error::ChainTooLong {
                path: path.to_string(),
                len: total,
                max: MAX_HANDLERS,
            });
        }
        let mut combined = HandlerChain::with_capacity(total);
        combined.extend(self.handlers.iter().cloned());
        combined.extend(handlers);
        Ok(combined)
    }

    /// Register a GET route
    pub fn get(&mut self, relative_path: &str, handlers: HandlerChain) -> &mut Self {
        self.handle("GET", relative_path, handlers)
    }

    /// Register a POST route
    pub fn post(&mut self, relative_path: &str, handlers: HandlerChain) -> &mut Self {
        self.handle("POST", relative_path, handlers)
    }

    /// Register a PUT route
    pub fn put(&mut self, relative_path: &str, handlers: HandlerChain) -> &mut Self {
        self.handle("PUT", relative_path, handlers)
    }

    /// Register a PATCH route
    pub fn patch(&mut self, relative_path: &str, handlers: HandlerChain) -> &mut Self {
        self.handle("PATCH", relative_path, handlers)
    }

    /// Register a DELETE route
    pub fn delete(&mut self, relative_path: &str, handlers: HandlerChain) -> &mut Self {
        self.handle("DELETE", relative_path, handlers)
    }

    /// Register a HEAD route
    pub fn head(&mut self, relative_path: &str, handlers: HandlerChain) -> &mut Self {
        self.handle("HEAD", relative_path, handlers)
    }

    /// Register an OPTIONS route
    pub fn options(&mut self, relative_path: &str, handlers: HandlerChain) -> &mut Self {
        self.handle("OPTIONS", relative_path, handlers)
    }

    /// Register the same chain under every method in [`ANY_METHODS`]
    pub fn any(&mut self, relative_path: &str, handlers: HandlerChain) -> &mut Self {
        for method in ANY_METHODS {
            self.handle(method, relative_path, handlers.clone());
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{handler, Context};
    use crate::router::Resolution;

    fn noop() -> HandlerChain {
        vec![handler(|_c: &mut Context| {})]
    }

    fn resolved_len(engine: &Engine, method: &str, path: &str) -> Option<usize> {
        match engine.router().resolve(method, path) {
            Resolution::Matched(m) => Some(m.handlers.len()),
            Resolution::NotFound { .. } => None,
        }
    }

    #[test]
    fn test_join_paths() {
        assert_eq!(join_paths("/", "ping"), "/ping");
        assert_eq!(join_paths("/", "/ping"), "/ping");
        assert_eq!(join_paths("/api", "v1"), "/api/v1");
        assert_eq!(join_paths("/api/", "/v1/"), "/api/v1/");
        assert_eq!(join_paths("/api", ""), "/api");
        assert_eq!(join_paths("/", "/"), "/");
    }

    #[test]
    fn test_nested_groups_compose_path_and_chain() {
        let mut engine = Engine::new();
        engine
            .group("/api", noop())
            .group("/v1", noop())
            .get("/ping", noop());

        // one middleware per group plus the endpoint
        assert_eq!(resolved_len(&engine, "GET", "/api/v1/ping"), Some(3));
        assert_eq!(resolved_len(&engine, "GET", "/ping"), None);
    }

    #[test]
    fn test_child_snapshot_is_fixed_at_creation() {
        let mut engine = Engine::new();
        let mut api = engine.group("/api", noop());

        api.group("/v1", HandlerChain::new()).get("/a", noop());

        // middleware added to the parent afterwards must not reach the
        // already-registered child route
        api.use_middleware(noop());
        api.group("/v2", HandlerChain::new()).get("/b", noop());

        assert_eq!(resolved_len(&engine, "GET", "/api/v1/a"), Some(2));
        assert_eq!(resolved_len(&engine, "GET", "/api/v2/b"), Some(3));
    }

    #[test]
    fn test_any_registers_every_method() {
        let mut engine = Engine::new();
        engine.group("/", HandlerChain::new()).any("/echo", noop());

        for method in ANY_METHODS {
            assert_eq!(resolved_len(&engine, method, "/echo"), Some(1), "{method}");
        }
    }

    #[test]
    fn test_invalid_method_rejected() {
        let mut engine = Engine::new();
        let mut group = engine.group("/", HandlerChain::new());
        let err = group.try_handle("get", "/x", noop()).unwrap_err();
        assert!(matches!(err, Error::InvalidMethod { .. }));
    }

    #[test]
    fn test_empty_chain_rejected() {
        let mut engine = Engine::new();
        let mut group = engine.group("/", HandlerChain::new());
        let err = group
            .try_handle("GET", "/x", HandlerChain::new())
            .unwrap_err();
        assert!(matches!(err, Error::EmptyChain { .. }));
    }

    #[test]
    fn test_chain_length_capped_below_sentinel() {
        let mut engine = Engine::new();
        let mut group = engine.group("/", HandlerChain::new());
        let oversized: HandlerChain = (0..=MAX_HANDLERS)
            .map(|_| handler(|_c: &mut Context| {}))
            .collect();
        let err = group.try_handle("GET", "/x", oversized).unwrap_err();
        assert!(matches!(err, Error::ChainTooLong { .. }));
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn test_duplicate_route_is_fatal() {
        let mut engine = Engine::new();
        engine.get("/dup", noop());
        engine.get("/dup", noop());
    }
}
