//! # Engine
//!
//! Owns the per-method routing table and a pool of reusable dispatch
//! contexts. Registration happens through the engine's root group (or
//! nested groups) during setup; at request time the engine is read-only
//! and [`handle_request`](Engine::handle_request) may be called from any
//! number of workers concurrently.
//!
//! Contexts are acquired per request, exclusively owned by the handling
//! worker for the request's lifetime, and fully reset before returning
//! to the pool.

use crate::context::{Context, HandlerChain};
use crate::error::Result;
use crate::group::RouterGroup;
use crate::request::Request;
use crate::response::Response;
use crate::router::{Resolution, RouteInfo, Router};
use std::sync::{Arc, Mutex};
use tracing::debug;

const DEFAULT_404_BODY: &str = "404 page not found";
const DEFAULT_405_BODY: &str = "405 method not allowed";

/// Hook invoked for each route registration in place of the default
/// debug log line: `(method, absolute_path, handler_count)`
pub type RouteDebugFn = Arc<dyn Fn(&str, &str, usize) + Send + Sync>;

/// Pool of reusable dispatch contexts, one acquired per in-flight request
#[derive(Default)]
struct ContextPool {
    free: Mutex<Vec<Box<Context>>>,
}

impl ContextPool {
    fn acquire(&self) -> Box<Context> {
        self.free
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .pop()
            .unwrap_or_else(|| Box::new(Context::new()))
    }

    fn release(&self, mut context: Box<Context>) {
        context.reset();
        self.free
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(context);
    }
}

/// The routing engine: method tree table, context pool, dispatch policy
pub struct Engine {
    /// Redirect to the slash-toggled path when the lookup signals it
    pub redirect_trailing_slash: bool,
    /// Answer 405 instead of 404 when the path exists under another method
    pub handle_method_not_allowed: bool,

    pub(crate) handlers: HandlerChain,
    pub(crate) base_path: String,
    router: Router,
    pool: ContextPool,
    no_route: HandlerChain,
    no_method: HandlerChain,
    all_no_route: HandlerChain,
    all_no_method: HandlerChain,
    route_debug: Option<RouteDebugFn>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Create an engine with default policy
    #[must_use]
    pub fn new() -> Self {
        Self {
            redirect_trailing_slash: true,
            handle_method_not_allowed: false,
            handlers: HandlerChain::new(),
            base_path: "/".to_string(),
            router: Router::new(),
            pool: ContextPool::default(),
            no_route: HandlerChain::new(),
            no_method: HandlerChain::new(),
            all_no_route: HandlerChain::new(),
            all_no_method: HandlerChain::new(),
            route_debug: None,
        }
    }

    /// The routing table (read-only)
    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Replace the default route-registration debug log line
    pub fn set_route_debug_hook(&mut self, hook: RouteDebugFn) {
        self.route_debug = Some(hook);
    }

    /// Attach engine-wide middleware
    ///
    /// Applies to routes registered after this call, to the 404/405
    /// fallback chains, and to groups created afterwards.
    pub fn use_middleware(&mut self, middleware: HandlerChain) -> &mut Self {
        self.handlers.extend(middleware);
        self.rebuild_fallback_chains();
        self
    }

    /// Handlers run when no route matches (after engine middleware)
    pub fn no_route(&mut self, handlers: HandlerChain) -> &mut Self {
        self.no_route = handlers;
        self.rebuild_fallback_chains();
        self
    }

    /// Handlers run for a 405 (after engine middleware)
    pub fn no_method(&mut self, handlers: HandlerChain) -> &mut Self {
        self.no_method = handlers;
        self.rebuild_fallback_chains();
        self
    }

    fn rebuild_fallback_chains(&mut self) {
        self.all_no_route = self
            .handlers
            .iter()
            .chain(self.no_route.iter())
            .cloned()
            .collect();
        self.all_no_method = self
            .handlers
            .iter()
            .chain(self.no_method.iter())
            .cloned()
            .collect();
    }

    /// Open a registration group under `relative_path`
    ///
    /// The group's chain is the engine middleware plus `middleware`,
    /// frozen at this moment.
    pub fn group(&mut self, relative_path: &str, middleware: HandlerChain) -> RouterGroup<'_> {
        let mut handlers = self.handlers.clone();
        handlers.extend(middleware);
        let base_path = crate::group::join_paths(&self.base_path, relative_path);
        RouterGroup {
            engine: self,
            handlers,
            base_path,
        }
    }

    fn root_group(&mut self) -> RouterGroup<'_> {
        let handlers = self.handlers.clone();
        let base_path = self.base_path.clone();
        RouterGroup {
            engine: self,
            handlers,
            base_path,
        }
    }

    /// Register a route under an arbitrary method
    ///
    /// # Panics
    ///
    /// Panics on any registration error (duplicate route, malformed
    /// pattern, invalid method, oversized chain).
    pub fn handle(&mut self, method: &str, path: &str, handlers: HandlerChain) -> &mut Self {
        self.root_group().handle(method, path, handlers);
        self
    }

    /// Register a GET route
    pub fn get(&mut self, path: &str, handlers: HandlerChain) -> &mut Self {
        self.handle("GET", path, handlers)
    }

    /// Register a POST route
    pub fn post(&mut self, path: &str, handlers: HandlerChain) -> &mut Self {
        self.handle("POST", path, handlers)
    }

    /// Register a PUT route
    pub fn put(&mut self, path: &str, handlers: HandlerChain) -> &mut Self {
        self.handle("PUT", path, handlers)
    }

    /// Register a PATCH route
    pub fn patch(&mut self, path: &str, handlers: HandlerChain) -> &mut Self {
        self.handle("PATCH", path, handlers)
    }

    /// Register a DELETE route
    pub fn delete(&mut self, path: &str, handlers: HandlerChain) -> &mut Self {
        self.handle("DELETE", path, handlers)
    }

    /// Register a HEAD route
    pub fn head(&mut self, path: &str, handlers: HandlerChain) -> &mut Self {
        self.handle("HEAD", path, handlers)
    }

    /// Register an OPTIONS route
    pub fn options(&mut self, path: &str, handlers: HandlerChain) -> &mut Self {
        self.handle("OPTIONS", path, handlers)
    }

    /// Register the same chain under every common method
    pub fn any(&mut self, path: &str, handlers: HandlerChain) -> &mut Self {
        self.root_group().any(path, handlers);
        self
    }

    pub(crate) fn register(
        &mut self,
        method: &str,
        path: &str,
        handlers: HandlerChain,
    ) -> Result<()> {
        let num_handlers = handlers.len();
        self.router.add_route(method, path, handlers)?;
        if let Some(hook) = &self.route_debug {
            hook(method, path, num_handlers);
        } else if crate::mode::is_debugging() {
            debug!(method, path, handlers = num_handlers, "route registered");
        }
        Ok(())
    }

    /// All registered routes
    #[must_use]
    pub fn routes(&self) -> Vec<RouteInfo> {
        self.router.routes()
    }

    /// Dispatch one request to completion and produce its response
    ///
    /// Resolves method + path, drives a pooled context through the
    /// matched chain (or the 404/405/redirect policy), and returns the
    /// response the chain built.
    pub fn handle_request(&self, request: Request) -> Response {
        let mut context = self.pool.acquire();
        context.request = request;
        self.dispatch(&mut context);
        let response = std::mem::take(&mut context.response);
        self.pool.release(context);
        response
    }

    fn dispatch(&self, c: &mut Context) {
        let method = c.request.method.clone();
        let path = c.request.path.clone();

        match self.router.resolve(&method, &path) {
            Resolution::Matched(matched) => {
                c.handlers = matched.handlers.clone();
                c.params = matched.params;
                c.full_path = matched.full_path.to_string();
                c.next();
                if !c.response.written() {
                    c.response.write_header_now();
                }
            }
            Resolution::NotFound { tsr } => {
                if tsr && self.redirect_trailing_slash && method != "CONNECT" && path != "/" {
                    Self::redirect_trailing_slash(c, &method, &path);
                    return;
                }
                if self.handle_method_not_allowed && self.router.allowed_elsewhere(&method, &path)
                {
                    self.serve_fallback(c, 405, DEFAULT_405_BODY, &self.all_no_method);
                    return;
                }
                self.serve_fallback(c, 404, DEFAULT_404_BODY, &self.all_no_route);
            }
        }
    }

    fn redirect_trailing_slash(c: &mut Context, method: &str, path: &str) {
        let code = if method == "GET" { 301 } else { 307 };
        let location = path
            .strip_suffix('/')
            .map_or_else(|| format!("{path}/"), String::from);
        c.response.set_status(code);
        c.response.set_header("Location", &location);
        c.response.write_header_now();
    }

    fn serve_fallback(&self, c: &mut Context, code: u16, default_body: &str, chain: &HandlerChain) {
        c.handlers = chain.clone();
        c.response.set_status(code);
        c.next();
        if !c.response.written() {
            c.response.write_text(default_body.to_string());
        }
    }

    /// Serve this engine over HTTP/1 on `address` until shutdown
    pub async fn run(self, address: std::net::SocketAddr) -> Result<()> {
        crate::server::Server::new(Arc::new(self))
            .bind(address)
            .serve()
            .await
    }
}
