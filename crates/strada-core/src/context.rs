//! # Dispatch Context
//!
//! The per-request object threaded through a handler chain. It carries
//! the resolved chain, the matched path parameters, a signed cursor for
//! sequential execution, a lazily-allocated key/value bag for
//! inter-middleware communication, and the accumulated error list.
//!
//! Chain execution is plain synchronous recursion: a handler that calls
//! [`Context::next`] runs the rest of the chain inside its own stack
//! frame, so code before the nested call runs on the way in and code
//! after it runs on the way out, in reverse registration order.
//!
//! Contexts are pooled by the engine and [`reset`](Context::reset)
//! between uses; a context must never be retained past its request (use
//! [`Context::snapshot`] for that).

use crate::error::{ContextError, ErrorList};
use crate::request::Request;
use crate::response::Response;
use crate::tree::Params;
use serde::Serialize;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// Cursor value marking an aborted chain
///
/// Chosen so that no real chain can reach it: registration caps combined
/// chains strictly below this value, and the headroom above it absorbs
/// the post-abort increments of unwinding nested `next()` frames.
pub const ABORT_INDEX: i8 = i8::MAX / 2;

/// Longest combined handler chain a route may register
pub const MAX_HANDLERS: usize = ABORT_INDEX as usize - 1;

/// A route handler or middleware
///
/// A handler is a capability: a callable taking the context, permitted
/// to call [`Context::next`] and/or mutate the context, producing no
/// result.
pub type Handler = Arc<dyn Fn(&mut Context) + Send + Sync>;

/// Ordered sequence of handlers executed via sequential cursor advance
pub type HandlerChain = Vec<Handler>;

/// Wrap a closure as a [`Handler`]
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&mut Context) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Per-request dispatch state
pub struct Context {
    /// The inbound request
    pub request: Request,
    /// The response under construction
    pub response: Response,
    /// Path parameters captured by the route lookup
    pub params: Params,
    /// Errors accumulated by handlers during this request
    pub errors: ErrorList,

    pub(crate) handlers: HandlerChain,
    pub(crate) index: i8,
    pub(crate) full_path: String,
    keys: Option<HashMap<String, Arc<dyn Any + Send + Sync>>>,
}

impl Context {
    pub(crate) fn new() -> Self {
        Self {
            request: Request::default(),
            response: Response::default(),
            params: Params::default(),
            errors: ErrorList::default(),
            handlers: HandlerChain::new(),
            index: -1,
            full_path: String::new(),
            keys: None,
        }
    }

    /// Restore pristine state before the context is handed to another
    /// request
    pub(crate) fn reset(&mut self) {
        self.request = Request::default();
        self.response.reset();
        self.params.clear();
        self.errors.clear();
        self.handlers.clear();
        self.index = -1;
        self.full_path.clear();
        self.keys = None;
    }

    /// Run the remainder of the chain
    ///
    /// Only meaningful inside a handler: code placed after the call runs
    /// once the downstream handlers have returned.
    pub fn next(&mut self) {
        self.index += 1;
        while (self.index as usize) < self.handlers.len() {
            let handler = Arc::clone(&self.handlers[self.index as usize]);
            handler(self);
            self.index += 1;
        }
    }

    /// True once [`abort`](Self::abort) has been called
    ///
    /// Normal completion (running off the end of the chain) does not
    /// count as aborted.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.index >= ABORT_INDEX
    }

    /// Stop the chain: no handler after the current one will run, not
    /// even on return through nested [`next`](Self::next) calls.
    /// Idempotent.
    pub fn abort(&mut self) {
        self.index = ABORT_INDEX;
    }

    /// Abort and set the response status in one step
    pub fn abort_with_status(&mut self, code: u16) {
        self.response.set_status(code);
        self.response.write_header_now();
        self.abort();
    }

    /// Abort with a status and attach the error to the context
    pub fn abort_with_error(
        &mut self,
        code: u16,
        err: impl Into<anyhow::Error>,
    ) -> &mut ContextError {
        self.abort_with_status(code);
        self.error(err)
    }

    /// Attach an error to this request
    ///
    /// The error is wrapped as private-by-default; use the returned
    /// reference to reclassify it or attach metadata. Errors are
    /// accumulated, never raised as control flow.
    pub fn error(&mut self, err: impl Into<anyhow::Error>) -> &mut ContextError {
        self.errors.push(ContextError::new(err.into()))
    }

    /// Store a value under a string key
    ///
    /// The bag is allocated on first write; a context that never stores
    /// anything never pays for it.
    pub fn set<T: Send + Sync + 'static>(&mut self, key: impl Into<String>, value: T) {
        self.keys
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), Arc::new(value));
    }

    /// Fetch a value stored with [`set`](Self::set)
    ///
    /// Returns `None` when the key is absent or holds a different type.
    #[must_use]
    pub fn get<T: Send + Sync + 'static>(&self, key: &str) -> Option<&T> {
        self.keys.as_ref()?.get(key)?.downcast_ref::<T>()
    }

    /// Fetch a required value
    ///
    /// # Panics
    ///
    /// Panics when the key is absent: requesting a missing required key
    /// is a defect in calling code, not a runtime condition.
    #[must_use]
    pub fn must_get<T: Send + Sync + 'static>(&self, key: &str) -> &T {
        self.get(key)
            .unwrap_or_else(|| panic!("key \"{key}\" does not exist"))
    }

    /// Stored string under `key`, if present with that type
    #[must_use]
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get::<String>(key).cloned()
    }

    /// Stored bool under `key`, if present with that type
    #[must_use]
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get::<bool>(key).copied()
    }

    /// Stored i64 under `key`, if present with that type
    #[must_use]
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get::<i64>(key).copied()
    }

    /// Stored f64 under `key`, if present with that type
    #[must_use]
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get::<f64>(key).copied()
    }

    /// Value of the named path parameter, `""` when absent
    #[must_use]
    pub fn param(&self, name: &str) -> &str {
        self.params.by_name(name)
    }

    /// First value of the named query parameter
    #[must_use]
    pub fn query(&self, key: &str) -> Option<&str> {
        self.request.query(key)
    }

    /// Named query parameter with a fallback
    #[must_use]
    pub fn default_query<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.request.query(key).unwrap_or(default)
    }

    /// All values of the named query parameter
    #[must_use]
    pub fn query_array(&self, key: &str) -> &[String] {
        self.request.query_array(key)
    }

    /// The registered route pattern that matched this request
    #[must_use]
    pub fn full_path(&self) -> &str {
        &self.full_path
    }

    /// Write a plain-text response body
    pub fn string(&mut self, code: u16, body: impl Into<String>) {
        self.response.set_status(code);
        self.response.write_text(body.into());
    }

    /// Serialize `value` as the JSON response body
    pub fn json<T: Serialize>(&mut self, code: u16, value: &T) {
        self.response.set_status(code);
        self.response.write_json(value);
    }

    /// Detached copy safe to retain past the request
    ///
    /// The chain is dropped and the cursor forced to the abort sentinel,
    /// so the snapshot can never run handlers; key-bag values are shared,
    /// parameters and errors are independent.
    #[must_use]
    pub fn snapshot(&self) -> Self {
        Self {
            request: self.request.clone(),
            response: Response::default(),
            params: self.params.clone(),
            errors: ErrorList::default(),
            handlers: HandlerChain::new(),
            index: ABORT_INDEX,
            full_path: self.full_path.clone(),
            keys: self.keys.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn run(chain: HandlerChain) -> Context {
        let mut c = Context::new();
        c.handlers = chain;
        c.next();
        c
    }

    type Log = Arc<Mutex<Vec<&'static str>>>;

    fn logging(log: &Log, entry: &'static str) -> Handler {
        let log = Arc::clone(log);
        handler(move |_c| log.lock().unwrap().push(entry))
    }

    #[test]
    fn chain_runs_in_registration_order() {
        let log: Log = Arc::default();
        let c = run(vec![
            logging(&log, "one"),
            logging(&log, "two"),
            logging(&log, "three"),
        ]);

        assert_eq!(*log.lock().unwrap(), ["one", "two", "three"]);
        assert!(!c.is_aborted(), "normal completion is not an abort");
    }

    #[test]
    fn nested_next_wraps_downstream_handlers() {
        let log: Log = Arc::default();
        let outer = {
            let log = Arc::clone(&log);
            handler(move |c| {
                log.lock().unwrap().push("in");
                c.next();
                log.lock().unwrap().push("out");
            })
        };
        run(vec![outer, logging(&log, "endpoint")]);

        assert_eq!(*log.lock().unwrap(), ["in", "endpoint", "out"]);
    }

    #[test]
    fn abort_stops_downstream_but_unwinds_upstream() {
        let log: Log = Arc::default();
        let wrap = |tag_in: &'static str, tag_out: &'static str| {
            let log = Arc::clone(&log);
            handler(move |c| {
                log.lock().unwrap().push(tag_in);
                c.next();
                log.lock().unwrap().push(tag_out);
            })
        };
        let aborting = {
            let log = Arc::clone(&log);
            handler(move |c| {
                log.lock().unwrap().push("abort");
                c.abort();
            })
        };

        let c = run(vec![
            wrap("in1", "out1"),
            aborting,
            logging(&log, "three"),
            logging(&log, "four"),
            logging(&log, "five"),
        ]);

        assert!(c.is_aborted());
        assert_eq!(*log.lock().unwrap(), ["in1", "abort", "out1"]);
    }

    #[test]
    fn abort_is_idempotent() {
        let mut c = Context::new();
        c.abort();
        c.abort();
        assert!(c.is_aborted());
    }

    #[test]
    fn next_after_completion_is_inert() {
        let log: Log = Arc::default();
        let mut c = run(vec![logging(&log, "once")]);

        c.next();
        c.next();
        assert_eq!(*log.lock().unwrap(), ["once"]);
    }

    #[test]
    fn abort_with_status_sets_response() {
        let mut c = Context::new();
        c.abort_with_status(503);
        assert!(c.is_aborted());
        assert_eq!(c.response.status(), 503);
        assert!(c.response.written());
    }

    #[test]
    fn keys_are_lazy_and_typed() {
        let mut c = Context::new();
        assert!(c.get::<String>("user").is_none());

        c.set("user", "gopher".to_string());
        c.set("count", 3i64);
        c.set("ratio", 0.5f64);
        c.set("flag", true);

        assert_eq!(c.get_string("user").as_deref(), Some("gopher"));
        assert_eq!(c.get_i64("count"), Some(3));
        assert_eq!(c.get_f64("ratio"), Some(0.5));
        assert_eq!(c.get_bool("flag"), Some(true));
        // type mismatch reads as absent
        assert!(c.get::<i64>("user").is_none());
    }

    #[test]
    #[should_panic(expected = "key \"missing\" does not exist")]
    fn must_get_panics_on_missing_key() {
        let c = Context::new();
        let _: &String = c.must_get("missing");
    }

    #[test]
    fn errors_accumulate_private_by_default() {
        let mut c = Context::new();
        c.error(anyhow::anyhow!("first"));
        c.error(anyhow::anyhow!("second"))
            .set_kind(crate::error::ErrorKind::Public);

        assert_eq!(c.errors.len(), 2);
        assert_eq!(
            c.errors.by_kind(crate::error::ErrorKind::Private).count(),
            1
        );
        assert_eq!(c.errors.last().unwrap().to_string(), "second");
    }

    #[test]
    fn reset_restores_pristine_state() {
        let mut c = Context::new();
        c.handlers = vec![handler(|_c| {})];
        c.set("k", 1i64);
        c.error(anyhow::anyhow!("boom"));
        c.abort_with_status(500);
        assert!(c.is_aborted());

        c.reset();

        assert!(!c.is_aborted());
        assert_eq!(c.index, -1);
        assert!(c.handlers.is_empty());
        assert!(c.params.is_empty());
        assert!(c.errors.is_empty());
        assert!(c.get::<i64>("k").is_none());
        assert_eq!(c.response.status(), 200);
        assert!(!c.response.written());
    }

    #[test]
    fn snapshot_is_detached_and_inert() {
        let mut c = Context::new();
        c.handlers = vec![handler(|_c| {})];
        c.set("user", "gopher".to_string());
        c.full_path = "/user/:id".to_string();

        let snap = c.snapshot();
        assert!(snap.is_aborted(), "snapshot must never run handlers");
        assert!(snap.handlers.is_empty());
        assert_eq!(snap.get_string("user").as_deref(), Some("gopher"));
        assert_eq!(snap.full_path(), "/user/:id");
    }

    #[test]
    fn string_and_json_render_into_response() {
        let mut c = Context::new();
        c.string(201, "created");
        assert_eq!(c.response.status(), 201);
        assert_eq!(c.response.body(), "created");

        let mut c = Context::new();
        c.json(200, &serde_json::json!({"ok": true}));
        assert_eq!(c.response.header("Content-Type"), None);
        assert_eq!(c.response.content_type(), "application/json");
        assert!(c.response.body().contains("\"ok\":true"));
    }
}
