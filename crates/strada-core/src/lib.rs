//! # Strada Core
//!
//! Core runtime library for the strada framework: an embeddable HTTP
//! server toolkit built around a per-method radix-trie router and a
//! middleware-chaining dispatch context.
//!
//! ## Architecture
//!
//! Routes are registered through an [`Engine`] (or nested
//! [`RouterGroup`]s) during a setup phase; the resulting trees are
//! read-only at request time and safe for unsynchronized concurrent
//! lookups. Each request acquires a pooled [`Context`], runs its handler
//! chain synchronously with reentrant [`Context::next`] semantics, and
//! returns the context to the pool fully reset.
//!
//! ## Modules
//!
//! - `engine` - engine: routing table owner, context pool, dispatch policy
//! - `tree` - compressed radix trie with params and catch-all wildcards
//! - `router` - per-method tree table and lookup resolution
//! - `group` - route groups with inherited middleware and base paths
//! - `context` - per-request dispatch context and handler chain
//! - `request` - HTTP request wrapper with lazy query parsing
//! - `response` - buffered HTTP response
//! - `server` - HTTP/1 transport built on Hyper
//! - `mode` - process-wide run mode (debug / release / test)
//! - `error` - error types and handling

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod context;
pub mod engine;
pub mod error;
pub mod group;
pub mod mode;
pub mod request;
pub mod response;
pub mod router;
pub mod server;
pub mod tree;

pub use context::{handler, Context, Handler, HandlerChain, ABORT_INDEX, MAX_HANDLERS};
pub use engine::{Engine, RouteDebugFn};
pub use error::{ContextError, Error, ErrorKind, ErrorList, Result};
pub use group::{RouterGroup, ANY_METHODS};
pub use mode::{is_debugging, mode, set_mode, Mode, ENV_STRADA_MODE};
pub use request::Request;
pub use response::Response;
pub use router::{Resolution, RouteInfo, RouteMatch, Router};
pub use server::{Server, ServerConfig};
pub use tree::{Param, Params};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
