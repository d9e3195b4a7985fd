//! # Error Handling
//!
//! Centralized error types for the strada core.
//! Uses `thiserror` for the crate error enum and `anyhow` for the
//! open-ended errors handlers attach to a request context.
//!
//! Two distinct families live here:
//!
//! - [`Error`]: registration-time and transport errors. Registration
//!   variants are programmer errors and are treated as fatal by the
//!   builder API (it panics); the trie-level API returns them so the
//!   failure can be observed without aborting.
//! - [`ContextError`] / [`ErrorList`]: request-scoped errors accumulated
//!   by handlers. These are ordinary data, never control flow; the
//!   transport layer decides what, if anything, reaches the client.

use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Result type alias for strada operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for the strada runtime
#[derive(Error, Debug)]
pub enum Error {
    /// A handler chain is already registered for this exact path
    #[error("handlers are already registered for path '{path}'")]
    Conflict {
        /// The duplicate full path
        path: String,
    },

    /// A wildcard segment clashes with an existing route at the same position
    #[error("'{segment}' in new path '{path}' conflicts with existing wildcard '{existing}' in existing prefix '{prefix}'")]
    WildcardConflict {
        /// The offending segment of the new path
        segment: String,
        /// The full new path
        path: String,
        /// The wildcard already occupying the position
        existing: String,
        /// The registered prefix up to and including the existing wildcard
        prefix: String,
    },

    /// A wildcard segment would shadow existing static children
    #[error("wildcard route '{segment}' conflicts with existing children in path '{path}'")]
    WildcardShadowsChildren {
        /// The offending wildcard segment
        segment: String,
        /// The full new path
        path: String,
    },

    /// The path pattern itself is invalid
    #[error("invalid route pattern '{path}': {reason}")]
    MalformedPath {
        /// The invalid pattern
        path: String,
        /// Reason for invalidity
        reason: &'static str,
    },

    /// The HTTP method string is not a non-empty uppercase token
    #[error("invalid HTTP method: '{method}'")]
    InvalidMethod {
        /// The rejected method string
        method: String,
    },

    /// The combined handler chain would reach the abort sentinel
    #[error("too many handlers for route '{path}': {len} (max {max})")]
    ChainTooLong {
        /// The route being registered
        path: String,
        /// Combined chain length
        len: usize,
        /// Maximum permitted length
        max: usize,
    },

    /// A route was registered without any handler
    #[error("there must be at least one handler for route '{path}'")]
    EmptyChain {
        /// The route missing its handler
        path: String,
    },

    /// Server failed to bind to the specified address
    #[error("failed to bind server to {address}: {source}")]
    Bind {
        /// The address we tried to bind to
        address: String,
        /// The underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Request payload too large
    #[error("payload too large: limit={limit} bytes, received={actual} bytes")]
    PayloadTooLarge {
        /// Max allowed size
        limit: usize,
        /// Actual size
        actual: usize,
    },

    /// HTTP protocol error
    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Classification of a request-scoped error
///
/// `Private` errors are internal detail and must not be surfaced to the
/// client; `Public` errors are safe to expose. Handlers attach errors as
/// private by default and opt in to exposure explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Internal detail, not for client exposure (the default)
    Private,
    /// Safe to surface to the client
    Public,
}

/// A structured error attached to a request context by a handler
///
/// Wraps an arbitrary error with a visibility kind and optional JSON
/// metadata. Accumulated in the context's [`ErrorList`], never raised as
/// control flow.
#[derive(Debug)]
pub struct ContextError {
    inner: anyhow::Error,
    kind: ErrorKind,
    meta: Option<Value>,
}

impl ContextError {
    pub(crate) fn new(inner: anyhow::Error) -> Self {
        Self {
            inner,
            kind: ErrorKind::Private,
            meta: None,
        }
    }

    /// Reclassify this error
    pub fn set_kind(&mut self, kind: ErrorKind) -> &mut Self {
        self.kind = kind;
        self
    }

    /// Attach JSON metadata
    pub fn set_meta(&mut self, meta: Value) -> &mut Self {
        self.meta = Some(meta);
        self
    }

    /// The visibility classification
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Attached metadata, if any
    #[must_use]
    pub fn meta(&self) -> Option<&Value> {
        self.meta.as_ref()
    }

    /// The wrapped error
    #[must_use]
    pub fn inner(&self) -> &anyhow::Error {
        &self.inner
    }

    /// Render as a JSON object: `{"error": ..}` plus `"meta"` when present
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut obj = serde_json::Map::new();
        obj.insert("error".to_string(), Value::String(self.inner.to_string()));
        if let Some(meta) = &self.meta {
            obj.insert("meta".to_string(), meta.clone());
        }
        Value::Object(obj)
    }
}

impl fmt::Display for ContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.fmt(f)
    }
}

/// Ordered list of errors accumulated during a request
#[derive(Debug, Default)]
pub struct ErrorList(Vec<ContextError>);

impl ErrorList {
    /// Number of accumulated errors
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no error has been attached
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The most recently attached error
    #[must_use]
    pub fn last(&self) -> Option<&ContextError> {
        self.0.last()
    }

    /// Iterate over the accumulated errors in attachment order
    pub fn iter(&self) -> std::slice::Iter<'_, ContextError> {
        self.0.iter()
    }

    /// Errors of the given kind, in attachment order
    pub fn by_kind(&self, kind: ErrorKind) -> impl Iterator<Item = &ContextError> {
        self.0.iter().filter(move |e| e.kind() == kind)
    }

    /// Render the whole list as a JSON array
    #[must_use]
    pub fn to_json(&self) -> Value {
        Value::Array(self.0.iter().map(ContextError::to_json).collect())
    }

    pub(crate) fn push(&mut self, err: ContextError) -> &mut ContextError {
        self.0.push(err);
        self.0.last_mut().expect("just pushed")
    }

    pub(crate) fn clear(&mut self) {
        self.0.clear();
    }
}

impl fmt::Display for ErrorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            writeln!(f, "Error #{:02}: {err}", i + 1)?;
            if let Some(meta) = err.meta() {
                writeln!(f, "     Meta: {meta}")?;
            }
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a ErrorList {
    type Item = &'a ContextError;
    type IntoIter = std::slice::Iter<'a, ContextError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
