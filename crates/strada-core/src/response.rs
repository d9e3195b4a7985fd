//! # HTTP Response
//!
//! Buffered response under construction by a handler chain. Carries a
//! `written` latch so the engine can tell whether any handler produced
//! output: fallback chains only write their default body when nothing
//! upstream committed a response first.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::StatusCode;
use serde::Serialize;
use std::collections::HashMap;
use tracing::error;

/// A buffered HTTP response
#[derive(Debug, Clone)]
pub struct Response {
    status: u16,
    content_type: String,
    headers: HashMap<String, String>,
    body: String,
    written: bool,
}

impl Default for Response {
    fn default() -> Self {
        Self {
            status: 200,
            content_type: "text/plain; charset=utf-8".to_string(),
            headers: HashMap::new(),
            body: String::new(),
            written: false,
        }
    }
}

impl Response {
    /// Create a plain-text response
    #[must_use]
    pub fn text(body: impl Into<String>) -> Self {
        let mut response = Self::default();
        response.write_text(body.into());
        response
    }

    /// Create a JSON response by serializing `value`
    ///
    /// Serialization failure degrades to a 500 with a plain body; it is
    /// logged, never panicked on.
    #[must_use]
    pub fn json<T: Serialize>(value: &T) -> Self {
        let mut response = Self::default();
        response.write_json(value);
        response
    }

    /// Set the status code (builder form)
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Set a header (builder form)
    #[must_use]
    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        self.set_header(key, value);
        self
    }

    /// Set the status code
    pub fn set_status(&mut self, status: u16) {
        self.status = status;
    }

    /// Set or override a header
    pub fn set_header(&mut self, key: &str, value: &str) {
        if key.eq_ignore_ascii_case("content-type") {
            self.content_type = value.to_string();
        } else {
            self.headers.insert(key.to_string(), value.to_string());
        }
    }

    /// Current status code
    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Current content type
    #[must_use]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Header value by name (exact match, content type excluded)
    #[must_use]
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(String::as_str)
    }

    /// Current body
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// True once a body was written or the header committed
    #[must_use]
    pub fn written(&self) -> bool {
        self.written
    }

    /// Commit the response header without a body
    pub fn write_header_now(&mut self) {
        self.written = true;
    }

    /// Write a plain-text body, committing the response
    pub fn write_text(&mut self, body: String) {
        self.content_type = "text/plain; charset=utf-8".to_string();
        self.body = body;
        self.written = true;
    }

    /// Serialize `value` into a JSON body, committing the response
    pub fn write_json<T: Serialize>(&mut self, value: &T) {
        match serde_json::to_string(value) {
            Ok(body) => {
                self.content_type = "application/json".to_string();
                self.body = body;
            }
            Err(err) => {
                error!(error = %err, "failed to serialize JSON response");
                self.status = 500;
                self.content_type = "text/plain; charset=utf-8".to_string();
                self.body = "Internal Server Error".to_string();
            }
        }
        self.written = true;
    }

    /// Restore the default state for context reuse
    pub(crate) fn reset(&mut self) {
        self.status = 200;
        self.content_type = "text/plain; charset=utf-8".to_string();
        self.headers.clear();
        self.body.clear();
        self.written = false;
    }

    /// Convert into a hyper response
    pub(crate) fn into_hyper(self) -> hyper::Response<Full<Bytes>> {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut builder = hyper::Response::builder().status(status);
        builder = builder.header("Content-Type", &self.content_type);
        for (k, v) in &self.headers {
            builder = builder.header(k.as_str(), v.as_str());
        }

        builder
            .body(Full::new(Bytes::from(self.body)))
            .unwrap_or_else(|_| {
                hyper::Response::builder()
                    .status(StatusCode::INTERNAL_SERVER_ERROR)
                    .body(Full::new(Bytes::from("Internal Server Error")))
                    .expect("static fallback response")
            })
    }
}
