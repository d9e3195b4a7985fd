//! # HTTP Request
//!
//! Transport-agnostic request wrapper with lazy query parsing.
//!
//! Headers are stored but accessed on demand, the body is collected once
//! and cached, and the query string is parsed into its multi-value form
//! on first access. Handlers see this type only; hyper never leaks past
//! the server module.

use crate::error::{Error, Result};
use http_body_util::BodyExt;
use hyper::body::Bytes;
use std::collections::HashMap;
use std::sync::OnceLock;

/// An inbound HTTP request as seen by handlers
#[derive(Debug, Clone, Default)]
pub struct Request {
    /// HTTP method token, uppercase
    pub method: String,
    /// Request path (without query string)
    pub path: String,
    query_string: Option<String>,
    headers: hyper::HeaderMap,
    body: Option<Bytes>,
    query_cache: OnceLock<HashMap<String, Vec<String>>>,
}

impl Request {
    /// Create a request manually (tests, embedding without a transport)
    ///
    /// A `?query` suffix on `path` is split off into the query string.
    #[must_use]
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        let path = path.into();
        let (path, query_string) = match path.split_once('?') {
            Some((p, q)) => (p.to_string(), Some(q.to_string())),
            None => (path, None),
        };

        Self {
            method: method.into(),
            path,
            query_string,
            headers: hyper::HeaderMap::new(),
            body: None,
            query_cache: OnceLock::new(),
        }
    }

    /// Attach a body
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Create from a hyper request, collecting the body
    pub async fn from_hyper(req: hyper::Request<hyper::body::Incoming>) -> Result<Self> {
        Self::from_hyper_with_limit(req, usize::MAX).await
    }

    /// Create from a hyper request with a body size limit
    pub async fn from_hyper_with_limit(
        req: hyper::Request<hyper::body::Incoming>,
        max_body_size: usize,
    ) -> Result<Self> {
        let method = req.method().as_str().to_string();

        let uri = req.uri();
        let path = uri.path().to_string();
        let query_string = uri.query().map(String::from);

        let headers = req.headers().clone();
        if let Some(len) = headers.get(hyper::header::CONTENT_LENGTH) {
            if let Ok(content_len) = len.to_str().unwrap_or_default().parse::<usize>() {
                if content_len > max_body_size {
                    return Err(Error::PayloadTooLarge {
                        limit: max_body_size,
                        actual: content_len,
                    });
                }
            }
        }

        let body = match BodyExt::collect(req.into_body()).await {
            Ok(collected) => {
                let bytes = collected.to_bytes();
                if bytes.len() > max_body_size {
                    return Err(Error::PayloadTooLarge {
                        limit: max_body_size,
                        actual: bytes.len(),
                    });
                }
                Some(bytes)
            }
            Err(_) => None,
        };

        Ok(Self {
            method,
            path,
            query_string,
            headers,
            body,
            query_cache: OnceLock::new(),
        })
    }

    /// Get a header value by name (case-insensitive)
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Set or override a header
    pub fn set_header(&mut self, name: &str, value: &str) {
        if let (Ok(n), Ok(v)) = (
            hyper::header::HeaderName::from_bytes(name.as_bytes()),
            hyper::header::HeaderValue::from_str(value),
        ) {
            self.headers.insert(n, v);
        }
    }

    /// All request headers
    #[must_use]
    pub fn headers(&self) -> &hyper::HeaderMap {
        &self.headers
    }

    /// Raw query string, if any
    #[must_use]
    pub fn query_string(&self) -> Option<&str> {
        self.query_string.as_deref()
    }

    /// First value of a query parameter
    #[must_use]
    pub fn query(&self, key: &str) -> Option<&str> {
        self.query_cache()
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// All values of a query parameter, in order of appearance
    #[must_use]
    pub fn query_array(&self, key: &str) -> &[String] {
        self.query_cache().get(key).map_or(&[], Vec::as_slice)
    }

    fn query_cache(&self) -> &HashMap<String, Vec<String>> {
        self.query_cache
            .get_or_init(|| parse_query_string(self.query_string.as_deref()))
    }

    /// The request body as bytes
    #[must_use]
    pub fn body_bytes(&self) -> Option<&[u8]> {
        self.body.as_ref().map(AsRef::as_ref)
    }

    /// The request body as UTF-8 text
    #[must_use]
    pub fn body_str(&self) -> Option<&str> {
        self.body_bytes().and_then(|b| std::str::from_utf8(b).ok())
    }
}

/// Parse a query string, preserving repeated keys
fn parse_query_string(query: Option<&str>) -> HashMap<String, Vec<String>> {
    let mut out: HashMap<String, Vec<String>> = HashMap::new();
    let Some(query) = query else {
        return out;
    };
    for pair in query.split('&') {
        if pair.is_empty() {
            continue;
        }
        let (key, value) = match pair.split_once('=') {
            Some((k, v)) => (k, v),
            None => (pair, ""),
        };
        out.entry(url_decode(key)).or_default().push(url_decode(value));
    }
    out
}

/// Basic URL decoding: `+` to space and `%XX` escapes
fn url_decode(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '+' => result.push(' '),
            '%' => {
                let hex: String = chars.by_ref().take(2).collect();
                if hex.len() == 2 {
                    if let Ok(byte) = u8::from_str_radix(&hex, 16) {
                        result.push(byte as char);
                    } else {
                        result.push('%');
                        result.push_str(&hex);
                    }
                } else {
                    result.push('%');
                    result.push_str(&hex);
                }
            }
            _ => result.push(c),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_splits_query() {
        let req = Request::new("GET", "/search?q=routing&page=2");
        assert_eq!(req.path, "/search");
        assert_eq!(req.query_string(), Some("q=routing&page=2"));
        assert_eq!(req.query("q"), Some("routing"));
        assert_eq!(req.query("page"), Some("2"));
        assert_eq!(req.query("missing"), None);
    }

    #[test]
    fn test_query_array_preserves_repeats() {
        let req = Request::new("GET", "/list?tag=a&tag=b&tag=c");
        assert_eq!(req.query_array("tag"), ["a", "b", "c"]);
        assert_eq!(req.query("tag"), Some("a"));
        assert!(req.query_array("none").is_empty());
    }

    #[test]
    fn test_query_decoding() {
        let req = Request::new("GET", "/q?name=John+Doe&city=New%20York&pct=100%25");
        assert_eq!(req.query("name"), Some("John Doe"));
        assert_eq!(req.query("city"), Some("New York"));
        assert_eq!(req.query("pct"), Some("100%"));
    }

    #[test]
    fn test_headers_round_trip() {
        let mut req = Request::new("GET", "/");
        req.set_header("X-Request-Id", "abc-1");
        assert_eq!(req.header("x-request-id"), Some("abc-1"));
        assert_eq!(req.header("absent"), None);
    }

    #[test]
    fn test_body_accessors() {
        let req = Request::new("POST", "/submit").with_body("hello");
        assert_eq!(req.body_bytes(), Some(b"hello".as_ref()));
        assert_eq!(req.body_str(), Some("hello"));

        let req = Request::new("GET", "/");
        assert!(req.body_bytes().is_none());
    }

    #[test]
    fn test_url_decode() {
        assert_eq!(url_decode("hello+world"), "hello world");
        assert_eq!(url_decode("hello%20world"), "hello world");
        assert_eq!(url_decode("100%25"), "100%");
        assert_eq!(url_decode("trailing%2"), "trailing%2");
    }
}
