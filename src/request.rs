//! Incoming HTTP request type.

use bytes::Bytes;
use http::HeaderMap;

use crate::method::Method;

/// An incoming HTTP request with its body fully read.
pub struct Request {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) query: Option<String>,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: Bytes,
}

impl Request {
    pub(crate) fn new(
        method: Method,
        uri: &http::Uri,
        headers: &HeaderMap,
        body: Bytes,
    ) -> Self {
        let headers: Vec<(String, String)> = headers
            .iter()
            .filter_map(|(k, v)| Some((k.as_str().to_owned(), v.to_str().ok()?.to_owned())))
            .collect();

        let mut req = Self {
            method,
            path: uri.path().to_owned(),
            query: uri.query().map(str::to_owned),
            headers,
            body: Bytes::new(),
        };
        req.body = body.slice(..req.content_length().min(body.len()));
        req
    }

    pub fn method(&self) -> Method { self.method }
    /// The raw path, still percent-encoded, without the query component.
    pub fn path(&self) -> &str { &self.path }
    pub fn query(&self) -> Option<&str> { self.query.as_deref() }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body(&self) -> &Bytes { &self.body }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Declared `Content-Length`, or 0 when the header is absent.
    ///
    /// hyper answers a malformed `Content-Length` with `400` before a
    /// `Request` is ever built, so only well-formed values reach this point.
    pub fn content_length(&self) -> usize {
        self.header("content-length")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0)
    }
}
