//! Incoming HTTP request type.

use bytes::Bytes;
use http::{HeaderMap, Method};

/// An incoming HTTP request with its body already collected.
pub struct Request {
    method: Method,
    path: String,
    headers: HeaderMap,
    body: Bytes,
}

impl Request {
    pub(crate) fn new(method: Method, path: impl Into<String>, headers: HeaderMap, body: Bytes) -> Self {
        Self { method, path: path.into(), headers, body }
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Case-insensitive header lookup. Non-UTF-8 values read as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

#[cfg(test)]
impl Request {
    pub(crate) fn get(path: &str) -> Self {
        Self::new(Method::GET, path, HeaderMap::new(), Bytes::new())
    }
}
