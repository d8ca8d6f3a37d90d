//! HTTP Request types

use std::collections::HashMap;

use bytes::Bytes;
use smallvec::SmallVec;
use trellis_router::Method;

use crate::{Error, Result};

/// HTTP Request, as handed over by the transport
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP method
    pub method: Method,
    /// Request path (without query string)
    pub path: String,
    /// Query string (without leading ?)
    pub query: Option<String>,
    /// Request headers (stack-allocated for small header counts)
    pub headers: SmallVec<[(String, String); 16]>,
    /// Request body
    pub body: Bytes,
}

impl Request {
    /// Create a new request
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            headers: SmallVec::new(),
            body: Bytes::new(),
        }
    }

    /// Get a header value (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Get content-type header
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// First value of a query string key, decoded
    pub fn query_param(&self, key: &str) -> Option<String> {
        self.query_pairs()
            .find(|(k, _)| urlencoding_decode(k) == key)
            .map(|(_, v)| urlencoding_decode(v))
    }

    /// Parse query string into key-value pairs; later keys win
    pub fn query_params(&self) -> HashMap<String, String> {
        self.query_pairs()
            .map(|(k, v)| (urlencoding_decode(k), urlencoding_decode(v)))
            .collect()
    }

    fn query_pairs(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.query
            .as_deref()
            .unwrap_or_default()
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
    }
}

/// Builder for constructing requests
pub struct RequestBuilder {
    request: Request,
}

impl RequestBuilder {
    /// Create a new builder
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            request: Request::new(method, path),
        }
    }

    /// Set query string
    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.request.query = Some(query.into());
        self
    }

    /// Add a header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request.headers.push((name.into(), value.into()));
        self
    }

    /// Set body
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.request.body = body.into();
        self
    }

    /// Build the request
    pub fn build(self) -> Request {
        self.request
    }
}

/// Percent-decode a request path one segment at a time, e.g.
/// `/user/John%20Doe` to `/user/John Doe`.
///
/// `+` is kept as is. Malformed escapes, escapes that do not form UTF-8 and
/// escaped `/` are rejected, so segment boundaries are the ones sent.
pub fn decode_path(path: &str) -> Result<String> {
    if !path.contains('%') {
        return Ok(path.to_string());
    }
    let invalid = || Error::InvalidPath(path.to_string());

    let mut decoded = String::with_capacity(path.len());
    for (i, segment) in path.split('/').enumerate() {
        if i > 0 {
            decoded.push('/');
        }
        let segment = percent_decode(segment).ok_or_else(invalid)?;
        if segment.contains('/') {
            return Err(invalid());
        }
        decoded.push_str(&segment);
    }
    Ok(decoded)
}

/// Strict percent decoding; `None` on a bad escape or invalid UTF-8
fn percent_decode(s: &str) -> Option<String> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            out.push(hex_byte(bytes, i + 1)?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

/// Byte encoded by the two hex digits at `at`
fn hex_byte(bytes: &[u8], at: usize) -> Option<u8> {
    let digit = |b: u8| (b as char).to_digit(16);
    let hi = digit(*bytes.get(at)?)?;
    let lo = digit(*bytes.get(at + 1)?)?;
    u8::try_from(hi * 16 + lo).ok()
}

/// Percent and `+` decoding for query components
fn urlencoding_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                if let Some(byte) = hex_byte(bytes, i + 1) {
                    out.push(byte);
                    i += 3;
                    continue;
                }
                out.push(b'%');
            }
            b'+' => out.push(b' '),
            b => out.push(b),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
