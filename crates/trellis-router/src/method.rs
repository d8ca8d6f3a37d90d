//! HTTP methods and the per-route method table key.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::InvalidMethod;

/// HTTP Method
///
/// The standard and WebDAV verbs have their own variants; any other token
/// is carried as an [`Extension`](Method::Extension). Extension methods only
/// reach a route through an exact entry for the same token or the `*` entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
    Connect,
    Trace,
    // WebDAV
    Propfind,
    Proppatch,
    Mkcol,
    Copy,
    Move,
    Lock,
    Unlock,
    /// Upper-cased token of a method without a variant of its own
    Extension(Arc<str>),
}

impl Method {
    /// The standard methods, in table order
    pub const ALL: [Method; 9] = [
        Method::Get,
        Method::Post,
        Method::Put,
        Method::Delete,
        Method::Patch,
        Method::Head,
        Method::Options,
        Method::Connect,
        Method::Trace,
    ];

    /// Parse a known method from raw request-line bytes (exact, upper case)
    #[inline]
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        match bytes.first()? {
            b'G' if bytes == b"GET" => Some(Method::Get),
            b'P' => match bytes {
                b"POST" => Some(Method::Post),
                b"PUT" => Some(Method::Put),
                b"PATCH" => Some(Method::Patch),
                b"PROPFIND" => Some(Method::Propfind),
                b"PROPPATCH" => Some(Method::Proppatch),
                _ => None,
            },
            b'D' if bytes == b"DELETE" => Some(Method::Delete),
            b'H' if bytes == b"HEAD" => Some(Method::Head),
            b'O' if bytes == b"OPTIONS" => Some(Method::Options),
            b'C' => match bytes {
                b"CONNECT" => Some(Method::Connect),
                b"COPY" => Some(Method::Copy),
                _ => None,
            },
            b'T' if bytes == b"TRACE" => Some(Method::Trace),
            b'M' => match bytes {
                b"MKCOL" => Some(Method::Mkcol),
                b"MOVE" => Some(Method::Move),
                _ => None,
            },
            b'L' if bytes == b"LOCK" => Some(Method::Lock),
            b'U' if bytes == b"UNLOCK" => Some(Method::Unlock),
            _ => None,
        }
    }

    /// Convert to string
    pub fn as_str(&self) -> &str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
            Method::Connect => "CONNECT",
            Method::Trace => "TRACE",
            Method::Propfind => "PROPFIND",
            Method::Proppatch => "PROPPATCH",
            Method::Mkcol => "MKCOL",
            Method::Copy => "COPY",
            Method::Move => "MOVE",
            Method::Lock => "LOCK",
            Method::Unlock => "UNLOCK",
            Method::Extension(token) => token,
        }
    }

    pub fn is_extension(&self) -> bool {
        matches!(self, Method::Extension(_))
    }
}

/// RFC 9110 `tchar`
fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

impl FromStr for Method {
    type Err = InvalidMethod;

    /// Case-insensitive; unknown tokens become [`Method::Extension`]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s == "*" || !s.bytes().all(is_token_byte) {
            return Err(InvalidMethod(s.to_string()));
        }
        let upper = s.to_ascii_uppercase();
        Ok(Method::parse(upper.as_bytes()).unwrap_or_else(|| Method::Extension(Arc::from(upper))))
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key of a route's method table.
///
/// `Any` is the `"*"` wildcard entry, used when the request method has no
/// exact entry of its own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MethodKey {
    Exact(Method),
    Any,
}

impl MethodKey {
    pub fn as_str(&self) -> &str {
        match self {
            MethodKey::Exact(method) => method.as_str(),
            MethodKey::Any => "*",
        }
    }
}

impl From<Method> for MethodKey {
    fn from(method: Method) -> Self {
        MethodKey::Exact(method)
    }
}

impl FromStr for MethodKey {
    type Err = InvalidMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "*" {
            Ok(MethodKey::Any)
        } else {
            s.parse().map(MethodKey::Exact)
        }
    }
}

impl fmt::Display for MethodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
