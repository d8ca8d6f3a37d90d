//! HTTP Response types and the [`Responder`] boundary
//!
//! Handlers may return anything implementing [`Responder`]; the dispatcher
//! turns it into a [`Response`] for the transport to write.

use std::fmt;

use bytes::Bytes;
use smallvec::SmallVec;
use trellis_router::Method;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// HTTP Status Code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusCode(pub u16);

impl StatusCode {
    // 2xx Success
    pub const OK: StatusCode = StatusCode(200);
    pub const CREATED: StatusCode = StatusCode(201);
    pub const NO_CONTENT: StatusCode = StatusCode(204);

    // 3xx Redirection
    pub const MOVED_PERMANENTLY: StatusCode = StatusCode(301);
    pub const FOUND: StatusCode = StatusCode(302);

    // 4xx Client Errors
    pub const BAD_REQUEST: StatusCode = StatusCode(400);
    pub const FORBIDDEN: StatusCode = StatusCode(403);
    pub const NOT_FOUND: StatusCode = StatusCode(404);
    pub const METHOD_NOT_ALLOWED: StatusCode = StatusCode(405);

    // 5xx Server Errors
    pub const INTERNAL_SERVER_ERROR: StatusCode = StatusCode(500);
    pub const NOT_IMPLEMENTED: StatusCode = StatusCode(501);

    /// Get the numeric code
    pub fn as_u16(&self) -> u16 {
        self.0
    }

    /// Get the reason phrase
    pub fn reason_phrase(&self) -> &'static str {
        match self.0 {
            200 => "OK",
            201 => "Created",
            204 => "No Content",
            301 => "Moved Permanently",
            302 => "Found",
            400 => "Bad Request",
            403 => "Forbidden",
            404 => "Not Found",
            405 => "Method Not Allowed",
            500 => "Internal Server Error",
            501 => "Not Implemented",
            _ => "Unknown",
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.0)
    }

    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.0)
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.0)
    }

    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.0)
    }
}

impl From<u16> for StatusCode {
    fn from(code: u16) -> Self {
        StatusCode(code)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.0, self.reason_phrase())
    }
}

/// HTTP Response
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    /// Response headers (stack-allocated for small header counts)
    pub headers: SmallVec<[(String, String); 8]>,
    pub body: Bytes,
}

impl Response {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: SmallVec::new(),
            body: Bytes::new(),
        }
    }

    /// Empty 200 OK
    pub fn ok() -> Self {
        Self::new(StatusCode::OK)
    }

    /// 200 OK with a plain text body
    pub fn text(body: impl Into<Bytes>) -> Self {
        Self::text_with_status(StatusCode::OK, body)
    }

    pub fn text_with_status(status: StatusCode, body: impl Into<Bytes>) -> Self {
        ResponseBuilder::new(status)
            .header("content-type", TEXT_PLAIN)
            .body(body)
            .build()
    }

    /// `301` when permanent, `302` otherwise
    pub fn redirect(location: &str, permanent: bool) -> Self {
        let status = if permanent {
            StatusCode::MOVED_PERMANENTLY
        } else {
            StatusCode::FOUND
        };
        ResponseBuilder::new(status)
            .header("location", location)
            .build()
    }

    pub fn not_found() -> Self {
        Self::text_with_status(StatusCode::NOT_FOUND, "404 page not found")
    }

    pub fn bad_request(message: &str) -> Self {
        Self::text_with_status(StatusCode::BAD_REQUEST, message.to_string())
    }

    /// 405 listing the allowed methods in the `allow` header
    pub fn method_not_allowed(allowed: &[Method]) -> Self {
        let allow = allowed
            .iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        ResponseBuilder::new(StatusCode::METHOD_NOT_ALLOWED)
            .header("allow", allow)
            .header("content-type", TEXT_PLAIN)
            .body("405 method not allowed")
            .build()
    }

    pub fn internal_error(message: &str) -> Self {
        Self::text_with_status(StatusCode::INTERNAL_SERVER_ERROR, message.to_string())
    }

    /// Get a header value (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Get body as string (if UTF-8)
    pub fn body_string(&self) -> Option<String> {
        std::str::from_utf8(&self.body).ok().map(str::to_string)
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::ok()
    }
}

/// Builder for constructing responses
pub struct ResponseBuilder {
    response: Response,
}

impl ResponseBuilder {
    pub fn new(status: StatusCode) -> Self {
        Self {
            response: Response::new(status),
        }
    }

    pub fn status(mut self, status: StatusCode) -> Self {
        self.response.status = status;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.response.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.response.body = body.into();
        self
    }

    pub fn build(self) -> Response {
        self.response
    }
}

/// A redirect result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    location: String,
    permanent: bool,
}

impl Redirect {
    /// `302 Found`
    pub fn to(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            permanent: false,
        }
    }

    /// `301 Moved Permanently`
    pub fn permanent(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            permanent: true,
        }
    }

    pub fn location(&self) -> &str {
        &self.location
    }
}

/// Values a handler can return.
pub trait Responder {
    fn into_response(self) -> Response;
}

impl Responder for Response {
    fn into_response(self) -> Response {
        self
    }
}

impl Responder for String {
    fn into_response(self) -> Response {
        Response::text(self)
    }
}

impl Responder for &'static str {
    fn into_response(self) -> Response {
        Response::text(self)
    }
}

impl Responder for Vec<u8> {
    fn into_response(self) -> Response {
        Response::text(self)
    }
}

impl Responder for Bytes {
    fn into_response(self) -> Response {
        Response::text(self)
    }
}

impl Responder for StatusCode {
    fn into_response(self) -> Response {
        Response::new(self)
    }
}

impl Responder for Redirect {
    fn into_response(self) -> Response {
        Response::redirect(&self.location, self.permanent)
    }
}

impl Responder for () {
    fn into_response(self) -> Response {
        Response::ok()
    }
}

/// `Err` becomes a 500 with the error text as body
impl<R, E> Responder for Result<R, E>
where
    R: Responder,
    E: fmt::Display,
{
    fn into_response(self) -> Response {
        match self {
            Ok(value) => value.into_response(),
            Err(err) => Response::internal_error(&err.to_string()),
        }
    }
}
