//! hyper adapter
//!
//! Converts between hyper's request/response types and the core ones, and
//! exposes a locked [`Router`] as a `hyper::service::Service`. Connection
//! handling stays with the embedding application.

use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http::request::Parts;
use http_body_util::{BodyExt, Full};
use hyper::body::Body;
use hyper::service::Service;

use crate::{decode_path, Error, Method, Request, Response, Result, Router, StatusCode};

/// Convert a hyper request, collecting its body
///
/// The path is percent-decoded, so bindings and the `..` check see the
/// decoded text.
pub async fn from_hyper_request<B>(req: hyper::Request<B>) -> Result<Request>
where
    B: Body,
    B::Error: Display,
{
    let (parts, body) = req.into_parts();
    let mut request = request_head(&parts)?;
    request.path = decode_path(&request.path)?;
    request.body = collect_body(body).await?;
    Ok(request)
}

/// Method, raw path, query and headers
fn request_head(parts: &Parts) -> Result<Request> {
    let method: Method = parts.method.as_str().parse()?;

    let mut request = Request::new(method, parts.uri.path());
    request.query = parts.uri.query().map(str::to_string);

    // Copy headers
    for (name, value) in &parts.headers {
        if let Ok(v) = value.to_str() {
            request.headers.push((name.to_string(), v.to_string()));
        }
    }
    Ok(request)
}

async fn collect_body<B>(body: B) -> Result<Bytes>
where
    B: Body,
    B::Error: Display,
{
    Ok(body
        .collect()
        .await
        .map_err(|e| Error::Http(e.to_string()))?
        .to_bytes())
}

/// Convert our Response to hyper Response
pub fn to_hyper_response(res: Response) -> Result<hyper::Response<Full<Bytes>>> {
    let mut builder = hyper::Response::builder().status(res.status.as_u16());

    for (name, value) in &res.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }

    builder
        .body(Full::new(res.body))
        .map_err(|e: http::Error| Error::Http(e.to_string()))
}

/// hyper service dispatching through a shared router.
#[derive(Debug, Clone)]
pub struct RouterService {
    router: Arc<Router>,
}

impl RouterService {
    /// Wrap a router; it is expected to be locked already
    pub fn new(router: Arc<Router>) -> Self {
        if !router.is_locked() {
            tracing::warn!("serving through a router that was never locked");
        }
        Self { router }
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }
}

impl<B> Service<hyper::Request<B>> for RouterService
where
    B: Body + Send + 'static,
    B::Data: Send,
    B::Error: Display,
{
    type Response = hyper::Response<Full<Bytes>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response>> + Send>>;

    fn call(&self, req: hyper::Request<B>) -> Self::Future {
        let router = Arc::clone(&self.router);
        Box::pin(async move {
            let (parts, body) = req.into_parts();
            let mut request = match request_head(&parts) {
                Ok(request) => request,
                Err(Error::InvalidMethod(err)) => {
                    tracing::debug!(error = %err, "malformed request method");
                    let response = Response::text_with_status(StatusCode::NOT_IMPLEMENTED, err.to_string());
                    return to_hyper_response(response);
                }
                Err(err) => return Err(err),
            };

            let response = match decode_path(&request.path) {
                Ok(path) => {
                    request.path = path;
                    request.body = collect_body(body).await?;
                    router.dispatch(request)
                }
                Err(err) => {
                    tracing::warn!(path = %request.path, error = %err, "rejected request path");
                    router.bad_request(&request, &err)
                }
            };
            to_hyper_response(response)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> Arc<Router> {
        let mut router = Router::new();
        router
            .post("/echo/<name>", |ctx| {
                let body = String::from_utf8_lossy(&ctx.request().body).into_owned();
                format!("{}:{}:{}", ctx.route_var("name").unwrap_or_default(), ctx.query_str("x").unwrap_or_default(), body)
            })
            .unwrap();
        router.into_shared()
    }

    fn path_router() -> Arc<Router> {
        let mut router = Router::new();
        router
            .get("/files/*pathInfo", |ctx| ctx.route_var("pathInfo").unwrap_or_default().to_string())
            .unwrap();
        router
            .get("/user/<name>", |ctx| ctx.route_var("name").unwrap_or_default().to_string())
            .unwrap();
        router.any("/dav", |ctx| format!("dav {}", ctx.method())).unwrap();
        router.into_shared()
    }

    fn empty(method: &str, uri: &str) -> hyper::Request<Full<Bytes>> {
        hyper::Request::builder()
            .method(method)
            .uri(uri)
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    async fn body_of(res: hyper::Response<Full<Bytes>>) -> String {
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_from_hyper_request() {
        let req = hyper::Request::builder()
            .method("PUT")
            .uri("/a%20b/c?x=1")
            .header("x-token", "abc")
            .body(Full::new(Bytes::from_static(b"payload")))
            .unwrap();

        let request = from_hyper_request(req).await.unwrap();
        assert_eq!(request.method, Method::Put);
        assert_eq!(request.path, "/a b/c");
        assert_eq!(request.query.as_deref(), Some("x=1"));
        assert_eq!(request.header("X-Token"), Some("abc"));
        assert_eq!(&request.body[..], b"payload");
    }

    #[tokio::test]
    async fn test_service_dispatch() {
        let service = RouterService::new(router());
        let req = hyper::Request::builder()
            .method("POST")
            .uri("/echo/ann?x=2")
            .body(Full::new(Bytes::from_static(b"hi")))
            .unwrap();

        let res = service.call(req).await.unwrap();
        assert_eq!(res.status(), 200);
        assert_eq!(
            res.headers().get("content-type").unwrap(),
            "text/plain; charset=utf-8"
        );
        assert_eq!(body_of(res).await, "ann:2:hi");
    }

    #[tokio::test]
    async fn test_service_error_statuses() {
        let service = RouterService::new(router());

        let req = hyper::Request::builder()
            .uri("/missing")
            .body(Full::new(Bytes::new()))
            .unwrap();
        assert_eq!(service.call(req).await.unwrap().status(), 404);

        let req = hyper::Request::builder()
            .uri("/echo/ann")
            .body(Full::new(Bytes::new()))
            .unwrap();
        let res = service.call(req).await.unwrap();
        assert_eq!(res.status(), 405);
        assert_eq!(res.headers().get("allow").unwrap(), "POST");

        // unknown method without a `*` entry
        let res = service.call(empty("BREW", "/echo/ann")).await.unwrap();
        assert_eq!(res.status(), 405);
        assert_eq!(res.headers().get("allow").unwrap(), "POST");
    }

    #[tokio::test]
    async fn test_service_decodes_path() {
        let service = RouterService::new(path_router());

        let res = service.call(empty("GET", "/user/John%20Doe")).await.unwrap();
        assert_eq!(res.status(), 200);
        assert_eq!(body_of(res).await, "John Doe");

        let res = service.call(empty("GET", "/files/docs/r%C3%A9sum%C3%A9.txt")).await.unwrap();
        assert_eq!(body_of(res).await, "docs/résumé.txt");
    }

    #[tokio::test]
    async fn test_service_rejects_encoded_traversal() {
        let service = RouterService::new(path_router());
        for uri in [
            "/files/%2e%2e/secret",
            "/files/%2E%2E/secret",
            "/files/.%2e/secret",
            "/files/a%2F..%2Fsecret",
            "/files/%ff",
        ] {
            let res = service.call(empty("GET", uri)).await.unwrap();
            assert_eq!(res.status(), 400, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_service_extension_methods() {
        let service = RouterService::new(path_router());
        for method in ["PROPFIND", "MKCOL", "UNLOCK", "BREW"] {
            let res = service.call(empty(method, "/dav")).await.unwrap();
            assert_eq!(res.status(), 200, "{method}");
            assert_eq!(body_of(res).await, format!("dav {method}"));
        }
    }
}
