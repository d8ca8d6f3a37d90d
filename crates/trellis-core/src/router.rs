//! Router: route table, pipeline and dispatcher
//!
//! A router is configured while in [`RouterState::Setup`]; [`Router::lock`]
//! moves it to [`RouterState::Serving`], after which every setup call fails
//! with [`Error::Locked`]. Dispatch only needs `&self`, so a locked router
//! is shared between workers behind an `Arc`.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use trellis_router::{Constraint, Method, MethodKey, RouteMatch, RouteTrie};

use crate::area::{normalize_prefix, Area};
use crate::filter::Pipeline;
use crate::handler::{self, ErrorHandlers, Filter, Handler};
use crate::{Context, Error, Request, Responder, Response, Result, RouterConfig};

/// Lifecycle phase of a [`Router`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterState {
    /// Routes, constraints, filters and hijacks may be registered
    Setup,
    /// Read-only; requests are dispatched
    Serving,
}

/// Outcome of resolving a path and method.
pub enum Resolution<'r> {
    Found {
        handler: &'r Handler,
        bindings: HashMap<String, String>,
        area: Option<&'r str>,
    },
    /// The path matched a route without a handler for the method
    MethodNotAllowed { allowed: Vec<Method> },
    NotFound,
}

impl Resolution<'_> {
    pub fn is_found(&self) -> bool {
        matches!(self, Resolution::Found { .. })
    }
}

impl std::fmt::Debug for Resolution<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resolution::Found { bindings, area, .. } => f
                .debug_struct("Found")
                .field("bindings", bindings)
                .field("area", area)
                .finish_non_exhaustive(),
            Resolution::MethodNotAllowed { allowed } => f
                .debug_struct("MethodNotAllowed")
                .field("allowed", allowed)
                .finish(),
            Resolution::NotFound => f.write_str("NotFound"),
        }
    }
}

/// HTTP request router
///
/// # Example
/// ```
/// use trellis_core::{Method, Request, Router, StatusCode};
///
/// let mut router = Router::new();
/// router.get("/users/<id:int>", |ctx| {
///     format!("user {}", ctx.route_var("id").unwrap_or_default())
/// }).unwrap();
/// router.lock();
///
/// let res = router.dispatch(Request::new(Method::Get, "/users/42"));
/// assert_eq!(res.status, StatusCode::OK);
/// assert_eq!(res.body_string().as_deref(), Some("user 42"));
/// ```
pub struct Router {
    trie: RouteTrie<Handler>,
    pipeline: Pipeline,
    errors: ErrorHandlers,
    config: RouterConfig,
    state: RouterState,
    next_ctx_id: AtomicU64,
}

impl Router {
    pub fn new() -> Self {
        Self::with_config(RouterConfig::default())
    }

    pub fn with_config(config: RouterConfig) -> Self {
        Self {
            trie: RouteTrie::new().match_case(config.match_case),
            pipeline: Pipeline::default(),
            errors: ErrorHandlers::default(),
            config,
            state: RouterState::Setup,
            next_ctx_id: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn state(&self) -> RouterState {
        self.state
    }

    pub fn is_locked(&self) -> bool {
        self.state == RouterState::Serving
    }

    /// Number of registered (pattern, method) pairs
    pub fn route_count(&self) -> usize {
        self.trie.len()
    }

    /// Finish setup; the router becomes read-only
    pub fn lock(&mut self) {
        if self.is_locked() {
            return;
        }
        self.state = RouterState::Serving;
        tracing::info!(
            routes = self.trie.len(),
            filters = self.pipeline.filter_count(),
            hijacks = self.pipeline.hijack_count(),
            "router locked"
        );
    }

    /// Lock and wrap for sharing between workers
    pub fn into_shared(mut self) -> Arc<Self> {
        self.lock();
        Arc::new(self)
    }

    fn ensure_setup(&self) -> Result<()> {
        match self.state {
            RouterState::Setup => Ok(()),
            RouterState::Serving => Err(Error::Locked),
        }
    }

    /// Register a named constraint for route variables
    pub fn register_constraint<C>(&mut self, name: &str, constraint: C) -> Result<()>
    where
        C: Constraint + 'static,
    {
        self.ensure_setup()?;
        self.trie.register_constraint(name, constraint)?;
        Ok(())
    }

    /// Register a handler for `pattern` and `method`; `MethodKey::Any`
    /// serves every method without a handler of its own
    pub fn route<H, R>(&mut self, pattern: &str, method: impl Into<MethodKey>, handler: H) -> Result<()>
    where
        H: Fn(&mut Context) -> R + Send + Sync + 'static,
        R: Responder,
    {
        self.add_route(pattern, method.into(), handler::handler(handler), None)
    }

    pub(crate) fn add_route(
        &mut self,
        pattern: &str,
        method: MethodKey,
        handler: Handler,
        area: Option<&str>,
    ) -> Result<()> {
        self.ensure_setup()?;
        if pattern.is_empty() {
            return Err(Error::EmptyArgument("pattern"));
        }
        self.trie.insert(pattern, method, handler, area)?;
        Ok(())
    }

    method_routes! {
        get => Method::Get,
        post => Method::Post,
        put => Method::Put,
        delete => Method::Delete,
        patch => Method::Patch,
        head => Method::Head,
        options => Method::Options,
        connect => Method::Connect,
        trace => Method::Trace,
        any => MethodKey::Any,
    }

    /// Scope for routes and filters under `prefix`
    pub fn area(&mut self, prefix: &str) -> Result<Area<'_>> {
        self.ensure_setup()?;
        let prefix = normalize_prefix(prefix).ok_or(Error::EmptyArgument("prefix"))?;
        tracing::debug!(area = %prefix, "opened area");
        Ok(Area::new(self, prefix))
    }

    /// Run `callback` before the handler of matching requests
    ///
    /// With `match_all` the filter covers every path starting with
    /// `prefix`, otherwise only the path equal to it.
    pub fn filter<F>(&mut self, prefix: &str, match_all: bool, callback: F) -> Result<()>
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.add_filter(prefix, match_all, None, Box::new(callback))
    }

    pub(crate) fn add_filter(
        &mut self,
        prefix: &str,
        match_all: bool,
        area: Option<Arc<str>>,
        callback: Box<dyn Filter>,
    ) -> Result<()> {
        self.ensure_setup()?;
        if prefix.is_empty() {
            return Err(Error::EmptyArgument("prefix"));
        }
        self.pipeline.add_filter(prefix, match_all, area, callback);
        Ok(())
    }

    /// Run `callback` for `prefix` and everything below it, ahead of
    /// filters and even when no route matches
    pub fn hijack<F>(&mut self, prefix: &str, callback: F) -> Result<()>
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.ensure_setup()?;
        if prefix.is_empty() {
            return Err(Error::EmptyArgument("prefix"));
        }
        self.pipeline.add_hijack(prefix, Box::new(callback));
        Ok(())
    }

    pub fn set_not_found<F>(&mut self, f: F) -> Result<()>
    where
        F: Fn(&Request) -> Response + Send + Sync + 'static,
    {
        self.ensure_setup()?;
        self.errors.not_found = Box::new(f);
        Ok(())
    }

    pub fn set_bad_request<F>(&mut self, f: F) -> Result<()>
    where
        F: Fn(&Request, &Error) -> Response + Send + Sync + 'static,
    {
        self.ensure_setup()?;
        self.errors.bad_request = Box::new(f);
        Ok(())
    }

    pub fn set_method_not_allowed<F>(&mut self, f: F) -> Result<()>
    where
        F: Fn(&Request, &[Method]) -> Response + Send + Sync + 'static,
    {
        self.ensure_setup()?;
        self.errors.method_not_allowed = Box::new(f);
        Ok(())
    }

    /// Find the handler for a request path and method
    ///
    /// The path is looked up as given. Misses are ordinary outcomes; only
    /// empty paths and `..` segments are errors.
    pub fn resolve(&self, path: &str, method: &Method) -> Result<Resolution<'_>> {
        let Some(found) = self.trie.lookup(path)? else {
            return Ok(Resolution::NotFound);
        };
        match self.select_handler(&found, method) {
            Some((handler, area)) => Ok(Resolution::Found {
                handler,
                bindings: found.bindings,
                area,
            }),
            None => Ok(Resolution::MethodNotAllowed {
                allowed: self.allowed_methods(&found),
            }),
        }
    }

    /// Exact method, then `*`, then `GET` for `HEAD`; the area is the
    /// one of the selected entry
    fn select_handler<'t>(
        &self,
        found: &RouteMatch<'t, Handler>,
        method: &Method,
    ) -> Option<(&'t Handler, Option<&'t str>)> {
        found.select(method).or_else(|| {
            if *method == Method::Head && self.config.head_falls_back_to_get {
                found.entry(&MethodKey::Exact(Method::Get))
            } else {
                None
            }
        })
    }

    fn allowed_methods(&self, found: &RouteMatch<'_, Handler>) -> Vec<Method> {
        let mut allowed: Vec<Method> = found
            .methods()
            .into_iter()
            .filter_map(|key| match key {
                MethodKey::Exact(method) => Some(method),
                MethodKey::Any => None,
            })
            .collect();
        if self.config.head_falls_back_to_get
            && allowed.contains(&Method::Get)
            && !allowed.contains(&Method::Head)
        {
            allowed.push(Method::Head);
            allowed.sort_unstable();
        }
        allowed
    }

    fn lookup_path<'p>(&self, path: &'p str) -> Cow<'p, str> {
        if !self.config.strip_trailing_slash || !path.ends_with('/') {
            return Cow::Borrowed(path);
        }
        match path.trim_end_matches('/') {
            "" => Cow::Borrowed("/"),
            trimmed => Cow::Borrowed(trimmed),
        }
    }

    /// Response of the bad-request handler, for requests rejected before
    /// they reach [`dispatch`](Router::dispatch)
    pub fn bad_request(&self, request: &Request, err: &Error) -> Response {
        (self.errors.bad_request)(request, err)
    }

    /// Handle one request: resolve, run hijacks and filters, call the handler
    pub fn dispatch(&self, request: Request) -> Response {
        let path = self.lookup_path(&request.path).into_owned();
        let resolution = match self.resolve(&path, &request.method) {
            Ok(resolution) => resolution,
            Err(err) => {
                tracing::warn!(path = %request.path, error = %err, "rejected request path");
                return self.bad_request(&request, &err);
            }
        };

        let id = self.next_ctx_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (bindings, area) = match &resolution {
            Resolution::Found { bindings, area, .. } => {
                (bindings.clone(), area.map(str::to_string))
            }
            _ => (HashMap::new(), None),
        };
        let mut ctx = Context::new(id, request, bindings, area);

        if self.pipeline.run_hijacks(&path, &mut ctx) {
            return ended(&mut ctx);
        }

        let handler = match resolution {
            Resolution::Found { handler, .. } => handler,
            Resolution::MethodNotAllowed { allowed } => {
                return (self.errors.method_not_allowed)(ctx.request(), &allowed);
            }
            Resolution::NotFound => return (self.errors.not_found)(ctx.request()),
        };

        if self.pipeline.run_filters(&path, &mut ctx) {
            return ended(&mut ctx);
        }

        let response = handler(&mut ctx);
        if ctx.is_ended() {
            if let Some(response) = ctx.take_response() {
                return response;
            }
        }
        response
    }
}

/// Response of a request ended by a hijack or filter
fn ended(ctx: &mut Context) -> Response {
    ctx.take_response().unwrap_or_default()
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("state", &self.state)
            .field("config", &self.config)
            .field("routes", &self.trie.len())
            .field("filters", &self.pipeline.filter_count())
            .field("hijacks", &self.pipeline.hijack_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RequestBuilder, StatusCode};

    fn get(router: &Router, path: &str) -> Response {
        router.dispatch(Request::new(Method::Get, path))
    }

    fn body(res: &Response) -> String {
        res.body_string().unwrap_or_default()
    }

    #[test]
    fn test_locked_router_rejects_setup() {
        let mut router = Router::new();
        router.get("/a", |_| "a").unwrap();
        assert_eq!(router.state(), RouterState::Setup);
        router.lock();
        assert!(router.is_locked());

        assert!(matches!(router.get("/b", |_| "b"), Err(Error::Locked)));
        assert!(matches!(router.filter("/", true, |_| {}), Err(Error::Locked)));
        assert!(matches!(router.hijack("/", |_| {}), Err(Error::Locked)));
        assert!(matches!(router.area("/admin"), Err(Error::Locked)));
        assert!(matches!(
            router.register_constraint("hex", trellis_router::constraint::any),
            Err(Error::Locked)
        ));
        assert!(matches!(router.set_not_found(|_| Response::not_found()), Err(Error::Locked)));
        assert_eq!(router.route_count(), 1);
    }

    #[test]
    fn test_empty_arguments() {
        let mut router = Router::new();
        assert!(matches!(router.get("", |_| "x"), Err(Error::EmptyArgument("pattern"))));
        assert!(matches!(
            router.filter("", true, |_| {}),
            Err(Error::EmptyArgument("prefix"))
        ));
        assert!(matches!(
            router.hijack("", |_| {}),
            Err(Error::EmptyArgument("prefix"))
        ));
        assert!(matches!(router.area("/"), Err(Error::EmptyArgument("prefix"))));
    }

    #[test]
    fn test_setup_errors_propagate() {
        let mut router = Router::new();
        router.get("/x", |_| "x").unwrap();
        assert!(matches!(router.get("/x", |_| "y"), Err(Error::Insert(_))));
        assert!(matches!(router.get("/<a", |_| "y"), Err(Error::Insert(_))));
        assert!(matches!(
            router.register_constraint("int", trellis_router::constraint::any),
            Err(Error::Constraint(_))
        ));
    }

    #[test]
    fn test_resolve() {
        let mut router = Router::new();
        router.get("/users/<id:int>", |_| "user").unwrap();
        router.post("/users/<id:int>", |_| "update").unwrap();

        match router.resolve("/users/9", &Method::Get).unwrap() {
            Resolution::Found { bindings, area, .. } => {
                assert_eq!(bindings.get("id").map(String::as_str), Some("9"));
                assert_eq!(area, None);
            }
            other => panic!("unexpected {other:?}"),
        }
        match router.resolve("/users/9", &Method::Delete).unwrap() {
            Resolution::MethodNotAllowed { allowed } => {
                assert_eq!(allowed, vec![Method::Get, Method::Post, Method::Head]);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            router.resolve("/users/me", &Method::Get).unwrap(),
            Resolution::NotFound
        ));
        assert!(matches!(
            router.resolve("/users/../etc", &Method::Get),
            Err(Error::Lookup(_))
        ));
    }

    #[test]
    fn test_resolve_reports_area_of_selected_entry() {
        let mut router = Router::new();
        router.post("/admin/users", |_| "plain").unwrap();
        router.area("/admin").unwrap().get("/users", |_| "area").unwrap();
        router.any("/admin/users", |_| "any").unwrap();

        let area_of = |method: Method| match router.resolve("/admin/users", &method).unwrap() {
            Resolution::Found { area, .. } => area.map(str::to_string),
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(area_of(Method::Get).as_deref(), Some("/admin"));
        assert_eq!(area_of(Method::Head).as_deref(), Some("/admin"));
        assert_eq!(area_of(Method::Post), None);
        assert_eq!(area_of(Method::Delete), None);
    }

    #[test]
    fn test_any_fallback() {
        let mut router = Router::new();
        router.get("/r", |_| "get").unwrap();
        router.any("/r", |ctx| format!("any {}", ctx.method())).unwrap();

        assert_eq!(body(&get(&router, "/r")), "get");
        let res = router.dispatch(Request::new(Method::Delete, "/r"));
        assert_eq!(body(&res), "any DELETE");

        for method in ["PROPFIND", "MKCOL", "BREW"] {
            let res = router.dispatch(Request::new(method.parse().unwrap(), "/r"));
            assert_eq!(body(&res), format!("any {method}"));
        }
    }

    #[test]
    fn test_extension_method_without_wildcard() {
        let mut router = Router::new();
        router.get("/dav", |_| "get").unwrap();
        router.route("/dav", Method::Propfind, |_| "props").unwrap();

        let res = router.dispatch(Request::new(Method::Propfind, "/dav"));
        assert_eq!(body(&res), "props");

        let res = router.dispatch(Request::new("BREW".parse().unwrap(), "/dav"));
        assert_eq!(res.status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(res.header("allow"), Some("GET, HEAD, PROPFIND"));
    }

    #[test]
    fn test_head_falls_back_to_get() {
        let mut router = Router::new();
        router.get("/r", |_| "get").unwrap();
        let res = router.dispatch(Request::new(Method::Head, "/r"));
        assert_eq!(res.status, StatusCode::OK);

        let mut strict = Router::with_config(RouterConfig::new().head_falls_back_to_get(false));
        strict.get("/r", |_| "get").unwrap();
        let res = strict.dispatch(Request::new(Method::Head, "/r"));
        assert_eq!(res.status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(res.header("allow"), Some("GET"));
    }

    #[test]
    fn test_trailing_slash() {
        let mut router = Router::new();
        router.get("/", |_| "root").unwrap();
        router.get("/files/*pathInfo", |ctx| ctx.route_var("pathInfo").unwrap_or_default().to_string()).unwrap();

        assert_eq!(body(&get(&router, "///")), "root");
        assert_eq!(body(&get(&router, "/files/a/b/")), "a/b");

        let mut verbatim = Router::with_config(RouterConfig::new().strip_trailing_slash(false));
        verbatim
            .get("/files/*pathInfo", |ctx| ctx.route_var("pathInfo").unwrap_or_default().to_string())
            .unwrap();
        assert_eq!(body(&get(&verbatim, "/files/a/b/")), "a/b/");
    }

    #[test]
    fn test_context_ids_increase() {
        let mut router = Router::new();
        router.get("/id", |ctx| ctx.id().to_string()).unwrap();
        assert_eq!(body(&get(&router, "/id")), "1");
        assert_eq!(body(&get(&router, "/id")), "2");
    }

    #[test]
    fn test_custom_error_handlers() {
        let mut router = Router::new();
        router.post("/only-post", |_| "ok").unwrap();
        router
            .set_not_found(|req| Response::text_with_status(StatusCode::NOT_FOUND, format!("no {}", req.path)))
            .unwrap();
        router
            .set_bad_request(|_, err| Response::text_with_status(StatusCode::BAD_REQUEST, format!("bad: {err}")))
            .unwrap();
        router
            .set_method_not_allowed(|_, allowed| {
                Response::text_with_status(StatusCode::METHOD_NOT_ALLOWED, format!("use {allowed:?}"))
            })
            .unwrap();

        assert_eq!(body(&get(&router, "/nope")), "no /nope");
        assert!(body(&get(&router, "/a/../b")).starts_with("bad: "));
        assert_eq!(body(&get(&router, "/only-post")), "use [Post]");
    }

    #[test]
    fn test_handler_response_overridden_when_ended() {
        let mut router = Router::new();
        router
            .get("/go", |ctx| {
                ctx.redirect("/elsewhere", true);
                "ignored"
            })
            .unwrap();
        let res = get(&router, "/go");
        assert_eq!(res.status, StatusCode::MOVED_PERMANENTLY);
        assert_eq!(res.header("location"), Some("/elsewhere"));
    }

    #[test]
    fn test_query_in_handler() {
        let mut router = Router::new();
        router
            .get("/search", |ctx| ctx.query_str("q").unwrap_or_default())
            .unwrap();
        let res = router.dispatch(RequestBuilder::new(Method::Get, "/search").query("q=rust+trie").build());
        assert_eq!(body(&res), "rust trie");
    }
}
