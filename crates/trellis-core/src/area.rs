//! Areas: route namespaces sharing a URL prefix

use std::sync::Arc;

use trellis_router::{Method, MethodKey};

use crate::handler;
use crate::{Context, Error, Responder, Result, Router};

/// Registration scope for routes under a common prefix.
///
/// Routes registered through an area are tagged with it, and the tag is
/// reported by [`Context::area`] for requests they serve. Area filters
/// only run for such requests.
///
/// # Example
/// ```
/// use trellis_core::{Method, Request, Router};
///
/// let mut router = Router::new();
/// let mut admin = router.area("/admin").unwrap();
/// admin.get("/users", |ctx| ctx.area().unwrap_or_default().to_string()).unwrap();
///
/// let res = router.dispatch(Request::new(Method::Get, "/admin/users"));
/// assert_eq!(res.body_string().as_deref(), Some("/admin"));
/// ```
pub struct Area<'r> {
    router: &'r mut Router,
    prefix: Arc<str>,
}

impl<'r> Area<'r> {
    pub(crate) fn new(router: &'r mut Router, prefix: String) -> Self {
        Self {
            router,
            prefix: Arc::from(prefix),
        }
    }

    /// Normalised prefix, e.g. `/admin`
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Register `pattern` below the area prefix
    pub fn route<H, R>(&mut self, pattern: &str, method: impl Into<MethodKey>, handler: H) -> Result<()>
    where
        H: Fn(&mut Context) -> R + Send + Sync + 'static,
        R: Responder,
    {
        let pattern = match pattern.trim_matches('/') {
            "" => self.prefix.to_string(),
            rest => format!("{}/{}", self.prefix, rest),
        };
        self.router.add_route(
            &pattern,
            method.into(),
            handler::handler(handler),
            Some(&*self.prefix),
        )
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

    /// Filter on every path under `prefix` within the area, run only for
    /// routes of this area
    pub fn filter<F>(&mut self, prefix: &str, callback: F) -> Result<()>
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        if prefix.is_empty() {
            return Err(Error::EmptyArgument("prefix"));
        }
        let full = format!("{}/{}", self.prefix, prefix.trim_matches('/'));
        self.router
            .add_filter(&full, true, Some(Arc::clone(&self.prefix)), Box::new(callback))
    }
}

impl std::fmt::Debug for Area<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Area").field("prefix", &self.prefix).finish()
    }
}

/// `admin/`, `/admin` and `//admin//` all become `/admin`; `None` when
/// nothing is left
pub(crate) fn normalize_prefix(prefix: &str) -> Option<String> {
    match prefix.trim_matches('/') {
        "" => None,
        trimmed => Some(format!("/{trimmed}")),
    }
}
