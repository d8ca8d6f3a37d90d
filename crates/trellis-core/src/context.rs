//! Per-request context
//!
//! A [`Context`] is created for every dispatched request and dropped when
//! the response is produced. Hijacks, filters and the route handler all
//! receive it mutably, one after another.

use std::any::Any;
use std::collections::HashMap;

use trellis_router::Method;

use crate::{Request, Response};

/// Request-scoped state shared by the pipeline and the handler.
pub struct Context {
    id: u64,
    request: Request,
    bindings: HashMap<String, String>,
    area: Option<String>,
    ended: bool,
    response: Option<Response>,
    items: HashMap<String, Box<dyn Any + Send + Sync>>,
}

impl Context {
    pub fn new(
        id: u64,
        request: Request,
        bindings: HashMap<String, String>,
        area: Option<String>,
    ) -> Self {
        Self {
            id,
            request,
            bindings,
            area,
            ended: false,
            response: None,
            items: HashMap::new(),
        }
    }

    /// Per-router sequence number of this request, starting at 1
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn request_mut(&mut self) -> &mut Request {
        &mut self.request
    }

    pub fn method(&self) -> &Method {
        &self.request.method
    }

    pub fn path(&self) -> &str {
        &self.request.path
    }

    /// Value bound to a route variable, `pathInfo` included
    pub fn route_var(&self, name: &str) -> Option<&str> {
        self.bindings.get(name).map(String::as_str)
    }

    pub fn route_vars(&self) -> &HashMap<String, String> {
        &self.bindings
    }

    /// First query string value for `key`, decoded
    pub fn query_str(&self, key: &str) -> Option<String> {
        self.request.query_param(key)
    }

    /// Prefix of the area the matched route belongs to
    pub fn area(&self) -> Option<&str> {
        self.area.as_deref()
    }

    /// Store a value for later pipeline stages; replaces any previous item
    pub fn set_item<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.items.insert(key.into(), Box::new(value));
    }

    /// Item stored under `key`, if it has type `T`
    pub fn get_item<T: Any + Send + Sync>(&self, key: &str) -> Option<&T> {
        self.items.get(key)?.downcast_ref()
    }

    /// Remove and return the item under `key` if it has type `T`; an item of
    /// another type is left in place
    pub fn remove_item<T: Any + Send + Sync>(&mut self, key: &str) -> Option<T> {
        if !self.items.get(key)?.is::<T>() {
            return None;
        }
        let item = self.items.remove(key)?;
        item.downcast::<T>().ok().map(|boxed| *boxed)
    }

    /// Stop the pipeline: no further hijack, filter or handler runs
    pub fn end(&mut self) {
        self.ended = true;
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// Respond with a redirect and end the request
    pub fn redirect(&mut self, location: &str, permanent: bool) {
        self.response = Some(Response::redirect(location, permanent));
        self.end();
    }

    /// Response to send if the request is ended
    pub fn set_response(&mut self, response: Response) {
        self.response = Some(response);
    }

    pub fn response(&self) -> Option<&Response> {
        self.response.as_ref()
    }

    pub(crate) fn take_response(&mut self) -> Option<Response> {
        self.response.take()
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.id)
            .field("method", &self.request.method)
            .field("path", &self.request.path)
            .field("bindings", &self.bindings)
            .field("area", &self.area)
            .field("ended", &self.ended)
            .field("items", &self.items.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RequestBuilder, StatusCode};

    fn context() -> Context {
        let request = RequestBuilder::new(Method::Get, "/users/7")
            .query("tab=posts")
            .build();
        let bindings = HashMap::from([("id".to_string(), "7".to_string())]);
        Context::new(3, request, bindings, Some("/admin".to_string()))
    }

    #[test]
    fn test_accessors() {
        let ctx = context();
        assert_eq!(ctx.id(), 3);
        assert_eq!(ctx.method(), &Method::Get);
        assert_eq!(ctx.path(), "/users/7");
        assert_eq!(ctx.route_var("id"), Some("7"));
        assert_eq!(ctx.route_var("missing"), None);
        assert_eq!(ctx.query_str("tab").as_deref(), Some("posts"));
        assert_eq!(ctx.area(), Some("/admin"));
    }

    #[test]
    fn test_items() {
        let mut ctx = context();
        ctx.set_item("user", 42u32);
        assert_eq!(ctx.get_item::<u32>("user"), Some(&42));
        assert_eq!(ctx.get_item::<String>("user"), None);

        assert_eq!(ctx.remove_item::<String>("user"), None);
        assert_eq!(ctx.remove_item::<u32>("user"), Some(42));
        assert_eq!(ctx.get_item::<u32>("user"), None);
    }

    #[test]
    fn test_end_and_redirect() {
        let mut ctx = context();
        assert!(!ctx.is_ended());
        ctx.redirect("/login", false);
        assert!(ctx.is_ended());
        assert_eq!(ctx.response().map(|r| r.status), Some(StatusCode::FOUND));
        assert!(ctx.take_response().is_some());
        assert!(ctx.response().is_none());
    }
}
