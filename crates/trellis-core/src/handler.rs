//! Handler and callback types

use std::sync::Arc;

use trellis_router::Method;

use crate::{Context, Error, Request, Responder, Response};

/// Route handler, stored in the trie's method table
pub type Handler = Arc<dyn Fn(&mut Context) -> Response + Send + Sync>;

/// Box a handler returning any [`Responder`]
pub fn handler<H, R>(f: H) -> Handler
where
    H: Fn(&mut Context) -> R + Send + Sync + 'static,
    R: Responder,
{
    Arc::new(move |ctx: &mut Context| f(ctx).into_response())
}

/// Pre-handler callback used by filters and hijacks.
///
/// A callback takes over the request by calling [`Context::end`], usually
/// after [`Context::set_response`] or [`Context::redirect`].
pub trait Filter: Send + Sync {
    fn call(&self, ctx: &mut Context);
}

impl<F> Filter for F
where
    F: Fn(&mut Context) + Send + Sync,
{
    fn call(&self, ctx: &mut Context) {
        self(ctx)
    }
}

/// Builds the 404 response
pub type NotFoundHandler = Box<dyn Fn(&Request) -> Response + Send + Sync>;

/// Builds the 400 response for a path that cannot be looked up
pub type BadRequestHandler = Box<dyn Fn(&Request, &Error) -> Response + Send + Sync>;

/// Builds the 405 response from the methods the path does accept
pub type MethodNotAllowedHandler = Box<dyn Fn(&Request, &[Method]) -> Response + Send + Sync>;

/// The replaceable error responses of a router.
pub(crate) struct ErrorHandlers {
    pub(crate) not_found: NotFoundHandler,
    pub(crate) bad_request: BadRequestHandler,
    pub(crate) method_not_allowed: MethodNotAllowedHandler,
}

impl Default for ErrorHandlers {
    fn default() -> Self {
        Self {
            not_found: Box::new(|_| Response::not_found()),
            bad_request: Box::new(|_, err| Response::bad_request(&err.to_string())),
            method_not_allowed: Box::new(|_, allowed| Response::method_not_allowed(allowed)),
        }
    }
}
