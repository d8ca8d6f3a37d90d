//! trellis-core: request dispatch on top of trellis-router
//!
//! A [`Router`] owns the route trie, the hijack/filter pipeline and the
//! error responses. It is configured during setup, locked, and then shared
//! read-only by any number of workers calling [`Router::dispatch`].
//!
//! ## Features
//! - `native` - hyper adapter: request/response conversion and a
//!   `hyper::service::Service` over a shared router
//!
//! ## Dispatch order
//! 1. Resolve the path (a `..` segment is a 400)
//! 2. Hijacks matching the path
//! 3. 404 / 405 when no handler was found
//! 4. Filters matching the path (area filters: routes of their area only)
//! 5. The route handler
//!
//! Any hijack, filter or handler may end the request through
//! [`Context::end`]; the remaining stages are skipped.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

/// Per-method registration helpers, forwarding to `route`
macro_rules! method_routes {
    ($($name:ident => $method:expr),* $(,)?) => {
        $(
            #[doc = concat!("Register a `", stringify!($name), "` route")]
            pub fn $name<H, R>(&mut self, pattern: &str, handler: H) -> $crate::Result<()>
            where
                H: Fn(&mut $crate::Context) -> R + Send + Sync + 'static,
                R: $crate::Responder,
            {
                self.route(pattern, $method, handler)
            }
        )*
    };
}

pub mod area;
pub mod config;
pub mod context;
pub mod error;
mod filter;
pub mod handler;
pub mod request;
pub mod response;
pub mod router;

#[cfg(feature = "native")]
pub mod service;

// Re-exports
pub use area::Area;
pub use config::RouterConfig;
pub use context::Context;
pub use error::{Error, Result};
pub use handler::{Filter, Handler};
pub use request::{decode_path, Request, RequestBuilder};
pub use response::{Redirect, Responder, Response, ResponseBuilder, StatusCode};
pub use router::{Resolution, Router, RouterState};

// Router crate re-exports
pub use trellis_router::{Bounds, Constraint, Method, MethodKey, PATH_INFO};

#[cfg(feature = "native")]
pub use service::{from_hyper_request, to_hyper_response, RouterService};
