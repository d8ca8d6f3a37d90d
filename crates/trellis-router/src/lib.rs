//! trellis-router: Segment Trie HTTP Router
//!
//! Route table used by trellis-core. Patterns are compiled once into a
//! trie of path segments; lookups walk it with backtracking and report
//! the matched method table together with the captured variables.
//!
//! ## Features
//! - Static segments: `/users`, `/api/v1/health`
//! - Variables: `/users/<id>`, several per segment: `/date/<y:int>-<m:int>-<d:int>`
//! - Constraints with length bounds: `<n:int(3)>`, `<n:int(2~4)>`, `<f:enum(json|xml)>`
//! - Defaults: `/page/<n=1>` also answers `/page`
//! - Catch-all: `/files/*pathInfo`, bound to the rest of the path
//! - Pluggable constraints through [`ConstraintRegistry`]
//!
//! ## Path Syntax
//! - `<name>` - any non-empty text within one segment
//! - `<name:ctor>` / `<name:ctor(setting)>` - constrained variable
//! - `<name=default>` / `<name=default:ctor(...)>` - variable with a default
//! - `*pathInfo` - catch-all, last segment only
//!
//! ## Priority
//! 1. Static segment (highest)
//! 2. Constrained variable segment
//! 3. Unconstrained variable segment
//! 4. Catch-all (lowest)
//!
//! ## Example
//! ```
//! use trellis_router::{Method, RouteTrie};
//!
//! let mut trie = RouteTrie::new();
//! trie.insert("/users", Method::Get, 0, None).unwrap();
//! trie.insert("/users/<id:int>", Method::Get, 1, None).unwrap();
//! trie.insert("/files/*pathInfo", Method::Get, 2, None).unwrap();
//!
//! let m = trie.lookup("/users/123").unwrap().unwrap();
//! assert_eq!(m.handler(&Method::Get), Some(&1));
//! assert_eq!(m.get("id"), Some("123"));
//!
//! let m = trie.lookup("/files/css/site.css").unwrap().unwrap();
//! assert_eq!(m.get("pathInfo"), Some("css/site.css"));
//! ```

pub mod constraint;
mod error;
mod method;
mod path;
pub mod pattern;
mod trie;

pub use constraint::{Bounds, Constraint, ConstraintRegistry};
pub use error::{ConstraintError, InsertError, InvalidMethod, LookupError, PatternError};
pub use method::{Method, MethodKey};
pub use pattern::{Pattern, Segment, Token, Variable, PATH_INFO};
pub use trie::{RouteMatch, RouteTrie};
