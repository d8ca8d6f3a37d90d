//! Error types for trellis-core

use thiserror::Error;
use trellis_router::{ConstraintError, InsertError, InvalidMethod, LookupError, PatternError};

/// Result type alias for trellis operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for router setup and dispatch
#[derive(Debug, Error)]
pub enum Error {
    /// A route could not be added
    #[error(transparent)]
    Insert(#[from] InsertError),

    /// A constraint could not be registered
    #[error(transparent)]
    Constraint(#[from] ConstraintError),

    /// The request path cannot be looked up
    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    InvalidMethod(#[from] InvalidMethod),

    /// Setup call made after the router started serving
    #[error("the router is locked: routes, constraints, filters and error handlers can only change before serving")]
    Locked,

    /// The request path is not valid percent-encoded UTF-8, or encodes a `/`
    #[error("invalid request path '{0}'")]
    InvalidPath(String),

    /// A required argument was empty
    #[error("the parameter '{0}' cannot be empty")]
    EmptyArgument(&'static str),

    /// Conversion to or from the transport types failed
    #[cfg(feature = "native")]
    #[error("HTTP error: {0}")]
    Http(String),
}

impl From<PatternError> for Error {
    fn from(err: PatternError) -> Self {
        Error::Insert(InsertError::Pattern(err))
    }
}
