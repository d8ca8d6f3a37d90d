//! Error types for trellis-router

use thiserror::Error;

use crate::MethodKey;

/// A route pattern that could not be compiled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    /// The pattern string is empty
    #[error("route pattern is empty")]
    Empty,

    /// Patterns must be absolute
    #[error("route pattern '{0}' must start with '/'")]
    NoLeadingSlash(String),

    /// A `<` was opened while another variable was still open, or never closed
    #[error("route variable opened at {position} has no closing '>'")]
    Unclosed { position: usize },

    /// A `>` without a matching `<`
    #[error("unexpected '>' at {position}: no route variable is open")]
    Unopened { position: usize },

    /// `<>`
    #[error("empty route variable at {position}")]
    EmptyVariable { position: usize },

    /// Variable names start with a letter and contain only word characters;
    /// `pathInfo` is reserved
    #[error("invalid route variable name '{0}'")]
    InvalidName(String),

    /// The same variable name appears twice in one pattern
    #[error("duplicate route variable '{0}'")]
    DuplicateVariable(String),

    #[error("too many route variables: at most {max} are allowed")]
    TooManyVariables { max: usize },

    /// The text after `:` is neither `ctor` nor `ctor(setting)`
    #[error("invalid constraint option '{0}'")]
    InvalidOption(String),

    /// `*pathInfo` followed by more segments
    #[error("'*pathInfo' must be the last segment of route '{0}'")]
    CatchAllNotLast(String),

    /// A `*` anywhere other than the `*pathInfo` token
    #[error("illegal '*' in route segment '{0}'")]
    IllegalWildcard(String),

    #[error("route pattern '{0}' cannot contain '..'")]
    Traversal(String),
}

/// Failure to add a route to the trie.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InsertError {
    #[error(transparent)]
    Pattern(#[from] PatternError),

    /// The pattern already has a handler bound for this method
    #[error("duplicate handler for {method} '{pattern}'")]
    DuplicateRoute { pattern: String, method: MethodKey },

    /// The pattern names a constraint the registry does not know
    #[error("unknown constraint '{name}' in route '{pattern}'")]
    UnknownConstraint { name: String, pattern: String },
}

/// Failure to register a constraint.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstraintError {
    #[error("constraint '{0}' is already registered")]
    Duplicate(String),

    #[error("invalid constraint name '{0}'")]
    InvalidName(String),
}

/// A request path that cannot be looked up.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("the URL path is empty")]
    EmptyPath,

    #[error("invalid URL path '{0}': the path cannot contain '..'")]
    PathTraversal(String),
}

/// An HTTP method token that is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid HTTP method: {0}")]
pub struct InvalidMethod(pub String);
