//! Named constraints for route variables
//!
//! A constraint looks at the text a variable could capture and reports how
//! much of it (a leading prefix, in bytes) it accepts. Returning `None` or
//! `Some(0)` means no match.
//!
//! ## Built-ins
//! - `any` - the whole candidate, if its length is within bounds
//! - `word` - leading run of `[A-Za-z0-9_]`
//! - `int` - leading run of ASCII digits
//! - `enum` - first `|`-separated literal of the setting that prefixes the candidate
//! - `uuid` - a 36 character hyphenated UUID

use std::collections::HashMap;
use std::fmt;

use crate::ConstraintError;

/// Length used when a variable has no explicit bound.
pub const DEFAULT_MAX_LEN: usize = 255;
pub const DEFAULT_MIN_LEN: usize = 1;

/// Constraint applied to variables declared without one
pub const DEFAULT_CONSTRAINT: &str = "any";

/// Options a variable passes to its constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Bounds {
    pub min_len: usize,
    pub max_len: usize,
    /// Free-form setting, e.g. the value list of `enum(a|b)`
    pub setting: String,
}

impl Bounds {
    pub fn exact(len: usize) -> Self {
        Self {
            min_len: len,
            max_len: len,
            setting: String::new(),
        }
    }

    /// Length range; the ends may be given in either order
    pub fn range(a: usize, b: usize) -> Self {
        Self {
            min_len: a.min(b),
            max_len: a.max(b),
            setting: String::new(),
        }
    }

    pub fn with_setting(setting: impl Into<String>) -> Self {
        Self {
            setting: setting.into(),
            ..Self::default()
        }
    }

    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    #[inline]
    fn admits(&self, len: usize) -> bool {
        len >= self.min_len && len <= self.max_len
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            min_len: DEFAULT_MIN_LEN,
            max_len: DEFAULT_MAX_LEN,
            setting: String::new(),
        }
    }
}

/// A route variable constraint.
pub trait Constraint: Send + Sync {
    /// Length in bytes of the accepted prefix of `candidate`
    fn find_match(&self, candidate: &str, bounds: &Bounds) -> Option<usize>;
}

impl<F> Constraint for F
where
    F: Fn(&str, &Bounds) -> Option<usize> + Send + Sync,
{
    fn find_match(&self, candidate: &str, bounds: &Bounds) -> Option<usize> {
        self(candidate, bounds)
    }
}

/// Name to constraint table.
pub struct ConstraintRegistry {
    constraints: HashMap<String, Box<dyn Constraint>>,
}

impl ConstraintRegistry {
    /// Registry with the built-in constraints
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.insert_builtin("any", any);
        registry.insert_builtin("word", word);
        registry.insert_builtin("int", int);
        registry.insert_builtin("enum", enumeration);
        registry.insert_builtin("uuid", uuid);
        registry
    }

    /// Registry without any constraint
    pub fn empty() -> Self {
        Self {
            constraints: HashMap::new(),
        }
    }

    fn insert_builtin<C: Constraint + 'static>(&mut self, name: &str, constraint: C) {
        self.constraints.insert(name.to_string(), Box::new(constraint));
    }

    /// Register a constraint under `name`
    ///
    /// Names follow `[A-Za-z_][A-Za-z0-9_]*` and cannot be registered twice.
    pub fn register<C>(&mut self, name: &str, constraint: C) -> Result<(), ConstraintError>
    where
        C: Constraint + 'static,
    {
        if !is_constraint_name(name) {
            return Err(ConstraintError::InvalidName(name.to_string()));
        }
        if self.constraints.contains_key(name) {
            return Err(ConstraintError::Duplicate(name.to_string()));
        }
        tracing::debug!(constraint = name, "registered route constraint");
        self.constraints.insert(name.to_string(), Box::new(constraint));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&dyn Constraint> {
        self.constraints.get(name).map(|c| c.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constraints.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.constraints.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for ConstraintRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ConstraintRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstraintRegistry")
            .field("constraints", &self.names())
            .finish()
    }
}

pub(crate) fn is_constraint_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[inline]
fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Accepts the whole candidate when its length is within bounds
pub fn any(candidate: &str, bounds: &Bounds) -> Option<usize> {
    let len = candidate.len();
    (len > 0 && bounds.admits(len)).then_some(len)
}

/// Longest leading run of word characters, capped at `max_len`
pub fn word(candidate: &str, bounds: &Bounds) -> Option<usize> {
    leading_run(candidate, bounds, is_word_byte)
}

/// Longest leading run of decimal digits, capped at `max_len`
pub fn int(candidate: &str, bounds: &Bounds) -> Option<usize> {
    leading_run(candidate, bounds, |b| b.is_ascii_digit())
}

fn leading_run(candidate: &str, bounds: &Bounds, accept: impl Fn(u8) -> bool) -> Option<usize> {
    let len = candidate
        .bytes()
        .take(bounds.max_len)
        .take_while(|&b| accept(b))
        .count();
    (len > 0 && len >= bounds.min_len).then_some(len)
}

/// First literal of the `|`-delimited setting that prefixes the candidate
pub fn enumeration(candidate: &str, bounds: &Bounds) -> Option<usize> {
    bounds
        .setting
        .split('|')
        .find(|value| !value.is_empty() && candidate.starts_with(value))
        .map(str::len)
}

/// A hyphenated 8-4-4-4-12 hex UUID at the start of the candidate
pub fn uuid(candidate: &str, _bounds: &Bounds) -> Option<usize> {
    const LEN: usize = 36;
    let head = candidate.get(..LEN)?;
    ::uuid::Uuid::try_parse(head).ok().map(|_| LEN)
}
