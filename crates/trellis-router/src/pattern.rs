//! Route pattern compiler
//!
//! Turns a pattern such as `/blog/<year:int(4)>-<month:int(2)>/<slug=index>`
//! into one [`Segment`] per `/`-delimited unit.
//!
//! ## Variable syntax
//! - `<name>` - any non-empty text
//! - `<name:ctor>` - text accepted by the `ctor` constraint
//! - `<name:ctor(3)>` - exactly 3 bytes
//! - `<name:ctor(2~4)>` - 2 to 4 bytes
//! - `<name:ctor(a|b)>` - free-form setting handed to the constraint
//! - `<name=value>` / `<name=value:ctor>` - default used when the text is absent
//! - `*pathInfo` - rest of the path, only as the last segment

use std::fmt;
use std::str::FromStr;

use crate::constraint::{is_constraint_name, Bounds, DEFAULT_CONSTRAINT};
use crate::path::split_segments;
use crate::PatternError;

/// Binding name of the catch-all capture
pub const PATH_INFO: &str = "pathInfo";

/// The catch-all segment token
pub const CATCH_ALL_TOKEN: &str = "*pathInfo";

pub const MAX_VARIABLES: usize = 255;

/// A variable slot inside a segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Variable {
    pub name: String,
    pub constraint: String,
    pub bounds: Bounds,
    pub default: Option<String>,
}

impl Variable {
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    fn is_unconstrained(&self) -> bool {
        self.constraint == DEFAULT_CONSTRAINT && self.bounds.is_default()
    }
}

/// Part of a variable segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Token {
    Literal(String),
    Variable(Variable),
}

/// One compiled `/`-delimited unit of a pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Static(String),
    /// Literals and variables, in order, e.g. `<year>-<month>`
    Variable(Vec<Token>),
    CatchAll,
}

impl Segment {
    /// Variable slots of this segment, in order
    pub fn variables(&self) -> impl Iterator<Item = &Variable> + '_ {
        let tokens: &[Token] = match self {
            Segment::Variable(tokens) => tokens,
            _ => &[],
        };
        tokens.iter().filter_map(|token| match token {
            Token::Variable(variable) => Some(variable),
            Token::Literal(_) => None,
        })
    }

    /// A segment that may be left out of the URL: only variables, all with defaults
    pub fn is_optional(&self) -> bool {
        match self {
            Segment::Variable(tokens) => {
                !tokens.is_empty()
                    && tokens
                        .iter()
                        .all(|t| matches!(t, Token::Variable(v) if v.has_default()))
            }
            _ => false,
        }
    }

    /// Sibling order in the trie; lower is tried first
    pub(crate) fn precedence(&self) -> u8 {
        match self {
            Segment::Static(_) => 0,
            Segment::Variable(tokens) => {
                let specific = tokens.iter().any(|token| match token {
                    Token::Literal(_) => true,
                    Token::Variable(v) => !v.is_unconstrained(),
                });
                if specific {
                    1
                } else {
                    2
                }
            }
            Segment::CatchAll => 3,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Static(literal) => f.write_str(literal),
            Segment::CatchAll => f.write_str(CATCH_ALL_TOKEN),
            Segment::Variable(tokens) => {
                for token in tokens {
                    match token {
                        Token::Literal(literal) => f.write_str(literal)?,
                        Token::Variable(v) => write!(f, "<{}>", v.name)?,
                    }
                }
                Ok(())
            }
        }
    }
}

/// A compiled route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    raw: String,
    segments: Vec<Segment>,
}

impl Pattern {
    pub fn parse(raw: &str) -> Result<Self, PatternError> {
        if raw.is_empty() {
            return Err(PatternError::Empty);
        }
        if !raw.starts_with('/') {
            return Err(PatternError::NoLeadingSlash(raw.to_string()));
        }
        check_variables(raw)?;

        let parts =
            split_segments(raw).map_err(|_| PatternError::Traversal(raw.to_string()))?;
        let last = parts.len().saturating_sub(1);
        let segments = parts
            .iter()
            .enumerate()
            .map(|(i, part)| parse_segment(part, raw, i == last))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// `/` and equivalents bind on the trie root
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn variables(&self) -> impl Iterator<Item = &Variable> + '_ {
        self.segments.iter().flat_map(Segment::variables)
    }
}

impl FromStr for Pattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Pattern::parse(s)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// `pathInfo` is reserved for the catch-all capture
fn is_variable_name(name: &str) -> bool {
    if name == PATH_INFO {
        return false;
    }
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// `name` out of `name=default:ctor(setting)`
fn variable_name(body: &str) -> &str {
    let head = body.split_once(':').map_or(body, |(head, _)| head);
    head.split_once('=').map_or(head, |(name, _)| name)
}

/// Bracket balance, names and the variable count, over the whole pattern.
fn check_variables(raw: &str) -> Result<(), PatternError> {
    let mut names: Vec<&str> = Vec::new();
    let mut open: Option<usize> = None;

    for (i, c) in raw.char_indices() {
        match c {
            '<' | '/' => {
                if let Some(start) = open {
                    return Err(PatternError::Unclosed { position: start });
                }
                if c == '<' {
                    open = Some(i);
                }
            }
            '>' => {
                let start = open.take().ok_or(PatternError::Unopened { position: i })?;
                let body = &raw[start + 1..i];
                if body.is_empty() {
                    return Err(PatternError::EmptyVariable { position: start });
                }
                let name = variable_name(body);
                if !is_variable_name(name) {
                    return Err(PatternError::InvalidName(name.to_string()));
                }
                if names.contains(&name) {
                    return Err(PatternError::DuplicateVariable(name.to_string()));
                }
                names.push(name);
            }
            _ => {}
        }
    }

    if let Some(start) = open {
        return Err(PatternError::Unclosed { position: start });
    }
    if names.len() > MAX_VARIABLES {
        return Err(PatternError::TooManyVariables { max: MAX_VARIABLES });
    }
    Ok(())
}

fn parse_segment(part: &str, raw: &str, is_last: bool) -> Result<Segment, PatternError> {
    if part == CATCH_ALL_TOKEN {
        if !is_last {
            return Err(PatternError::CatchAllNotLast(raw.to_string()));
        }
        return Ok(Segment::CatchAll);
    }
    if part.contains('*') {
        return Err(PatternError::IllegalWildcard(part.to_string()));
    }
    if !part.contains('<') {
        return Ok(Segment::Static(part.to_string()));
    }

    // brackets are balanced and never span a '/', see check_variables
    let mut tokens = Vec::new();
    let mut rest = part;
    while let Some(open) = rest.find('<') {
        if open > 0 {
            tokens.push(Token::Literal(rest[..open].to_string()));
        }
        let close = match rest[open..].find('>') {
            Some(offset) => open + offset,
            None => return Err(PatternError::Unclosed { position: open }),
        };
        tokens.push(Token::Variable(parse_variable(&rest[open + 1..close])?));
        rest = &rest[close + 1..];
    }
    if !rest.is_empty() {
        tokens.push(Token::Literal(rest.to_string()));
    }
    Ok(Segment::Variable(tokens))
}

fn parse_variable(body: &str) -> Result<Variable, PatternError> {
    let (head, option) = match body.split_once(':') {
        Some((head, option)) => (head, Some(option)),
        None => (body, None),
    };
    let (name, default) = match head.split_once('=') {
        Some((name, default)) => (name, Some(default.to_string())),
        None => (head, None),
    };
    if !is_variable_name(name) {
        return Err(PatternError::InvalidName(name.to_string()));
    }

    let (constraint, bounds) = match option {
        None | Some("") => (DEFAULT_CONSTRAINT.to_string(), Bounds::default()),
        Some(option) => parse_option(option)?,
    };

    Ok(Variable {
        name: name.to_string(),
        constraint,
        bounds,
        default,
    })
}

/// `ctor` or `ctor(setting)`
fn parse_option(option: &str) -> Result<(String, Bounds), PatternError> {
    if is_constraint_name(option) {
        return Ok((option.to_string(), Bounds::default()));
    }

    let invalid = || PatternError::InvalidOption(option.to_string());
    let (ctor, setting) = option
        .strip_suffix(')')
        .and_then(|inner| inner.split_once('('))
        .ok_or_else(invalid)?;
    if !is_constraint_name(ctor) || setting.is_empty() || setting.contains(['(', ')']) {
        return Err(invalid());
    }

    let bounds = if is_digits(setting) {
        Bounds::exact(setting.parse().map_err(|_| invalid())?)
    } else if let Some((a, b)) = setting
        .split_once('~')
        .filter(|(a, b)| is_digits(a) && is_digits(b))
    {
        let a = a.parse().map_err(|_| invalid())?;
        let b = b.parse().map_err(|_| invalid())?;
        Bounds::range(a, b)
    } else {
        Bounds::with_setting(setting)
    };

    if bounds.max_len == 0 {
        return Err(invalid());
    }
    Ok((ctor.to_string(), bounds))
}
