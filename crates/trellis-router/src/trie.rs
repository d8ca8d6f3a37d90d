//! Segment trie
//!
//! Every node holds one compiled [`Segment`]; a route is the chain of nodes
//! from the root down to the node carrying its method table. Lookup walks
//! the request path one segment per level and backtracks across siblings.
//!
//! ## Sibling order
//! 1. Static segments
//! 2. Variable segments with a literal or a constraint other than plain `any`
//! 3. Unconstrained variable segments
//! 4. `*pathInfo`
//!
//! Within one class, earlier insertions are tried first.

use std::collections::HashMap;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::constraint::{Constraint, ConstraintRegistry};
use crate::path::split_segments;
use crate::pattern::{Pattern, Segment, Token, Variable, PATH_INFO};
use crate::{ConstraintError, InsertError, LookupError, Method, MethodKey};

/// Reach of a route ending in a catch-all
const UNBOUNDED: usize = usize::MAX;

type Captures = SmallVec<[(String, String); 8]>;

/// One method table entry
#[derive(Debug)]
struct Entry<T> {
    value: T,
    /// Area the entry was registered under
    area: Option<Arc<str>>,
}

#[derive(Debug)]
struct Node<T> {
    /// `None` only at the root
    segment: Option<Segment>,
    /// 1-based position in the pattern
    depth: usize,
    /// Segments the longest route through this node still spans, this one included
    max_depth: usize,
    children: Vec<Node<T>>,
    handlers: HashMap<MethodKey, Entry<T>>,
}

impl<T> Node<T> {
    fn root() -> Self {
        Self {
            segment: None,
            depth: 0,
            max_depth: 0,
            children: Vec::new(),
            handlers: HashMap::new(),
        }
    }

    /// Single-child chain for one route, handler on the last node
    fn chain(
        segments: &[Segment],
        method: MethodKey,
        handler: T,
        area: Option<Arc<str>>,
    ) -> Option<Self> {
        let (last, parents) = segments.split_last()?;
        let unbounded = matches!(last, Segment::CatchAll);
        let reach = |i: usize| {
            if unbounded {
                UNBOUNDED
            } else {
                segments.len() - i
            }
        };

        let mut node = Self {
            segment: Some(last.clone()),
            depth: segments.len(),
            max_depth: reach(segments.len() - 1),
            children: Vec::new(),
            handlers: HashMap::from([(method, Entry { value: handler, area })]),
        };
        for (i, segment) in parents.iter().enumerate().rev() {
            node = Self {
                segment: Some(segment.clone()),
                depth: i + 1,
                max_depth: reach(i),
                children: vec![node],
                handlers: HashMap::new(),
            };
        }
        Some(node)
    }

    fn is_terminal(&self) -> bool {
        !self.handlers.is_empty()
    }

    fn precedence(&self) -> u8 {
        self.segment.as_ref().map_or(0, Segment::precedence)
    }

    fn child(&self, segment: &Segment) -> Option<&Self> {
        self.children
            .iter()
            .find(|child| child.segment.as_ref() == Some(segment))
    }

    fn add_child(&mut self, child: Self) {
        let rank = child.precedence();
        let at = self
            .children
            .iter()
            .position(|c| c.precedence() > rank)
            .unwrap_or(self.children.len());
        self.children.insert(at, child);
    }

    /// Merge a chain into this node's children. Duplicate methods must
    /// have been ruled out beforehand.
    fn merge(&mut self, incoming: Self) {
        let existing = self
            .children
            .iter()
            .position(|child| child.segment == incoming.segment);
        let Some(index) = existing else {
            self.add_child(incoming);
            return;
        };

        let existing = &mut self.children[index];
        existing.max_depth = existing.max_depth.max(incoming.max_depth);
        for (method, entry) in incoming.handlers {
            existing.handlers.entry(method).or_insert(entry);
        }
        for child in incoming.children {
            existing.merge(child);
        }
    }
}

/// Result of a successful lookup.
///
/// Area tags belong to method table entries, so two methods of the same
/// path can report different areas.
#[derive(Debug)]
pub struct RouteMatch<'t, T> {
    table: &'t HashMap<MethodKey, Entry<T>>,
    /// Captured variables, including defaults and `pathInfo`
    pub bindings: HashMap<String, String>,
}

impl<'t, T> RouteMatch<'t, T> {
    /// Handler for `method`, falling back to the `*` entry
    pub fn handler(&self, method: &Method) -> Option<&'t T> {
        self.select(method).map(|(value, _)| value)
    }

    /// Handler and area tag for `method`, falling back to the `*` entry
    pub fn select(&self, method: &Method) -> Option<(&'t T, Option<&'t str>)> {
        self.entry(&MethodKey::Exact(method.clone()))
            .or_else(|| self.entry(&MethodKey::Any))
    }

    /// Handler and area tag stored under exactly `key`
    pub fn entry(&self, key: &MethodKey) -> Option<(&'t T, Option<&'t str>)> {
        self.table
            .get(key)
            .map(|entry| (&entry.value, entry.area.as_deref()))
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.bindings.get(name).map(String::as_str)
    }

    /// Keys of the method table, sorted
    pub fn methods(&self) -> Vec<MethodKey> {
        let mut methods: Vec<MethodKey> = self.table.keys().cloned().collect();
        methods.sort_unstable();
        methods
    }
}

/// Route trie with its constraint registry.
///
/// Built with [`insert`](RouteTrie::insert) during setup, then shared
/// read-only; [`lookup`](RouteTrie::lookup) never mutates it.
#[derive(Debug)]
pub struct RouteTrie<T> {
    root: Node<T>,
    constraints: ConstraintRegistry,
    match_case: bool,
    routes: usize,
}

impl<T> RouteTrie<T> {
    /// Empty trie with the built-in constraints
    ///
    /// Literal matching is case-sensitive except on Windows.
    pub fn new() -> Self {
        Self::with_constraints(ConstraintRegistry::new())
    }

    pub fn with_constraints(constraints: ConstraintRegistry) -> Self {
        Self {
            root: Node::root(),
            constraints,
            match_case: !cfg!(windows),
            routes: 0,
        }
    }

    /// Set case-sensitivity of static segments and literals
    pub fn match_case(mut self, match_case: bool) -> Self {
        self.match_case = match_case;
        self
    }

    pub fn set_match_case(&mut self, match_case: bool) {
        self.match_case = match_case;
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.match_case
    }

    pub fn constraints(&self) -> &ConstraintRegistry {
        &self.constraints
    }

    /// Register a constraint usable by routes inserted afterwards
    pub fn register_constraint<C>(&mut self, name: &str, constraint: C) -> Result<(), ConstraintError>
    where
        C: Constraint + 'static,
    {
        self.constraints.register(name, constraint)
    }

    /// Number of (pattern, method) pairs inserted
    pub fn len(&self) -> usize {
        self.routes
    }

    pub fn is_empty(&self) -> bool {
        self.routes == 0
    }

    /// Insert a route
    ///
    /// # Arguments
    /// * `pattern` - route pattern, see [`Pattern`]
    /// * `method` - method table key; [`MethodKey::Any`] is the `*` fallback
    /// * `handler` - value returned by lookups that land on this route
    /// * `area` - optional namespace tag reported back by lookups
    ///
    /// # Example
    /// ```
    /// use trellis_router::{Method, RouteTrie};
    ///
    /// let mut trie = RouteTrie::new();
    /// trie.insert("/users/<id:int>", Method::Get, "user", None).unwrap();
    ///
    /// let m = trie.lookup("/users/42").unwrap().unwrap();
    /// assert_eq!(m.handler(&Method::Get), Some(&"user"));
    /// assert_eq!(m.get("id"), Some("42"));
    /// ```
    pub fn insert(
        &mut self,
        pattern: &str,
        method: impl Into<MethodKey>,
        handler: T,
        area: Option<&str>,
    ) -> Result<(), InsertError> {
        let method = method.into();
        let compiled = Pattern::parse(pattern)?;

        if let Some(variable) = compiled
            .variables()
            .find(|v| !self.constraints.contains(&v.constraint))
        {
            return Err(InsertError::UnknownConstraint {
                name: variable.constraint.clone(),
                pattern: pattern.to_string(),
            });
        }
        if self.contains(compiled.segments(), &method) {
            return Err(InsertError::DuplicateRoute {
                pattern: pattern.to_string(),
                method,
            });
        }

        tracing::debug!(pattern, method = %method, area = ?area, "inserted route");
        let tag: Option<Arc<str>> = area.map(Arc::from);
        if compiled.is_root() {
            let entry = Entry {
                value: handler,
                area: tag,
            };
            self.root.handlers.insert(method, entry);
        } else if let Some(chain) = Node::chain(compiled.segments(), method, handler, tag) {
            self.root.merge(chain);
        }
        self.routes += 1;
        Ok(())
    }

    fn contains(&self, segments: &[Segment], method: &MethodKey) -> bool {
        let mut node = &self.root;
        for segment in segments {
            match node.child(segment) {
                Some(child) => node = child,
                None => return false,
            }
        }
        node.handlers.contains_key(method)
    }

    /// Find the route matching a request path
    ///
    /// Returns `Ok(None)` when nothing matches; errors only for paths that
    /// are empty or contain a `..` segment.
    pub fn lookup(&self, path: &str) -> Result<Option<RouteMatch<'_, T>>, LookupError> {
        if path.is_empty() {
            return Err(LookupError::EmptyPath);
        }
        let segments =
            split_segments(path).map_err(|_| LookupError::PathTraversal(path.to_string()))?;

        let mut captures = Captures::new();
        let found = if segments.is_empty() {
            if self.root.is_terminal() {
                Some(&self.root)
            } else {
                self.resolve_defaults(&self.root, &mut captures)
            }
        } else {
            let trailing = path.ends_with('/');
            self.root
                .children
                .iter()
                .find_map(|child| self.walk(child, &segments, trailing, &mut captures))
        };

        tracing::trace!(path, matched = found.is_some(), "route lookup");
        Ok(found.map(|node| RouteMatch {
            table: &node.handlers,
            bindings: captures.into_iter().collect(),
        }))
    }

    fn walk<'t>(
        &'t self,
        node: &'t Node<T>,
        segments: &[&str],
        trailing: bool,
        captures: &mut Captures,
    ) -> Option<&'t Node<T>> {
        let depth = node.depth;
        let total = segments.len();
        if depth.saturating_add(node.max_depth) <= total {
            return None;
        }

        let mark = captures.len();
        let current = segments[depth - 1];
        match node.segment.as_ref()? {
            Segment::CatchAll => {
                let mut rest = segments[depth - 1..].join("/");
                if trailing {
                    rest.push('/');
                }
                captures.push((PATH_INFO.to_string(), rest));
                return Some(node);
            }
            Segment::Static(literal) => {
                if !self.literal_eq(literal, current) {
                    return None;
                }
            }
            Segment::Variable(tokens) => {
                if !self.match_tokens(tokens, current, captures) {
                    captures.truncate(mark);
                    return None;
                }
            }
        }

        if depth == total {
            if node.is_terminal() {
                return Some(node);
            }
            if let Some(found) = self.resolve_defaults(node, captures) {
                return Some(found);
            }
        } else {
            for child in &node.children {
                if let Some(found) = self.walk(child, segments, trailing, captures) {
                    return Some(found);
                }
            }
        }

        captures.truncate(mark);
        None
    }

    /// Routes reachable from `node` without consuming another URL segment:
    /// through optional segments (bound to their defaults) or a catch-all
    /// (bound to an empty `pathInfo`).
    fn resolve_defaults<'t>(
        &'t self,
        node: &'t Node<T>,
        captures: &mut Captures,
    ) -> Option<&'t Node<T>> {
        for child in &node.children {
            let Some(segment) = child.segment.as_ref() else {
                continue;
            };
            if matches!(segment, Segment::CatchAll) {
                captures.push((PATH_INFO.to_string(), String::new()));
                return Some(child);
            }
            if !segment.is_optional() {
                continue;
            }

            let mark = captures.len();
            for variable in segment.variables() {
                let value = variable.default.clone().unwrap_or_default();
                captures.push((variable.name.clone(), value));
            }
            if child.is_terminal() {
                return Some(child);
            }
            if let Some(found) = self.resolve_defaults(child, captures) {
                return Some(found);
            }
            captures.truncate(mark);
        }
        None
    }

    /// Match one URL segment against literals and variables.
    ///
    /// Each literal is located at its first occurrence in the unconsumed
    /// text; the text before it feeds the variables queued ahead of it.
    fn match_tokens(&self, tokens: &[Token], segment: &str, captures: &mut Captures) -> bool {
        let mut rest = segment;
        let mut pending: SmallVec<[&Variable; 4]> = SmallVec::new();

        for token in tokens {
            match token {
                Token::Variable(variable) => pending.push(variable),
                Token::Literal(literal) => {
                    let Some(index) = self.find_literal(rest, literal) else {
                        return false;
                    };
                    if pending.is_empty() {
                        if index != 0 {
                            return false;
                        }
                    } else if !self.bind_run(&pending, &rest[..index], captures) {
                        return false;
                    }
                    pending.clear();
                    rest = &rest[index + literal.len()..];
                }
            }
        }

        if pending.is_empty() {
            rest.is_empty()
        } else {
            self.bind_run(&pending, rest, captures)
        }
    }

    /// Feed `text` through consecutive variables, each taking the prefix
    /// its constraint accepts. All of `text` must be consumed.
    fn bind_run(&self, variables: &[&Variable], text: &str, captures: &mut Captures) -> bool {
        let mut text = text;
        for variable in variables {
            if text.is_empty() {
                match &variable.default {
                    Some(default) => {
                        captures.push((variable.name.clone(), default.clone()));
                        continue;
                    }
                    None => return false,
                }
            }

            let Some(constraint) = self.constraints.get(&variable.constraint) else {
                return false;
            };
            let len = match constraint.find_match(text, &variable.bounds) {
                Some(len) if len > 0 && len <= text.len() && text.is_char_boundary(len) => len,
                _ => return false,
            };
            captures.push((variable.name.clone(), text[..len].to_string()));
            text = &text[len..];
        }
        text.is_empty()
    }

    fn literal_eq(&self, literal: &str, text: &str) -> bool {
        if self.match_case {
            literal == text
        } else {
            literal.eq_ignore_ascii_case(text)
        }
    }

    fn find_literal(&self, haystack: &str, needle: &str) -> Option<usize> {
        if self.match_case {
            return haystack.find(needle);
        }
        let (hay, pin) = (haystack.as_bytes(), needle.as_bytes());
        let last = hay.len().checked_sub(pin.len())?;
        (0..=last).find(|&i| {
            haystack.is_char_boundary(i) && hay[i..i + pin.len()].eq_ignore_ascii_case(pin)
        })
    }
}

impl<T> Default for RouteTrie<T> {
    fn default() -> Self {
        Self::new()
    }
}
