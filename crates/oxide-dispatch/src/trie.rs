//! Prefix tree holding the routes of one HTTP method.

use std::collections::HashMap;

use tracing::warn;

use crate::path::{split_path, PathPattern, Segment};
use crate::request::PathParams;

/// A route installed on a trie node.
#[derive(Debug)]
struct Endpoint<T> {
    /// The pattern as registered.
    pattern: String,
    /// Parameter and wildcard names, in segment order.
    names: Vec<String>,
    value: T,
}

impl<T> Endpoint<T> {
    /// Returns true when installing `names` here would bind different
    /// parameter names than this endpoint does.
    fn renames(&self, names: &[String]) -> bool {
        self.names != names
    }
}

#[derive(Debug)]
struct Node<T> {
    statics: HashMap<String, Node<T>>,
    param: Option<Box<Node<T>>>,
    wildcard: Option<Box<Node<T>>>,
    endpoint: Option<Endpoint<T>>,
}

impl<T> Node<T> {
    fn new() -> Self {
        Self {
            statics: HashMap::new(),
            param: None,
            wildcard: None,
            endpoint: None,
        }
    }

    /// Depth-first search trying the literal child, then the parameter child,
    /// then the wildcard child. Captured values are pushed onto `captures` and
    /// popped again when a branch fails.
    fn search<'a>(&'a self, segments: &[&str], captures: &mut Vec<String>) -> Option<&'a Endpoint<T>> {
        let Some((first, rest)) = segments.split_first() else {
            return self.endpoint.as_ref();
        };

        if let Some(found) = self
            .statics
            .get(*first)
            .and_then(|child| child.search(rest, captures))
        {
            return Some(found);
        }

        if let Some(child) = self.param.as_deref() {
            if !first.is_empty() {
                captures.push((*first).to_string());
                if let Some(found) = child.search(rest, captures) {
                    return Some(found);
                }
                captures.pop();
            }
        }

        if let Some(endpoint) = self.wildcard.as_deref().and_then(|w| w.endpoint.as_ref()) {
            let remainder = segments.join("/");
            if !remainder.is_empty() {
                captures.push(remainder);
                return Some(endpoint);
            }
        }

        None
    }

    fn collect<'a>(&'a self, out: &mut Vec<&'a str>) {
        if let Some(endpoint) = &self.endpoint {
            out.push(&endpoint.pattern);
        }
        for child in self.statics.values() {
            child.collect(out);
        }
        if let Some(child) = &self.param {
            child.collect(out);
        }
        if let Some(child) = &self.wildcard {
            child.collect(out);
        }
    }
}

/// A successful lookup.
#[derive(Debug)]
pub struct Match<'a, T> {
    /// The value installed for the route.
    pub value: &'a T,
    /// The pattern the route was registered with.
    pub pattern: &'a str,
    /// Bound parameter and wildcard values.
    pub params: PathParams,
}

/// Routes of one HTTP method, keyed by pattern.
///
/// At any node a literal segment outranks a parameter, which outranks a
/// wildcard. A lookup only succeeds on a node that has a route installed.
#[derive(Debug)]
pub struct PathTrie<T> {
    root: Node<T>,
    len: usize,
}

impl<T> Default for PathTrie<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PathTrie<T> {
    /// Creates an empty trie.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: Node::new(),
            len: 0,
        }
    }

    /// Installs `value` under `pattern`, returning the value it replaced.
    ///
    /// Patterns that decompose to the same shape share one node, so
    /// re-registering `/user/:id` as `/user/:name` replaces the earlier route
    /// and the later parameter name is the one bound.
    pub fn insert(&mut self, pattern: &str, value: T) -> Option<T> {
        let parsed = PathPattern::parse(pattern);
        if parsed.is_truncated() {
            warn!(pattern, "segments after the wildcard are ignored");
        }

        let mut node = &mut self.root;
        for segment in parsed.segments() {
            node = match segment {
                Segment::Static(part) => node.statics.entry(part.clone()).or_insert_with(Node::new),
                Segment::Param(_) => &mut **node.param.get_or_insert_with(|| Box::new(Node::new())),
                Segment::Wildcard(_) => {
                    &mut **node.wildcard.get_or_insert_with(|| Box::new(Node::new()))
                }
            };
        }

        let names: Vec<String> = parsed.param_names().map(str::to_string).collect();
        if let Some(previous) = node.endpoint.as_ref().filter(|old| old.renames(&names)) {
            warn!(pattern, previous = %previous.pattern, "parameter renamed");
        }
        let endpoint = Endpoint {
            pattern: pattern.to_string(),
            names,
            value,
        };
        let replaced = node.endpoint.replace(endpoint).map(|old| old.value);
        if replaced.is_none() {
            self.len += 1;
        }
        replaced
    }

    /// Resolves a concrete path.
    #[must_use]
    pub fn find(&self, path: &str) -> Option<Match<'_, T>> {
        let segments = split_path(path);
        let mut captures = Vec::with_capacity(segments.len());
        let endpoint = self.root.search(&segments, &mut captures)?;

        let mut params = PathParams::new();
        for (name, value) in endpoint.names.iter().zip(captures) {
            params.insert(name.clone(), value);
        }

        Some(Match {
            value: &endpoint.value,
            pattern: &endpoint.pattern,
            params,
        })
    }

    /// Returns the registered patterns, sorted.
    #[must_use]
    pub fn patterns(&self) -> Vec<&str> {
        let mut out = Vec::with_capacity(self.len);
        self.root.collect(&mut out);
        out.sort_unstable();
        out
    }

    /// Number of installed routes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns true when no route is installed.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}
