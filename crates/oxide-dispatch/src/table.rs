//! Per-method route storage.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::request::Method;
use crate::trie::{Match, PathTrie};

/// A registered route, as listed by [`RouteTable::routes`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
    /// HTTP method.
    pub method: Method,
    /// Full pattern, group prefixes included.
    pub pattern: String,
}

/// One [`PathTrie`] per HTTP method.
#[derive(Debug)]
pub struct RouteTable<T> {
    tries: HashMap<Method, PathTrie<T>>,
    log_routes: bool,
}

impl<T> Default for RouteTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RouteTable<T> {
    /// Creates an empty table that logs each registration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tries: HashMap::new(),
            log_routes: true,
        }
    }

    /// Enables or disables the registration log line.
    pub fn set_log_routes(&mut self, enabled: bool) {
        self.log_routes = enabled;
    }

    /// Registers `value` under `method` and `pattern`. A previous route with
    /// the same method and pattern is replaced.
    pub fn register(&mut self, method: Method, pattern: &str, value: T) {
        if self.log_routes {
            info!("Route {:>7} - {}", method, pattern);
        }
        let replaced = self
            .tries
            .entry(method)
            .or_default()
            .insert(pattern, value)
            .is_some();
        if replaced {
            debug!(%method, pattern, "route replaced");
        }
    }

    /// Resolves `path` among the routes of `method`.
    #[must_use]
    pub fn resolve(&self, method: Method, path: &str) -> Option<Match<'_, T>> {
        self.tries.get(&method)?.find(path)
    }

    /// Lists every registered route, ordered by method then pattern.
    #[must_use]
    pub fn routes(&self) -> Vec<RouteInfo> {
        let mut methods: Vec<_> = self.tries.keys().copied().collect();
        methods.sort_unstable();
        methods
            .into_iter()
            .flat_map(|method| {
                self.tries[&method]
                    .patterns()
                    .into_iter()
                    .map(move |pattern| RouteInfo {
                        method,
                        pattern: pattern.to_string(),
                    })
            })
            .collect()
    }

    /// Total number of routes across all methods.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tries.values().map(PathTrie::len).sum()
    }

    /// Returns true when no route is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_per_method() {
        let mut table = RouteTable::new();
        table.register(Method::Get, "/users/:id", "get");
        table.register(Method::Delete, "/users/:id", "delete");

        let m = table.resolve(Method::Get, "/users/9").unwrap();
        assert_eq!(m.value, &"get");
        assert_eq!(m.params.get("id"), Some("9"));
        assert_eq!(table.resolve(Method::Delete, "/users/9").unwrap().value, &"delete");
    }

    #[test]
    fn test_unregistered_method_is_no_match() {
        let mut table = RouteTable::new();
        table.register(Method::Get, "/", "root");
        assert!(table.resolve(Method::Post, "/").is_none());
    }

    #[test]
    fn test_routes_listing() {
        let mut table = RouteTable::new();
        table.set_log_routes(false);
        table.register(Method::Post, "/b", 1);
        table.register(Method::Get, "/z", 2);
        table.register(Method::Get, "/a", 3);
        table.register(Method::Get, "/a", 4);

        let routes: Vec<_> = table
            .routes()
            .into_iter()
            .map(|r| format!("{} {}", r.method, r.pattern))
            .collect();
        assert_eq!(routes, vec!["GET /a", "GET /z", "POST /b"]);
        assert_eq!(table.len(), 3);
    }
}
