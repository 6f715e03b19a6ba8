//! Route groups: prefix-scoped namespaces with their own middleware.

use std::sync::Arc;

use crate::context::{Context, Handler};
use crate::engine::Engine;
use crate::request::Method;

/// Stored state of one group. Groups live as long as their engine.
pub(crate) struct GroupState {
    /// Effective prefix, ancestors' prefixes included.
    pub(crate) prefix: String,
    /// Middleware added with [`RouteGroup::middleware`], in order.
    pub(crate) middleware: Vec<Handler>,
    /// Index of the group this one was created from.
    pub(crate) parent: Option<usize>,
}

impl GroupState {
    pub(crate) const fn root() -> Self {
        Self {
            prefix: String::new(),
            middleware: Vec::new(),
            parent: None,
        }
    }
}

/// A handle on one route group of an [`Engine`].
///
/// Routes registered through a group get the group's prefix. Middleware
/// added to a group runs for every request whose path starts with the
/// group's prefix, whether or not a route matched, and before the
/// middleware of groups created later.
///
/// ```
/// use oxide_dispatch::{Engine, Request};
///
/// let mut app = Engine::new();
/// {
///     let mut admin = app.group("/admin");
///     admin.middleware(|c| {
///         if c.header("Authorization").is_none() {
///             c.abort_with_status(401);
///         }
///     });
///     admin.get("/stats", |c| c.string(200, "ok"));
/// }
///
/// assert_eq!(app.handle(Request::get("/admin/stats")).status, 401);
/// ```
pub struct RouteGroup<'a> {
    engine: &'a mut Engine,
    index: usize,
}

impl<'a> RouteGroup<'a> {
    pub(crate) fn new(engine: &'a mut Engine, index: usize) -> Self {
        Self { engine, index }
    }

    fn state(&self) -> &GroupState {
        self.engine.group_state(self.index)
    }

    /// The effective prefix of this group.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.state().prefix
    }

    /// The effective prefix of the group this one was created from.
    #[must_use]
    pub fn parent_prefix(&self) -> Option<&str> {
        let parent = self.state().parent?;
        Some(&self.engine.group_state(parent).prefix)
    }

    /// Creates a nested group under `prefix`, relative to this group.
    pub fn group(&mut self, prefix: &str) -> RouteGroup<'_> {
        let index = self.engine.add_group(self.index, prefix);
        RouteGroup::new(self.engine, index)
    }

    /// Appends middleware to this group.
    pub fn middleware<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&mut Context<'_>) + Send + Sync + 'static,
    {
        self.engine
            .group_state_mut(self.index)
            .middleware
            .push(Arc::new(handler));
        self
    }

    /// Appends several middleware at once, keeping their order.
    pub fn middlewares<I>(&mut self, handlers: I) -> &mut Self
    where
        I: IntoIterator<Item = Handler>,
    {
        self.engine
            .group_state_mut(self.index)
            .middleware
            .extend(handlers);
        self
    }

    /// Adds a route with any method, relative to this group's prefix.
    pub fn route<F>(&mut self, method: Method, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context<'_>) + Send + Sync + 'static,
    {
        let full_pattern = format!("{}{}", self.prefix(), pattern);
        self.engine.register(method, &full_pattern, Arc::new(handler));
        self
    }

    /// Adds a GET route.
    pub fn get<F>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context<'_>) + Send + Sync + 'static,
    {
        self.route(Method::Get, pattern, handler)
    }

    /// Adds a POST route.
    pub fn post<F>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context<'_>) + Send + Sync + 'static,
    {
        self.route(Method::Post, pattern, handler)
    }

    /// Adds a PUT route.
    pub fn put<F>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context<'_>) + Send + Sync + 'static,
    {
        self.route(Method::Put, pattern, handler)
    }

    /// Adds a PATCH route.
    pub fn patch<F>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context<'_>) + Send + Sync + 'static,
    {
        self.route(Method::Patch, pattern, handler)
    }

    /// Adds a DELETE route.
    pub fn delete<F>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context<'_>) + Send + Sync + 'static,
    {
        self.route(Method::Delete, pattern, handler)
    }

    /// Adds a HEAD route.
    pub fn head<F>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context<'_>) + Send + Sync + 'static,
    {
        self.route(Method::Head, pattern, handler)
    }

    /// Adds an OPTIONS route.
    pub fn options<F>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context<'_>) + Send + Sync + 'static,
    {
        self.route(Method::Options, pattern, handler)
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::Engine;

    #[test]
    fn test_prefixes_concatenate() {
        let mut app = Engine::new();
        let mut v1 = app.group("/api/v1");
        assert_eq!(v1.prefix(), "/api/v1");
        assert_eq!(v1.parent_prefix(), Some(""));

        let users = v1.group("/users");
        assert_eq!(users.prefix(), "/api/v1/users");
        assert_eq!(users.parent_prefix(), Some("/api/v1"));
    }

    #[test]
    fn test_routes_get_full_pattern() {
        let mut app = Engine::new();
        {
            let mut v1 = app.group("/v1");
            v1.get("/items/:id", |_| {});
            v1.group("/admin").delete("/items/:id", |_| {});
        }

        let routes: Vec<_> = app
            .routes()
            .into_iter()
            .map(|r| format!("{} {}", r.method, r.pattern))
            .collect();
        assert_eq!(routes, vec!["GET /v1/items/:id", "DELETE /v1/admin/items/:id"]);
    }

    #[test]
    fn test_middlewares_keep_order() {
        use std::sync::Arc;

        use crate::context::{Context, Handler};
        use crate::request::Request;

        let tag = |name: &'static str| -> Handler {
            Arc::new(move |c: &mut Context<'_>| {
                let seen = c.get_string("seen").unwrap_or_default().to_string();
                c.set("seen", format!("{seen}{name}"));
                c.next();
            })
        };

        let mut app = Engine::new();
        {
            let mut api = app.group("/api");
            api.middlewares([tag("a"), tag("b")]).middleware(|c| {
                let seen = c.get_string("seen").unwrap_or_default().to_string();
                c.set("seen", format!("{seen}c"));
                c.next();
            });
            api.get("/x", |c| {
                let seen = c.get_string("seen").unwrap_or_default().to_string();
                c.string(200, seen);
            });
        }

        let res = app.handle(Request::get("/api/x"));
        assert_eq!(res.body_string().as_deref(), Some("abc"));
    }
}
