//! The dispatcher: registration API and per-request entry point.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::config::EngineConfig;
use crate::context::{Context, Handler};
use crate::group::{GroupState, RouteGroup};
use crate::middleware::{logger, recovery_with_body};
use crate::request::{Method, PathParams, Request};
use crate::response::{Response, ResponseWriter};
use crate::table::{RouteInfo, RouteTable};

/// How a request was dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// A route matched and its chain ran.
    Matched,
    /// No route matched; the not-found handler's chain ran.
    Fallback,
    /// No route matched and no not-found handler is set. Nothing ran and
    /// nothing was written.
    Unmatched,
}

/// An application: routes, groups and the not-found handler.
///
/// Build it with `&mut self` methods during setup, then serve requests
/// through `&self` from as many threads as needed.
///
/// ```
/// use oxide_dispatch::{Engine, Request};
///
/// let mut app = Engine::new();
/// app.get("/users/:id", |c| {
///     let id = c.param("id").unwrap_or_default().to_string();
///     c.string(200, format!("user {id}"));
/// });
///
/// let res = app.handle(Request::get("/users/42"));
/// assert_eq!(res.status, 200);
/// assert_eq!(res.body_string().as_deref(), Some("user 42"));
/// ```
pub struct Engine {
    table: RouteTable<Handler>,
    /// Every group ever created, root first, in creation order.
    groups: Vec<GroupState>,
    not_found: Option<Handler>,
    config: EngineConfig,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Creates an engine with the default configuration and no middleware.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Creates an engine with the given configuration.
    #[must_use]
    pub fn with_config(config: EngineConfig) -> Self {
        let mut table = RouteTable::new();
        table.set_log_routes(config.log_routes);
        Self {
            table,
            groups: vec![GroupState::root()],
            not_found: None,
            config,
        }
    }

    /// Creates an engine with the request logger and panic recovery
    /// installed on the root group.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut engine = Self::new();
        let body = engine.config.recovery_body.clone();
        engine.middleware(logger()).middleware(recovery_with_body(body));
        engine
    }

    /// The configuration this engine was built with.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The root group, prefix `""`. Its middleware runs for every request.
    pub fn root(&mut self) -> RouteGroup<'_> {
        RouteGroup::new(self, 0)
    }

    /// Creates a top-level group under `prefix`.
    pub fn group(&mut self, prefix: &str) -> RouteGroup<'_> {
        let index = self.add_group(0, prefix);
        RouteGroup::new(self, index)
    }

    /// Appends middleware to the root group.
    pub fn middleware<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&mut Context<'_>) + Send + Sync + 'static,
    {
        self.root().middleware(handler);
        self
    }

    /// Appends several middleware to the root group, keeping their order.
    pub fn middlewares<I>(&mut self, handlers: I) -> &mut Self
    where
        I: IntoIterator<Item = Handler>,
    {
        self.root().middlewares(handlers);
        self
    }

    /// Adds a route with any method.
    pub fn route<F>(&mut self, method: Method, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context<'_>) + Send + Sync + 'static,
    {
        self.root().route(method, pattern, handler);
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

    /// Sets the handler that ends the chain when no route matches.
    pub fn set_not_found_handler<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&mut Context<'_>) + Send + Sync + 'static,
    {
        self.not_found = Some(Arc::new(handler));
        self
    }

    /// Lists the registered routes, ordered by method then pattern.
    #[must_use]
    pub fn routes(&self) -> Vec<RouteInfo> {
        self.table.routes()
    }

    /// Dispatches one request, writing the response to `writer`.
    ///
    /// The chain is the middleware of every group whose prefix starts the
    /// request path, in group creation order, followed by the matched route's
    /// handler or the not-found handler. When neither exists the chain is
    /// empty and nothing is written: answering is then up to the caller.
    pub fn serve(&self, request: Request, writer: &mut dyn ResponseWriter) -> Dispatch {
        let mut chain: Vec<Handler> = self
            .groups
            .iter()
            .filter(|group| request.path.starts_with(group.prefix.as_str()))
            .flat_map(|group| group.middleware.iter().cloned())
            .collect();

        let (params, full_path, outcome) = match self.table.resolve(request.method, &request.path) {
            Some(matched) => {
                chain.push(Arc::clone(matched.value));
                (matched.params, Some(matched.pattern.to_string()), Dispatch::Matched)
            }
            None => match &self.not_found {
                Some(handler) => {
                    chain.push(Arc::clone(handler));
                    (PathParams::new(), None, Dispatch::Fallback)
                }
                None => {
                    chain.clear();
                    (PathParams::new(), None, Dispatch::Unmatched)
                }
            },
        };

        debug!(
            method = %request.method,
            path = %request.path,
            pattern = full_path.as_deref().unwrap_or("-"),
            handlers = chain.len(),
            ?outcome,
            "dispatching"
        );

        let mut ctx = Context::new(request, writer).with_chain(chain, params, full_path);
        ctx.next();
        trace!(status = ?ctx.response_status(), aborted = ctx.is_aborted(), "chain finished");
        outcome
    }

    /// Dispatches one request into an in-memory [`Response`].
    ///
    /// Unlike [`Engine::serve`], an unmatched request gets a 404 with the
    /// configured not-found body.
    #[must_use]
    pub fn handle(&self, request: Request) -> Response {
        let path = request.path.clone();
        let mut response = Response::default();
        if self.serve(request, &mut response) == Dispatch::Unmatched {
            let body = self.config.not_found_body_for(&path);
            response.write_status(404);
            response.set_header("Content-Type", "text/plain; charset=utf-8");
            response.write_body(body.as_bytes());
        }
        response
    }

    pub(crate) fn add_group(&mut self, parent: usize, prefix: &str) -> usize {
        let prefix = format!("{}{}", self.groups[parent].prefix, prefix);
        debug!(prefix = %prefix, "group created");
        self.groups.push(GroupState {
            prefix,
            middleware: Vec::new(),
            parent: Some(parent),
        });
        self.groups.len() - 1
    }

    pub(crate) fn group_state(&self, index: usize) -> &GroupState {
        &self.groups[index]
    }

    pub(crate) fn group_state_mut(&mut self, index: usize) -> &mut GroupState {
        &mut self.groups[index]
    }

    pub(crate) fn register(&mut self, method: Method, pattern: &str, handler: Handler) {
        self.table.register(method, pattern, handler);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    fn quiet() -> Engine {
        Engine::with_config(EngineConfig {
            log_routes: false,
            ..EngineConfig::default()
        })
    }

    #[test]
    fn test_engine_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Engine>();
    }

    #[test]
    fn test_basic_routing() {
        let mut app = quiet();
        app.get("/", |c| c.string(200, "Hello, World!"));

        let res = app.handle(Request::get("/"));
        assert_eq!(res.status, 200);
        assert_eq!(res.body_string(), Some("Hello, World!".to_string()));
    }

    #[test]
    fn test_path_params() {
        let mut app = quiet();
        app.get("/users/:id", |c| {
            let body = format!("User: {}", c.param("id").unwrap_or("unknown"));
            c.string(200, body);
        });

        let res = app.handle(Request::get("/users/123"));
        assert_eq!(res.body_string(), Some("User: 123".to_string()));
    }

    #[test]
    fn test_not_found_boundary() {
        let mut app = quiet();
        app.get("/", |c| c.string(200, "home"));

        let res = app.handle(Request::get("/nonexistent"));
        assert_eq!(res.status, 404);
        assert_eq!(res.body_string(), Some("404 NOT FOUND: /nonexistent".to_string()));
    }

    #[test]
    fn test_unmatched_runs_nothing() {
        let ran = Arc::new(Mutex::new(0));
        let mut app = quiet();
        let counter = Arc::clone(&ran);
        app.middleware(move |c| {
            *counter.lock().unwrap() += 1;
            c.next();
        });

        let mut res = Response::new(0);
        let outcome = app.serve(Request::get("/missing"), &mut res);
        assert_eq!(outcome, Dispatch::Unmatched);
        assert_eq!(*ran.lock().unwrap(), 0);
        assert_eq!(res.status, 0);
        assert!(res.body.is_empty());
        assert!(res.headers.is_empty());
    }

    #[test]
    fn test_not_found_handler_gets_middleware() {
        let mut app = quiet();
        app.middleware(|c| {
            c.set_header("X-Seen", "yes");
            c.next();
        });
        app.set_not_found_handler(|c| {
            let body = format!("nothing at {}", c.path());
            c.string(404, body);
        });

        let mut res = Response::default();
        assert_eq!(app.serve(Request::get("/gone"), &mut res), Dispatch::Fallback);
        assert_eq!(res.status, 404);
        assert_eq!(res.header("X-Seen"), Some("yes"));
        assert_eq!(res.body_string().as_deref(), Some("nothing at /gone"));
    }

    #[test]
    fn test_method_is_part_of_route() {
        let mut app = quiet();
        app.get("/", |c| c.string(200, "home"));
        assert_eq!(app.handle(Request::post("/")).status, 404);
    }

    #[test]
    fn test_full_path_exposed() {
        let mut app = quiet();
        app.get("/files/*path", |c| {
            let body = format!("{} {}", c.full_path().unwrap_or("-"), c.param("path").unwrap_or("-"));
            c.string(200, body);
        });
        let res = app.handle(Request::get("/files/a/b"));
        assert_eq!(res.body_string().as_deref(), Some("/files/*path a/b"));
    }
}
