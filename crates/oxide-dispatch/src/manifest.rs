//! Declarative route manifests.
//!
//! A manifest is a JSON document declaring groups, middleware and routes that
//! answer with a fixed reply. It is what the `oxide-dispatch` binary
//! loads, and it is handy for stubbing a service in tests.
//!
//! ```json
//! {
//!   "config": { "log_routes": false },
//!   "middleware": [{ "kind": "recovery" }],
//!   "routes": [
//!     { "method": "GET", "pattern": "/users/:id", "body": "user {id}" }
//!   ],
//!   "groups": [
//!     {
//!       "prefix": "/admin",
//!       "middleware": [{ "kind": "require_header", "header": "Authorization" }],
//!       "routes": [{ "method": "GET", "pattern": "/stats", "body": "{}",
//!                    "content_type": "application/json" }]
//!     }
//!   ],
//!   "not_found": { "status": 404, "body": "no route for {path}" }
//! }
//! ```
//!
//! Reply bodies may reference bound parameters as `{name}` and the request
//! path as `{path}`.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::config::EngineConfig;
use crate::context::Context;
use crate::engine::Engine;
use crate::error::{DispatchError, Result};
use crate::group::RouteGroup;
use crate::middleware::{logger, recovery_with_body, require_header};
use crate::path::PathPattern;
use crate::request::{Method, PathParams};

/// A fixed reply.
#[derive(Debug, Clone, Deserialize)]
pub struct Reply {
    /// Status code, 200 by default.
    #[serde(default = "default_status")]
    pub status: u16,
    /// Body template.
    #[serde(default)]
    pub body: String,
    /// Content type, `text/plain; charset=utf-8` by default.
    #[serde(default)]
    pub content_type: Option<String>,
    /// Extra response headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

const fn default_status() -> u16 {
    200
}

const fn default_reject_status() -> u16 {
    401
}

impl Reply {
    /// Writes the reply, filling in `{name}` and `{path}` placeholders.
    /// A route parameter called `path` shadows the request path.
    pub fn write(&self, c: &mut Context<'_>) {
        let body = render(&self.body, c.params(), c.path());

        for (key, value) in &self.headers {
            c.set_header(key, value);
        }
        let content_type = self
            .content_type
            .as_deref()
            .unwrap_or("text/plain; charset=utf-8");
        c.set_header("Content-Type", content_type);
        c.data(self.status, body.as_bytes());
    }
}

/// Fills `{name}` placeholders in one left-to-right pass. Inserted values are
/// never scanned again, and unknown placeholders are kept as written.
fn render(template: &str, params: &PathParams, path: &str) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            rest = &rest[open..];
            break;
        };
        let name = &after[..close];
        if name.contains('{') {
            out.push('{');
            rest = after;
            continue;
        }
        match params.get(name).or_else(|| (name == "path").then_some(path)) {
            Some(value) => out.push_str(value),
            None => out.push_str(&rest[open..=open + close + 1]),
        }
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    out
}

/// Middleware a manifest can install.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MiddlewareSpec {
    /// [`logger`](crate::middleware::logger).
    Logger,
    /// [`recovery`](crate::middleware::recovery), with the configured body.
    Recovery,
    /// [`require_header`](crate::middleware::require_header).
    RequireHeader {
        /// Header that must be present.
        header: String,
        /// Status for requests without it, 401 by default.
        #[serde(default = "default_reject_status")]
        status: u16,
    },
    /// Sets a response header and carries on.
    SetHeader {
        /// Header name.
        name: String,
        /// Header value.
        value: String,
    },
}

/// A route answering with a fixed reply.
#[derive(Debug, Clone, Deserialize)]
pub struct RouteSpec {
    /// HTTP method name, case-insensitive.
    pub method: String,
    /// Pattern relative to the enclosing group.
    pub pattern: String,
    /// The reply.
    #[serde(flatten)]
    pub reply: Reply,
}

/// A group and everything declared inside it.
#[derive(Debug, Clone, Deserialize)]
pub struct GroupSpec {
    /// Prefix relative to the enclosing group.
    pub prefix: String,
    /// Middleware of this group.
    #[serde(default)]
    pub middleware: Vec<MiddlewareSpec>,
    /// Routes of this group.
    #[serde(default)]
    pub routes: Vec<RouteSpec>,
    /// Nested groups.
    #[serde(default)]
    pub groups: Vec<GroupSpec>,
}

/// A complete manifest.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Manifest {
    /// Engine configuration.
    pub config: EngineConfig,
    /// Root group middleware.
    pub middleware: Vec<MiddlewareSpec>,
    /// Root group routes.
    pub routes: Vec<RouteSpec>,
    /// Top-level groups.
    pub groups: Vec<GroupSpec>,
    /// Reply used when no route matches.
    pub not_found: Option<Reply>,
}

impl Manifest {
    /// Parses a manifest from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|err| DispatchError::Manifest(err.to_string()))
    }

    /// Reads and parses a manifest file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|err| DispatchError::Manifest(format!("{}: {err}", path.display())))?;
        Self::from_json(&json)
    }

    /// Builds an engine serving the manifest's routes.
    ///
    /// Fails on unknown methods and on patterns with a wildcard before the
    /// last segment or an unnamed parameter.
    pub fn build(&self) -> Result<Engine> {
        let mut engine = Engine::with_config(self.config.clone());
        let recovery_body = self.config.recovery_body.as_str();
        {
            let mut root = engine.root();
            install(&mut root, &self.middleware, &self.routes, &self.groups, recovery_body)?;
        }
        if let Some(reply) = self.not_found.clone() {
            engine.set_not_found_handler(move |c| reply.write(c));
        }
        Ok(engine)
    }
}

fn install(
    group: &mut RouteGroup<'_>,
    middleware: &[MiddlewareSpec],
    routes: &[RouteSpec],
    groups: &[GroupSpec],
    recovery_body: &str,
) -> Result<()> {
    for spec in middleware {
        match spec.clone() {
            MiddlewareSpec::Logger => group.middleware(logger()),
            MiddlewareSpec::Recovery => group.middleware(recovery_with_body(recovery_body)),
            MiddlewareSpec::RequireHeader { header, status } => {
                group.middleware(require_header(header, status))
            }
            MiddlewareSpec::SetHeader { name, value } => {
                group.middleware(move |c| c.set_header(&name, &value))
            }
        };
    }

    for route in routes {
        let method: Method = route.method.parse()?;
        PathPattern::validate(&format!("{}{}", group.prefix(), route.pattern))?;
        let reply = route.reply.clone();
        group.route(method, &route.pattern, move |c| reply.write(c));
    }

    for spec in groups {
        let mut child = group.group(&spec.prefix);
        install(&mut child, &spec.middleware, &spec.routes, &spec.groups, recovery_body)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Request;

    const MANIFEST: &str = r#"{
        "config": { "log_routes": false },
        "middleware": [
            { "kind": "recovery" },
            { "kind": "set_header", "name": "X-Served-By", "value": "manifest" }
        ],
        "routes": [
            { "method": "GET", "pattern": "/users/:id", "body": "user {id}" },
            { "method": "post", "pattern": "/users", "status": 201, "body": "created",
              "headers": { "Location": "/users/1" } }
        ],
        "groups": [
            {
                "prefix": "/admin",
                "middleware": [{ "kind": "require_header", "header": "Authorization", "status": 403 }],
                "routes": [
                    { "method": "GET", "pattern": "/stats", "body": "{\"ok\":true}",
                      "content_type": "application/json" }
                ],
                "groups": [
                    { "prefix": "/files", "routes": [
                        { "method": "GET", "pattern": "/*path", "body": "file {path}" }
                    ] }
                ]
            }
        ],
        "not_found": { "status": 404, "body": "no route for {path}" }
    }"#;

    fn engine() -> Engine {
        Manifest::from_json(MANIFEST).unwrap().build().unwrap()
    }

    #[test]
    fn test_routes_and_templates() {
        let app = engine();
        let res = app.handle(Request::get("/users/7"));
        assert_eq!(res.status, 200);
        assert_eq!(res.body_string().as_deref(), Some("user 7"));
        assert_eq!(res.header("X-Served-By"), Some("manifest"));

        let res = app.handle(Request::post("/users"));
        assert_eq!(res.status, 201);
        assert_eq!(res.header("Location"), Some("/users/1"));
    }

    #[test]
    fn test_group_middleware() {
        let app = engine();
        assert_eq!(app.handle(Request::get("/admin/stats")).status, 403);

        let res = app.handle(Request::get("/admin/stats").header("Authorization", "t"));
        assert_eq!(res.status, 200);
        assert_eq!(res.header("Content-Type"), Some("application/json"));

        let res = app.handle(Request::get("/admin/files/a/b.txt").header("Authorization", "t"));
        assert_eq!(res.body_string().as_deref(), Some("file a/b.txt"));
    }

    #[test]
    fn test_not_found_reply() {
        let res = engine().handle(Request::get("/nowhere"));
        assert_eq!(res.status, 404);
        assert_eq!(res.body_string().as_deref(), Some("no route for /nowhere"));
        assert_eq!(res.header("X-Served-By"), Some("manifest"));
    }

    #[test]
    fn test_rejects_bad_method() {
        let manifest = Manifest::from_json(
            r#"{ "routes": [{ "method": "BREW", "pattern": "/coffee" }] }"#,
        )
        .unwrap();
        assert!(matches!(manifest.build(), Err(DispatchError::UnknownMethod(_))));
    }

    #[test]
    fn test_rejects_inner_wildcard() {
        let manifest = Manifest::from_json(
            r#"{ "routes": [{ "method": "GET", "pattern": "/a/*rest/b" }] }"#,
        )
        .unwrap();
        assert!(matches!(
            manifest.build(),
            Err(DispatchError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_render_single_pass() {
        let mut params = PathParams::new();
        params.insert("a", "{b}");
        params.insert("b", "x");
        assert_eq!(render("a={a} b={b}", &params, "/p"), "a={b} b=x");
        assert_eq!(render("{path} {missing} {", &params, "/p"), "/p {missing} {");
        assert_eq!(render("{{a}}", &params, "/p"), "{{b}}");
    }

    #[test]
    fn test_inserted_values_are_not_expanded() {
        let app = engine();
        let res = app.handle(Request::get("/users/{path}"));
        assert_eq!(res.body_string().as_deref(), Some("user {path}"));

        let manifest = Manifest::from_json(
            r#"{ "config": { "log_routes": false },
                 "routes": [{ "method": "GET", "pattern": "/p/:a/:b", "body": "a={a} b={b}" }] }"#,
        )
        .unwrap();
        for _ in 0..20 {
            let res = manifest.build().unwrap().handle(Request::get("/p/{b}/x"));
            assert_eq!(res.body_string().as_deref(), Some("a={b} b=x"));
        }
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(
            Manifest::from_json("{ not json"),
            Err(DispatchError::Manifest(_))
        ));
    }
}
