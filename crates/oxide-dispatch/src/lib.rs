//! # oxide-dispatch
//!
//! An embeddable HTTP request dispatcher with middleware support.
//!
//! This crate provides:
//! - A per-method prefix tree router with `:param` and `*wildcard` segments
//! - Route groups with prefixes and their own middleware
//! - An onion-style handler chain with explicit continuation control
//! - Logging and panic-recovery middleware
//! - A JSON route manifest for declaring static routes
//!
//! Sockets are not handled here. A transport adapter builds a [`Request`],
//! hands it to [`Engine::serve`] together with a [`ResponseWriter`], and
//! writes whatever ends up in the writer.
//!
//! ## Quick Start
//!
//! ```
//! use oxide_dispatch::{Engine, Request};
//!
//! let mut app = Engine::new();
//! app.get("/", |c| c.string(200, "Hello, World!"));
//! app.get("/users/:id", |c| {
//!     let id = c.param("id").unwrap_or_default().to_string();
//!     c.json(200, &serde_json::json!({ "id": id }));
//! });
//!
//! let res = app.handle(Request::get("/users/123"));
//! assert_eq!(res.status, 200);
//! assert_eq!(res.body_string().as_deref(), Some(r#"{"id":"123"}"#));
//! ```
//!
//! ## Patterns
//!
//! - `/users` matches exactly `/users` (not `/users/`)
//! - `/users/:id` binds one non-empty segment to `id`
//! - `/files/*path` binds the rest of the path, slashes included
//!
//! A literal segment wins over a parameter, and a parameter over a wildcard.
//!
//! ## Middleware
//!
//! ```
//! use oxide_dispatch::{middleware, Engine, Request};
//!
//! let mut app = Engine::new();
//! app.middleware(middleware::logger());
//! app.middleware(middleware::recovery());
//!
//! let mut admin = app.group("/admin");
//! admin.middleware(|c| {
//!     if c.header("Authorization").is_none() {
//!         c.abort_with_status(401);
//!     }
//! });
//! admin.get("/stats", |c| c.string(200, "ok"));
//!
//! assert_eq!(app.handle(Request::get("/admin/stats")).status, 401);
//! ```

mod config;
mod context;
mod engine;
mod error;
mod group;
pub mod manifest;
pub mod middleware;
mod path;
mod request;
mod response;
mod table;
mod trie;

pub use config::EngineConfig;
pub use context::{BoxError, Context, Handler};
pub use engine::{Dispatch, Engine};
pub use error::{DispatchError, Result};
pub use group::RouteGroup;
pub use manifest::Manifest;
pub use path::{split_path, PathPattern, Segment};
pub use request::{parse_query_string, Method, PathParams, Request};
pub use response::{Response, ResponseWriter};
pub use table::{RouteInfo, RouteTable};
pub use trie::{Match, PathTrie};
