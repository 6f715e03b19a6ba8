//! Per-request context and the continuation protocol.
//!
//! A [`Context`] owns the handler chain assembled for one request and a cursor
//! into it. [`Context::next`] runs the rest of the chain from inside a
//! handler, so code placed after the call runs once every downstream handler
//! has returned:
//!
//! ```
//! use oxide_dispatch::{Engine, Request};
//!
//! let mut app = Engine::new();
//! app.middleware(|c| {
//!     c.set_header("X-Before", "1");
//!     c.next();
//!     // downstream handlers have finished here
//! });
//! app.get("/", |c| c.string(200, "home"));
//!
//! let res = app.handle(Request::get("/"));
//! assert_eq!(res.body_string().as_deref(), Some("home"));
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{error, info_span, warn, Span};

use crate::error::{DispatchError, Result};
use crate::request::{Method, PathParams, Request};
use crate::response::ResponseWriter;

/// A request handler or middleware.
///
/// Both are the same thing: a function of the request context. Middleware
/// usually calls [`Context::next`] somewhere in its body, a final handler
/// usually does not.
pub type Handler = Arc<dyn Fn(&mut Context<'_>) + Send + Sync>;

/// Boxed error recorded on a context with [`Context::error`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The state of one request as it travels through its handler chain.
pub struct Context<'w> {
    request: Request,
    params: PathParams,
    full_path: Option<String>,
    writer: &'w mut dyn ResponseWriter,
    status: Option<u16>,
    body_written: bool,
    handlers: Vec<Handler>,
    /// Position of the next handler to run.
    cursor: usize,
    aborted: bool,
    keys: HashMap<String, Box<dyn Any + Send + Sync>>,
    errors: Vec<BoxError>,
}

impl<'w> Context<'w> {
    /// Creates a context with an empty chain and no route match.
    pub fn new(request: Request, writer: &'w mut dyn ResponseWriter) -> Self {
        Self {
            request,
            params: PathParams::new(),
            full_path: None,
            writer,
            status: None,
            body_written: false,
            handlers: Vec::new(),
            cursor: 0,
            aborted: false,
            keys: HashMap::new(),
            errors: Vec::new(),
        }
    }

    /// Seeds the chain and the route match. The cursor is left before the
    /// first handler.
    pub(crate) fn with_chain(
        mut self,
        handlers: Vec<Handler>,
        params: PathParams,
        full_path: Option<String>,
    ) -> Self {
        self.handlers = handlers;
        self.params = params;
        self.full_path = full_path;
        self.cursor = 0;
        self
    }

    // ---- continuation ----

    /// Runs the remaining handlers of the chain.
    ///
    /// Each handler runs to completion before the following one starts. A
    /// handler that itself calls `next` resumes after everything downstream
    /// has returned. Handlers only stop the chain early through
    /// [`Context::abort`].
    pub fn next(&mut self) {
        while self.cursor < self.handlers.len() {
            let handler = Arc::clone(&self.handlers[self.cursor]);
            self.cursor += 1;
            handler(&mut *self);
        }
    }

    /// Stops the chain. Handlers already running still return normally.
    pub fn abort(&mut self) {
        self.cursor = self.handlers.len();
        self.aborted = true;
    }

    /// Writes `code` as the response status and stops the chain.
    pub fn abort_with_status(&mut self, code: u16) {
        self.status(code);
        self.abort();
    }

    /// Returns true once [`Context::abort`] has been called.
    #[must_use]
    pub const fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Number of handlers in the chain, middleware included.
    #[must_use]
    pub fn chain_len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns true once a status or any body bytes have been written.
    #[must_use]
    pub const fn written(&self) -> bool {
        self.status.is_some() || self.body_written
    }

    /// The status written so far.
    #[must_use]
    pub const fn response_status(&self) -> Option<u16> {
        self.status
    }

    // ---- request facts ----

    /// The request as received from the transport.
    #[must_use]
    pub const fn request(&self) -> &Request {
        &self.request
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.request.method
    }

    /// Request path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.request.path
    }

    /// Pattern of the matched route, `None` when no route matched.
    #[must_use]
    pub fn full_path(&self) -> Option<&str> {
        self.full_path.as_deref()
    }

    /// Gets a path parameter bound by the matched route.
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key)
    }

    /// All path parameters bound by the matched route.
    #[must_use]
    pub const fn params(&self) -> &PathParams {
        &self.params
    }

    /// Gets the first value of a query parameter.
    #[must_use]
    pub fn query(&self, key: &str) -> Option<&str> {
        self.request.get_query(key)
    }

    /// Gets every value of a query parameter.
    #[must_use]
    pub fn query_array(&self, key: &str) -> Vec<&str> {
        self.request
            .query
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Gets a query parameter, falling back to `default` when it is missing
    /// or empty.
    #[must_use]
    pub fn default_query<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.query(key).filter(|v| !v.is_empty()).unwrap_or(default)
    }

    /// Gets a field of a url-encoded form body.
    ///
    /// Errors from the form decoder are returned as in
    /// [`Context::bind_form`], never folded into `None`.
    pub fn post_form(&self, key: &str) -> Result<Option<String>> {
        let fields: Vec<(String, String)> = serde_urlencoded::from_bytes(&self.request.body)?;
        Ok(fields.into_iter().find(|(k, _)| k == key).map(|(_, v)| v))
    }

    /// Gets a request header, ignoring case.
    #[must_use]
    pub fn header(&self, key: &str) -> Option<&str> {
        self.request.get_header(key)
    }

    /// Best-effort client address: the first `X-Forwarded-For` entry, then
    /// `X-Real-Ip`, then the host part of the peer address.
    #[must_use]
    pub fn client_ip(&self) -> Option<String> {
        if let Some(forwarded) = self.header("X-Forwarded-For") {
            if let Some(first) = forwarded.split(',').map(str::trim).find(|ip| !ip.is_empty()) {
                return Some(first.to_string());
            }
        }
        if let Some(real) = self.header("X-Real-Ip").filter(|ip| !ip.is_empty()) {
            return Some(real.to_string());
        }
        let remote = self.request.remote_addr.as_deref()?;
        Some(
            remote
                .parse::<SocketAddr>()
                .map_or_else(|_| remote.to_string(), |addr| addr.ip().to_string()),
        )
    }

    /// Decodes the body as JSON.
    pub fn bind_json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.request.body)?)
    }

    /// Decodes the query string into `T`.
    pub fn bind_query<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_urlencoded::from_str(&self.request.query_string())?)
    }

    /// Decodes a url-encoded form body into `T`.
    pub fn bind_form<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_urlencoded::from_bytes(&self.request.body)?)
    }

    /// Deadline attached by the transport, if any.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.request.deadline
    }

    /// Returns true when the request deadline has passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.request
            .deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Fails with [`DispatchError::DeadlineExceeded`] once the deadline has
    /// passed.
    pub fn check_deadline(&self) -> Result<()> {
        if self.is_expired() {
            Err(DispatchError::DeadlineExceeded)
        } else {
            Ok(())
        }
    }

    /// A span describing this request.
    #[must_use]
    pub fn span(&self) -> Span {
        info_span!(
            "request",
            method = %self.request.method,
            path = %self.request.path
        )
    }

    // ---- request-scoped storage ----

    /// Stores a value for later handlers in the chain.
    pub fn set<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.keys.insert(key.into(), Box::new(value));
    }

    /// Gets a stored value if it exists and has type `T`.
    #[must_use]
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.keys.get(key)?.downcast_ref()
    }

    /// Gets a stored `String` value.
    #[must_use]
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.get::<String>(key).map(String::as_str)
    }

    /// Removes a stored value, returning it if it has type `T`.
    pub fn remove<T: Any>(&mut self, key: &str) -> Option<T> {
        let value = self.keys.remove(key)?;
        value.downcast::<T>().ok().map(|boxed| *boxed)
    }

    /// Records an error for middleware further up the chain.
    pub fn error(&mut self, err: impl Into<BoxError>) {
        self.errors.push(err.into());
    }

    /// Errors recorded so far.
    #[must_use]
    pub fn errors(&self) -> &[BoxError] {
        &self.errors
    }

    // ---- response ----

    /// Writes the response status. Only the first call reaches the sink.
    pub fn status(&mut self, code: u16) {
        if let Some(current) = self.status {
            warn!(current, ignored = code, path = %self.request.path, "status already written");
            return;
        }
        self.writer.write_status(code);
        self.status = Some(code);
    }

    /// Sets a response header.
    pub fn set_header(&mut self, key: &str, value: &str) {
        self.writer.set_header(key, value);
    }

    /// Appends raw bytes to the body, writing a 200 status first if none was
    /// written yet.
    pub fn write(&mut self, bytes: &[u8]) {
        if self.status.is_none() {
            self.status(200);
        }
        self.writer.write_body(bytes);
        self.body_written = true;
    }

    /// Writes a plain-text response.
    pub fn string(&mut self, code: u16, body: impl AsRef<str>) {
        self.set_header("Content-Type", "text/plain; charset=utf-8");
        self.status(code);
        self.write(body.as_ref().as_bytes());
    }

    /// Writes a JSON response. An unserializable value produces a 500.
    pub fn json<T: Serialize + ?Sized>(&mut self, code: u16, value: &T) {
        match serde_json::to_vec(value) {
            Ok(body) => {
                self.set_header("Content-Type", "application/json");
                self.status(code);
                self.write(&body);
            }
            Err(err) => {
                error!(error = %err, path = %self.request.path, "failed to encode JSON response");
                self.string(500, err.to_string());
            }
        }
    }

    /// Writes an HTML response.
    pub fn html(&mut self, code: u16, body: impl AsRef<str>) {
        self.set_header("Content-Type", "text/html; charset=utf-8");
        self.status(code);
        self.write(body.as_ref().as_bytes());
    }

    /// Writes a raw body.
    pub fn data(&mut self, code: u16, body: &[u8]) {
        self.status(code);
        self.write(body);
    }

    /// Stops the chain and answers with `{"message": message}`.
    pub fn fail(&mut self, code: u16, message: &str) {
        self.abort();
        self.json(code, &serde_json::json!({ "message": message }));
    }
}
