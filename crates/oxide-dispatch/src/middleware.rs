//! Built-in middleware.
//!
//! Middleware is an ordinary handler that calls [`Context::next`] to run the
//! rest of the chain. Each constructor here returns a closure ready to pass to
//! [`Engine::middleware`](crate::Engine::middleware) or
//! [`RouteGroup::middleware`](crate::RouteGroup::middleware).

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use tracing::{debug, error, info};

use crate::config::EngineConfig;
use crate::context::Context;

/// Logs one line per request with its status and duration.
///
/// The rest of the chain runs inside the request span, so events emitted by
/// handlers carry the method and path.
pub fn logger() -> impl Fn(&mut Context<'_>) + Send + Sync + 'static {
    |c: &mut Context<'_>| {
        let span = c.span();
        let _entered = span.enter();
        let start = Instant::now();
        c.next();
        info!(
            status = c.response_status().unwrap_or(200),
            elapsed = ?start.elapsed(),
            "{} {}",
            c.method(),
            c.path()
        );
    }
}

/// Turns a panic in the rest of the chain into a 500 response.
pub fn recovery() -> impl Fn(&mut Context<'_>) + Send + Sync + 'static {
    recovery_with_body(EngineConfig::default().recovery_body)
}

/// Like [`recovery`], with a custom response body.
///
/// The panic is logged, the chain is aborted, and the 500 is only written
/// when nothing was written before the panic.
pub fn recovery_with_body(body: impl Into<String>) -> impl Fn(&mut Context<'_>) + Send + Sync + 'static {
    let body = body.into();
    move |c: &mut Context<'_>| {
        let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| c.next())) else {
            return;
        };
        error!(
            method = %c.method(),
            path = %c.path(),
            panic = %panic_message(payload.as_ref()),
            "handler panicked"
        );
        c.abort();
        if !c.written() {
            c.string(500, &body);
        }
    }
}

/// Rejects requests lacking the header `name` with `status`.
pub fn require_header(name: impl Into<String>, status: u16) -> impl Fn(&mut Context<'_>) + Send + Sync + 'static {
    let name = name.into();
    move |c: &mut Context<'_>| {
        if c.header(&name).is_none() {
            debug!(header = %name, path = %c.path(), status, "missing required header");
            c.abort_with_status(status);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
