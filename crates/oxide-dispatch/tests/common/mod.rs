#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use oxide_dispatch::{Context, Engine, EngineConfig, Request, Response};

/// Shared log of handler events, in execution order.
pub type Trace = Arc<Mutex<Vec<String>>>;

pub fn engine() -> Engine {
    Engine::with_config(EngineConfig {
        log_routes: false,
        ..EngineConfig::default()
    })
}

pub fn trace() -> Trace {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn events(trace: &Trace) -> Vec<String> {
    trace.lock().unwrap().clone()
}

/// Middleware that records `{name}-pre`, runs the rest of the chain, then
/// records `{name}-post`.
pub fn wrapping(trace: &Trace, name: &'static str) -> impl Fn(&mut Context<'_>) + Send + Sync + 'static {
    let trace = Arc::clone(trace);
    move |c: &mut Context<'_>| {
        trace.lock().unwrap().push(format!("{name}-pre"));
        c.next();
        trace.lock().unwrap().push(format!("{name}-post"));
    }
}

/// Handler that records `name` and answers 200 with `name` as the body.
pub fn answering(trace: &Trace, name: &'static str) -> impl Fn(&mut Context<'_>) + Send + Sync + 'static {
    let trace = Arc::clone(trace);
    move |c: &mut Context<'_>| {
        trace.lock().unwrap().push(name.to_string());
        c.string(200, name);
    }
}

pub fn get(app: &Engine, target: &str) -> Response {
    app.handle(Request::get(target))
}

pub fn body(res: &Response) -> String {
    res.body_string()
        .unwrap_or_else(|| panic!("body is not UTF-8: {:?}", res.body))
}
