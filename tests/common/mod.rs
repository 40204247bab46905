#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

use http::Method;
use nsmux::{
    ErrorHandler, Handler, Middleware, Next, Params, Request, ResponseWriter,
};

static TRACING: Once = Once::new();

/// Route `tracing` output through the test harness, once per process.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Request aimed at the test host, with the path kept verbatim (the
/// WHATWG parser behind `Request::from_uri` would resolve dot segments
/// before the multiplexer gets to see them).
pub fn request(method: Method, path: &str) -> Request {
    Request::new(method, "site.com", path)
}

pub fn get_request(path: &str) -> Request {
    request(Method::GET, path)
}

/// Handler that does nothing; useful where only the route table matters.
pub struct StubHandler;

impl Handler for StubHandler {
    fn serve(&self, _w: &mut dyn ResponseWriter, _r: &mut Request) {}
}

/// Handler that records the params it was called with and then runs the
/// supplied closure.
pub struct MockHandler {
    pub last_params: Mutex<Option<Params>>,
    on_handle: Box<dyn Fn(&mut dyn ResponseWriter, &mut Request) + Send + Sync>,
}

impl MockHandler {
    pub fn new<F>(on_handle: F) -> Arc<Self>
    where
        F: Fn(&mut dyn ResponseWriter, &mut Request) + Send + Sync + 'static,
    {
        Arc::new(Self {
            last_params: Mutex::new(None),
            on_handle: Box::new(on_handle),
        })
    }

    pub fn silent() -> Arc<Self> {
        Self::new(|_w, _r| {})
    }

    pub fn called(&self) -> bool {
        self.last_params.lock().unwrap().is_some()
    }

    pub fn params(&self) -> Params {
        self.last_params.lock().unwrap().clone().unwrap_or_default()
    }
}

impl Handler for MockHandler {
    fn serve(&self, w: &mut dyn ResponseWriter, r: &mut Request) {
        *self.last_params.lock().unwrap() = Some(r.params().clone());
        (self.on_handle)(w, r);
    }
}

/// Middleware that records whether it intercepted and always proceeds.
#[derive(Default)]
pub struct SpyMiddleware {
    pub intercepted: AtomicBool,
}

impl SpyMiddleware {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn intercepted(&self) -> bool {
        self.intercepted.load(Ordering::SeqCst)
    }
}

impl Middleware for SpyMiddleware {
    fn intercept(&self, w: &mut dyn ResponseWriter, r: &mut Request, next: Next<'_>) {
        self.intercepted.store(true, Ordering::SeqCst);
        next.proceed(w, r);
    }
}

/// Middleware driven by a closure, for one-off behaviors.
pub struct MockMiddleware {
    intercept: Box<dyn Fn(&mut dyn ResponseWriter, &mut Request, Next<'_>) + Send + Sync>,
}

impl MockMiddleware {
    pub fn new<F>(intercept: F) -> Arc<Self>
    where
        F: Fn(&mut dyn ResponseWriter, &mut Request, Next<'_>) + Send + Sync + 'static,
    {
        Arc::new(Self {
            intercept: Box::new(intercept),
        })
    }
}

impl Middleware for MockMiddleware {
    fn intercept(&self, w: &mut dyn ResponseWriter, r: &mut Request, next: Next<'_>) {
        (self.intercept)(w, r, next)
    }
}

/// Error handler that counts calls and keeps the last error message.
#[derive(Default)]
pub struct SpyErrorHandler {
    pub calls: AtomicUsize,
    pub last_error: Mutex<Option<String>>,
}

impl SpyErrorHandler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ErrorHandler for SpyErrorHandler {
    fn handle_error(&self, w: &mut dyn ResponseWriter, _r: &mut Request, err: &anyhow::Error) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_error.lock().unwrap() = Some(err.to_string());
        w.set_status(500);
    }
}
