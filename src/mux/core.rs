use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, RwLock};

use anyhow::Error;
use http::Method;
use tracing::{error, info};

use crate::error::{fail, RegistrationError};
use crate::handler::{Handler, HandlerFn};
use crate::middleware::{self, ErrorHandler, ErrorHandlerFn, Middleware, MiddlewareFn, Next};
use crate::request::Request;
use crate::response::ResponseWriter;
use crate::store::entry::Entry;
use crate::store::node::{self, Node};
use crate::store::pattern;

use super::matcher;
use super::namespace::Namespace;

pub(crate) struct MuxInner {
    /// Child map of the (virtual) tree root.
    pub(crate) roots: HashMap<String, Node>,
    /// Entry for the pattern `/`, which has no normalized name and
    /// therefore lives outside the tree.
    pub(crate) root_entry: Option<Entry>,
    /// Global middlewares, run before any per-node list.
    pub(crate) middlewares: Vec<Arc<dyn Middleware>>,
    /// Singleton error receiver; a later registration replaces it.
    pub(crate) error_handler: Option<Arc<dyn ErrorHandler>>,
    /// Set once any registered pattern carries a host prefix.
    pub(crate) host_qualified: bool,
}

/// The multiplexer. Populate it at startup, share it read-only across
/// serving threads; the tree sits behind a read/write lock, so
/// registering while serving is allowed (in-flight requests may still
/// observe the pre-registration table).
pub struct Mux {
    pub(crate) inner: RwLock<MuxInner>,
}

impl Default for Mux {
    fn default() -> Self {
        Self::new()
    }
}

impl Mux {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MuxInner {
                roots: HashMap::new(),
                root_entry: None,
                middlewares: Vec::new(),
                error_handler: None,
                host_qualified: false,
            }),
        }
    }

    /// Register `handler` for every method on `pattern`. The entry acts
    /// as a fallback: method-specific registrations on the same pattern
    /// take precedence.
    pub fn all(&self, pattern: &str, handler: Arc<dyn Handler>) {
        self.register(pattern, handler, None);
    }

    pub fn get(&self, pattern: &str, handler: Arc<dyn Handler>) {
        self.register(pattern, handler, Some(Method::GET));
    }

    pub fn post(&self, pattern: &str, handler: Arc<dyn Handler>) {
        self.register(pattern, handler, Some(Method::POST));
    }

    pub fn put(&self, pattern: &str, handler: Arc<dyn Handler>) {
        self.register(pattern, handler, Some(Method::PUT));
    }

    pub fn delete(&self, pattern: &str, handler: Arc<dyn Handler>) {
        self.register(pattern, handler, Some(Method::DELETE));
    }

    pub fn all_fn<F>(&self, pattern: &str, f: F)
    where
        F: Fn(&mut dyn ResponseWriter, &mut Request) + Send + Sync + 'static,
    {
        self.all(pattern, Arc::new(HandlerFn(f)));
    }

    pub fn get_fn<F>(&self, pattern: &str, f: F)
    where
        F: Fn(&mut dyn ResponseWriter, &mut Request) + Send + Sync + 'static,
    {
        self.get(pattern, Arc::new(HandlerFn(f)));
    }

    pub fn post_fn<F>(&self, pattern: &str, f: F)
    where
        F: Fn(&mut dyn ResponseWriter, &mut Request) + Send + Sync + 'static,
    {
        self.post(pattern, Arc::new(HandlerFn(f)));
    }

    pub fn put_fn<F>(&self, pattern: &str, f: F)
    where
        F: Fn(&mut dyn ResponseWriter, &mut Request) + Send + Sync + 'static,
    {
        self.put(pattern, Arc::new(HandlerFn(f)));
    }

    pub fn delete_fn<F>(&self, pattern: &str, f: F)
    where
        F: Fn(&mut dyn ResponseWriter, &mut Request) + Send + Sync + 'static,
    {
        self.delete(pattern, Arc::new(HandlerFn(f)));
    }

    /// Insert a handler for `(pattern, method)`; `None` is the
    /// every-method fallback. Panics on an invalid pattern or a duplicate
    /// endpoint, since both mean the route table itself is wrong.
    pub(crate) fn register(&self, pattern: &str, handler: Arc<dyn Handler>, method: Option<Method>) {
        let parts = match pattern::parse_pattern(pattern) {
            Ok(parts) => parts,
            Err(err) => fail(err),
        };
        let method_label = method
            .as_ref()
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| "ALL".to_string());

        let mut inner = self.inner.write().unwrap();
        if parts.host.is_some() {
            inner.host_qualified = true;
        }

        let result = if parts.name.is_empty() {
            let entry = inner
                .root_entry
                .get_or_insert_with(|| Entry::new(parts.pattern.clone(), parts.regex.clone()));
            entry.insert(method, handler)
        } else {
            let node = node::insert(&mut inner.roots, "", &parts.name);
            let slot = if parts.trailing_slash {
                &mut node.entry_slash
            } else {
                &mut node.entry_noslash
            };
            let entry = slot
                .get_or_insert_with(|| Entry::new(parts.pattern.clone(), parts.regex.clone()));
            entry.insert(method, handler)
        };
        drop(inner);

        if let Err(err) = result {
            fail(err);
        }
        info!(pattern, method = %method_label, "endpoint registered");
    }

    /// Append global middlewares, run for every request in registration
    /// order before any per-namespace list.
    pub fn use_middleware<I>(&self, middlewares: I)
    where
        I: IntoIterator<Item = Arc<dyn Middleware>>,
    {
        let mut inner = self.inner.write().unwrap();
        inner.middlewares.extend(middlewares);
    }

    pub fn use_middleware_fn<F>(&self, f: F)
    where
        F: Fn(&mut dyn ResponseWriter, &mut Request, Next<'_>) + Send + Sync + 'static,
    {
        self.use_middleware([Arc::new(MiddlewareFn(f)) as Arc<dyn Middleware>]);
    }

    /// Append middlewares to the namespace at `path`, creating it if
    /// needed. They apply to every request whose matched pattern passes
    /// through that namespace.
    pub fn use_at<I>(&self, path: &str, middlewares: I)
    where
        I: IntoIterator<Item = Arc<dyn Middleware>>,
    {
        let middlewares: Vec<_> = middlewares.into_iter().collect();
        if middlewares.is_empty() {
            fail(RegistrationError::MissingHandler(path.to_string()));
        }
        let parts = match pattern::parse_pattern(path) {
            Ok(parts) => parts,
            Err(err) => fail(err),
        };

        let mut inner = self.inner.write().unwrap();
        if parts.name.is_empty() {
            inner.middlewares.extend(middlewares);
        } else {
            let node = node::insert(&mut inner.roots, "", &parts.name);
            node.middlewares.extend(middlewares);
        }
    }

    /// Set the process-wide middleware error handler. A second
    /// registration silently replaces the first.
    pub fn use_error_handler(&self, handler: Arc<dyn ErrorHandler>) {
        let mut inner = self.inner.write().unwrap();
        inner.error_handler = Some(handler);
    }

    pub fn use_error_handler_fn<F>(&self, f: F)
    where
        F: Fn(&mut dyn ResponseWriter, &mut Request, &Error) + Send + Sync + 'static,
    {
        self.use_error_handler(Arc::new(ErrorHandlerFn(f)));
    }

    /// Create (or return) the namespace subtree for `name` and hand back
    /// a handle that registers relative to it.
    pub fn namespace(&self, name: &str) -> Namespace<'_> {
        let (path, params) = match pattern::parse_namespace(name) {
            Ok(parsed) => parsed,
            Err(err) => fail(err),
        };
        {
            let mut inner = self.inner.write().unwrap();
            node::insert(&mut inner.roots, "", &path);
        }
        Namespace::new(self, path, params)
    }

    /// The single dispatch entry: resolve the request, thread it through
    /// the applicable middleware chain, and invoke the selected handler.
    pub fn dispatch(&self, w: &mut dyn ResponseWriter, req: &mut Request) {
        if req.path == "*" {
            // Wire compatibility: an asterisk-form request-URI is not a
            // routable path.
            w.header("Connection", "close");
            w.set_status(400);
            return;
        }

        let (resolution, chain, error_handler) = {
            let inner = self.inner.read().unwrap();
            let resolution = matcher::resolve_inner(&inner, req);
            let chain = matcher::middleware_chain(&inner, &resolution.pattern);
            (resolution, chain, inner.error_handler.clone())
        };
        req.set_params(resolution.params.clone().unwrap_or_default());

        let mut surfaced: Option<Error> = None;
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            middleware::run(&chain, resolution.handler.as_ref(), w, req, &mut surfaced);
        }));
        if outcome.is_err() {
            error!(pattern = %resolution.pattern, "request pipeline panicked");
            w.set_status(500);
            w.write(b"internal server error");
            return;
        }

        if let Some(err) = surfaced {
            error!(pattern = %resolution.pattern, error = %err, "middleware aborted the request");
            match error_handler {
                Some(handler) => handler.handle_error(w, req, &err),
                None => {
                    w.set_status(500);
                    w.header("Content-Type", "text/plain; charset=utf-8");
                    let detail = format!("{err:?}");
                    let excerpt: Vec<&str> = detail.lines().take(12).collect();
                    w.write(excerpt.join("\n").as_bytes());
                }
            }
        }
    }
}
