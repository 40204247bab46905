use std::sync::Arc;

use http::Method;

use super::core::Mux;
use crate::error::{fail, RegistrationError};
use crate::handler::{Handler, HandlerFn};
use crate::middleware::{Middleware, MiddlewareFn, Next};
use crate::request::Request;
use crate::response::ResponseWriter;
use crate::store::node;
use crate::store::pattern;

/// Handle to a namespace subtree. It remembers the absolute normalized
/// path of its node and the original parameter names consumed while
/// normalizing, so relative registrations can reconstruct full patterns
/// with the registrant's spelling.
pub struct Namespace<'m> {
    mux: &'m Mux,
    path: String,
    params: Vec<String>,
}

impl<'m> Namespace<'m> {
    pub(crate) fn new(mux: &'m Mux, path: String, params: Vec<String>) -> Self {
        Self { mux, path, params }
    }

    /// Absolute normalized path of the namespace node.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Create (or return) a namespace nested under this one.
    pub fn namespace(&self, name: &str) -> Namespace<'m> {
        let (sub_path, sub_params) = match pattern::parse_namespace(name) {
            Ok(parsed) => parsed,
            Err(err) => fail(err),
        };
        let path = format!("{}/{}", self.path, sub_path);
        {
            let mut inner = self.mux.inner.write().unwrap();
            node::insert(&mut inner.roots, "", &path);
        }
        let mut params = self.params.clone();
        params.extend(sub_params);
        Namespace::new(self.mux, path, params)
    }

    /// Register for every method. An empty `sub_pattern` terminates at
    /// the namespace node itself, without a trailing slash.
    pub fn all(&self, sub_pattern: &str, handler: Arc<dyn Handler>) {
        self.register(sub_pattern, handler, None);
    }

    pub fn get(&self, sub_pattern: &str, handler: Arc<dyn Handler>) {
        self.register(sub_pattern, handler, Some(Method::GET));
    }

    pub fn post(&self, sub_pattern: &str, handler: Arc<dyn Handler>) {
        self.register(sub_pattern, handler, Some(Method::POST));
    }

    pub fn put(&self, sub_pattern: &str, handler: Arc<dyn Handler>) {
        self.register(sub_pattern, handler, Some(Method::PUT));
    }

    pub fn delete(&self, sub_pattern: &str, handler: Arc<dyn Handler>) {
        self.register(sub_pattern, handler, Some(Method::DELETE));
    }

    pub fn all_fn<F>(&self, sub_pattern: &str, f: F)
    where
        F: Fn(&mut dyn ResponseWriter, &mut Request) + Send + Sync + 'static,
    {
        self.all(sub_pattern, Arc::new(HandlerFn(f)));
    }

    pub fn get_fn<F>(&self, sub_pattern: &str, f: F)
    where
        F: Fn(&mut dyn ResponseWriter, &mut Request) + Send + Sync + 'static,
    {
        self.get(sub_pattern, Arc::new(HandlerFn(f)));
    }

    pub fn post_fn<F>(&self, sub_pattern: &str, f: F)
    where
        F: Fn(&mut dyn ResponseWriter, &mut Request) + Send + Sync + 'static,
    {
        self.post(sub_pattern, Arc::new(HandlerFn(f)));
    }

    pub fn put_fn<F>(&self, sub_pattern: &str, f: F)
    where
        F: Fn(&mut dyn ResponseWriter, &mut Request) + Send + Sync + 'static,
    {
        self.put(sub_pattern, Arc::new(HandlerFn(f)));
    }

    pub fn delete_fn<F>(&self, sub_pattern: &str, f: F)
    where
        F: Fn(&mut dyn ResponseWriter, &mut Request) + Send + Sync + 'static,
    {
        self.delete(sub_pattern, Arc::new(HandlerFn(f)));
    }

    /// Append middlewares to this namespace's node.
    pub fn use_middleware<I>(&self, middlewares: I)
    where
        I: IntoIterator<Item = Arc<dyn Middleware>>,
    {
        let middlewares: Vec<_> = middlewares.into_iter().collect();
        if middlewares.is_empty() {
            fail(RegistrationError::MissingHandler(self.path.clone()));
        }
        let mut inner = self.mux.inner.write().unwrap();
        let found = node::insert(&mut inner.roots, "", &self.path);
        found.middlewares.extend(middlewares);
    }

    pub fn use_middleware_fn<F>(&self, f: F)
    where
        F: Fn(&mut dyn ResponseWriter, &mut Request, Next<'_>) + Send + Sync + 'static,
    {
        self.use_middleware([Arc::new(MiddlewareFn(f)) as Arc<dyn Middleware>]);
    }

    fn register(&self, sub_pattern: &str, handler: Arc<dyn Handler>, method: Option<Method>) {
        let full = self.full_pattern(sub_pattern);
        self.mux.register(&full, handler, method);
    }

    /// The handle's prefix with the registrant's parameter names put
    /// back, joined with the sub-pattern.
    fn full_pattern(&self, sub_pattern: &str) -> String {
        if !sub_pattern.is_empty() && !sub_pattern.starts_with('/') {
            fail(RegistrationError::InvalidPattern(sub_pattern.to_string()));
        }
        let mut names = self.params.iter();
        let prefix: Vec<String> = self
            .path
            .split('/')
            .map(|token| {
                if token == "{}" {
                    format!("{{{}}}", names.next().map(String::as_str).unwrap_or_default())
                } else {
                    token.to_string()
                }
            })
            .collect();
        format!("/{}{}", prefix.join("/"), sub_pattern)
    }
}
