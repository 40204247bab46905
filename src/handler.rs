use tracing::debug;

use crate::request::Request;
use crate::response::ResponseWriter;

/// A request endpoint. Handlers are registered once and shared read-only
/// across serving threads.
pub trait Handler: Send + Sync {
    fn serve(&self, w: &mut dyn ResponseWriter, r: &mut Request);
}

/// Adapter that lets a plain function serve as a [`Handler`].
pub struct HandlerFn<F>(pub F);

impl<F> Handler for HandlerFn<F>
where
    F: Fn(&mut dyn ResponseWriter, &mut Request) + Send + Sync,
{
    fn serve(&self, w: &mut dyn ResponseWriter, r: &mut Request) {
        (self.0)(w, r)
    }
}

/// Library handler for unmatched requests: 404, empty body.
pub struct NotFoundHandler;

impl Handler for NotFoundHandler {
    fn serve(&self, w: &mut dyn ResponseWriter, r: &mut Request) {
        debug!(method = %r.method, path = %r.path, "no route matched");
        w.set_status(404);
    }
}

/// Library handler for trailing-slash and path-cleaning redirects:
/// 301 with `Location` set to the target path plus the preserved raw
/// query string.
pub struct RedirectHandler {
    location: String,
}

impl RedirectHandler {
    pub(crate) fn new(location: String) -> Self {
        Self { location }
    }

    pub fn location(&self) -> &str {
        &self.location
    }
}

impl Handler for RedirectHandler {
    fn serve(&self, w: &mut dyn ResponseWriter, r: &mut Request) {
        debug!(from = %r.path, to = %self.location, "redirecting");
        w.header("Location", &self.location);
        w.set_status(301);
    }
}
