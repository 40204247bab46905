use std::sync::Arc;

use anyhow::Error;
use tracing::debug;

use super::core::Middleware;
use crate::handler::Handler;
use crate::request::Request;
use crate::response::ResponseWriter;

/// Continuation handed to a middleware. Consuming it is the only way to
/// keep the pipeline moving, so the exactly-once contract holds by
/// construction; dropping it halts the pipeline without error.
pub struct Next<'a> {
    rest: &'a [Arc<dyn Middleware>],
    handler: &'a dyn Handler,
    error: &'a mut Option<Error>,
}

impl Next<'_> {
    /// Continue with the next middleware in the chain, or with the
    /// handler once the chain is exhausted.
    pub fn proceed(self, w: &mut dyn ResponseWriter, r: &mut Request) {
        run(self.rest, self.handler, w, r, self.error);
    }

    /// Abort the pipeline. The handler is not invoked; the error is
    /// surfaced to the registered error handler after unwinding.
    pub fn fail(self, err: Error) {
        *self.error = Some(err);
    }
}

/// Walk the chain front to back, cooperatively. Cancellation is checked
/// before every step, including the hand-off to the handler.
pub(crate) fn run(
    chain: &[Arc<dyn Middleware>],
    handler: &dyn Handler,
    w: &mut dyn ResponseWriter,
    r: &mut Request,
    error: &mut Option<Error>,
) {
    if r.cancel_token().is_cancelled() {
        debug!(path = %r.path, "request cancelled, pipeline stopped");
        return;
    }
    match chain.split_first() {
        None => handler.serve(w, r),
        Some((middleware, rest)) => middleware.intercept(
            w,
            r,
            Next {
                rest,
                handler,
                error,
            },
        ),
    }
}
