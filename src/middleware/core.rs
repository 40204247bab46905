use anyhow::Error;

use super::chain::Next;
use crate::request::Request;
use crate::response::ResponseWriter;

/// An interceptor in the request pipeline.
///
/// A middleware must resolve its continuation exactly once: call
/// [`Next::proceed`] to hand the request onward, or [`Next::fail`] to
/// abort with an error. Returning with the continuation unused halts the
/// pipeline silently, which is the short-circuit idiom (the middleware is
/// expected to have written the response itself).
pub trait Middleware: Send + Sync {
    fn intercept(&self, w: &mut dyn ResponseWriter, r: &mut Request, next: Next<'_>);
}

/// Adapter that lets a plain function serve as a [`Middleware`].
pub struct MiddlewareFn<F>(pub F);

impl<F> Middleware for MiddlewareFn<F>
where
    F: Fn(&mut dyn ResponseWriter, &mut Request, Next<'_>) + Send + Sync,
{
    fn intercept(&self, w: &mut dyn ResponseWriter, r: &mut Request, next: Next<'_>) {
        (self.0)(w, r, next)
    }
}

/// Receiver for errors surfaced by middlewares. A single handler exists
/// per multiplexer; it owns writing the response for the failed request.
pub trait ErrorHandler: Send + Sync {
    fn handle_error(&self, w: &mut dyn ResponseWriter, r: &mut Request, err: &Error);
}

/// Adapter that lets a plain function serve as an [`ErrorHandler`].
pub struct ErrorHandlerFn<F>(pub F);

impl<F> ErrorHandler for ErrorHandlerFn<F>
where
    F: Fn(&mut dyn ResponseWriter, &mut Request, &Error) + Send + Sync,
{
    fn handle_error(&self, w: &mut dyn ResponseWriter, r: &mut Request, err: &Error) {
        (self.0)(w, r, err)
    }
}
