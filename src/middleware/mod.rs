//! # Middleware engine
//!
//! Middlewares intercept a request before its handler runs. Global
//! middlewares execute first, then the lists attached to each namespace
//! node along the matched pattern, root to leaf, each in registration
//! order. A node's list applies to every path that passes through it.
//!
//! Continuation is cooperative: each middleware receives a [`Next`] and
//! either proceeds, fails with an error (surfaced to the singleton
//! [`ErrorHandler`] or a default 500), or drops it to short-circuit. The
//! chain is a direct recursive walk; cancellation via the request's
//! token stops it between steps.

mod chain;
mod core;

pub use chain::Next;
pub use core::{ErrorHandler, ErrorHandlerFn, Middleware, MiddlewareFn};

pub(crate) use chain::run;
