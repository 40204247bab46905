//! # nsmux
//!
//! A host-aware HTTP request multiplexer. Incoming requests are matched
//! on host, path, and method against patterns such as
//! `/customers/{id}/gifs/` or `site.com/users`, then threaded through an
//! ordered chain of middlewares before the selected handler runs.
//!
//! Three subsystems cooperate:
//!
//! - the **pattern store** ([`store`], internal): a namespace tree of
//!   normalized pattern fragments, each terminal node holding compiled
//!   regexes and per-method handler tables;
//! - the **matcher** (part of [`mux`]): path cleaning, host-qualified
//!   lookup, parameter capture, and the trailing-slash redirect policy;
//! - the **middleware engine** ([`middleware`]): global and per-namespace
//!   interceptors with cooperative `next` continuation, error surfacing,
//!   and cancellation.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use nsmux::Mux;
//!
//! let mux = Arc::new(Mux::new());
//! mux.get_fn("/greet", |w, _r| w.write(b"Hello, Requester"));
//! mux.use_middleware_fn(|w, r, next| {
//!     if r.header("authorization").is_some() {
//!         next.proceed(w, r);
//!     } else {
//!         w.set_status(401);
//!     }
//! });
//! let handle = nsmux::server::serve(mux, "0.0.0.0:8080")?;
//! handle.join().unwrap();
//! # Ok::<(), std::io::Error>(())
//! ```

mod error;
mod handler;
pub mod middleware;
pub mod mux;
mod request;
mod response;
pub mod server;
mod store;

pub use error::RegistrationError;
pub use handler::{Handler, HandlerFn, NotFoundHandler, RedirectHandler};
pub use middleware::{ErrorHandler, ErrorHandlerFn, Middleware, MiddlewareFn, Next};
pub use mux::{Mux, Namespace, Resolution};
pub use request::{BodyError, CancelToken, Params, Request};
pub use response::{ResponseBuffer, ResponseWriter};
