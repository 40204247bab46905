//! # Multiplexer
//!
//! The [`Mux`] accepts registrations keyed by host, path, and method,
//! resolves incoming requests against the pattern store, and dispatches
//! them through the middleware engine.
//!
//! ## Resolution
//!
//! A request's path is cleaned (dot segments resolved, trailing slash
//! preserved), then tried as `host + path` when any registration used a
//! host prefix, and as the bare path otherwise. The node terminating the
//! walk holds up to two entries, one per trailing-slash variant; the
//! non-slash one wins when both regexes agree. A handler for the
//! request's method is looked up, falling back to the every-method slot.
//!
//! ## Redirects
//!
//! When nothing matches directly, the opposite trailing-slash variant is
//! probed; if it exists and can serve the request's method, the client
//! gets a 301 to it. A direct hit on a path that cleaning rewrote is
//! also answered with a 301 to the canonical form, except at the root.
//!
//! ## Example
//!
//! ```rust,ignore
//! use nsmux::Mux;
//!
//! let mux = Mux::new();
//! mux.get_fn("/users/{id}", |w, r| {
//!     let id = r.params()["id"].clone();
//!     w.write(id.as_bytes());
//! });
//! let api = mux.namespace("api");
//! api.get_fn("/reports", |w, _r| w.write(b"[]"));
//! ```

mod core;
mod matcher;
mod namespace;

pub use core::Mux;
pub use matcher::Resolution;
pub use namespace::Namespace;
