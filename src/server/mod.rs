//! # Server
//!
//! Transport adapter built on `may_minihttp` and the `may` coroutine
//! runtime. The multiplexer itself is transport-agnostic; this module
//! turns a raw connection request into the owned [`crate::Request`]
//! view, hands a buffered [`crate::ResponseBuffer`] through the dispatch
//! entry, and flushes the outcome to the wire.
//!
//! ```text
//! connection → MuxService → Mux::dispatch → middleware chain → handler
//! ```

mod http_server;
mod service;

pub use http_server::{serve, ServerHandle};
pub use service::MuxService;
