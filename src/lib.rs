//! A single-threaded, event-driven HTTP/1.0 server built directly on
//! non-blocking sockets and `mio`'s edge-triggered readiness multiplexer.
//!
//! The server answers exactly one request per connection, then closes it:
//! no keep-alive, no pipelining, no request bodies. See [`server::Server`]
//! for the connection lifecycle engine and [`handler::HandlerTask`] for the
//! per-connection state machine that drives a request to completion.

pub mod bstr;
pub mod coro;
pub mod error;
pub mod format;
pub mod handler;
pub mod http;
pub mod io;
pub mod server;

pub use error::{CleanError, Result};
pub use server::Server;
