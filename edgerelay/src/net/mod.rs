//! TCP networking primitives.
//!
//! Thin owners of raw sockets: each type closes its descriptor when it is
//! dropped, and every socket handed to the reactor is non-blocking.
//!
//! These types are driven by [`Reactor`](crate::Reactor) and are not meant to
//! be used with blocking I/O.
mod tcp;

pub use tcp::connection::Connection;
pub use tcp::listener::TcpListener;
