//! TCP networking implementation.
//!
//! It is split into:
//! - [`listener`]: the listening endpoint and its socket factory,
//! - [`connection`]: accepted client sockets owned by the reactor.

pub mod connection;
pub mod listener;
