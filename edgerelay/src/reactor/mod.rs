//! Reactor core and event handling.
//!
//! This module implements the single-threaded event loop of the relay.
//! The reactor is responsible for:
//! - waiting on the poller, the only place the thread ever blocks,
//! - draining the listener's backlog into the connection table,
//! - draining readable connections into the output sink,
//! - closing connections whose peer went away.

mod acceptor;
mod core;
mod relay;

pub(crate) mod event;
pub(crate) mod poller;

pub use self::core::Reactor;
