//! # edgerelay
//!
//! **edgerelay** is a single-threaded, edge-triggered TCP server. It accepts
//! any number of concurrent connections on one port and copies every byte it
//! receives, unmodified, to an output sink (standard output in the binary).
//!
//! Nothing is ever sent back to clients. There is no framing and no
//! backpressure beyond the kernel's socket buffers.
//!
//! The crate is built around a small readiness-driven core:
//!
//! - A **poller** wrapping `epoll` (Linux) or `kqueue` (macOS), with every
//!   descriptor registered for edge-triggered read readiness
//! - A **listener** bound to the wildcard address of the first address family
//!   that works for the requested port
//! - A **reactor** that waits on the poller, drains the listener's backlog and
//!   drains every readable connection until it would block
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgerelay::{Config, Reactor};
//!
//! fn main() -> edgerelay::Result<()> {
//!     let config = Config::new("7000");
//!     let mut reactor = Reactor::new(&config, std::io::stdout().lock())?;
//!
//!     // Blocks forever, relaying every client's bytes to stdout.
//!     reactor.run()
//! }
//! ```
//!
//! ## Modules
//!
//! - [`config`] — Port and tuning knobs, doubling as the CLI definition
//! - [`error`] — Fatal error taxonomy
//! - [`net`] — Listening socket and accepted connections

mod reactor;
mod utils;

pub mod config;
pub mod error;
pub mod net;

pub use config::Config;
pub use error::{Error, Result};
pub use reactor::Reactor;
