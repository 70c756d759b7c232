//! Error types and utilities

use std::io;
use thiserror::Error;

/// Errors that stop the relay.
///
/// Per-descriptor failures (a refused accept, a read error, a peer closing
/// its side, an error on the listener) are handled inside the reactor and
/// never surface here.
#[derive(Error, Debug)]
pub enum Error {
    #[error("{context}: {source}")]
    Setup {
        context: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("Failed to resolve listening address: {0}")]
    Resolve(String),

    #[error("Could not bind any address for port {0:?}")]
    NoBindableAddress(String),

    #[error("Failed to register descriptor with the poller: {0}")]
    Registration(#[source] io::Error),

    #[error("Failed to forward bytes to the output sink: {0}")]
    OutputSink(#[source] io::Error),

    #[error("Waiting for readiness events failed: {0}")]
    Poll(#[source] io::Error),
}

impl Error {
    pub(crate) fn setup(context: &'static str, source: io::Error) -> Self {
        Error::Setup { context, source }
    }

    /// Whether this error happened while bringing the listener or the poller up.
    pub fn is_setup(&self) -> bool {
        matches!(
            self,
            Error::Setup { .. } | Error::Resolve(_) | Error::NoBindableAddress(_)
        )
    }
}

/// Crate-wide result type
pub type Result<T> = std::result::Result<T, Error>;
