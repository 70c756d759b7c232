//! Forwarding of client bytes to the output sink.
//!
//! A connection is only reported again after new data arrives, so each
//! readiness event drains the socket until it would block.

use crate::error::{Error, Result};
use crate::net::Connection;

use std::io::{self, Write};
use tracing::{debug, warn};

/// What the drain loop left behind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Drained {
    /// The socket would block; wait for the next readiness edge.
    Open,

    /// The peer shut down or the read failed; close the connection.
    Closed,
}

/// Reads everything currently available on `connection` into `sink`.
///
/// Reads happen in `buffer`-sized chunks until the socket would block, so
/// no bytes are left behind under edge-triggered notification. Every chunk
/// is written out completely and flushed before the next read.
///
/// A failure to write to the sink is fatal. A read failure only closes this
/// connection.
pub(crate) fn drain<W: Write>(
    connection: &Connection,
    buffer: &mut [u8],
    sink: &mut W,
) -> Result<Drained> {
    loop {
        match connection.read(buffer) {
            Ok(0) => return Ok(Drained::Closed),
            Ok(n) => {
                sink.write_all(&buffer[..n])
                    .and_then(|_| sink.flush())
                    .map_err(Error::OutputSink)?;
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(Drained::Open),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                debug!("read on descriptor {} interrupted, retrying", connection.fd());
            }
            Err(e) => {
                warn!("read on descriptor {} failed: {}", connection.fd(), e);
                return Ok(Drained::Closed);
            }
        }
    }
}
