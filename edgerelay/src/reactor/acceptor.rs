//! Socket acceptance for the listening endpoint.
//!
//! Under edge-triggered notification the listener is only reported when the
//! backlog goes from empty to non-empty, so every pending connection is
//! accepted before returning to the poller.

use crate::error::{Error, Result};
use crate::net::{Connection, TcpListener};
use crate::reactor::event::Token;
use crate::reactor::poller::{Interest, Poller};
use crate::utils::Slab;

use std::io;
use tracing::{debug, info, warn};

/// Accepts every pending connection on `listener`.
///
/// Each accepted socket is made non-blocking, stored in `connections` and
/// registered with `poller` under the token of its slot.
///
/// # Behavior
/// - If no connection is pending (`WouldBlock`), stops without error
/// - If interrupted by a signal, retries
/// - Any other accept failure is logged and ends this round; the listener
///   stays usable
///
/// Failing to make a socket non-blocking or to register it is fatal.
pub(crate) fn accept_clients(
    listener: &TcpListener,
    poller: &Poller,
    connections: &mut Slab<Connection>,
) -> Result<()> {
    let mut accepted = 0;

    loop {
        let connection = match listener.accept() {
            Ok(connection) => connection,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!("accept failed: {}", e);
                break;
            }
        };

        connection
            .set_nonblocking()
            .map_err(|e| Error::setup("failed to make accepted socket non-blocking", e))?;

        let fd = connection.fd();
        let peer = connection.peer_addr();
        let key = connections.insert(connection);

        if let Err(e) = poller.register(fd, Token::from(key), Interest::READ_EDGE) {
            connections.remove(key);
            return Err(Error::Registration(e));
        }

        info!(
            "accepted connection on descriptor {} (host = {}, port = {})",
            fd,
            peer.ip(),
            peer.port()
        );
        accepted += 1;
    }

    debug!("accepted {} connection(s) this round", accepted);

    Ok(())
}
