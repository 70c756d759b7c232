use super::connection::Connection;
use crate::error::{Error, Result};
use crate::reactor::poller::platform::{
    sys_accept, sys_bind, sys_close, sys_ipv6_is_necessary, sys_is_nonblocking, sys_listen,
    sys_resolve_passive, sys_set_nonblocking, sys_set_reuseaddr, sys_socket, sys_sockname,
};

use std::io;
use std::net::SocketAddr;
use std::os::fd::{AsRawFd, RawFd};
use tracing::debug;

/// The listening endpoint of the relay.
///
/// Bound to every local address of the first address family that works,
/// non-blocking, and closed exactly once when dropped.
#[derive(Debug)]
pub struct TcpListener {
    /// File descriptor of the listening socket.
    fd: RawFd,
}

impl TcpListener {
    /// Binds a listener to `port`, a numeric port or a service name.
    ///
    /// Resolver candidates are tried in the order they are returned; the
    /// first one that opens a socket and binds wins. This function:
    /// - enables `SO_REUSEADDR`,
    /// - configures IPv6 dual-stack if applicable,
    /// - binds, switches to non-blocking mode and starts listening with the
    ///   platform's maximum backlog.
    pub fn bind(port: &str) -> Result<Self> {
        let candidates = sys_resolve_passive(port).map_err(Error::Resolve)?;

        let mut bound = None;
        for candidate in candidates.iter() {
            let fd = match sys_socket(candidate.family, candidate.kind, candidate.protocol) {
                Ok(fd) => fd,
                Err(e) => {
                    debug!("socket(family = {}) failed: {}", candidate.family, e);
                    continue;
                }
            };

            // Owned from here on, so every failed candidate is closed.
            let listener = Self { fd };

            let attempt = sys_set_reuseaddr(fd)
                .and_then(|_| sys_ipv6_is_necessary(fd, candidate.family))
                .and_then(|_| sys_bind(fd, candidate.addr, candidate.len));

            match attempt {
                Ok(()) => {
                    bound = Some(listener);
                    break;
                }
                Err(e) => debug!("bind(family = {}) failed: {}", candidate.family, e),
            }
        }

        let listener = bound.ok_or_else(|| Error::NoBindableAddress(port.to_string()))?;

        sys_set_nonblocking(listener.fd)
            .map_err(|e| Error::setup("failed to make listening socket non-blocking", e))?;
        sys_listen(listener.fd).map_err(|e| Error::setup("failed to listen", e))?;

        Ok(listener)
    }

    /// Accepts one pending connection.
    ///
    /// Returns `WouldBlock` once the backlog is empty. The accepted socket is
    /// returned as the kernel created it; the caller decides its mode.
    pub fn accept(&self) -> io::Result<Connection> {
        let (fd, peer) = sys_accept(self.fd)?;

        Ok(Connection::new(fd, peer))
    }

    /// Returns the local socket address of this listener.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        sys_sockname(self.fd)
    }

    /// Whether the listening socket is in non-blocking mode.
    pub fn is_nonblocking(&self) -> io::Result<bool> {
        sys_is_nonblocking(self.fd)
    }
}

impl AsRawFd for TcpListener {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

impl Drop for TcpListener {
    /// Closes the listening socket.
    fn drop(&mut self) {
        sys_close(self.fd);
    }
}
