use crate::reactor::poller::platform::{
    sys_close, sys_is_nonblocking, sys_read, sys_set_nonblocking,
};

use std::io;
use std::net::SocketAddr;
use std::os::fd::{AsRawFd, RawFd};

/// An accepted client connection.
///
/// The connection owns its descriptor: dropping it closes the socket
/// exactly once. The reactor removes the poller registration first.
#[derive(Debug)]
pub struct Connection {
    /// The underlying file descriptor.
    fd: RawFd,

    /// Address of the peer, as reported by `accept`.
    peer: SocketAddr,
}

impl Connection {
    pub(crate) fn new(fd: RawFd, peer: SocketAddr) -> Self {
        Self { fd, peer }
    }

    /// Returns the descriptor number of this connection.
    pub fn fd(&self) -> RawFd {
        self.fd
    }

    /// Returns the peer address.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Whether the socket is in non-blocking mode.
    pub fn is_nonblocking(&self) -> io::Result<bool> {
        sys_is_nonblocking(self.fd)
    }

    pub(crate) fn set_nonblocking(&self) -> io::Result<()> {
        sys_set_nonblocking(self.fd)
    }

    /// Reads once into `buffer`.
    ///
    /// `Ok(0)` means the peer shut down its side of the stream.
    pub(crate) fn read(&self, buffer: &mut [u8]) -> io::Result<usize> {
        let n = sys_read(self.fd, buffer);

        if n < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(n as usize)
    }
}

impl AsRawFd for Connection {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

impl Drop for Connection {
    /// Closes the client socket.
    fn drop(&mut self) {
        sys_close(self.fd);
    }
}
