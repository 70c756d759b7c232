use libc::{
    AF_INET, AF_INET6, AF_UNSPEC, AI_PASSIVE, F_GETFL, F_SETFL, IPPROTO_IPV6, IPV6_V6ONLY,
    O_NONBLOCK, SO_REUSEADDR, SOCK_STREAM, SOL_SOCKET, SOMAXCONN, accept, addrinfo, bind, c_int,
    close, fcntl, freeaddrinfo, gai_strerror, getaddrinfo, getsockname, listen, read, setsockopt,
    sockaddr, sockaddr_in, sockaddr_in6, sockaddr_storage, socket, socklen_t,
};
use std::ffi::{CStr, CString};
use std::marker::PhantomData;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};
use std::os::fd::RawFd;
use std::{io, mem, ptr};

/// Reads from a file descriptor into the given buffer.
///
/// Returns the number of bytes read, or a negative value on error.
/// The file descriptor **must** be non-blocking.
pub(crate) fn sys_read(fd: RawFd, buffer: &mut [u8]) -> isize {
    unsafe { read(fd, buffer.as_mut_ptr() as *mut _, buffer.len()) }
}

/// Closes a file descriptor.
pub(crate) fn sys_close(fd: RawFd) {
    unsafe { close(fd) };
}

/// Adds `O_NONBLOCK` to the status flags of a descriptor, leaving every other flag untouched.
pub(crate) fn sys_set_nonblocking(fd: RawFd) -> io::Result<()> {
    let flags = unsafe { fcntl(fd, F_GETFL) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }

    let rc = unsafe { fcntl(fd, F_SETFL, flags | O_NONBLOCK) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(())
}

/// Reports whether `O_NONBLOCK` is set on a descriptor.
pub(crate) fn sys_is_nonblocking(fd: RawFd) -> io::Result<bool> {
    let flags = unsafe { fcntl(fd, F_GETFL) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(flags & O_NONBLOCK != 0)
}

/// Creates a socket for one resolver candidate.
///
/// The socket is left in blocking mode; callers switch it once it is bound.
pub(crate) fn sys_socket(domain: c_int, kind: c_int, protocol: c_int) -> io::Result<RawFd> {
    let fd = unsafe { socket(domain, kind, protocol) };
    if fd < 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(fd)
}

/// Binds a socket to an address.
pub(crate) fn sys_bind(fd: RawFd, addr: *const sockaddr, len: socklen_t) -> io::Result<()> {
    let rc = unsafe { bind(fd, addr, len) };
    if rc < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

/// Marks a socket as listening, with the platform's maximum backlog.
pub(crate) fn sys_listen(fd: RawFd) -> io::Result<()> {
    let rc = unsafe { listen(fd, SOMAXCONN) };
    if rc < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

/// Accepts one pending connection.
///
/// The peer address is converted numerically; no reverse lookup happens.
/// The returned descriptor keeps the blocking mode the kernel gave it.
pub(crate) fn sys_accept(fd: RawFd) -> io::Result<(RawFd, SocketAddr)> {
    let mut storage: sockaddr_storage = unsafe { mem::zeroed() };
    let mut len = mem::size_of::<sockaddr_storage>() as socklen_t;

    let client_fd = unsafe { accept(fd, &mut storage as *mut _ as *mut sockaddr, &mut len) };

    if client_fd < 0 {
        return Err(io::Error::last_os_error());
    }

    match sockaddr_storage_to_socketaddr(&storage) {
        Ok(addr) => Ok((client_fd, addr)),
        Err(e) => {
            sys_close(client_fd);
            Err(e)
        }
    }
}

/// Returns the local address of a socket.
pub(crate) fn sys_sockname(fd: RawFd) -> io::Result<SocketAddr> {
    let mut storage: sockaddr_storage = unsafe { mem::zeroed() };
    let mut len = mem::size_of::<sockaddr_storage>() as socklen_t;

    let rc = unsafe { getsockname(fd, &mut storage as *mut _ as *mut sockaddr, &mut len) };

    if rc < 0 {
        Err(io::Error::last_os_error())
    } else {
        sockaddr_storage_to_socketaddr(&storage)
    }
}

/// Enables `SO_REUSEADDR` on a socket.
pub(crate) fn sys_set_reuseaddr(fd: RawFd) -> io::Result<()> {
    let yes: c_int = 1;
    let rc = unsafe {
        setsockopt(
            fd,
            SOL_SOCKET,
            SO_REUSEADDR,
            &yes as *const _ as *const _,
            mem::size_of::<c_int>() as socklen_t,
        )
    };

    if rc < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

/// Enables IPv6 dual-stack support when required.
pub(crate) fn sys_ipv6_is_necessary(fd: RawFd, domain: c_int) -> io::Result<()> {
    if domain == AF_INET6 {
        sys_set_v6only(fd, false)?;
    }
    Ok(())
}

/// Sets the `IPV6_V6ONLY` socket option.
pub(crate) fn sys_set_v6only(fd: RawFd, v6only: bool) -> io::Result<()> {
    let value: c_int = if v6only { 1 } else { 0 };

    let rc = unsafe {
        setsockopt(
            fd,
            IPPROTO_IPV6,
            IPV6_V6ONLY,
            &value as *const _ as *const _,
            mem::size_of::<c_int>() as socklen_t,
        )
    };

    if rc < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

/// Converts a `sockaddr_storage` to a Rust `SocketAddr`.
pub(crate) fn sockaddr_storage_to_socketaddr(storage: &sockaddr_storage) -> io::Result<SocketAddr> {
    match storage.ss_family as c_int {
        AF_INET => {
            let addr = unsafe { &*(storage as *const _ as *const sockaddr_in) };
            let ip = Ipv4Addr::from(u32::from_be(addr.sin_addr.s_addr));
            let port = u16::from_be(addr.sin_port);

            Ok(SocketAddr::V4(SocketAddrV4::new(ip, port)))
        }

        AF_INET6 => {
            let addr = unsafe { &*(storage as *const _ as *const sockaddr_in6) };
            let ip = Ipv6Addr::from(addr.sin6_addr.s6_addr);
            let port = u16::from_be(addr.sin6_port);

            Ok(SocketAddr::V6(SocketAddrV6::new(
                ip,
                port,
                addr.sin6_flowinfo,
                addr.sin6_scope_id,
            )))
        }

        _ => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "unsupported address family",
        )),
    }
}

/// One passive stream address returned by the resolver.
pub(crate) struct Candidate<'a> {
    pub(crate) family: c_int,
    pub(crate) kind: c_int,
    pub(crate) protocol: c_int,
    pub(crate) addr: *const sockaddr,
    pub(crate) len: socklen_t,
    _list: PhantomData<&'a AddrInfo>,
}

/// Owned result list of `getaddrinfo(3)`, released with `freeaddrinfo(3)`.
pub(crate) struct AddrInfo {
    head: *mut addrinfo,
}

impl AddrInfo {
    /// Iterates candidates in the order the resolver returned them.
    pub(crate) fn iter(&self) -> impl Iterator<Item = Candidate<'_>> {
        let mut cursor = self.head;

        std::iter::from_fn(move || {
            if cursor.is_null() {
                return None;
            }

            let entry = unsafe { &*cursor };
            cursor = entry.ai_next;

            Some(Candidate {
                family: entry.ai_family,
                kind: entry.ai_socktype,
                protocol: entry.ai_protocol,
                addr: entry.ai_addr as *const sockaddr,
                len: entry.ai_addrlen,
                _list: PhantomData,
            })
        })
    }
}

impl Drop for AddrInfo {
    fn drop(&mut self) {
        if !self.head.is_null() {
            unsafe { freeaddrinfo(self.head) };
        }
    }
}

/// Resolves a port or service name to wildcard stream addresses of any family.
///
/// On failure the resolver's own message is returned.
pub(crate) fn sys_resolve_passive(service: &str) -> Result<AddrInfo, String> {
    let service =
        CString::new(service).map_err(|_| format!("service {service:?} contains a nul byte"))?;

    let mut hints: addrinfo = unsafe { mem::zeroed() };
    hints.ai_family = AF_UNSPEC;
    hints.ai_socktype = SOCK_STREAM;
    hints.ai_flags = AI_PASSIVE;

    let mut head: *mut addrinfo = ptr::null_mut();
    let rc = unsafe { getaddrinfo(ptr::null(), service.as_ptr(), &hints, &mut head) };

    if rc != 0 {
        let message = unsafe { CStr::from_ptr(gai_strerror(rc)) };
        return Err(message.to_string_lossy().into_owned());
    }

    Ok(AddrInfo { head })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipe() -> (RawFd, RawFd) {
        let mut fds = [0; 2];
        let rc = unsafe { libc::pipe(fds.as_mut_ptr()) };
        assert_eq!(rc, 0, "pipe failed");
        (fds[0], fds[1])
    }

    #[test]
    fn set_nonblocking_keeps_other_flags() {
        let (reader, writer) = pipe();

        let before = unsafe { fcntl(reader, F_GETFL) };
        assert!(!sys_is_nonblocking(reader).unwrap());

        sys_set_nonblocking(reader).unwrap();
        sys_set_nonblocking(reader).unwrap();

        let after = unsafe { fcntl(reader, F_GETFL) };
        assert_eq!(after, before | O_NONBLOCK);
        assert!(sys_is_nonblocking(reader).unwrap());

        sys_close(reader);
        sys_close(writer);
    }

    #[test]
    fn nonblocking_read_on_empty_pipe_would_block() {
        let (reader, writer) = pipe();
        sys_set_nonblocking(reader).unwrap();

        let mut buffer = [0u8; 8];
        assert!(sys_read(reader, &mut buffer) < 0);
        assert_eq!(
            io::Error::last_os_error().kind(),
            io::ErrorKind::WouldBlock
        );

        sys_close(reader);
        sys_close(writer);
    }

    #[test]
    fn set_nonblocking_on_closed_descriptor_fails() {
        let (reader, writer) = pipe();
        sys_close(reader);
        sys_close(writer);

        assert!(sys_set_nonblocking(reader).is_err());
    }

    #[test]
    fn resolve_numeric_port_yields_wildcard_candidates() {
        let list = sys_resolve_passive("4242").unwrap();
        let candidates: Vec<_> = list.iter().collect();

        assert!(!candidates.is_empty());
        for candidate in candidates {
            assert_eq!(candidate.kind, SOCK_STREAM);

            let mut storage: sockaddr_storage = unsafe { mem::zeroed() };
            unsafe {
                ptr::copy_nonoverlapping(
                    candidate.addr as *const u8,
                    &mut storage as *mut _ as *mut u8,
                    candidate.len as usize,
                );
            }

            let addr = sockaddr_storage_to_socketaddr(&storage).unwrap();
            assert_eq!(addr.port(), 4242);
            assert!(addr.ip().is_unspecified());
        }
    }

    #[test]
    fn resolve_unknown_service_reports_resolver_message() {
        let err = sys_resolve_passive("edgerelay-no-such-service").err().unwrap();
        assert!(!err.is_empty());
    }

    #[test]
    fn resolve_rejects_interior_nul() {
        assert!(sys_resolve_passive("80\0").is_err());
    }
}
