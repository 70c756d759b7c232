//! Linux `epoll`-based poller implementation.
//!
//! Responsibilities:
//! - Register file descriptors with read interest, edge-triggered
//! - Remove them again before they are closed
//! - Block waiting for I/O readiness
//!
//! This backend is selected automatically on Linux targets.

use super::common::Interest;
use crate::reactor::event::{Event, Token};

use libc::{
    EPOLL_CLOEXEC, EPOLL_CTL_ADD, EPOLL_CTL_DEL, EPOLLERR, EPOLLET, EPOLLHUP, EPOLLIN,
    epoll_create1, epoll_ctl, epoll_event, epoll_wait,
};
use std::io;
use std::os::unix::io::RawFd;
use std::time::Duration;

/// Linux `epoll` poller.
///
/// Owns the `epoll` instance and a reusable event buffer whose capacity
/// bounds the number of events returned by one [`poll`](Self::poll).
pub(crate) struct EpollPoller {
    /// Epoll file descriptor.
    epoll: RawFd,

    /// Reusable buffer for epoll events.
    events: Vec<epoll_event>,

    /// Maximum number of events returned by one call.
    max_events: usize,
}

impl EpollPoller {
    /// Creates a poller returning at most `max_events` events per call.
    pub(crate) fn new(max_events: usize) -> io::Result<Self> {
        let epoll = unsafe { epoll_create1(EPOLL_CLOEXEC) };
        if epoll < 0 {
            return Err(io::Error::last_os_error());
        }

        let max_events = max_events.max(1);

        Ok(Self {
            epoll,
            events: Vec::with_capacity(max_events),
            max_events,
        })
    }

    /// Registers a descriptor.
    ///
    /// Fails with `EEXIST` if it is already registered and `EBADF` if it is
    /// not an open descriptor.
    pub(crate) fn register(&self, fd: RawFd, token: Token, interest: Interest) -> io::Result<()> {
        let mut flags = 0;

        if interest.read {
            flags |= EPOLLIN;
        }
        if interest.edge {
            flags |= EPOLLET;
        }

        let mut event = epoll_event {
            events: flags as u32,
            u64: token.0,
        };

        let rc = unsafe { epoll_ctl(self.epoll, EPOLL_CTL_ADD, fd, &mut event) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    }

    /// Removes a descriptor from the poller.
    pub(crate) fn deregister(&self, fd: RawFd) -> io::Result<()> {
        let rc = unsafe { epoll_ctl(self.epoll, EPOLL_CTL_DEL, fd, std::ptr::null_mut()) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    }

    /// Polls for I/O readiness events.
    ///
    /// Blocks until at least one descriptor is ready or the timeout expires;
    /// `None` waits forever. An interrupted wait yields an empty batch.
    pub(crate) fn poll(
        &mut self,
        events: &mut Vec<Event>,
        timeout: Option<Duration>,
    ) -> io::Result<()> {
        let timeout_ms = timeout.map(timeout_millis).unwrap_or(-1);

        events.clear();

        let n = unsafe {
            epoll_wait(
                self.epoll,
                self.events.as_mut_ptr(),
                self.max_events as i32,
                timeout_ms,
            )
        };

        if n < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(());
            }
            return Err(err);
        }

        unsafe {
            self.events.set_len(n as usize);
        }

        for ev in &self.events {
            let flags = ev.events;

            events.push(Event {
                token: Token(ev.u64),
                readable: flags & (EPOLLIN as u32) != 0,
                error: flags & (EPOLLERR as u32) != 0,
                hangup: flags & (EPOLLHUP as u32) != 0,
            });
        }

        Ok(())
    }
}

impl Drop for EpollPoller {
    fn drop(&mut self) {
        unsafe { libc::close(self.epoll) };
    }
}

/// Rounds up so a sub-millisecond timeout does not turn into a busy poll.
fn timeout_millis(timeout: Duration) -> i32 {
    let mut millis = timeout.as_millis();
    if timeout.subsec_nanos() % 1_000_000 != 0 {
        millis += 1;
    }

    millis.min(i32::MAX as u128) as i32
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
    fn double_registration_is_rejected() {
        let poller = EpollPoller::new(8).unwrap();
        let (reader, writer) = pipe();

        poller
            .register(reader, Token(1), Interest::READ_EDGE)
            .unwrap();
        let err = poller
            .register(reader, Token(1), Interest::READ_EDGE)
            .unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::EEXIST));

        unsafe {
            libc::close(reader);
            libc::close(writer);
        }
    }

    #[test]
    fn invalid_descriptor_is_rejected() {
        let poller = EpollPoller::new(8).unwrap();
        let err = poller
            .register(-1, Token(1), Interest::READ_EDGE)
            .unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::EBADF));
    }

    #[test]
    fn poll_times_out_without_events() {
        let mut poller = EpollPoller::new(8).unwrap();
        let mut events = Vec::new();

        poller
            .poll(&mut events, Some(Duration::from_millis(10)))
            .unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn edge_triggered_reports_once_per_transition() {
        let mut poller = EpollPoller::new(8).unwrap();
        let (reader, writer) = pipe();
        poller
            .register(reader, Token(9), Interest::READ_EDGE)
            .unwrap();

        let written = unsafe { libc::write(writer, b"x".as_ptr() as *const _, 1) };
        assert_eq!(written, 1);

        let mut events = Vec::new();
        poller
            .poll(&mut events, Some(Duration::from_millis(100)))
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].token, Token(9));
        assert!(events[0].readable);

        // Not drained, but no new transition: nothing further is reported.
        poller
            .poll(&mut events, Some(Duration::from_millis(10)))
            .unwrap();
        assert!(events.is_empty());

        unsafe {
            libc::close(reader);
            libc::close(writer);
        }
    }

    #[test]
    fn batch_is_bounded_by_max_events() {
        let mut poller = EpollPoller::new(1).unwrap();
        let (first_reader, first_writer) = pipe();
        let (second_reader, second_writer) = pipe();

        poller
            .register(first_reader, Token(1), Interest::READ_EDGE)
            .unwrap();
        poller
            .register(second_reader, Token(2), Interest::READ_EDGE)
            .unwrap();

        unsafe {
            libc::write(first_writer, b"a".as_ptr() as *const _, 1);
            libc::write(second_writer, b"b".as_ptr() as *const _, 1);
        }

        let mut events = Vec::new();
        let mut seen = Vec::new();
        for _ in 0..2 {
            poller
                .poll(&mut events, Some(Duration::from_millis(100)))
                .unwrap();
            assert_eq!(events.len(), 1);
            seen.push(events[0].token);
        }

        seen.sort_by_key(|token| token.0);
        assert_eq!(seen, vec![Token(1), Token(2)]);

        unsafe {
            libc::close(first_reader);
            libc::close(first_writer);
            libc::close(second_reader);
            libc::close(second_writer);
        }
    }

    #[test]
    fn deregistered_descriptor_is_silent() {
        let mut poller = EpollPoller::new(8).unwrap();
        let (reader, writer) = pipe();

        poller
            .register(reader, Token(4), Interest::READ_EDGE)
            .unwrap();
        poller.deregister(reader).unwrap();

        unsafe { libc::write(writer, b"x".as_ptr() as *const _, 1) };

        let mut events = Vec::new();
        poller
            .poll(&mut events, Some(Duration::from_millis(10)))
            .unwrap();
        assert!(events.is_empty());

        unsafe {
            libc::close(reader);
            libc::close(writer);
        }
    }

    #[test]
    fn sub_millisecond_timeouts_round_up() {
        assert_eq!(timeout_millis(Duration::from_micros(10)), 1);
        assert_eq!(timeout_millis(Duration::from_millis(5)), 5);
        assert_eq!(timeout_millis(Duration::from_secs(u64::MAX)), i32::MAX);
    }
}
