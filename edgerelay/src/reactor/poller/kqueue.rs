//! macOS `kqueue`-based poller implementation.
//!
//! Mirrors the `epoll` backend. Edge-triggered delivery maps to `EV_CLEAR`,
//! which resets the read filter state once the event is returned.

use super::common::Interest;
use crate::reactor::event::{Event, Token};

use libc::{EV_ADD, EV_CLEAR, EV_DELETE, EV_ENABLE, EV_ERROR, EVFILT_READ, kevent, kqueue};
use std::io;
use std::os::fd::RawFd;
use std::ptr;
use std::time::Duration;

/// macOS `kqueue` poller.
pub(crate) struct KqueuePoller {
    queue: RawFd,
    events: Vec<kevent>,
    max_events: usize,
}

impl KqueuePoller {
    pub(crate) fn new(max_events: usize) -> io::Result<Self> {
        let queue = unsafe { kqueue() };
        if queue < 0 {
            return Err(io::Error::last_os_error());
        }

        let max_events = max_events.max(1);

        Ok(Self {
            queue,
            events: Vec::with_capacity(max_events),
            max_events,
        })
    }

    /// Registers a descriptor for read readiness.
    ///
    /// kqueue silently updates an existing registration, so a duplicate is
    /// only caught by the reactor's own bookkeeping.
    pub(crate) fn register(&self, fd: RawFd, token: Token, interest: Interest) -> io::Result<()> {
        let mut flags = EV_ADD | EV_ENABLE;
        if interest.edge {
            flags |= EV_CLEAR;
        }

        self.change(fd, flags, token)
    }

    pub(crate) fn deregister(&self, fd: RawFd) -> io::Result<()> {
        self.change(fd, EV_DELETE, Token(0))
    }

    fn change(&self, fd: RawFd, flags: u16, token: Token) -> io::Result<()> {
        let change = kevent {
            ident: fd as usize,
            filter: EVFILT_READ,
            flags,
            fflags: 0,
            data: 0,
            udata: token.0 as usize as *mut _,
        };

        let rc = unsafe { kevent(self.queue, &change, 1, ptr::null_mut(), 0, ptr::null()) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    }

    pub(crate) fn poll(
        &mut self,
        events: &mut Vec<Event>,
        timeout: Option<Duration>,
    ) -> io::Result<()> {
        let timespec = timeout.map(|t| libc::timespec {
            tv_sec: t.as_secs() as libc::time_t,
            tv_nsec: t.subsec_nanos() as libc::c_long,
        });
        let timespec_ptr = timespec
            .as_ref()
            .map_or(ptr::null(), |t| t as *const libc::timespec);

        events.clear();

        let n = unsafe {
            kevent(
                self.queue,
                ptr::null(),
                0,
                self.events.as_mut_ptr(),
                self.max_events as i32,
                timespec_ptr,
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
            let error = ev.flags & EV_ERROR != 0;

            // EV_EOF on a read filter still allows buffered data to be read;
            // the relay observes the closure as a zero-length read.
            events.push(Event {
                token: Token(ev.udata as usize as u64),
                readable: ev.filter == EVFILT_READ && !error,
                error,
                hangup: false,
            });
        }

        Ok(())
    }
}

impl Drop for KqueuePoller {
    fn drop(&mut self) {
        unsafe { libc::close(self.queue) };
    }
}
