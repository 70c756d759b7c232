//! Event loop of the relay.
//!
//! One `turn` waits for a bounded batch of readiness events and services each
//! of them: the listener event drains the accept backlog, a connection event
//! drains the socket into the sink. A failed descriptor is closed and the loop
//! moves on to the next event.

use super::acceptor::accept_clients;
use super::event::{Event, Token};
use super::poller::{Interest, Poller};
use super::relay::{Drained, drain};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::net::{Connection, TcpListener};
use crate::utils::{Key, Slab};

use std::io::{self, Write};
use std::net::SocketAddr;
use std::os::fd::AsRawFd;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// The single-threaded event loop.
///
/// The reactor owns the poller, the listening socket and every accepted
/// connection. A connection is registered with the poller exactly as long as
/// it sits in the connection table, and its descriptor is closed when it
/// leaves the table. If the listener reports an error it is closed the same
/// way, and the reactor keeps serving the connections it already has.
///
/// Bytes read from any connection are written to `sink`.
pub struct Reactor<W: Write> {
    poller: Poller,
    events: Vec<Event>,

    listener: Option<TcpListener>,
    connections: Slab<Connection>,

    buffer: Vec<u8>,
    sink: W,
}

impl<W: Write> Reactor<W> {
    /// Binds the port named in `config` and prepares the event loop.
    pub fn new(config: &Config, sink: W) -> Result<Self> {
        let listener = TcpListener::bind(&config.port)?;

        Self::with_listener(listener, config, sink)
    }

    /// Prepares the event loop around an already bound listener.
    pub fn with_listener(listener: TcpListener, config: &Config, sink: W) -> Result<Self> {
        let poller = Poller::new(config.max_events)
            .map_err(|e| Error::setup("failed to create the poller", e))?;

        poller
            .register(listener.as_raw_fd(), Token::LISTENER, Interest::READ_EDGE)
            .map_err(Error::Registration)?;

        Ok(Self {
            poller,
            events: Vec::with_capacity(config.max_events),
            listener: Some(listener),
            connections: Slab::new(64),
            buffer: vec![0; config.chunk_size.max(1)],
            sink,
        })
    }

    /// Returns the address the listener is bound to.
    ///
    /// Fails with `NotConnected` once the listener has been closed.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        match &self.listener {
            Some(listener) => listener.local_addr(),
            None => Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "the listening socket was closed",
            )),
        }
    }

    /// Returns the listening socket, or `None` after it failed.
    pub fn listener(&self) -> Option<&TcpListener> {
        self.listener.as_ref()
    }

    /// Whether new connections are still being accepted.
    pub fn is_listening(&self) -> bool {
        self.listener.is_some()
    }

    /// Number of open client connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Iterates over open client connections.
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.iter()
    }

    /// Returns the output sink.
    pub fn sink(&self) -> &W {
        &self.sink
    }

    /// Runs the event loop forever.
    ///
    /// Only returns on a fatal error.
    pub fn run(&mut self) -> Result<()> {
        loop {
            self.turn(None)?;
        }
    }

    /// Waits once for readiness and handles every reported event in order.
    ///
    /// `None` waits until something is ready. Returns the number of events
    /// in the batch.
    pub fn turn(&mut self, timeout: Option<Duration>) -> Result<usize> {
        let mut events = std::mem::take(&mut self.events);
        let result = self.dispatch(&mut events, timeout);
        self.events = events;

        result
    }

    fn dispatch(&mut self, events: &mut Vec<Event>, timeout: Option<Duration>) -> Result<usize> {
        self.poller.poll(events, timeout).map_err(Error::Poll)?;

        for event in events.iter() {
            self.handle_event(event)?;
        }

        Ok(events.len())
    }

    fn handle_event(&mut self, event: &Event) -> Result<()> {
        let Some(key) = event.token.key() else {
            let Some(listener) = &self.listener else {
                debug!("dropping event for the closed listener");
                return Ok(());
            };

            if event.is_failure() {
                warn!(
                    "readiness error on listening descriptor {} (error = {}, hangup = {})",
                    listener.as_raw_fd(),
                    event.error,
                    event.hangup
                );
                self.close_listener();
                return Ok(());
            }

            return accept_clients(listener, &self.poller, &mut self.connections);
        };

        let Some(connection) = self.connections.get(key) else {
            debug!("dropping event for a closed connection");
            return Ok(());
        };

        let drained = if event.is_failure() {
            warn!(
                "readiness error on descriptor {} (error = {}, hangup = {})",
                connection.fd(),
                event.error,
                event.hangup
            );
            Drained::Closed
        } else {
            drain(connection, &mut self.buffer, &mut self.sink)?
        };

        if drained == Drained::Closed {
            self.close(key);
        }

        Ok(())
    }

    /// Removes a connection from the poller and closes it.
    fn close(&mut self, key: Key) {
        let Some(connection) = self.connections.remove(key) else {
            return;
        };

        let fd = connection.fd();
        if let Err(e) = self.poller.deregister(fd) {
            debug!("deregister of descriptor {} failed: {}", fd, e);
        }
        drop(connection);

        info!("closed connection on descriptor {}", fd);
    }

    /// Stops accepting: removes the listener from the poller and closes it.
    fn close_listener(&mut self) {
        let Some(listener) = self.listener.take() else {
            return;
        };

        let fd = listener.as_raw_fd();
        if let Err(e) = self.poller.deregister(fd) {
            debug!("deregister of listening descriptor {} failed: {}", fd, e);
        }
        drop(listener);

        error!("closed listening descriptor {}; no new connections will be accepted", fd);
    }
}
