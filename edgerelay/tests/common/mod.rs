#![allow(dead_code)]

use edgerelay::{Config, Reactor};
use std::io::{self, Write};
use std::net::{Ipv4Addr, SocketAddr, TcpStream};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Timeout of a single reactor turn in tests.
pub const TICK: Duration = Duration::from_millis(20);

/// Upper bound on turns before a condition is considered unreachable.
pub const MAX_TURNS: usize = 250;

pub fn start(config: Config) -> Reactor<Vec<u8>> {
    Reactor::new(&config, Vec::new()).expect("Failed to start reactor")
}

pub fn start_default() -> Reactor<Vec<u8>> {
    start(Config::new("0"))
}

/// Connects over IPv4 loopback, which also reaches a dual-stack IPv6 listener.
pub fn connect<W: Write>(reactor: &Reactor<W>) -> TcpStream {
    let port = reactor
        .local_addr()
        .expect("Failed to get local address")
        .port();

    TcpStream::connect(SocketAddr::from((Ipv4Addr::LOCALHOST, port)))
        .expect("Failed to connect to reactor")
}

/// Turns the reactor until `done` holds, failing the test after `MAX_TURNS`.
pub fn turn_until<W: Write>(reactor: &mut Reactor<W>, mut done: impl FnMut(&Reactor<W>) -> bool) {
    for _ in 0..MAX_TURNS {
        if done(&*reactor) {
            return;
        }
        reactor.turn(Some(TICK)).expect("Reactor turn failed");
    }

    assert!(done(&*reactor), "Condition not reached within {MAX_TURNS} turns");
}

/// Shared buffer collecting formatted log output.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Routes this thread's log events into a buffer until the guard is dropped.
pub fn capture_logs() -> (LogBuffer, tracing::subscriber::DefaultGuard) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();

    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();

    (buffer, tracing::subscriber::set_default(subscriber))
}
