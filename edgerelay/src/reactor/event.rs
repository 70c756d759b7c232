//! Readiness events and the tokens that identify their descriptors.

use crate::utils::Key;

/// Opaque identity stored alongside a registration in the poller.
///
/// A token packs the connection table slot with the slot's generation, so an
/// event for a connection that was closed (and whose descriptor number was
/// reused) can never be delivered to its successor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct Token(pub(crate) u64);

impl Token {
    /// Reserved token of the listening socket.
    ///
    /// Never produced by the connection table: it would need both a slot
    /// index and a generation of `u32::MAX`.
    pub(crate) const LISTENER: Self = Self(u64::MAX);

    /// Returns the connection table key, or `None` for the listener.
    pub(crate) fn key(self) -> Option<Key> {
        if self == Self::LISTENER {
            return None;
        }

        Some(Key {
            index: (self.0 & u64::from(u32::MAX)) as u32,
            generation: (self.0 >> 32) as u32,
        })
    }
}

impl From<Key> for Token {
    fn from(key: Key) -> Self {
        Self((u64::from(key.generation) << 32) | u64::from(key.index))
    }
}

/// A readiness event reported by the poller.
///
/// Produced once per `poll` call and consumed by the reactor in the
/// order the kernel delivered it.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Event {
    /// Token the descriptor was registered with.
    pub(crate) token: Token,

    /// The descriptor has data (or a pending connection) to read.
    pub(crate) readable: bool,

    /// An error condition is pending on the descriptor.
    pub(crate) error: bool,

    /// The descriptor was hung up.
    pub(crate) hangup: bool,
}

impl Event {
    /// An event that must not be serviced: error, hangup, or no read readiness.
    pub(crate) fn is_failure(&self) -> bool {
        self.error || self.hangup || !self.readable
    }
}
