//! Platform-specific I/O poller abstraction.
//!
//! This module provides a unified interface over the platform's readiness
//! notification mechanism (`epoll` on Linux, `kqueue` on macOS).
//!
//! The poller is used by the reactor to:
//! - register descriptors with edge-triggered read interest,
//! - remove them before their descriptor is closed,
//! - block until at least one of them is ready.
//!
//! The concrete implementation is selected at compile time
//! depending on the target operating system.

pub(crate) mod common;

pub(crate) use common::Interest;

#[cfg(target_os = "macos")]
mod kqueue;

#[cfg(target_os = "linux")]
mod epoll;

#[cfg(target_os = "macos")]
pub(crate) type Poller = kqueue::KqueuePoller;

#[cfg(target_os = "linux")]
pub(crate) type Poller = epoll::EpollPoller;

#[cfg(unix)]
pub(crate) mod unix;

#[cfg(unix)]
pub(crate) use unix as platform;
