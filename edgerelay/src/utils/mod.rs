//! Utilities for memory-efficient data structures.
//!
//! This module exposes a generational [`Slab`] used as the reactor's
//! connection table: fast indexed storage with reuse of freed slots and
//! keys that go stale when their slot is vacated.

mod slab;

pub(crate) use slab::{Key, Slab};
