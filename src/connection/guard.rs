// src/connection/guard.rs

//! Defines `WriteGuard`, an RAII guard for the connection's write gate.

use tokio::sync::SemaphorePermit;

/// An RAII guard proving exclusive write access to a connection's outbound
/// stream. All bytes of one logical reply or pushed message must be written
/// while the guard is alive.
///
/// Dropping the guard releases the gate, so the release happens exactly once
/// per acquisition on every exit path, including early returns and `?`.
#[must_use = "the write gate is released as soon as the guard is dropped"]
pub struct WriteGuard<'a> {
    _permit: SemaphorePermit<'a>,
}

impl<'a> WriteGuard<'a> {
    /// Wraps a permit obtained from the connection's write-gate semaphore.
    pub(crate) fn new(permit: SemaphorePermit<'a>) -> Self {
        Self { _permit: permit }
    }
}

impl std::fmt::Debug for WriteGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteGuard").finish_non_exhaustive()
    }
}
