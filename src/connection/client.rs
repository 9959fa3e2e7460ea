// src/connection/client.rs

//! Defines `ClientConnection`, the state a server holds for one accepted
//! connection from accept until teardown.

use super::guard::WriteGuard;
use super::stream::ConnectionStream;
use crate::core::ConnectionError;
use bitflags::bitflags;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::debug;

bitflags! {
    /// Cross-thread state bits for a client connection. Both bits are
    /// monotonic: once set they are never cleared.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ClientFlags: u32 {
        /// Teardown has begun; the stream handle is no longer usable.
        const CLOSED         = 1 << 0;
        /// The client has subscribed to at least one channel at some point,
        /// even if it has since unsubscribed from all of them.
        const HAS_SUBSCRIBED = 1 << 1;
    }
}

/// The per-connection state object.
///
/// One instance exists per accepted connection and is typically shared via
/// `Arc` between the connection's own command loop, other connections
/// publishing to its subscribed channels, and administrative tasks
/// (`CLIENT KILL`, `CLIENT LIST`). Everything except the write gate is
/// lock-free: flag and counter reads never serialize unrelated connections
/// against each other.
pub struct ClientConnection {
    /// Unique for the lifetime of the server process; assigned by the acceptor.
    id: u64,
    /// Human-readable label set by `CLIENT SETNAME`. Mutated only by the
    /// connection's own command loop; read from anywhere.
    name: RwLock<Option<String>>,
    /// The active logical database index (`SELECT`).
    db_index: AtomicUsize,
    /// Number of upcoming replies to suppress. Single-drainer only; see
    /// [`ClientConnection::should_skip_reply`].
    skip_replies: AtomicU32,
    /// `ClientFlags` bits, readable from any thread without a lock.
    flags: AtomicU32,
    /// Number of channels the client is currently subscribed to.
    subscriptions: AtomicU32,
    /// The exclusively-owned duplex stream. Taken (swapped to `None`) by
    /// exactly one caller during teardown.
    stream: Mutex<Option<Box<dyn ConnectionStream>>>,
    /// Capacity-one gate serializing writes to the outbound half, so a
    /// command reply and a pushed pub/sub message cannot interleave mid-frame.
    write_gate: Semaphore,
    /// When the connection was accepted, for `CLIENT LIST`-style reporting.
    created: Instant,
}

/// An owned snapshot of a connection's state for administrative listing.
/// Fields mutated by other threads may be transiently stale.
#[derive(Debug, Clone)]
pub struct ClientInfo {
    pub id: u64,
    pub name: Option<String>,
    pub db_index: usize,
    pub subscription_count: u32,
    pub closed: bool,
    pub age: Duration,
}

impl ClientConnection {
    /// Creates the state for a freshly accepted connection.
    pub fn new<S>(id: u64, stream: S) -> Self
    where
        S: ConnectionStream + 'static,
    {
        Self {
            id,
            name: RwLock::new(None),
            db_index: AtomicUsize::new(0),
            skip_replies: AtomicU32::new(0),
            flags: AtomicU32::new(ClientFlags::empty().bits()),
            subscriptions: AtomicU32::new(0),
            stream: Mutex::new(Some(Box::new(stream))),
            write_gate: Semaphore::new(1),
            created: Instant::now(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns the client's name, cloned so the lock is not held by callers.
    pub fn name(&self) -> Option<String> {
        self.name.read().clone()
    }

    /// Sets the client's name. Conventionally called only by the
    /// connection's own command loop; concurrent readers may observe either
    /// the old or the new value.
    pub fn set_name(&self, name: Option<String>) {
        *self.name.write() = name;
    }

    pub fn db_index(&self) -> usize {
        self.db_index.load(Ordering::Relaxed)
    }

    /// Switches the active database. Called only by the connection's own
    /// command loop; cross-thread readers tolerate a stale index.
    pub fn select_db(&self, index: usize) {
        self.db_index.store(index, Ordering::Relaxed);
    }

    /// Arms reply suppression for the next `count` replies.
    pub fn set_skip_replies(&self, count: u32) {
        self.skip_replies.store(count, Ordering::Relaxed);
    }

    /// Returns `true` if the next reply should be suppressed, consuming one
    /// unit of the skip counter.
    ///
    /// Not thread-safe, by design: exactly one logical owner drains a
    /// connection's command pipeline, so this is a plain load/store rather
    /// than a read-modify-write. Calling it from two threads is a caller
    /// bug that a lock here would only mask.
    pub fn should_skip_reply(&self) -> bool {
        let remaining = self.skip_replies.load(Ordering::Relaxed);
        if remaining > 0 {
            self.skip_replies.store(remaining - 1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    /// Current value of the skip counter.
    pub fn skip_replies(&self) -> u32 {
        self.skip_replies.load(Ordering::Relaxed)
    }

    /// Records a successful subscription and returns the new count.
    /// Marks the connection as having subscribed at least once.
    pub fn increment_subscriptions(&self) -> u32 {
        let new_count = self.subscriptions.fetch_add(1, Ordering::SeqCst) + 1;
        self.flags
            .fetch_or(ClientFlags::HAS_SUBSCRIBED.bits(), Ordering::SeqCst);
        new_count
    }

    /// Records a successful unsubscription and returns the new count.
    ///
    /// Decrementing past zero is a caller contract violation: every call
    /// must be paired with an earlier [`increment_subscriptions`].
    ///
    /// [`increment_subscriptions`]: ClientConnection::increment_subscriptions
    pub fn decrement_subscriptions(&self) -> u32 {
        let prev = self.subscriptions.fetch_sub(1, Ordering::SeqCst);
        debug_assert!(prev > 0, "subscription count decremented below zero");
        prev - 1
    }

    /// A fresh snapshot of the subscription count, readable from any thread
    /// without a lock (e.g. to decide idle-cleanup eligibility).
    pub fn subscription_count(&self) -> u32 {
        self.subscriptions.load(Ordering::SeqCst)
    }

    /// Current flag bits.
    pub fn flags(&self) -> ClientFlags {
        ClientFlags::from_bits_truncate(self.flags.load(Ordering::SeqCst))
    }

    /// True once teardown has begun. Collaborators must check this before
    /// touching the stream, since a concurrent `close` may have released it.
    pub fn is_closed(&self) -> bool {
        self.flags().contains(ClientFlags::CLOSED)
    }

    /// True if the connection has ever held a subscription, even after
    /// unsubscribing from everything. Used for protocol-mode decisions.
    pub fn has_ever_subscribed(&self) -> bool {
        self.flags().contains(ClientFlags::HAS_SUBSCRIBED)
    }

    /// Acquires exclusive write access to the outbound stream, suspending
    /// until the current holder (if any) finishes its write unit.
    ///
    /// Fails with [`ConnectionError::ConnectionClosed`] if the connection is
    /// closed, including when `close` runs while this call is waiting: the
    /// gate's semaphore is closed during teardown, so blocked acquirers wake
    /// with an error instead of acquiring against a released handle.
    pub async fn acquire_write_gate(&self) -> Result<WriteGuard<'_>, ConnectionError> {
        if self.is_closed() {
            return Err(ConnectionError::ConnectionClosed);
        }
        let permit = self
            .write_gate
            .acquire()
            .await
            .map_err(|_| ConnectionError::ConnectionClosed)?;
        // Teardown may have started between the flag check and the acquire.
        if self.is_closed() {
            return Err(ConnectionError::ConnectionClosed);
        }
        Ok(WriteGuard::new(permit))
    }

    /// Tears the connection down. Idempotent and race-free: any number of
    /// callers on any threads may invoke it, exactly one of them obtains the
    /// stream handle and runs the teardown sequence against it.
    ///
    /// Teardown is best-effort: the peer may already be gone, so each step's
    /// failure is logged and swallowed and never stops the remaining steps.
    /// After the first call returns, `is_closed` is true for every observer
    /// and the stream handle is unreachable from this object.
    pub async fn close(&self) {
        let prev = self
            .flags
            .fetch_or(ClientFlags::CLOSED.bits(), Ordering::SeqCst);
        if ClientFlags::from_bits_truncate(prev).contains(ClientFlags::CLOSED) {
            debug!(id = self.id, "close called on already-closed connection");
        }

        // Wake any write-gate waiters with an error and fail future acquires.
        self.write_gate.close();

        // Exactly one caller gets `Some` here; the losers are done.
        let Some(mut stream) = self.stream.lock().take() else {
            return;
        };

        if let Err(e) = stream.cancel_pending_read().await {
            debug!(id = self.id, error = %e, "ignoring cancel_pending_read failure during teardown");
        }
        if let Err(e) = stream.complete_read_half().await {
            debug!(id = self.id, error = %e, "ignoring complete_read_half failure during teardown");
        }
        if let Err(e) = stream.cancel_pending_flush().await {
            debug!(id = self.id, error = %e, "ignoring cancel_pending_flush failure during teardown");
        }
        if let Err(e) = stream.complete_write_half().await {
            debug!(id = self.id, error = %e, "ignoring complete_write_half failure during teardown");
        }
        // Dropping the handle releases whatever the transport still holds.
        drop(stream);
        debug!(id = self.id, "connection torn down");
    }

    /// An owned snapshot for `CLIENT LIST`-style reporting.
    pub fn info(&self) -> ClientInfo {
        ClientInfo {
            id: self.id,
            name: self.name(),
            db_index: self.db_index(),
            subscription_count: self.subscription_count(),
            closed: self.is_closed(),
            age: self.created.elapsed(),
        }
    }
}

impl std::fmt::Debug for ClientConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConnection")
            .field("id", &self.id)
            .field("db_index", &self.db_index())
            .field("subscriptions", &self.subscription_count())
            .field("flags", &self.flags())
            .finish_non_exhaustive()
    }
}
