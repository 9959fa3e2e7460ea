// tests/support/mock_stream.rs

//! A mock `ConnectionStream` that records how its teardown surface is used.

#![allow(dead_code)]

use async_trait::async_trait;
use resp_conn::{ConnectionError, ConnectionStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counters for each teardown operation, shared with the test body so they
/// survive the stream being moved into (and dropped by) the connection.
#[derive(Debug, Default)]
pub struct TeardownCounts {
    pub cancel_read: AtomicUsize,
    pub complete_read: AtomicUsize,
    pub cancel_flush: AtomicUsize,
    pub complete_write: AtomicUsize,
    pub dropped: AtomicUsize,
}

impl TeardownCounts {
    /// Total invocations across the four teardown operations.
    pub fn total_calls(&self) -> usize {
        self.cancel_read.load(Ordering::SeqCst)
            + self.complete_read.load(Ordering::SeqCst)
            + self.cancel_flush.load(Ordering::SeqCst)
            + self.complete_write.load(Ordering::SeqCst)
    }
}

pub struct MockStream {
    counts: Arc<TeardownCounts>,
    fail_read_cancel: bool,
}

impl MockStream {
    pub fn new() -> (Self, Arc<TeardownCounts>) {
        let counts = Arc::new(TeardownCounts::default());
        (
            Self {
                counts: counts.clone(),
                fail_read_cancel: false,
            },
            counts,
        )
    }

    /// A stream whose `cancel_pending_read` fails, for verifying that
    /// teardown swallows step failures and keeps going.
    pub fn failing_read_cancel() -> (Self, Arc<TeardownCounts>) {
        let counts = Arc::new(TeardownCounts::default());
        (
            Self {
                counts: counts.clone(),
                fail_read_cancel: true,
            },
            counts,
        )
    }
}

impl Drop for MockStream {
    fn drop(&mut self) {
        self.counts.dropped.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ConnectionStream for MockStream {
    async fn cancel_pending_read(&mut self) -> Result<(), ConnectionError> {
        self.counts.cancel_read.fetch_add(1, Ordering::SeqCst);
        if self.fail_read_cancel {
            return Err(ConnectionError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "peer already gone",
            )));
        }
        Ok(())
    }

    async fn complete_read_half(&mut self) -> Result<(), ConnectionError> {
        self.counts.complete_read.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn cancel_pending_flush(&mut self) -> Result<(), ConnectionError> {
        self.counts.cancel_flush.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn complete_write_half(&mut self) -> Result<(), ConnectionError> {
        self.counts.complete_write.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
