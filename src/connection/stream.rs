// src/connection/stream.rs

//! Defines the duplex-transport seam a connection owns and tears down.

use crate::core::ConnectionError;
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

/// The duplex byte-stream handle owned by a [`ClientConnection`].
///
/// The four operations are the teardown surface used during disposal. Each is
/// individually fallible and must be safe to call after the peer is gone; the
/// connection swallows their errors and continues with the remaining steps.
///
/// [`ClientConnection`]: crate::connection::ClientConnection
#[async_trait]
pub trait ConnectionStream: Send + Sync {
    /// Cancels a read pending on the inbound half, if any.
    async fn cancel_pending_read(&mut self) -> Result<(), ConnectionError>;

    /// Completes (closes) the inbound half.
    async fn complete_read_half(&mut self) -> Result<(), ConnectionError>;

    /// Cancels a flush pending on the outbound half, if any.
    async fn cancel_pending_flush(&mut self) -> Result<(), ConnectionError>;

    /// Completes (closes) the outbound half.
    async fn complete_write_half(&mut self) -> Result<(), ConnectionError>;
}

/// A [`ConnectionStream`] over a plain `tokio::net::TcpStream`.
pub struct TcpConnectionStream {
    inner: TcpStream,
}

impl TcpConnectionStream {
    pub fn new(inner: TcpStream) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl ConnectionStream for TcpConnectionStream {
    async fn cancel_pending_read(&mut self) -> Result<(), ConnectionError> {
        // Dropping a tokio read future already cancels it; nothing is queued here.
        Ok(())
    }

    async fn complete_read_half(&mut self) -> Result<(), ConnectionError> {
        // The read half closes with the socket when the stream is dropped.
        Ok(())
    }

    async fn cancel_pending_flush(&mut self) -> Result<(), ConnectionError> {
        Ok(())
    }

    async fn complete_write_half(&mut self) -> Result<(), ConnectionError> {
        self.inner.shutdown().await?;
        Ok(())
    }
}
