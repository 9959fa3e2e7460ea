// src/core/errors.rs

//! Defines the primary error type for the crate.

use thiserror::Error;

/// The error enum for connection-state operations.
/// Using `thiserror` allows for clean error definitions and automatic `From` trait implementations.
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// The connection has been closed; the stream handle is no longer reachable.
    #[error("connection is closed")]
    ConnectionClosed,

    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
}
