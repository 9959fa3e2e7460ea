// src/lib.rs

pub mod connection;
pub mod core;

// Re-export
pub use crate::connection::{
    ClientConnection, ClientFlags, ClientInfo, ConnectionStream, TcpConnectionStream, WriteGuard,
};
pub use crate::core::ConnectionError;
