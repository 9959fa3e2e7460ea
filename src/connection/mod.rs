// src/connection/mod.rs

//! Per-connection client state: subscription accounting, reply suppression,
//! write serialization, and idempotent teardown of the owned duplex stream.

// Declare the private sub-modules of the `connection` module.
mod client;
mod guard;
mod stream;

// Publicly re-export the primary types from the sub-modules.
// This creates a clean public API for the `connection` module, hiding the
// internal file structure from the rest of the crate.
pub use client::{ClientConnection, ClientFlags, ClientInfo};
pub use guard::WriteGuard;
pub use stream::{ConnectionStream, TcpConnectionStream};
