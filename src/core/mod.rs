// src/core/mod.rs

//! Crate-wide core types.

pub mod errors;

pub use errors::ConnectionError;
