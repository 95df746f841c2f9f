//! # echobench Transport
//!
//! Network transport layer for the echo benchmark.
//!
//! This crate provides:
//! - [`tuning`] - Best-effort socket option profiles with per-option reporting
//! - [`tcp`] - Tuned TCP listener, connector and read-boundary connections

pub mod error;
pub mod tcp;
pub mod tuning;

pub use error::TransportError;
pub use tuning::{SocketOption, SocketSettings, TuningProfile, TuningReport, TuningWarning};
