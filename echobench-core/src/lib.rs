//! # echobench Core
//!
//! Core types shared by the echobench server and client.
//!
//! This crate provides:
//! - [`message`] - Request and echo-response text formats
//! - [`stats`] - Latency samples and the benchmark statistics reduction
//! - Error types for parsing responses

pub mod error;
pub mod message;
pub mod stats;

pub use error::{Error, Result};
pub use message::{EchoResponse, Request};
pub use stats::{BenchmarkStats, LatencySample};
