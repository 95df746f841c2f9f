//! # echobench Client
//!
//! Closed-loop benchmark client.
//!
//! This crate provides:
//! - Client builder with configuration options
//! - The benchmark driver: one request in flight at a time, one latency
//!   sample per completed exchange
//! - Run reports with partial statistics when a run ends early

pub mod builder;
pub mod driver;
pub mod error;

pub use builder::{BenchmarkClient, ClientBuilder, ClientHandle};
pub use driver::{BenchmarkDriver, BenchmarkReport, ExchangeFailure, ExchangeState, FailureKind};
pub use error::ClientError;
