//! # echobench Bench
//!
//! Benchmarking utilities for echobench performance testing.

pub mod latency;

pub use latency::{HistogramSummary, LatencyHistogram};
