//! # echobench
//!
//! TCP round-trip latency benchmark for Rust.
//!
//! A tuned echo server answers each message with the original text, a
//! per-connection message index and a timestamp. A closed-loop client sends
//! numbered messages one at a time, measures each round trip and reports
//! latency and throughput statistics.
//!
//! ## Quick Start
//!
//! ```ignore
//! use echobench::prelude::*;
//!
//! // Run a server
//! let (mut server, handle) = ServerBuilder::new().build();
//! tokio::spawn(async move { server.start().await });
//!
//! // Benchmark it
//! let (client, _handle) = ClientBuilder::default().message_count(1000).build();
//! let report = client.run().await?;
//! if let Some(stats) = report.stats {
//!     println!("{stats}");
//! }
//! ```
//!
//! ## Crate Organization
//!
//! - [`core`] - Wire format and benchmark statistics
//! - [`transport`] - Socket tuning and TCP connections
//! - [`server`] - Echo server
//! - [`client`] - Benchmark client

pub mod prelude;

/// Wire format and benchmark statistics.
pub mod core {
    pub use echobench_core::*;
}

/// Socket tuning and TCP connections.
pub mod transport {
    pub use echobench_transport::*;
}

/// Echo server.
pub mod server {
    pub use echobench_server::*;
}

/// Benchmark client.
pub mod client {
    pub use echobench_client::*;
}

// Re-export commonly used items at the crate root
pub use echobench_client::{ClientBuilder, ClientHandle};
pub use echobench_core::{BenchmarkStats, LatencySample};
pub use echobench_server::{ServerBuilder, ServerHandle};
