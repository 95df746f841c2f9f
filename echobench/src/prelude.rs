//! Prelude module for convenient imports.
//!
//! ```ignore
//! use echobench::prelude::*;
//! ```

// Core types
pub use echobench_core::error::{Error as CoreError, Result as CoreResult};
pub use echobench_core::{BenchmarkStats, EchoResponse, LatencySample, Request};

// Transport types
pub use echobench_transport::{TransportError, TuningProfile, TuningReport};

// Server types
pub use echobench_server::{
    EchoHandler, FnHandler, ListenerState, MessageHandler, Server, ServerBuilder, ServerError,
    ServerHandle, SessionSummary,
};

// Client types
pub use echobench_client::{
    BenchmarkClient, BenchmarkReport, ClientBuilder, ClientError, ClientHandle, ExchangeFailure,
    FailureKind,
};
