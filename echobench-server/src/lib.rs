//! # echobench Server
//!
//! Server side of the echo benchmark.
//!
//! This crate provides:
//! - Server builder and the accept loop with explicit listener state
//! - The echo session handler owning one connection
//! - Message handler trait with the default echo responder
//! - Session registry used for logging and shutdown draining

pub mod builder;
pub mod error;
pub mod handler;
pub mod registry;
pub mod session;

pub use builder::{ListenerState, Server, ServerBuilder, ServerHandle};
pub use error::ServerError;
pub use handler::{EchoHandler, FnHandler, MessageHandler};
pub use registry::SessionManager;
pub use session::{EchoSession, SessionEnd, SessionStats, SessionSummary};
