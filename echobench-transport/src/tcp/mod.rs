//! TCP transport module.
//!
//! Provides a tuned listener, a tuned connector, and connections that treat
//! each socket read as one message.

pub mod client;
pub mod connection;
pub mod server;

pub use client::{ConnectConfig, connect};
pub use connection::TcpConnection;
pub use server::{ListenerConfig, TcpServer};
