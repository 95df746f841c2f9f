//! Error types for transport operations.

use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// Error type for transport operations.
#[derive(Debug, Error)]
pub enum TransportError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Could not create, bind or listen on the listening socket.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address that was requested.
        addr: SocketAddr,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Could not connect to the server.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        /// Server address.
        addr: SocketAddr,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Connection attempt did not complete in time.
    #[error("connection to {addr} timed out after {timeout:?}")]
    ConnectTimeout {
        /// Server address.
        addr: SocketAddr,
        /// Configured connect timeout.
        timeout: Duration,
    },

    /// A send or receive did not complete in time.
    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        /// The operation that expired.
        operation: &'static str,
        /// Configured timeout.
        timeout: Duration,
    },

    /// Address parse error.
    #[error("address parse error: {0}")]
    AddrParse(#[from] std::net::AddrParseError),
}

impl TransportError {
    /// Returns true if this error is an expired send/receive timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
