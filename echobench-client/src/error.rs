//! Error types for client operations.

use echobench_transport::TransportError;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// Error type for client operations.
///
/// Only connection setup is fatal; failures during the exchange loop end the
/// run early and are reported in the benchmark report instead.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server could not be reached.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        /// Server address.
        addr: SocketAddr,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Connection timeout.
    #[error("connection to {addr} timed out after {timeout:?}")]
    ConnectTimeout {
        /// Server address.
        addr: SocketAddr,
        /// Configured timeout.
        timeout: Duration,
    },

    /// The run was cancelled before a connection was established.
    #[error("cancelled before connecting")]
    Cancelled,

    /// Transport error.
    #[error("transport error: {0}")]
    Transport(TransportError),
}

impl From<TransportError> for ClientError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Connect { addr, source } => Self::Connect { addr, source },
            TransportError::ConnectTimeout { addr, timeout } => {
                Self::ConnectTimeout { addr, timeout }
            }
            other => Self::Transport(other),
        }
    }
}
