//! Error types for server operations.

use echobench_transport::TransportError;
use std::net::SocketAddr;
use thiserror::Error;

/// Error type for server operations.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listening socket could not be set up. Fatal at startup.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Requested bind address.
        addr: SocketAddr,
        /// Underlying error.
        source: std::io::Error,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport error.
    #[error("transport error: {0}")]
    Transport(TransportError),

    /// `start` was called while the server is already listening.
    #[error("server is already listening on {0}")]
    AlreadyRunning(SocketAddr),

    /// A stop was requested before the server started.
    #[error("server shutdown")]
    Shutdown,
}

impl From<TransportError> for ServerError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Bind { addr, source } => Self::Bind { addr, source },
            TransportError::Io(e) => Self::Io(e),
            other => Self::Transport(other),
        }
    }
}

impl ServerError {
    /// Returns true if this is a startup bind failure.
    #[must_use]
    pub fn is_bind(&self) -> bool {
        matches!(self, Self::Bind { .. })
    }
}
