//! Tuned TCP connector.

use super::connection::TcpConnection;
use super::server::DEFAULT_PORT;
use crate::error::TransportError;
use crate::tuning::TuningProfile;
use echobench_core::message::MAX_MESSAGE_SIZE;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::net::TcpStream;

/// Configuration for connecting to the benchmark server.
#[derive(Debug, Clone)]
pub struct ConnectConfig {
    /// Server address to connect to.
    pub server_addr: SocketAddr,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Options applied once connected.
    pub profile: TuningProfile,
    /// Size of a single read.
    pub max_message_size: usize,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)),
            connect_timeout: Duration::from_secs(5),
            profile: TuningProfile::default(),
            max_message_size: MAX_MESSAGE_SIZE,
        }
    }
}

impl ConnectConfig {
    /// Creates a connect config with the specified server address.
    #[must_use]
    pub fn new(server_addr: SocketAddr) -> Self {
        Self {
            server_addr,
            ..Default::default()
        }
    }

    /// Sets the connection timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the tuning profile.
    #[must_use]
    pub fn profile(mut self, profile: TuningProfile) -> Self {
        self.profile = profile;
        self
    }
}

/// Connects to the server and tunes the resulting connection.
///
/// # Errors
/// Returns `TransportError::ConnectTimeout` if the connect timeout expires,
/// or `TransportError::Connect` if the connection is refused or fails.
pub async fn connect(config: &ConnectConfig) -> Result<TcpConnection, TransportError> {
    let addr = config.server_addr;
    let stream = tokio::time::timeout(config.connect_timeout, TcpStream::connect(addr))
        .await
        .map_err(|_| TransportError::ConnectTimeout {
            addr,
            timeout: config.connect_timeout,
        })?
        .map_err(|source| TransportError::Connect { addr, source })?;

    Ok(TcpConnection::new(
        stream,
        addr,
        &config.profile,
        config.max_message_size,
    ))
}
