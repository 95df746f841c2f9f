//! Tuned TCP listener.

use super::connection::TcpConnection;
use crate::error::TransportError;
use crate::tuning::{TuningProfile, TuningReport};
use echobench_core::message::MAX_MESSAGE_SIZE;
use socket2::{Domain, Protocol, SockRef, Socket, Type};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::TcpListener;

/// Well-known benchmark port.
pub const DEFAULT_PORT: u16 = 8888;

/// Default listen backlog.
pub const DEFAULT_BACKLOG: i32 = 10;

/// Configuration for the listening socket.
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// Maximum number of not-yet-accepted connections.
    pub backlog: i32,
    /// Options applied to the listener and to every accepted connection.
    pub profile: TuningProfile,
    /// Size of a single read on accepted connections.
    pub max_message_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            backlog: DEFAULT_BACKLOG,
            profile: TuningProfile::default(),
            max_message_size: MAX_MESSAGE_SIZE,
        }
    }
}

impl ListenerConfig {
    /// Creates a listener config with the specified bind address.
    #[must_use]
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            ..Default::default()
        }
    }

    /// Sets the listen backlog.
    #[must_use]
    pub fn backlog(mut self, backlog: i32) -> Self {
        self.backlog = backlog;
        self
    }

    /// Sets the tuning profile.
    #[must_use]
    pub fn profile(mut self, profile: TuningProfile) -> Self {
        self.profile = profile;
        self
    }
}

/// A bound, listening TCP socket that hands out tuned connections.
pub struct TcpServer {
    listener: TcpListener,
    config: Arc<ListenerConfig>,
    tuning: TuningReport,
}

impl TcpServer {
    /// Creates the listening socket, tunes it, binds and listens.
    ///
    /// The profile is applied before `bind` so `SO_REUSEADDR` takes effect.
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    /// Returns `TransportError::Bind` if any step of creating the listener fails.
    pub fn bind(config: ListenerConfig) -> Result<Self, TransportError> {
        let addr = config.bind_addr;
        let bind_err = |source| TransportError::Bind { addr, source };

        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))
            .map_err(bind_err)?;
        let tuning = config.profile.apply(SockRef::from(&socket));

        socket.set_nonblocking(true).map_err(bind_err)?;
        socket.bind(&addr.into()).map_err(bind_err)?;
        socket.listen(config.backlog).map_err(bind_err)?;

        let listener = TcpListener::from_std(socket.into()).map_err(bind_err)?;
        Ok(Self {
            listener,
            config: Arc::new(config),
            tuning,
        })
    }

    /// Accepts a connection and applies the tuning profile to it.
    ///
    /// # Errors
    /// Returns IO error if accept fails.
    pub async fn accept(&self) -> std::io::Result<TcpConnection> {
        let (stream, peer_addr) = self.listener.accept().await?;
        Ok(TcpConnection::new(
            stream,
            peer_addr,
            &self.config.profile,
            self.config.max_message_size,
        ))
    }

    /// Returns the local address the server is bound to.
    ///
    /// # Errors
    /// Returns IO error if the address cannot be queried.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Returns the result of tuning the listening socket.
    #[must_use]
    pub fn tuning(&self) -> &TuningReport {
        &self.tuning
    }
}
