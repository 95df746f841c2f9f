//! A single TCP connection with read-boundary message semantics.

use crate::error::TransportError;
use crate::tuning::{SocketSettings, TuningProfile, TuningReport};
use bytes::{Bytes, BytesMut};
use socket2::SockRef;
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// A tuned TCP connection.
///
/// One successful [`recv`](Self::recv) returns whatever a single socket read
/// produced, up to the configured maximum message size. No framing is
/// applied. Every send and receive is bounded by the profile's timeouts.
pub struct TcpConnection {
    stream: TcpStream,
    peer_addr: SocketAddr,
    buffer: BytesMut,
    max_message_size: usize,
    send_timeout: Option<Duration>,
    recv_timeout: Option<Duration>,
    tuning: TuningReport,
}

impl TcpConnection {
    /// Tunes `stream` with `profile` and wraps it.
    pub fn new(
        stream: TcpStream,
        peer_addr: SocketAddr,
        profile: &TuningProfile,
        max_message_size: usize,
    ) -> Self {
        let tuning = profile.apply(SockRef::from(&stream));
        Self {
            stream,
            peer_addr,
            buffer: BytesMut::with_capacity(max_message_size),
            max_message_size,
            send_timeout: profile.send_deadline(),
            recv_timeout: profile.recv_deadline(),
            tuning,
        }
    }

    /// Returns the peer address.
    #[must_use]
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Returns the local address.
    ///
    /// # Errors
    /// Returns IO error if the socket is no longer valid.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.stream.local_addr()
    }

    /// Returns the result of tuning this connection.
    #[must_use]
    pub fn tuning(&self) -> &TuningReport {
        &self.tuning
    }

    /// Reads back the effective socket options.
    ///
    /// # Errors
    /// Returns IO error if an option cannot be queried.
    pub fn socket_settings(&self) -> std::io::Result<SocketSettings> {
        SocketSettings::read(SockRef::from(&self.stream))
    }

    /// Writes one message.
    ///
    /// # Errors
    /// Returns `TransportError::Timeout` if the send timeout expires, or the
    /// underlying IO error.
    pub async fn send(&mut self, message: &[u8]) -> Result<(), TransportError> {
        let stream = &mut self.stream;
        with_timeout("send", self.send_timeout, stream.write_all(message)).await
    }

    /// Reads one message.
    ///
    /// # Returns
    /// `Ok(Some(bytes))` for a non-empty read, `Ok(None)` if the peer closed
    /// the connection.
    ///
    /// # Errors
    /// Returns `TransportError::Timeout` if the receive timeout expires, or
    /// the underlying IO error.
    pub async fn recv(&mut self) -> Result<Option<Bytes>, TransportError> {
        self.buffer.clear();
        self.buffer.resize(self.max_message_size, 0);

        let stream = &mut self.stream;
        let read = with_timeout("receive", self.recv_timeout, stream.read(&mut self.buffer[..]))
            .await?;

        if read == 0 {
            return Ok(None);
        }
        self.buffer.truncate(read);
        Ok(Some(self.buffer.split().freeze()))
    }

    /// Shuts down the write half and closes the connection.
    ///
    /// # Errors
    /// Returns IO error if the shutdown fails.
    pub async fn close(mut self) -> Result<(), TransportError> {
        self.stream.shutdown().await.map_err(TransportError::Io)
    }
}

impl std::fmt::Debug for TcpConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpConnection")
            .field("peer_addr", &self.peer_addr)
            .field("max_message_size", &self.max_message_size)
            .field("send_timeout", &self.send_timeout)
            .field("recv_timeout", &self.recv_timeout)
            .finish_non_exhaustive()
    }
}

async fn with_timeout<T>(
    operation: &'static str,
    limit: Option<Duration>,
    io: impl Future<Output = std::io::Result<T>>,
) -> Result<T, TransportError> {
    match limit {
        Some(timeout) => tokio::time::timeout(timeout, io)
            .await
            .map_err(|_| TransportError::Timeout { operation, timeout })?
            .map_err(TransportError::Io),
        None => io.await.map_err(TransportError::Io),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    async fn pair(profile: &TuningProfile, max: usize) -> (TcpConnection, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (client, accepted) = tokio::join!(TcpStream::connect(addr), listener.accept());
        let conn = TcpConnection::new(client.unwrap(), addr, profile, max);
        (conn, accepted.unwrap().0)
    }

    #[tokio::test]
    async fn test_send_and_recv() {
        let (mut conn, mut peer) = pair(&TuningProfile::default(), 8192).await;

        conn.send(b"ping").await.unwrap();
        let mut buf = [0u8; 4];
        peer.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping");

        peer.write_all(b"pong").await.unwrap();
        let reply = conn.recv().await.unwrap().unwrap();
        assert_eq!(reply.as_ref(), b"pong");
        assert!(conn.tuning().is_clean());
    }

    #[tokio::test]
    async fn test_recv_returns_none_on_close() {
        let (mut conn, peer) = pair(&TuningProfile::default(), 8192).await;
        drop(peer);
        assert!(conn.recv().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_recv_caps_read_at_max_message_size() {
        let (mut conn, mut peer) = pair(&TuningProfile::default(), 4).await;
        peer.write_all(b"abcdefgh").await.unwrap();

        let first = conn.recv().await.unwrap().unwrap();
        assert!(first.len() <= 4);
        assert_eq!(&b"abcd"[..first.len()], first.as_ref());
    }

    #[tokio::test]
    async fn test_recv_timeout() {
        let profile = TuningProfile::default().recv_timeout(Duration::from_millis(50));
        let (mut conn, _peer) = pair(&profile, 8192).await;

        let err = conn.recv().await.unwrap_err();
        assert!(err.is_timeout());
        assert!(err.to_string().contains("receive timed out"));
    }

    #[tokio::test]
    async fn test_socket_settings_reflect_profile() {
        let (conn, _peer) = pair(&TuningProfile::default(), 8192).await;
        let settings = conn.socket_settings().unwrap();
        assert!(settings.no_delay);
        assert!(settings.keepalive);
    }

    #[tokio::test]
    async fn test_close() {
        let (conn, mut peer) = pair(&TuningProfile::default(), 8192).await;
        conn.close().await.unwrap();
        let mut buf = [0u8; 1];
        assert_eq!(peer.read(&mut buf).await.unwrap(), 0);
    }
}
