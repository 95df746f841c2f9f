//! Client builder and the benchmark client.

use crate::driver::{BenchmarkDriver, BenchmarkReport};
use crate::error::ClientError;
use echobench_core::message::DEFAULT_CLIENT_ID;
use echobench_transport::TuningProfile;
use echobench_transport::tcp::{ConnectConfig, connect};
use std::net::SocketAddr;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Default number of exchanges per run.
pub const DEFAULT_MESSAGE_COUNT: u64 = 1000;

/// Builder for configuring and creating a benchmark client.
pub struct ClientBuilder {
    connect: ConnectConfig,
    message_count: u64,
    client_id: String,
}

impl ClientBuilder {
    /// Creates a new client builder for the specified server address.
    #[must_use]
    pub fn new(server_addr: SocketAddr) -> Self {
        Self {
            connect: ConnectConfig::new(server_addr),
            message_count: DEFAULT_MESSAGE_COUNT,
            client_id: DEFAULT_CLIENT_ID.to_string(),
        }
    }

    /// Sets the number of exchanges to perform.
    #[must_use]
    pub fn message_count(mut self, count: u64) -> Self {
        self.message_count = count;
        self
    }

    /// Sets the identity embedded in every request.
    #[must_use]
    pub fn client_id(mut self, id: impl Into<String>) -> Self {
        self.client_id = id.into();
        self
    }

    /// Sets the connection timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect = self.connect.connect_timeout(timeout);
        self
    }

    /// Sets the tuning profile for the connection.
    #[must_use]
    pub fn profile(mut self, profile: TuningProfile) -> Self {
        self.connect = self.connect.profile(profile);
        self
    }

    /// Builds the client and a handle to cancel it.
    #[must_use]
    pub fn build(self) -> (BenchmarkClient, ClientHandle) {
        let cancel = CancellationToken::new();
        let client = BenchmarkClient {
            connect: self.connect,
            message_count: self.message_count,
            client_id: self.client_id,
            cancel: cancel.clone(),
        };
        (client, ClientHandle { cancel })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new(ConnectConfig::default().server_addr)
    }
}

/// A configured benchmark run.
pub struct BenchmarkClient {
    connect: ConnectConfig,
    message_count: u64,
    client_id: String,
    cancel: CancellationToken,
}

impl BenchmarkClient {
    /// Returns the server address.
    #[must_use]
    pub fn server_addr(&self) -> SocketAddr {
        self.connect.server_addr
    }

    /// Returns the number of exchanges the run will attempt.
    #[must_use]
    pub fn message_count(&self) -> u64 {
        self.message_count
    }

    /// Connects to the server and runs the benchmark.
    ///
    /// A run that ends early still returns `Ok`; the report carries the
    /// failure and the statistics of the completed exchanges.
    ///
    /// # Errors
    /// Returns `ClientError::Connect` or `ClientError::ConnectTimeout` if the
    /// server cannot be reached, and `ClientError::Cancelled` if the run was
    /// cancelled while connecting.
    pub async fn run(self) -> Result<BenchmarkReport, ClientError> {
        let addr = self.connect.server_addr;
        tracing::info!(%addr, "Connecting to server");

        let conn = tokio::select! {
            biased;

            () = self.cancel.cancelled() => return Err(ClientError::Cancelled),

            result = connect(&self.connect) => result?,
        };
        tracing::info!(%addr, "Connected to server");

        match conn.socket_settings() {
            Ok(settings) => tracing::info!(
                no_delay = settings.no_delay,
                send_buffer = settings.send_buffer_size,
                recv_buffer = settings.recv_buffer_size,
                send_timeout = ?settings.send_timeout,
                recv_timeout = ?settings.recv_timeout,
                keepalive = settings.keepalive,
                "Effective socket settings"
            ),
            Err(e) => tracing::debug!(error = %e, "Could not read socket settings"),
        }

        let report = BenchmarkDriver::new(conn, self.client_id, self.cancel)
            .run(self.message_count)
            .await;
        Ok(report)
    }
}

/// Handle for cancelling a run from outside.
#[derive(Debug, Clone)]
pub struct ClientHandle {
    cancel: CancellationToken,
}

impl ClientHandle {
    /// Cancels the run. A pending exchange resolves as cancelled.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Returns true if the run was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builder_defaults() {
        let (client, handle) = ClientBuilder::default().build();
        assert_eq!(client.server_addr().port(), 8888);
        assert_eq!(client.message_count(), DEFAULT_MESSAGE_COUNT);
        assert_eq!(client.client_id, "Rust client");
        assert!(!handle.is_cancelled());
    }

    #[test]
    fn test_client_builder_setters() {
        let addr: SocketAddr = "10.0.0.1:9000".parse().unwrap();
        let (client, _handle) = ClientBuilder::new(addr)
            .message_count(25)
            .client_id("probe")
            .connect_timeout(Duration::from_millis(100))
            .build();

        assert_eq!(client.server_addr(), addr);
        assert_eq!(client.message_count(), 25);
        assert_eq!(client.client_id, "probe");
        assert_eq!(client.connect.connect_timeout, Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_run_without_server_fails_to_connect() {
        let addr = {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };

        let (client, _handle) = ClientBuilder::new(addr).build();
        let err = client.run().await.unwrap_err();
        assert!(matches!(err, ClientError::Connect { .. }), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn test_cancel_before_connect() {
        let (client, handle) = ClientBuilder::new("127.0.0.1:9".parse().unwrap()).build();
        handle.cancel();
        assert!(handle.is_cancelled());
        assert!(matches!(client.run().await, Err(ClientError::Cancelled)));
    }
}
