//! The closed-loop benchmark driver.
//!
//! Exactly one request is in flight at a time. Each exchange moves the
//! driver from [`ExchangeState::Idle`] to [`ExchangeState::AwaitingResponse`]
//! and back; the driver only suspends in the awaiting state. A failed
//! exchange ends the run without retry and produces no sample.

use echobench_core::message::{EchoResponse, Request};
use echobench_core::stats::{BenchmarkStats, LatencySample};
use echobench_transport::TransportError;
use echobench_transport::tcp::TcpConnection;
use std::fmt;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// A progress line is logged every this many exchanges.
pub const PROGRESS_INTERVAL: u64 = 100;

/// Where the driver is within an exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeState {
    /// No request outstanding.
    Idle,
    /// Request `seq` was sent at `sent_at` and its response is pending.
    AwaitingResponse {
        /// Sequence number of the outstanding request.
        seq: u64,
        /// When the request was issued.
        sent_at: Instant,
    },
}

/// Why an exchange failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// Writing the request failed.
    SendFailed(String),
    /// The server closed the connection instead of responding.
    ConnectionClosed,
    /// Reading the response failed.
    ReceiveFailed(String),
    /// The send or receive timeout expired.
    Timeout,
    /// The run was cancelled; the connection is closed.
    Cancelled,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SendFailed(e) => write!(f, "send failed: {e}"),
            Self::ConnectionClosed => f.write_str("connection closed by server"),
            Self::ReceiveFailed(e) => write!(f, "receive failed: {e}"),
            Self::Timeout => f.write_str("timed out"),
            Self::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// The exchange that ended a run early.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeFailure {
    /// Sequence number of the failed exchange.
    pub seq: u64,
    /// What went wrong.
    pub kind: FailureKind,
}

impl fmt::Display for ExchangeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "message #{} {}", self.seq, self.kind)
    }
}

impl std::error::Error for ExchangeFailure {}

/// Outcome of a benchmark run.
#[derive(Debug, Clone)]
pub struct BenchmarkReport {
    /// Number of exchanges requested.
    pub requested: u64,
    /// One sample per completed exchange, in order.
    pub samples: Vec<LatencySample>,
    /// Request plus response bytes of completed exchanges.
    pub total_bytes: u64,
    /// Wall time of the exchange loop.
    pub total_duration: Duration,
    /// The failure that ended the run, if any.
    pub failure: Option<ExchangeFailure>,
    /// Summary statistics, `None` if no exchange completed.
    pub stats: Option<BenchmarkStats>,
}

impl BenchmarkReport {
    fn new(
        requested: u64,
        samples: Vec<LatencySample>,
        total_bytes: u64,
        total_duration: Duration,
        failure: Option<ExchangeFailure>,
    ) -> Self {
        let stats = BenchmarkStats::compute(&samples, total_bytes, total_duration);
        Self {
            requested,
            samples,
            total_bytes,
            total_duration,
            failure,
            stats,
        }
    }

    /// Number of completed exchanges.
    #[must_use]
    pub fn completed(&self) -> usize {
        self.samples.len()
    }

    /// Returns true if every requested exchange completed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }
}

/// Drives sequential exchanges over one tuned connection.
pub struct BenchmarkDriver {
    conn: TcpConnection,
    client_id: String,
    state: ExchangeState,
    samples: Vec<LatencySample>,
    total_bytes: u64,
    cancel: CancellationToken,
}

impl BenchmarkDriver {
    /// Creates a driver over an established connection.
    ///
    /// Cancelling `cancel` resolves a pending exchange with
    /// [`FailureKind::Cancelled`].
    #[must_use]
    pub fn new(conn: TcpConnection, client_id: impl Into<String>, cancel: CancellationToken) -> Self {
        Self {
            conn,
            client_id: client_id.into(),
            state: ExchangeState::Idle,
            samples: Vec::new(),
            total_bytes: 0,
            cancel,
        }
    }

    /// Returns the current exchange state.
    #[must_use]
    pub fn state(&self) -> ExchangeState {
        self.state
    }

    /// Returns the samples collected so far.
    #[must_use]
    pub fn samples(&self) -> &[LatencySample] {
        &self.samples
    }

    /// Performs one request/response exchange.
    ///
    /// On success the sample is recorded and returned. On failure nothing is
    /// recorded and the state is back to `Idle`.
    ///
    /// # Errors
    /// Returns the failure if the send, the receive, or the wait fails.
    pub async fn exchange(&mut self, seq: u64) -> Result<LatencySample, ExchangeFailure> {
        let result = self.exchange_inner(seq).await;
        self.state = ExchangeState::Idle;
        result.map_err(|kind| ExchangeFailure { seq, kind })
    }

    async fn exchange_inner(&mut self, seq: u64) -> Result<LatencySample, FailureKind> {
        if self.cancel.is_cancelled() {
            return Err(FailureKind::Cancelled);
        }

        let request = Request::new(seq, &self.client_id);
        let sent_at = Instant::now();
        self.conn
            .send(request.as_bytes())
            .await
            .map_err(|e| match e {
                TransportError::Timeout { .. } => FailureKind::Timeout,
                other => FailureKind::SendFailed(other.to_string()),
            })?;
        self.state = ExchangeState::AwaitingResponse { seq, sent_at };

        let cancel = &self.cancel;
        let conn = &mut self.conn;
        let response = tokio::select! {
            biased;

            () = cancel.cancelled() => return Err(FailureKind::Cancelled),

            result = conn.recv() => match result {
                Ok(Some(bytes)) => bytes,
                Ok(None) => return Err(FailureKind::ConnectionClosed),
                Err(e) if e.is_timeout() => return Err(FailureKind::Timeout),
                Err(e) => return Err(FailureKind::ReceiveFailed(e.to_string())),
            },
        };

        let sample = LatencySample::new(sent_at.elapsed());
        self.samples.push(sample);
        self.total_bytes += (request.len() + response.len()) as u64;

        let text = String::from_utf8_lossy(&response);
        match EchoResponse::parse(&text) {
            Ok(echo) if echo.echoes(&request) => {
                tracing::trace!(seq, server_msg = echo.message_number, rtt_us = sample.as_micros(), "exchange complete");
            }
            Ok(_) => tracing::debug!(seq, "response echoes a different request"),
            Err(e) => tracing::debug!(seq, error = %e, "response is not an echo"),
        }

        Ok(sample)
    }

    /// Runs `message_count` sequential exchanges and reports the results.
    ///
    /// Stops at the first failed exchange, logging its sequence number.
    /// Statistics cover whatever exchanges completed.
    pub async fn run(mut self, message_count: u64) -> BenchmarkReport {
        let peer_addr = self.conn.peer_addr();
        tracing::info!(%peer_addr, message_count, "Starting benchmark");

        self.samples.reserve(usize::try_from(message_count).unwrap_or_default());
        let started = Instant::now();
        let mut failure = None;

        for seq in 1..=message_count {
            match self.exchange(seq).await {
                Ok(_) => {
                    if seq % PROGRESS_INTERVAL == 0 {
                        let elapsed = started.elapsed().as_secs_f64();
                        tracing::info!(
                            completed = seq,
                            total = message_count,
                            rate = if elapsed > 0.0 { seq as f64 / elapsed } else { 0.0 },
                            "benchmark progress"
                        );
                    }
                }
                Err(f) => {
                    tracing::error!(seq = f.seq, reason = %f.kind, "Exchange failed, ending run");
                    failure = Some(f);
                    break;
                }
            }
        }

        let total_duration = started.elapsed();
        let Self {
            conn,
            samples,
            total_bytes,
            ..
        } = self;

        if failure.is_none() {
            if let Err(e) = conn.close().await {
                tracing::debug!(error = %e, "Error closing connection");
            }
        } else {
            drop(conn);
        }
        tracing::info!(%peer_addr, "Disconnected");

        BenchmarkReport::new(message_count, samples, total_bytes, total_duration, failure)
    }
}
