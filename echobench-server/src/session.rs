//! Echo session handling.
//!
//! An [`EchoSession`] exclusively owns one accepted connection and runs the
//! receive, respond, send loop until the peer leaves or I/O fails. The
//! connection is released when the session finishes.

use crate::handler::MessageHandler;
use chrono::{DateTime, Utc};
use echobench_core::stats::message_rate;
use echobench_transport::tcp::TcpConnection;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A progress line is logged every this many messages.
pub const PROGRESS_INTERVAL: u64 = 100;

/// Per-connection counters.
#[derive(Debug, Clone)]
pub struct SessionStats {
    session_id: u64,
    message_count: u64,
    started_at: DateTime<Utc>,
    started: Instant,
}

impl SessionStats {
    /// Starts the statistics for a session now.
    #[must_use]
    pub fn new(session_id: u64) -> Self {
        Self {
            session_id,
            message_count: 0,
            started_at: Utc::now(),
            started: Instant::now(),
        }
    }

    /// Counts one received message and returns the new count.
    pub fn record_message(&mut self) -> u64 {
        self.message_count += 1;
        self.message_count
    }

    /// Returns the session ID.
    #[must_use]
    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    /// Returns the number of messages received so far.
    #[must_use]
    pub fn message_count(&self) -> u64 {
        self.message_count
    }

    /// Wall-clock time the session started.
    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Time since the session started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Messages per second so far.
    #[must_use]
    pub fn rate(&self) -> Option<f64> {
        message_rate(self.message_count, self.elapsed())
    }

    fn finish(&self, peer_addr: SocketAddr, end: SessionEnd) -> SessionSummary {
        let elapsed = self.elapsed();
        SessionSummary {
            session_id: self.session_id,
            peer_addr,
            message_count: self.message_count,
            elapsed,
            rate: message_rate(self.message_count, elapsed),
            end,
        }
    }
}

/// Why a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// The peer closed the connection.
    PeerClosed,
    /// Nothing arrived within the receive timeout.
    IdleTimeout,
    /// Reading from the connection failed.
    ReceiveFailed(String),
    /// Writing the response failed or timed out.
    SendFailed(String),
}

impl fmt::Display for SessionEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PeerClosed => f.write_str("peer closed connection"),
            Self::IdleTimeout => f.write_str("receive timed out"),
            Self::ReceiveFailed(e) => write!(f, "receive failed: {e}"),
            Self::SendFailed(e) => write!(f, "send failed: {e}"),
        }
    }
}

/// Final statistics of a session.
#[derive(Debug, Clone)]
pub struct SessionSummary {
    /// Session ID.
    pub session_id: u64,
    /// Peer address.
    pub peer_addr: SocketAddr,
    /// Messages received.
    pub message_count: u64,
    /// Session lifetime.
    pub elapsed: Duration,
    /// Average messages per second, `None` for a zero-length session.
    pub rate: Option<f64>,
    /// Why the session ended.
    pub end: SessionEnd,
}

/// One connection's echo loop.
pub struct EchoSession<H> {
    conn: TcpConnection,
    handler: Arc<H>,
    stats: SessionStats,
}

impl<H: MessageHandler> EchoSession<H> {
    /// Creates a session over an accepted connection.
    #[must_use]
    pub fn new(session_id: u64, conn: TcpConnection, handler: Arc<H>) -> Self {
        Self {
            conn,
            handler,
            stats: SessionStats::new(session_id),
        }
    }

    /// Runs the session to completion and returns its summary.
    ///
    /// Ends when the peer closes, a read returns nothing, or a send or
    /// receive fails or times out. The connection is dropped on return.
    pub async fn run(mut self) -> SessionSummary {
        let session_id = self.stats.session_id();
        let peer_addr = self.conn.peer_addr();

        let end = loop {
            let request = match self.conn.recv().await {
                Ok(Some(bytes)) => bytes,
                Ok(None) => break SessionEnd::PeerClosed,
                Err(e) if e.is_timeout() => break SessionEnd::IdleTimeout,
                Err(e) => break SessionEnd::ReceiveFailed(e.to_string()),
            };

            let count = self.stats.record_message();
            let text = String::from_utf8_lossy(&request);
            tracing::trace!(session_id, count, bytes = request.len(), "message received");

            let response = self.handler.on_message(&self.stats, &text);
            if let Err(e) = self.conn.send(response.as_bytes()).await {
                break SessionEnd::SendFailed(e.to_string());
            }

            if count % PROGRESS_INTERVAL == 0 {
                tracing::info!(
                    session_id,
                    messages = count,
                    rate = self.stats.rate().unwrap_or_default(),
                    "session progress"
                );
            }
        };

        let summary = self.stats.finish(peer_addr, end);
        match &summary.end {
            SessionEnd::PeerClosed => tracing::info!(session_id, %peer_addr, "Client disconnected"),
            other => tracing::warn!(session_id, %peer_addr, reason = %other, "Session ended"),
        }
        tracing::info!(
            session_id,
            messages = summary.message_count,
            duration_ms = summary.elapsed.as_millis() as u64,
            rate = summary.rate.unwrap_or_default(),
            "session stats"
        );
        summary
    }
}
