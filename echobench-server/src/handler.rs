//! Message handler traits.

use crate::session::{SessionStats, SessionSummary};
use echobench_core::message::encode_echo;
use std::net::SocketAddr;

/// Builds the response to each received message.
pub trait MessageHandler: Send + Sync + 'static {
    /// Called once per received message, after the session's message count
    /// has been incremented.
    ///
    /// # Arguments
    /// * `stats` - Statistics of the session that received the message
    /// * `request` - Received text (invalid UTF-8 replaced with U+FFFD)
    fn on_message(&self, stats: &SessionStats, request: &str) -> String;

    /// Called when a new session is established.
    fn on_session_start(&self, _session_id: u64, _peer_addr: SocketAddr) {}

    /// Called when a session ends, with its final statistics.
    fn on_session_end(&self, _summary: &SessionSummary) {}
}

/// Echoes the request back with the message index and a timestamp.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoHandler;

impl MessageHandler for EchoHandler {
    fn on_message(&self, stats: &SessionStats, request: &str) -> String {
        encode_echo(
            request,
            stats.message_count(),
            chrono::Utc::now().timestamp_millis(),
        )
    }
}

/// Wrapper to convert a closure into a MessageHandler.
pub struct FnHandler<F> {
    handler: F,
}

impl<F> FnHandler<F>
where
    F: Fn(&SessionStats, &str) -> String + Send + Sync + 'static,
{
    /// Creates a new function handler.
    pub fn new(handler: F) -> Self {
        Self { handler }
    }
}

impl<F> MessageHandler for FnHandler<F>
where
    F: Fn(&SessionStats, &str) -> String + Send + Sync + 'static,
{
    fn on_message(&self, stats: &SessionStats, request: &str) -> String {
        (self.handler)(stats, request)
    }
}
