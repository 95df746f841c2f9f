//! Registry of active sessions.
//!
//! Sessions do not share any state through the registry; it exists for
//! logging and for reporting what is still open during shutdown.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

/// Session information.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    /// Session ID.
    pub id: u64,
    /// Peer address.
    pub peer_addr: SocketAddr,
    /// Creation timestamp (millis since epoch).
    pub created_at_ms: i64,
}

/// Tracks active sessions.
pub struct SessionManager {
    sessions: RwLock<HashMap<u64, SessionInfo>>,
    next_id: AtomicU64,
}

impl SessionManager {
    /// Creates a new session manager.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers a new session and returns its ID.
    pub fn create_session(&self, peer_addr: SocketAddr) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let session = SessionInfo {
            id,
            peer_addr,
            created_at_ms: chrono::Utc::now().timestamp_millis(),
        };

        self.sessions.write().insert(id, session);
        id
    }

    /// Removes a session.
    pub fn close_session(&self, session_id: u64) -> Option<SessionInfo> {
        self.sessions.write().remove(&session_id)
    }

    /// Gets a session by ID.
    #[must_use]
    pub fn get_session(&self, session_id: u64) -> Option<SessionInfo> {
        self.sessions.read().get(&session_id).cloned()
    }

    /// Returns the number of active sessions.
    #[must_use]
    pub fn count(&self) -> usize {
        self.sessions.read().len()
    }

    /// Returns the number of sessions created since startup.
    #[must_use]
    pub fn total_created(&self) -> u64 {
        self.next_id.load(Ordering::Relaxed) - 1
    }

    /// Returns the peers of all active sessions.
    #[must_use]
    pub fn active_peers(&self) -> Vec<SocketAddr> {
        self.sessions.read().values().map(|s| s.peer_addr).collect()
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}
