//! Server builder and the connection listener.

use crate::error::ServerError;
use crate::handler::{EchoHandler, MessageHandler};
use crate::registry::SessionManager;
use crate::session::EchoSession;
use echobench_transport::TuningProfile;
use echobench_transport::tcp::{ListenerConfig, TcpConnection, TcpServer};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// How long in-flight sessions may keep running after `stop`.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Lifecycle of the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    /// Not accepting connections.
    Stopped,
    /// Accepting connections on `local_addr`.
    Listening {
        /// Address the listener is bound to.
        local_addr: SocketAddr,
    },
}

/// Builder for configuring and creating a server.
pub struct ServerBuilder<H> {
    listener: ListenerConfig,
    handler: H,
    drain_timeout: Duration,
}

impl ServerBuilder<EchoHandler> {
    /// Creates a new server builder with default settings and the echo handler.
    #[must_use]
    pub fn new() -> Self {
        Self {
            listener: ListenerConfig::default(),
            handler: EchoHandler,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }
}

impl Default for ServerBuilder<EchoHandler> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: MessageHandler> ServerBuilder<H> {
    /// Sets the bind address.
    #[must_use]
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.listener.bind_addr = addr;
        self
    }

    /// Sets the listen backlog.
    #[must_use]
    pub fn backlog(mut self, backlog: i32) -> Self {
        self.listener.backlog = backlog;
        self
    }

    /// Sets the tuning profile for the listener and accepted connections.
    #[must_use]
    pub fn profile(mut self, profile: TuningProfile) -> Self {
        self.listener.profile = profile;
        self
    }

    /// Sets the drain window used when stopping.
    #[must_use]
    pub fn drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Replaces the message handler.
    #[must_use]
    pub fn handler<H2: MessageHandler>(self, handler: H2) -> ServerBuilder<H2> {
        ServerBuilder {
            listener: self.listener,
            handler,
            drain_timeout: self.drain_timeout,
        }
    }

    /// Builds the server and a handle to control it.
    #[must_use]
    pub fn build(self) -> (Server<H>, ServerHandle) {
        let (state_tx, state_rx) = watch::channel(ListenerState::Stopped);
        let shutdown = CancellationToken::new();

        let server = Server {
            config: self.listener,
            handler: Arc::new(self.handler),
            drain_timeout: self.drain_timeout,
            state: state_tx,
            shutdown: shutdown.clone(),
            sessions: Arc::new(SessionManager::new()),
        };
        let handle = ServerHandle {
            state: state_rx,
            shutdown,
        };

        (server, handle)
    }
}

/// The connection listener.
///
/// Owns the [`ListenerState`]; only [`start`](Self::start) and a stop
/// request through [`ServerHandle::stop`] move it.
pub struct Server<H> {
    config: ListenerConfig,
    handler: Arc<H>,
    drain_timeout: Duration,
    state: watch::Sender<ListenerState>,
    shutdown: CancellationToken,
    sessions: Arc<SessionManager>,
}

impl<H: MessageHandler> Server<H> {
    /// Returns the current listener state.
    #[must_use]
    pub fn state(&self) -> ListenerState {
        *self.state.borrow()
    }

    /// Returns the session registry.
    #[must_use]
    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Binds, listens and accepts connections until stopped.
    ///
    /// Each accepted connection is tuned and served by its own
    /// [`EchoSession`] task. After a stop request the listening socket is
    /// released, the state returns to `Stopped`, and open sessions get the
    /// drain window to finish.
    ///
    /// # Errors
    /// Returns `ServerError::Bind` if the listener cannot be set up,
    /// `ServerError::AlreadyRunning` if already listening, and
    /// `ServerError::Shutdown` if a stop was requested before starting.
    pub async fn start(&mut self) -> Result<(), ServerError> {
        if let ListenerState::Listening { local_addr } = self.state() {
            return Err(ServerError::AlreadyRunning(local_addr));
        }
        if self.shutdown.is_cancelled() {
            return Err(ServerError::Shutdown);
        }

        let listener = TcpServer::bind(self.config.clone())?;
        let local_addr = listener.local_addr()?;
        self.state.send_replace(ListenerState::Listening { local_addr });
        tracing::info!(
            %local_addr,
            backlog = self.config.backlog,
            "Server listening"
        );

        let tracker = TaskTracker::new();
        loop {
            tokio::select! {
                biased;

                () = self.shutdown.cancelled() => break,

                result = listener.accept() => match result {
                    Ok(conn) => self.spawn_session(&tracker, conn),
                    Err(e) => tracing::error!(error = %e, "Accept error"),
                },
            }
        }

        drop(listener);
        self.state.send_replace(ListenerState::Stopped);
        tracing::info!(
            sessions_served = self.sessions.total_created(),
            "Server stopped accepting connections"
        );

        self.drain(tracker).await;
        Ok(())
    }

    fn spawn_session(&self, tracker: &TaskTracker, conn: TcpConnection) {
        let peer_addr = conn.peer_addr();
        let session_id = self.sessions.create_session(peer_addr);
        let handler = Arc::clone(&self.handler);
        let sessions = Arc::clone(&self.sessions);

        handler.on_session_start(session_id, peer_addr);
        tracker.spawn(async move {
            tracing::info!(session_id, %peer_addr, "Client connected");

            let summary = EchoSession::new(session_id, conn, Arc::clone(&handler))
                .run()
                .await;

            handler.on_session_end(&summary);
            sessions.close_session(session_id);
        });
    }

    async fn drain(&self, tracker: TaskTracker) {
        tracker.close();
        if tracker.is_empty() {
            return;
        }

        tracing::info!(
            active = self.sessions.count(),
            window_ms = self.drain_timeout.as_millis() as u64,
            "Draining sessions"
        );
        if tokio::time::timeout(self.drain_timeout, tracker.wait())
            .await
            .is_err()
        {
            tracing::warn!(
                remaining = self.sessions.count(),
                peers = ?self.sessions.active_peers(),
                "Drain window elapsed with sessions still open"
            );
        }
    }
}

/// Handle for controlling the server from outside.
#[derive(Clone)]
pub struct ServerHandle {
    state: watch::Receiver<ListenerState>,
    shutdown: CancellationToken,
}

impl ServerHandle {
    /// Requests the listener to stop accepting and shut down.
    pub fn stop(&self) {
        self.shutdown.cancel();
    }

    /// Returns the current listener state.
    #[must_use]
    pub fn state(&self) -> ListenerState {
        *self.state.borrow()
    }

    /// Waits until the listener is accepting and returns its address.
    ///
    /// Returns `None` if the server was dropped first.
    pub async fn listening(&mut self) -> Option<SocketAddr> {
        let state = self
            .state
            .wait_for(|s| matches!(s, ListenerState::Listening { .. }))
            .await
            .ok()?;
        match *state {
            ListenerState::Listening { local_addr } => Some(local_addr),
            ListenerState::Stopped => None,
        }
    }
}
