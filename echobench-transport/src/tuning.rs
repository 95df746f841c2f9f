//! Socket tuning.
//!
//! A [`TuningProfile`] is a fixed set of latency-oriented socket options.
//! Applying it never fails: each option is set independently and any error
//! is recorded as a [`TuningWarning`] in the returned [`TuningReport`].
//! Applying the same profile twice to the same socket is safe.

use socket2::{SockRef, TcpKeepalive};
use std::fmt;
use std::io;
use std::time::Duration;

/// Default socket buffer size (8 KiB read size times four).
pub const DEFAULT_BUFFER_SIZE: usize = 32 * 1024;

/// Default send and receive timeout.
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(5);

/// A socket option managed by a [`TuningProfile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketOption {
    /// `SO_REUSEADDR`.
    ReuseAddress,
    /// `TCP_NODELAY`.
    NoDelay,
    /// `SO_SNDBUF`.
    SendBuffer,
    /// `SO_RCVBUF`.
    RecvBuffer,
    /// `SO_SNDTIMEO`.
    SendTimeout,
    /// `SO_RCVTIMEO`.
    RecvTimeout,
    /// `SO_KEEPALIVE`.
    KeepAlive,
    /// Keepalive idle time, probe interval and probe count.
    KeepAliveParams,
}

impl SocketOption {
    /// Returns the conventional name of the option.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::ReuseAddress => "SO_REUSEADDR",
            Self::NoDelay => "TCP_NODELAY",
            Self::SendBuffer => "SO_SNDBUF",
            Self::RecvBuffer => "SO_RCVBUF",
            Self::SendTimeout => "SO_SNDTIMEO",
            Self::RecvTimeout => "SO_RCVTIMEO",
            Self::KeepAlive => "SO_KEEPALIVE",
            Self::KeepAliveParams => "TCP_KEEPIDLE/TCP_KEEPINTVL/TCP_KEEPCNT",
        }
    }
}

impl fmt::Display for SocketOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An option that could not be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TuningWarning {
    /// The option that failed.
    pub option: SocketOption,
    /// Error reported by the OS.
    pub message: String,
}

impl fmt::Display for TuningWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to set {}: {}", self.option, self.message)
    }
}

/// Outcome of applying a profile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TuningReport {
    /// Options applied successfully, in order.
    pub applied: Vec<SocketOption>,
    /// Options that failed, in order.
    pub warnings: Vec<TuningWarning>,
}

impl TuningReport {
    /// Returns true if every option was applied.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    fn record(&mut self, option: SocketOption, result: io::Result<()>) {
        match result {
            Ok(()) => {
                tracing::trace!(%option, "socket option applied");
                self.applied.push(option);
            }
            Err(e) => {
                tracing::warn!(%option, error = %e, "failed to apply socket option");
                self.warnings.push(TuningWarning {
                    option,
                    message: e.to_string(),
                });
            }
        }
    }
}

/// Fixed set of socket options applied at connect/accept time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TuningProfile {
    /// Disable Nagle's algorithm.
    pub no_delay: bool,
    /// Requested `SO_SNDBUF` in bytes.
    pub send_buffer_size: usize,
    /// Requested `SO_RCVBUF` in bytes.
    pub recv_buffer_size: usize,
    /// Send timeout; zero disables it.
    pub send_timeout: Duration,
    /// Receive timeout; zero disables it.
    pub recv_timeout: Duration,
    /// Enable TCP keepalive probes.
    pub keepalive: bool,
    /// Idle time before the first keepalive probe.
    pub keepalive_idle: Duration,
    /// Interval between keepalive probes.
    pub keepalive_interval: Duration,
    /// Unanswered probes before the peer is declared dead.
    pub keepalive_retries: u32,
    /// Allow rebinding a recently used local address.
    pub reuse_address: bool,
}

impl Default for TuningProfile {
    fn default() -> Self {
        Self {
            no_delay: true,
            send_buffer_size: DEFAULT_BUFFER_SIZE,
            recv_buffer_size: DEFAULT_BUFFER_SIZE,
            send_timeout: DEFAULT_IO_TIMEOUT,
            recv_timeout: DEFAULT_IO_TIMEOUT,
            keepalive: true,
            keepalive_idle: Duration::from_secs(60),
            keepalive_interval: Duration::from_secs(10),
            keepalive_retries: 5,
            reuse_address: true,
        }
    }
}

impl TuningProfile {
    /// Sets TCP_NODELAY.
    #[must_use]
    pub fn no_delay(mut self, enabled: bool) -> Self {
        self.no_delay = enabled;
        self
    }

    /// Sets both socket buffer sizes.
    #[must_use]
    pub fn buffer_sizes(mut self, send: usize, recv: usize) -> Self {
        self.send_buffer_size = send;
        self.recv_buffer_size = recv;
        self
    }

    /// Sets both the send and receive timeout.
    #[must_use]
    pub fn io_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self.recv_timeout = timeout;
        self
    }

    /// Sets the receive timeout only.
    #[must_use]
    pub fn recv_timeout(mut self, timeout: Duration) -> Self {
        self.recv_timeout = timeout;
        self
    }

    /// Enables or disables keepalive.
    #[must_use]
    pub fn keepalive(mut self, enabled: bool) -> Self {
        self.keepalive = enabled;
        self
    }

    /// Send timeout as used by async I/O, `None` when disabled.
    #[must_use]
    pub fn send_deadline(&self) -> Option<Duration> {
        non_zero(self.send_timeout)
    }

    /// Receive timeout as used by async I/O, `None` when disabled.
    #[must_use]
    pub fn recv_deadline(&self) -> Option<Duration> {
        non_zero(self.recv_timeout)
    }

    /// Applies every option in order to `socket`.
    ///
    /// Works on listening and connected sockets alike. Failures are logged
    /// and collected; they never abort the caller.
    pub fn apply(&self, socket: SockRef<'_>) -> TuningReport {
        let mut report = TuningReport::default();

        report.record(
            SocketOption::ReuseAddress,
            socket.set_reuse_address(self.reuse_address),
        );
        report.record(SocketOption::NoDelay, socket.set_nodelay(self.no_delay));
        report.record(
            SocketOption::SendBuffer,
            socket.set_send_buffer_size(self.send_buffer_size),
        );
        report.record(
            SocketOption::RecvBuffer,
            socket.set_recv_buffer_size(self.recv_buffer_size),
        );
        report.record(
            SocketOption::SendTimeout,
            socket.set_write_timeout(self.send_deadline()),
        );
        report.record(
            SocketOption::RecvTimeout,
            socket.set_read_timeout(self.recv_deadline()),
        );
        report.record(SocketOption::KeepAlive, socket.set_keepalive(self.keepalive));
        if self.keepalive {
            report.record(
                SocketOption::KeepAliveParams,
                socket.set_tcp_keepalive(&self.keepalive_params()),
            );
        }

        tracing::debug!(
            applied = report.applied.len(),
            warnings = report.warnings.len(),
            "socket tuning finished"
        );
        report
    }

    fn keepalive_params(&self) -> TcpKeepalive {
        let params = TcpKeepalive::new().with_time(self.keepalive_idle);

        #[cfg(any(
            target_os = "linux",
            target_os = "android",
            target_os = "macos",
            target_os = "ios",
            target_os = "freebsd",
            target_os = "netbsd",
            windows
        ))]
        let params = params.with_interval(self.keepalive_interval);

        #[cfg(any(
            target_os = "linux",
            target_os = "android",
            target_os = "macos",
            target_os = "ios",
            target_os = "freebsd",
            target_os = "netbsd"
        ))]
        let params = params.with_retries(self.keepalive_retries);

        params
    }
}

fn non_zero(timeout: Duration) -> Option<Duration> {
    (!timeout.is_zero()).then_some(timeout)
}

/// Effective socket configuration as reported by the OS.
///
/// Buffer sizes are what the kernel granted, which may differ from the
/// request (Linux doubles it).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketSettings {
    /// TCP_NODELAY.
    pub no_delay: bool,
    /// Granted `SO_SNDBUF`.
    pub send_buffer_size: usize,
    /// Granted `SO_RCVBUF`.
    pub recv_buffer_size: usize,
    /// `SO_SNDTIMEO`.
    pub send_timeout: Option<Duration>,
    /// `SO_RCVTIMEO`.
    pub recv_timeout: Option<Duration>,
    /// `SO_KEEPALIVE`.
    pub keepalive: bool,
    /// `SO_REUSEADDR`.
    pub reuse_address: bool,
}

impl SocketSettings {
    /// Reads the current settings of `socket`.
    ///
    /// # Errors
    /// Returns the first getsockopt error.
    pub fn read(socket: SockRef<'_>) -> io::Result<Self> {
        Ok(Self {
            no_delay: socket.nodelay()?,
            send_buffer_size: socket.send_buffer_size()?,
            recv_buffer_size: socket.recv_buffer_size()?,
            send_timeout: socket.write_timeout()?,
            recv_timeout: socket.read_timeout()?,
            keepalive: socket.keepalive()?,
            reuse_address: socket.reuse_address()?,
        })
    }
}
