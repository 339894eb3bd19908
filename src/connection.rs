//! Connection lifecycle: status, backoff, and the outbound frame gate.
//!
//! SYSTEM CONTEXT
//! ==============
//! The runtime owns the socket I/O; this module owns the *decisions*. It is
//! told about transport events and answers with the delay before the next
//! attempt (or `None` when it must not retry). Every outbound request in the
//! client goes through [`ConnectionManager::send`], which refuses to enqueue
//! anything while the link is down so stale intents never flush on reconnect.

#[cfg(test)]
#[path = "connection_test.rs"]
mod connection_test;

use std::time::Duration;

use frames::Frame;
use tokio::sync::mpsc::UnboundedSender;

use crate::config::BackoffConfig;
use crate::protocol::Outbound;
use crate::types::Millis;

/// Coarse status shown by the presentation layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Reconnecting,
    #[default]
    Disconnected,
}

/// Why the link went down.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The server closed the session on purpose (kick, shutdown).
    ServerTerminated,
    /// The local user asked to leave.
    ClientRequested,
    /// The socket closed without a deliberate reason.
    TransportClose,
    /// The socket failed mid-session.
    TransportError(String),
    /// No traffic within the keepalive window.
    PingTimeout,
}

impl DisconnectReason {
    /// Close reason the server sends when it ends a session deliberately.
    pub const SERVER_DISCONNECT: &'static str = "server disconnect";

    /// Deliberate terminations are final; everything else is retried.
    #[must_use]
    pub fn is_deliberate(&self) -> bool {
        matches!(self, Self::ServerTerminated | Self::ClientRequested)
    }

    /// Classify a websocket close frame's reason text.
    #[must_use]
    pub fn from_close_reason(reason: &str) -> Self {
        match reason {
            Self::SERVER_DISCONNECT => Self::ServerTerminated,
            "ping timeout" => Self::PingTimeout,
            _ => Self::TransportClose,
        }
    }
}

impl std::fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ServerTerminated => f.write_str("server disconnect"),
            Self::ClientRequested => f.write_str("client disconnect"),
            Self::TransportClose => f.write_str("transport close"),
            Self::TransportError(detail) => write!(f, "transport error: {detail}"),
            Self::PingTimeout => f.write_str("ping timeout"),
        }
    }
}

/// `min(base * 2^(attempt - 1), cap)`; attempt 0 means "no failure yet".
#[must_use]
pub fn backoff_delay(config: BackoffConfig, attempt: u32) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }
    let factor = 1u32.checked_shl(attempt - 1).unwrap_or(u32::MAX);
    config.base.saturating_mul(factor).min(config.cap)
}

/// Result of a failed connection attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConnectFailure {
    pub delay: Duration,
    /// True only for the first failure since the last successful connection.
    pub first_failure: bool,
}

#[derive(Debug)]
pub struct ConnectionManager {
    backoff: BackoffConfig,
    tx: UnboundedSender<Frame>,
    state: ConnectionState,
    attempt: u32,
    transport_id: Option<String>,
    reconnect_at: Option<Millis>,
}

impl ConnectionManager {
    #[must_use]
    pub fn new(backoff: BackoffConfig, tx: UnboundedSender<Frame>) -> Self {
        Self {
            backoff,
            tx,
            state: ConnectionState::Disconnected,
            attempt: 0,
            transport_id: None,
            reconnect_at: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    #[must_use]
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    #[must_use]
    pub fn transport_id(&self) -> Option<&str> {
        self.transport_id.as_deref()
    }

    pub fn set_transport_id(&mut self, transport_id: Option<String>) {
        self.transport_id = transport_id;
    }

    /// When the single pending reconnect attempt is due, if any.
    #[must_use]
    pub fn reconnect_at(&self) -> Option<Millis> {
        self.reconnect_at
    }

    pub fn on_connected(&mut self) {
        self.state = ConnectionState::Connected;
        self.attempt = 0;
        self.reconnect_at = None;
    }

    /// Record a lost session. Returns the delay before reconnecting, or
    /// `None` when the disconnect was deliberate.
    pub fn on_disconnected(&mut self, reason: &DisconnectReason, now: Millis) -> Option<Duration> {
        self.transport_id = None;
        if reason.is_deliberate() {
            self.state = ConnectionState::Disconnected;
            self.reconnect_at = None;
            return None;
        }
        Some(self.schedule_retry(now))
    }

    /// Record a failed connection attempt and schedule the next one.
    pub fn on_transport_error(&mut self, now: Millis) -> ConnectFailure {
        let first_failure = self.attempt == 0;
        let delay = self.schedule_retry(now);
        ConnectFailure { delay, first_failure }
    }

    fn schedule_retry(&mut self, now: Millis) -> Duration {
        self.attempt = self.attempt.saturating_add(1);
        self.state = ConnectionState::Reconnecting;
        let delay = backoff_delay(self.backoff, self.attempt);
        let delay_ms = Millis::try_from(delay.as_millis()).unwrap_or(Millis::MAX);
        // Replaces any earlier schedule: at most one retry is ever pending.
        self.reconnect_at = Some(now.saturating_add(delay_ms));
        delay
    }

    /// Forward a request to the server. Returns `false` (and drops it) when
    /// the link is down or the runtime has gone away.
    pub fn send(&self, request: &Outbound) -> bool {
        if !self.is_connected() {
            tracing::debug!(syscall = request.syscall(), "dropping request while offline");
            return false;
        }
        self.tx.send(request.to_frame()).is_ok()
    }
}
