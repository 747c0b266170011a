//! Connection lifecycle state and reconnect backoff.

use bm_common::consts::{RECONNECT_BACKOFF_MAX_S, RECONNECT_BACKOFF_STEP_S};
use std::fmt;
use std::time::Duration;

/// Adapter connection state.
///
/// ```text
/// DISCONNECTED ──► CONNECTING ──► CONNECTED ──► DISCONNECT_PLANNED ──► DISCONNECTED
///      ▲               │              │
///      └───────────────┴──────────────┘  (failure / unplanned drop)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No session; reconnect when the backoff expires.
    Disconnected,
    /// Waiting for the broker acknowledgement.
    Connecting,
    /// Session up.
    Connected,
    /// Shut down on purpose; no auto-reconnect.
    DisconnectPlanned,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Disconnected => "DISCONNECTED",
            Self::Connecting => "CONNECTING",
            Self::Connected => "CONNECTED",
            Self::DisconnectPlanned => "DISCONNECT_PLANNED",
        })
    }
}

/// Linear reconnect backoff.
///
/// The first attempt is immediate. After a failure the next attempt waits
/// the current backoff, which then grows by one step up to the ceiling.
/// A successful connection resets it.
#[derive(Debug, Clone)]
pub struct Backoff {
    current: Duration,
    next_attempt: Duration,
}

impl Backoff {
    const STEP: Duration = Duration::from_secs(RECONNECT_BACKOFF_STEP_S);
    const MAX: Duration = Duration::from_secs(RECONNECT_BACKOFF_MAX_S);

    /// Fresh backoff: attempt now.
    pub fn new() -> Self {
        Self {
            current: Self::STEP,
            next_attempt: Duration::ZERO,
        }
    }

    /// Whether an attempt is due at `now`.
    pub fn ready(&self, now: Duration) -> bool {
        now >= self.next_attempt
    }

    /// Wait before the next attempt.
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Earliest time of the next attempt.
    pub fn next_attempt(&self) -> Duration {
        self.next_attempt
    }

    /// Record a failed attempt at `now`.
    pub fn failed(&mut self, now: Duration) {
        self.next_attempt = now + self.current;
        self.current = (self.current + Self::STEP).min(Self::MAX);
    }

    /// Record a lost session at `now`; retry after the current backoff.
    pub fn dropped(&mut self, now: Duration) {
        self.next_attempt = now + self.current;
    }

    /// Record a successful connection.
    pub fn succeeded(&mut self) {
        self.current = Self::STEP;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}
