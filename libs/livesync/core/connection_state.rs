//! Lock-free connection state and counters
//!
//! The driver task is the only writer. Consumer handles read these from any
//! thread without going through the command channel.

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

/// Lifecycle of the live transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ConnectionState {
    /// Nothing attempted yet
    Idle = 0,
    /// A connect attempt is in flight
    Connecting = 1,
    /// Live transport is up and driving dispatch
    Open = 2,
    /// Waiting out a backoff delay before the next attempt
    Reconnecting = 3,
    /// Live transport given up on; simulation drives dispatch
    Failed = 4,
    /// Deliberately torn down
    Closed = 5,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ConnectionState::Idle,
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Open,
            3 => ConnectionState::Reconnecting,
            4 => ConnectionState::Failed,
            _ => ConnectionState::Closed,
        }
    }

    /// States from which a consumer-initiated connect is accepted
    pub fn accepts_connect(self) -> bool {
        matches!(
            self,
            ConnectionState::Idle | ConnectionState::Failed | ConnectionState::Closed
        )
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Reconnecting => "reconnecting",
            ConnectionState::Failed => "failed",
            ConnectionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Atomic cell holding a [`ConnectionState`]
#[derive(Debug)]
pub struct AtomicConnectionState {
    inner: AtomicU8,
}

impl AtomicConnectionState {
    pub fn new(state: ConnectionState) -> Self {
        Self {
            inner: AtomicU8::new(state as u8),
        }
    }

    #[inline]
    pub fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.inner.load(Ordering::Acquire))
    }

    #[inline]
    pub fn set(&self, state: ConnectionState) {
        self.inner.store(state as u8, Ordering::Release);
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.get() == ConnectionState::Open
    }
}

impl Default for AtomicConnectionState {
    fn default() -> Self {
        Self::new(ConnectionState::Idle)
    }
}

/// Running counters for one manager
#[derive(Debug, Default)]
pub struct AtomicMetrics {
    messages_sent: AtomicU64,
    messages_received: AtomicU64,
    reconnect_count: AtomicU64,
    dropped_sends: AtomicU64,
    decode_errors: AtomicU64,
    simulated_events: AtomicU64,
}

impl AtomicMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn increment_sent(&self) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_reconnects(&self) {
        self.reconnect_count.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_dropped_sends(&self) {
        self.dropped_sends.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_decode_errors(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_simulated(&self) {
        self.simulated_events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn messages_sent(&self) -> u64 {
        self.messages_sent.load(Ordering::Relaxed)
    }

    pub fn messages_received(&self) -> u64 {
        self.messages_received.load(Ordering::Relaxed)
    }

    pub fn reconnect_count(&self) -> u64 {
        self.reconnect_count.load(Ordering::Relaxed)
    }

    pub fn dropped_sends(&self) -> u64 {
        self.dropped_sends.load(Ordering::Relaxed)
    }

    pub fn decode_errors(&self) -> u64 {
        self.decode_errors.load(Ordering::Relaxed)
    }

    pub fn simulated_events(&self) -> u64 {
        self.simulated_events.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_round_trips_through_atomic() {
        let cell = AtomicConnectionState::default();
        assert_eq!(cell.get(), ConnectionState::Idle);

        for state in [
            ConnectionState::Connecting,
            ConnectionState::Open,
            ConnectionState::Reconnecting,
            ConnectionState::Failed,
            ConnectionState::Closed,
        ] {
            cell.set(state);
            assert_eq!(cell.get(), state);
        }
    }

    #[test]
    fn connect_is_accepted_only_when_no_attempt_is_live() {
        assert!(ConnectionState::Idle.accepts_connect());
        assert!(ConnectionState::Failed.accepts_connect());
        assert!(ConnectionState::Closed.accepts_connect());
        assert!(!ConnectionState::Connecting.accepts_connect());
        assert!(!ConnectionState::Open.accepts_connect());
        assert!(!ConnectionState::Reconnecting.accepts_connect());
    }

    #[test]
    fn display_names_are_lowercase() {
        let names: Vec<String> = [
            ConnectionState::Idle,
            ConnectionState::Connecting,
            ConnectionState::Open,
            ConnectionState::Reconnecting,
            ConnectionState::Failed,
            ConnectionState::Closed,
        ]
        .iter()
        .map(ToString::to_string)
        .collect();
        assert_eq!(
            names,
            ["idle", "connecting", "open", "reconnecting", "failed", "closed"]
        );
    }
}
