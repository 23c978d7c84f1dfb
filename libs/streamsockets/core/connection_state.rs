//! Connection state owned by one connection manager
//!
//! The connection task is the only writer. Readers get a consistent
//! snapshot through [`SharedConnectionState::get`], or subscribe to every
//! transition through [`SharedConnectionState::subscribe`].

use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// Lifecycle status of one logical socket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionStatus {
    /// No socket: the URL is empty, or the manager was closed
    Idle,
    /// Handshake in flight
    Connecting,
    /// Socket open, frames are dispatched
    Open,
    /// Tearing the socket down
    Closing,
    /// Socket gone; a reconnect is scheduled
    Closed,
    /// Reconnect budget spent; down until re-armed
    Exhausted,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Idle => "idle",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Open => "open",
            ConnectionStatus::Closing => "closing",
            ConnectionStatus::Closed => "closed",
            ConnectionStatus::Exhausted => "exhausted",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a connection manager's state
///
/// `attempt` counts reconnects scheduled since the last successful open
/// and goes back to 0 only when a socket opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionState {
    pub status: ConnectionStatus,
    pub attempt: u32,
    pub last_error: Option<String>,
}

impl ConnectionState {
    pub fn idle() -> Self {
        Self {
            status: ConnectionStatus::Idle,
            attempt: 0,
            last_error: None,
        }
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.status == ConnectionStatus::Open
    }

    /// Idle, Closed or Exhausted: no socket exists
    #[inline]
    pub fn is_down(&self) -> bool {
        matches!(
            self.status,
            ConnectionStatus::Idle | ConnectionStatus::Closed | ConnectionStatus::Exhausted
        )
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::idle()
    }
}

/// State shared between the connection task and its observers
#[derive(Debug, Clone)]
pub struct SharedConnectionState {
    inner: Arc<RwLock<ConnectionState>>,
    tx: Arc<watch::Sender<ConnectionState>>,
}

impl SharedConnectionState {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ConnectionState::idle());
        Self {
            inner: Arc::new(RwLock::new(ConnectionState::idle())),
            tx: Arc::new(tx),
        }
    }

    /// Current snapshot
    #[inline]
    pub fn get(&self) -> ConnectionState {
        self.inner.read().clone()
    }

    #[inline]
    pub fn status(&self) -> ConnectionStatus {
        self.inner.read().status
    }

    /// Receiver that observes every published transition
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.tx.subscribe()
    }

    /// Apply a mutation and publish the result
    pub(crate) fn update(&self, f: impl FnOnce(&mut ConnectionState)) -> ConnectionState {
        let snapshot = {
            let mut state = self.inner.write();
            f(&mut state);
            state.clone()
        };
        self.tx.send_replace(snapshot.clone());
        snapshot
    }

    pub(crate) fn set_status(&self, status: ConnectionStatus) -> ConnectionState {
        self.update(|s| s.status = status)
    }
}

impl Default for SharedConnectionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Counters for one connection manager
#[derive(Debug, Default)]
pub struct AtomicMetrics {
    messages_received: AtomicU64,
    messages_dropped: AtomicU64,
    reconnects: AtomicU64,
}

impl AtomicMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn increment_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_dropped(&self) {
        self.messages_dropped.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_reconnects(&self) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn messages_received(&self) -> u64 {
        self.messages_received.load(Ordering::Relaxed)
    }

    pub fn messages_dropped(&self) -> u64 {
        self.messages_dropped.load(Ordering::Relaxed)
    }

    pub fn reconnects(&self) -> u64 {
        self.reconnects.load(Ordering::Relaxed)
    }
}
