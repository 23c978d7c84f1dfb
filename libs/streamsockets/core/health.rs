//! Display-only connection health
//!
//! A pure projection of [`ConnectionState`]. It holds no state of its own,
//! so it is always exactly as fresh as the state it was projected from.

use crate::connection_state::{ConnectionState, ConnectionStatus};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionHealth {
    /// No socket and none pending
    Disconnected,
    /// First handshake in flight
    Connecting,
    Connected,
    /// Down, with reconnect `attempt` scheduled or in flight
    Reconnecting { attempt: u32 },
    /// Reconnect budget spent; needs a manual reconnect
    Failed { attempts: u32 },
}

impl ConnectionHealth {
    pub fn from_state(state: &ConnectionState) -> Self {
        match state.status {
            ConnectionStatus::Open => ConnectionHealth::Connected,
            ConnectionStatus::Exhausted => ConnectionHealth::Failed {
                attempts: state.attempt,
            },
            ConnectionStatus::Connecting | ConnectionStatus::Closed if state.attempt > 0 => {
                ConnectionHealth::Reconnecting {
                    attempt: state.attempt,
                }
            }
            ConnectionStatus::Connecting => ConnectionHealth::Connecting,
            ConnectionStatus::Idle | ConnectionStatus::Closing | ConnectionStatus::Closed => {
                ConnectionHealth::Disconnected
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionHealth::Connected)
    }

    /// Whether the UI should offer a manual "Reconnect" action
    pub fn needs_manual_reconnect(&self) -> bool {
        matches!(self, ConnectionHealth::Failed { .. })
    }

    pub fn label(&self) -> String {
        match self {
            ConnectionHealth::Disconnected => "disconnected".to_string(),
            ConnectionHealth::Connecting => "connecting".to_string(),
            ConnectionHealth::Connected => "connected".to_string(),
            ConnectionHealth::Reconnecting { attempt } => {
                format!("reconnecting (attempt {})", attempt)
            }
            ConnectionHealth::Failed { attempts } => {
                format!("connection lost after {} attempts", attempts)
            }
        }
    }
}

impl From<&ConnectionState> for ConnectionHealth {
    fn from(state: &ConnectionState) -> Self {
        Self::from_state(state)
    }
}

impl fmt::Display for ConnectionHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}
