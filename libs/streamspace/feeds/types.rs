//! Wire types pushed by the StreamSpace API over its WebSocket feeds

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// Sessions feed
// =============================================================================

/// One session as pushed in a `sessions_update` snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Session name, unique per namespace; used as the entity id
    pub name: String,

    #[serde(default)]
    pub namespace: String,

    #[serde(default)]
    pub user: String,

    #[serde(default)]
    pub template: String,

    /// Lifecycle state (running, hibernated, terminated, ...)
    #[serde(default)]
    pub state: String,

    #[serde(default)]
    pub status: SessionStatus,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub active_connections: u32,

    #[serde(default)]
    pub resources: Option<SessionResources>,

    #[serde(default)]
    pub last_activity: Option<DateTime<Utc>>,

    /// Seconds since last activity
    #[serde(default)]
    pub idle_duration: Option<i64>,

    /// Seconds of inactivity before auto-hibernation
    #[serde(default)]
    pub idle_threshold: Option<i64>,

    #[serde(default)]
    pub is_idle: bool,

    #[serde(default)]
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    #[serde(default)]
    pub phase: String,
    #[serde(default)]
    pub pod_name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub last_activity: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionResources {
    #[serde(default)]
    pub memory: String,
    #[serde(default)]
    pub cpu: String,
}

/// Full replacement collection of the user's sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionsUpdate {
    #[serde(default)]
    pub sessions: Vec<Session>,
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

// =============================================================================
// Cluster feed
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCounts {
    #[serde(default)]
    pub running: u64,
    #[serde(default)]
    pub hibernated: u64,
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterMetrics {
    #[serde(default)]
    pub sessions: SessionCounts,
    #[serde(default)]
    pub active_connections: u64,
    #[serde(default)]
    pub repositories: u64,
    #[serde(default)]
    pub templates: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsUpdate {
    #[serde(default)]
    pub metrics: ClusterMetrics,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

// =============================================================================
// Targeted session events
// =============================================================================

/// A single-session event (`session.created`, `session.state.changed`, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub data: Option<Value>,
}

impl SessionEvent {
    /// `(oldState, newState)` carried by `session.state.changed`
    pub fn state_change(&self) -> Option<(&str, &str)> {
        let data = self.data.as_ref()?;
        let old = data.get("oldState")?.as_str()?;
        let new = data.get("newState")?.as_str()?;
        Some((old, new))
    }
}

/// Event types the server emits for targeted session events
pub const SESSION_EVENT_TYPES: [&str; 14] = [
    "session.created",
    "session.updated",
    "session.deleted",
    "session.state.changed",
    "session.connected",
    "session.disconnected",
    "session.heartbeat",
    "session.idle",
    "session.active",
    "session.resources.updated",
    "session.tags.updated",
    "session.shared",
    "session.unshared",
    "session.error",
];

// =============================================================================
// Decoded feed messages
// =============================================================================

/// Every message kind the dashboard feeds carry
#[derive(Debug, Clone, PartialEq)]
pub enum FeedMessage {
    SessionsUpdate(SessionsUpdate),
    MetricsUpdate(MetricsUpdate),
    SessionEvent(SessionEvent),
    /// Raw log-tail line (not JSON)
    LogLine(String),
}

/// Route keys for feed handlers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedRoute {
    Sessions,
    Metrics,
    SessionEvents,
    Logs,
}

impl FeedMessage {
    pub fn route(&self) -> FeedRoute {
        match self {
            FeedMessage::SessionsUpdate(_) => FeedRoute::Sessions,
            FeedMessage::MetricsUpdate(_) => FeedRoute::Metrics,
            FeedMessage::SessionEvent(_) => FeedRoute::SessionEvents,
            FeedMessage::LogLine(_) => FeedRoute::Logs,
        }
    }
}
