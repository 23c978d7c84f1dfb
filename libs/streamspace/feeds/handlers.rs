//! Feed handlers: fold decoded messages into shared dashboard state

use super::types::{ClusterMetrics, FeedMessage, Session};
use crate::notifications::{NotificationRequest, NotificationSink};
use crate::tracking::{StateDiffTracker, TransitionEvent};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;
use std::sync::Arc;
use streamsockets::MessageHandler;
use tracing::{debug, info, warn};

/// Default number of log lines kept per tail
pub const DEFAULT_LOG_CAPACITY: usize = 1000;

// =============================================================================
// Sessions
// =============================================================================

/// Latest sessions snapshot plus the diff state that announces transitions
///
/// Shared between the sessions feed handler and REST seeding, so either
/// source can deliver a snapshot.
pub struct SessionsState {
    tracker: Mutex<StateDiffTracker<Session>>,
    sessions: RwLock<Vec<Session>>,
    updated_at: RwLock<Option<DateTime<Utc>>>,
    sink: Arc<dyn NotificationSink>,
}

impl SessionsState {
    pub fn new(sink: Arc<dyn NotificationSink>, evict_after_missing: Option<u32>) -> Self {
        Self {
            tracker: Mutex::new(StateDiffTracker::with_eviction(evict_after_missing)),
            sessions: RwLock::new(Vec::new()),
            updated_at: RwLock::new(None),
            sink,
        }
    }

    /// Diff a full snapshot, notify every transition, replace the stored list
    pub fn apply_snapshot(&self, sessions: Vec<Session>, timestamp: Option<DateTime<Utc>>) -> Vec<TransitionEvent> {
        let taken_at = timestamp.unwrap_or_else(Utc::now);
        let events = self.tracker.lock().observe_at(&sessions, taken_at);

        for event in &events {
            info!(
                session = %event.entity_id,
                "Session {} → {}",
                event.previous,
                event.next
            );
            self.sink.add_notification(NotificationRequest::from_transition(event));
        }

        debug!(count = sessions.len(), transitions = events.len(), "Sessions snapshot applied");
        *self.sessions.write() = sessions;
        *self.updated_at.write() = Some(taken_at);
        events
    }

    /// Drop a session from the diff state (it was deleted server-side)
    pub fn forget(&self, session_id: &str) {
        self.tracker.lock().forget(session_id);
    }

    pub fn sessions(&self) -> Vec<Session> {
        self.sessions.read().clone()
    }

    pub fn session(&self, name: &str) -> Option<Session> {
        self.sessions.read().iter().find(|s| s.name == name).cloned()
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        *self.updated_at.read()
    }

    pub fn tracked_count(&self) -> usize {
        self.tracker.lock().len()
    }
}

/// Handles the sessions feed: snapshots and targeted session events
pub struct SessionsFeedHandler {
    state: Arc<SessionsState>,
}

impl SessionsFeedHandler {
    pub fn new(state: Arc<SessionsState>) -> Self {
        Self { state }
    }
}

impl MessageHandler<FeedMessage> for SessionsFeedHandler {
    fn handle(&mut self, message: FeedMessage) -> streamsockets::Result<()> {
        match message {
            FeedMessage::SessionsUpdate(update) => {
                self.state.apply_snapshot(update.sessions, update.timestamp);
            }
            FeedMessage::SessionEvent(event) => match event.event_type.as_str() {
                "session.deleted" => {
                    debug!(session = %event.session_id, "Session deleted");
                    self.state.forget(&event.session_id);
                }
                "session.error" => {
                    warn!(session = %event.session_id, data = ?event.data, "Session error");
                }
                other => debug!(session = %event.session_id, "Session event {}", other),
            },
            other => debug!("Sessions feed ignoring {:?}", other.route()),
        }
        Ok(())
    }
}

// =============================================================================
// Cluster metrics
// =============================================================================

/// Latest cluster metrics
#[derive(Default)]
pub struct ClusterState {
    latest: RwLock<Option<ClusterMetrics>>,
    updated_at: RwLock<Option<DateTime<Utc>>>,
}

impl ClusterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&self, metrics: ClusterMetrics, timestamp: Option<DateTime<Utc>>) {
        *self.latest.write() = Some(metrics);
        *self.updated_at.write() = Some(timestamp.unwrap_or_else(Utc::now));
    }

    pub fn latest(&self) -> Option<ClusterMetrics> {
        self.latest.read().clone()
    }

    pub fn running(&self) -> u64 {
        self.latest.read().as_ref().map_or(0, |m| m.sessions.running)
    }

    pub fn hibernated(&self) -> u64 {
        self.latest.read().as_ref().map_or(0, |m| m.sessions.hibernated)
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        *self.updated_at.read()
    }
}

pub struct ClusterFeedHandler {
    state: Arc<ClusterState>,
}

impl ClusterFeedHandler {
    pub fn new(state: Arc<ClusterState>) -> Self {
        Self { state }
    }
}

impl MessageHandler<FeedMessage> for ClusterFeedHandler {
    fn handle(&mut self, message: FeedMessage) -> streamsockets::Result<()> {
        match message {
            FeedMessage::MetricsUpdate(update) => {
                debug!(
                    running = update.metrics.sessions.running,
                    hibernated = update.metrics.sessions.hibernated,
                    "Cluster metrics"
                );
                self.state.apply(update.metrics, update.timestamp);
            }
            other => debug!("Cluster feed ignoring {:?}", other.route()),
        }
        Ok(())
    }
}

// =============================================================================
// Log tail
// =============================================================================

/// Bounded buffer of the most recent log lines
pub struct LogBuffer {
    inner: Mutex<LogLines>,
    capacity: usize,
}

struct LogLines {
    lines: VecDeque<String>,
    /// Lines ever pushed, also the sequence number of the next one
    pushed: u64,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(LogLines {
                lines: VecDeque::with_capacity(capacity.min(DEFAULT_LOG_CAPACITY)),
                pushed: 0,
            }),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&self, line: String) {
        let mut inner = self.inner.lock();
        if inner.lines.len() == self.capacity {
            inner.lines.pop_front();
        }
        inner.lines.push_back(line);
        inner.pushed += 1;
    }

    pub fn lines(&self) -> Vec<String> {
        self.inner.lock().lines.iter().cloned().collect()
    }

    /// Lines pushed at or after sequence `cursor` that are still buffered,
    /// plus the cursor to pass next time. Evicted or cleared lines are skipped.
    pub fn lines_since(&self, cursor: u64) -> (Vec<String>, u64) {
        let inner = self.inner.lock();
        let oldest = inner.pushed - inner.lines.len() as u64;
        let skip = cursor.saturating_sub(oldest).min(inner.lines.len() as u64) as usize;
        (inner.lines.iter().skip(skip).cloned().collect(), inner.pushed)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().lines.is_empty()
    }

    pub fn clear(&self) {
        self.inner.lock().lines.clear();
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

pub struct LogTailHandler {
    buffer: Arc<LogBuffer>,
}

impl LogTailHandler {
    pub fn new(buffer: Arc<LogBuffer>) -> Self {
        Self { buffer }
    }
}

impl MessageHandler<FeedMessage> for LogTailHandler {
    fn handle(&mut self, message: FeedMessage) -> streamsockets::Result<()> {
        if let FeedMessage::LogLine(line) = message {
            self.buffer.push(line);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feeds::types::{SessionsUpdate, SessionStatus};
    use crate::notifications::NotificationQueue;
    use crate::tracking::{Priority, Severity};

    fn session(name: &str, state: &str) -> Session {
        Session {
            name: name.to_string(),
            namespace: "streamspace".to_string(),
            user: "user1".to_string(),
            template: "firefox-browser".to_string(),
            state: state.to_string(),
            status: SessionStatus::default(),
            created_at: None,
            active_connections: 0,
            resources: None,
            last_activity: None,
            idle_duration: None,
            idle_threshold: None,
            is_idle: false,
            is_active: false,
        }
    }

    fn update(sessions: Vec<Session>) -> FeedMessage {
        FeedMessage::SessionsUpdate(SessionsUpdate {
            count: sessions.len(),
            sessions,
            timestamp: None,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_sessions_handler_notifies_transitions() {
        let queue = Arc::new(NotificationQueue::default());
        let state = Arc::new(SessionsState::new(queue.clone(), None));
        let mut handler = SessionsFeedHandler::new(state.clone());

        handler.handle(update(vec![session("s1", "running")])).unwrap();
        assert!(queue.is_empty());
        assert_eq!(state.sessions().len(), 1);

        handler.handle(update(vec![session("s1", "hibernated")])).unwrap();
        let visible = queue.visible();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].title, "Session hibernated");
        assert_eq!(visible[0].message, "s1: running → hibernated");
        assert_eq!(visible[0].severity, Severity::Warning);
        assert_eq!(visible[0].priority, Priority::Medium);
        assert_eq!(state.session("s1").map(|s| s.state), Some("hibernated".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rest_seed_then_socket_snapshot() {
        let queue = Arc::new(NotificationQueue::default());
        let state = Arc::new(SessionsState::new(queue.clone(), None));

        // seeded over REST
        assert!(state.apply_snapshot(vec![session("s1", "running")], None).is_empty());

        let mut handler = SessionsFeedHandler::new(state.clone());
        handler.handle(update(vec![session("s1", "terminated")])).unwrap();

        let visible = queue.visible();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].severity, Severity::Error);
        assert_eq!(visible[0].priority, Priority::High);
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_timestamp_reaches_transitions() {
        let queue = Arc::new(NotificationQueue::default());
        let state = SessionsState::new(queue, None);
        let pushed_at: DateTime<Utc> = "2025-01-01T10:05:00Z".parse().unwrap();

        state.apply_snapshot(vec![session("s1", "running")], None);
        let events = state.apply_snapshot(vec![session("s1", "hibernated")], Some(pushed_at));

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].timestamp, pushed_at);
        assert_eq!(state.updated_at(), Some(pushed_at));
    }

    #[test]
    fn test_cluster_handler_keeps_latest() {
        let state = Arc::new(ClusterState::new());
        let mut handler = ClusterFeedHandler::new(state.clone());
        assert_eq!(state.running(), 0);

        let mut metrics = ClusterMetrics::default();
        metrics.sessions.running = 4;
        metrics.sessions.hibernated = 2;
        handler
            .handle(FeedMessage::MetricsUpdate(crate::feeds::types::MetricsUpdate {
                metrics,
                timestamp: None,
            }))
            .unwrap();

        assert_eq!(state.running(), 4);
        assert_eq!(state.hibernated(), 2);
        assert!(state.updated_at().is_some());
    }

    #[test]
    fn test_log_buffer_is_bounded() {
        let buffer = Arc::new(LogBuffer::new(3));
        let mut handler = LogTailHandler::new(buffer.clone());
        for i in 0..5 {
            handler.handle(FeedMessage::LogLine(format!("line {}", i))).unwrap();
        }

        assert_eq!(buffer.lines(), vec!["line 2", "line 3", "line 4"]);
    }

    #[test]
    fn test_lines_since_keeps_up_with_full_buffer() {
        let buffer = LogBuffer::new(3);
        for i in 0..3 {
            buffer.push(format!("line {}", i));
        }
        let (lines, cursor) = buffer.lines_since(0);
        assert_eq!(lines, vec!["line 0", "line 1", "line 2"]);
        assert_eq!(cursor, 3);

        // buffer stays at capacity, new lines still come through
        buffer.push("line 3".to_string());
        buffer.push("line 4".to_string());
        let (lines, cursor) = buffer.lines_since(cursor);
        assert_eq!(lines, vec!["line 3", "line 4"]);
        assert_eq!(buffer.len(), 3);

        // more than capacity since the last read: evicted lines are gone
        for i in 5..10 {
            buffer.push(format!("line {}", i));
        }
        let (lines, cursor) = buffer.lines_since(cursor);
        assert_eq!(lines, vec!["line 7", "line 8", "line 9"]);

        let (lines, cursor) = buffer.lines_since(cursor);
        assert!(lines.is_empty());
        assert_eq!(cursor, 10);
    }

    #[test]
    fn test_lines_since_after_clear() {
        let buffer = LogBuffer::new(3);
        buffer.push("old pod".to_string());
        let (_, cursor) = buffer.lines_since(0);

        buffer.push("unread".to_string());
        buffer.clear();
        buffer.push("new pod".to_string());

        let (lines, cursor) = buffer.lines_since(cursor);
        assert_eq!(lines, vec!["new pod"]);
        assert_eq!(cursor, 3);
    }
}
