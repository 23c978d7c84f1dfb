//! Notification queue with timed expiry

use crate::tracking::{Priority, Severity, TransitionEvent};
use chrono::{DateTime, Utc};
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

/// What a producer hands to a [`NotificationSink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRequest {
    pub title: String,
    pub message: String,
    pub severity: Severity,
    pub priority: Priority,
}

impl NotificationRequest {
    pub fn new(
        title: impl Into<String>,
        message: impl Into<String>,
        severity: Severity,
        priority: Priority,
    ) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            severity,
            priority,
        }
    }

    /// "Session hibernated" / "user1-firefox: running → hibernated"
    pub fn from_transition(event: &TransitionEvent) -> Self {
        Self::new(
            format!("Session {}", event.next),
            format!("{}: {} → {}", event.label, event.previous, event.next),
            event.severity(),
            event.priority(),
        )
    }
}

/// Fire-and-forget notification consumer
pub trait NotificationSink: Send + Sync {
    fn add_notification(&self, request: NotificationRequest);
}

/// A queued notification
#[derive(Debug, Clone)]
pub struct Notification {
    pub id: u64,
    pub title: String,
    pub message: String,
    pub severity: Severity,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    pub expires_at: Instant,
}

impl Notification {
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Display settings
#[derive(Debug, Clone, Copy)]
pub struct QueueSettings {
    pub display: Duration,
    /// Display time for error notifications
    pub error_display: Duration,
    pub max_visible: usize,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            display: Duration::from_millis(5_000),
            error_display: Duration::from_millis(10_000),
            max_visible: 5,
        }
    }
}

#[derive(Default)]
struct QueueInner {
    next_id: u64,
    /// Insertion order
    items: Vec<Notification>,
}

/// Time-boxed notification queue
///
/// `add_notification` never blocks on consumers: subscribers get a copy on
/// an unbounded channel and the item stays queued until it expires or is
/// dismissed.
pub struct NotificationQueue {
    settings: QueueSettings,
    inner: Mutex<QueueInner>,
    subscribers: Mutex<Vec<Sender<Notification>>>,
}

impl NotificationQueue {
    pub fn new(settings: QueueSettings) -> Self {
        Self {
            settings,
            inner: Mutex::new(QueueInner::default()),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn settings(&self) -> QueueSettings {
        self.settings
    }

    /// Receive a copy of every notification added from now on
    pub fn subscribe(&self) -> Receiver<Notification> {
        let (tx, rx) = unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    fn display_for(&self, severity: Severity) -> Duration {
        match severity {
            Severity::Error => self.settings.error_display,
            _ => self.settings.display,
        }
    }

    /// Unexpired items: highest priority first, FIFO within a priority,
    /// at most `max_visible`
    pub fn visible(&self) -> Vec<Notification> {
        let now = Instant::now();
        let mut items: Vec<Notification> = self
            .inner
            .lock()
            .items
            .iter()
            .filter(|n| !n.is_expired(now))
            .cloned()
            .collect();

        // stable sort keeps insertion order within a priority
        items.sort_by(|a, b| b.priority.cmp(&a.priority));
        items.truncate(self.settings.max_visible);
        items
    }

    pub fn dismiss(&self, id: u64) -> bool {
        let mut inner = self.inner.lock();
        let before = inner.items.len();
        inner.items.retain(|n| n.id != id);
        inner.items.len() != before
    }

    /// Drop expired items; returns how many were dropped
    pub fn expire(&self) -> usize {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        let before = inner.items.len();
        inner.items.retain(|n| !n.is_expired(now));
        let dropped = before - inner.items.len();
        if dropped > 0 {
            debug!("Expired {} notifications", dropped);
        }
        dropped
    }

    /// Queued items, expired or not
    pub fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().items.is_empty()
    }

    /// Run `expire()` every `interval` until the queue is dropped
    pub fn spawn_reaper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let queue: Weak<Self> = Arc::downgrade(self);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                match queue.upgrade() {
                    Some(queue) => {
                        queue.expire();
                    }
                    None => break,
                }
            }

            debug!("Notification reaper stopped");
        })
    }
}

impl Default for NotificationQueue {
    fn default() -> Self {
        Self::new(QueueSettings::default())
    }
}

impl NotificationSink for NotificationQueue {
    fn add_notification(&self, request: NotificationRequest) {
        let notification = {
            let mut inner = self.inner.lock();
            inner.next_id += 1;
            let notification = Notification {
                id: inner.next_id,
                expires_at: Instant::now() + self.display_for(request.severity),
                created_at: Utc::now(),
                title: request.title,
                message: request.message,
                severity: request.severity,
                priority: request.priority,
            };
            inner.items.push(notification.clone());
            notification
        };

        debug!(
            id = notification.id,
            severity = %notification.severity,
            priority = %notification.priority,
            "Notification: {}",
            notification.title
        );

        self.subscribers
            .lock()
            .retain(|tx| tx.send(notification.clone()).is_ok());
    }
}

impl<S: NotificationSink + ?Sized> NotificationSink for Arc<S> {
    fn add_notification(&self, request: NotificationRequest) {
        (**self).add_notification(request)
    }
}
