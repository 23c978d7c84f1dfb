//! StreamSpace live dashboard
//!
//! Domain layer on top of `streamsockets`: typed feed messages, snapshot
//! diffing, notifications, configuration and the composition that keeps a
//! dashboard live.

pub mod app;
pub mod feeds;
pub mod infrastructure;
pub mod notifications;
pub mod tracking;

// Re-export commonly used items
pub use app::{LiveDashboard, CLUSTER_FEED, LOGS_FEED, SESSIONS_FEED};
pub use feeds::{FeedMessage, FeedRoute, FeedRouter, LogTailRouter, Session};
pub use infrastructure::{init_tracing, init_tracing_with_level, LiveConfig, ShutdownManager};
pub use notifications::{Notification, NotificationQueue, NotificationRequest, NotificationSink};
pub use tracking::{classify, Priority, Severity, StateDiffTracker, TransitionEvent};
