//! User-facing notifications derived from feed transitions

pub mod queue;

pub use queue::{Notification, NotificationQueue, NotificationRequest, NotificationSink, QueueSettings};
