//! StreamSpace feeds: wire types, routers and handlers

pub mod handlers;
pub mod router;
pub mod types;

pub use handlers::{
    ClusterFeedHandler, ClusterState, LogBuffer, LogTailHandler, SessionsFeedHandler, SessionsState,
    DEFAULT_LOG_CAPACITY,
};
pub use router::{FeedRouter, LogTailRouter};
pub use types::{
    ClusterMetrics, FeedMessage, FeedRoute, MetricsUpdate, Session, SessionCounts, SessionEvent,
    SessionResources, SessionStatus, SessionsUpdate, SESSION_EVENT_TYPES,
};
