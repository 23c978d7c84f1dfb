//! Live dashboard composition
//!
//! Wires the sessions, cluster and log-tail feeds to their shared state.
//! Every feed is its own socket with its own reconnect loop; they share the
//! auth provider, the transport and the notification queue, nothing else.

use crate::feeds::{
    ClusterFeedHandler, ClusterState, FeedRoute, FeedRouter, LogBuffer, LogTailHandler, LogTailRouter,
    SessionsFeedHandler, SessionsState,
};
use crate::infrastructure::config::LiveConfig;
use crate::infrastructure::rest::StreamSpaceRestClient;
use crate::notifications::{NotificationQueue, NotificationRequest, NotificationSink};
use crate::tracking::{Priority, Severity};
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use streamsockets::{
    AuthProvider, ConnectionHealth, ConnectionManager, FeedEndpoint, FeedManager, FeedPath, LifecycleHooks,
    LogTarget, SubscriptionUrlResolver, Transport, TungsteniteTransport,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub const SESSIONS_FEED: &str = "sessions";
pub const CLUSTER_FEED: &str = "cluster";
pub const LOGS_FEED: &str = "logs";

/// How often expired notifications are dropped
const REAPER_INTERVAL: Duration = Duration::from_secs(1);

/// Raises a persistent notification when a feed gives up reconnecting
struct ExhaustionNotifier {
    feed: &'static str,
    sink: Arc<dyn NotificationSink>,
}

impl LifecycleHooks for ExhaustionNotifier {
    fn on_exhausted(&mut self, attempts: u32) {
        self.sink.add_notification(NotificationRequest::new(
            "Connection lost",
            format!(
                "Live {} updates stopped after {} reconnect attempts. Reconnect to resume.",
                self.feed, attempts
            ),
            Severity::Error,
            Priority::High,
        ));
    }
}

/// Log feed hooks: exhaustion notice plus buffer reset on re-target
///
/// The reset runs on the connection task after the old tail is torn down,
/// so no line from the previous pod can land after it. A token rotation
/// keeps the path and keeps the buffer.
struct LogFeedHooks {
    exhaustion: ExhaustionNotifier,
    buffer: Arc<LogBuffer>,
    /// URL of the current tail without its query
    tailing: String,
}

impl LifecycleHooks for LogFeedHooks {
    fn on_url_changed(&mut self, url: &str) {
        let path = without_query(url);
        if path != self.tailing {
            self.tailing = path.to_string();
            self.buffer.clear();
        }
    }

    fn on_exhausted(&mut self, attempts: u32) {
        self.exhaustion.on_exhausted(attempts);
    }
}

fn without_query(url: &str) -> &str {
    url.split_once('?').map_or(url, |(path, _)| path)
}

/// Headless live dashboard: three feeds and the state they keep current
pub struct LiveDashboard {
    auth: Arc<dyn AuthProvider>,
    endpoint: FeedEndpoint,
    feeds: FeedManager,
    sessions: Arc<SessionsState>,
    cluster: Arc<ClusterState>,
    logs: Arc<LogBuffer>,
    log_target: watch::Sender<Option<LogTarget>>,
    notifications: Arc<NotificationQueue>,
    reaper: JoinHandle<()>,
}

impl LiveDashboard {
    /// Start every feed against the configured server
    pub async fn start(config: &LiveConfig, auth: Arc<dyn AuthProvider>) -> Result<Self> {
        Self::start_with_transport(config, auth, Arc::new(TungsteniteTransport)).await
    }

    pub async fn start_with_transport(
        config: &LiveConfig,
        auth: Arc<dyn AuthProvider>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let endpoint = config.endpoint();
        let notifications = Arc::new(NotificationQueue::new(config.notifications.queue_settings()));
        let sink: Arc<dyn NotificationSink> = notifications.clone();
        let reaper = notifications.spawn_reaper(REAPER_INTERVAL);

        let sessions = Arc::new(SessionsState::new(
            Arc::clone(&sink),
            config.tracking.evict_after_missing,
        ));
        let cluster = Arc::new(ClusterState::new());
        let log_capacity = config
            .logs
            .as_ref()
            .map_or(crate::feeds::DEFAULT_LOG_CAPACITY, |logs| logs.capacity);
        let logs = Arc::new(LogBuffer::new(log_capacity));
        let (log_target, log_target_rx) = watch::channel(config.logs.as_ref().map(|logs| logs.target()));

        let mut dashboard = Self {
            auth,
            endpoint,
            feeds: FeedManager::new(),
            sessions,
            cluster,
            logs,
            log_target,
            notifications,
            reaper,
        };

        if config.server.seed_from_rest {
            match dashboard.seed_sessions().await {
                Ok(count) => info!("Seeded {} sessions over REST", count),
                Err(e) => warn!("REST seeding failed, waiting for the first push: {:#}", e),
            }
        }

        dashboard.spawn_feeds(config, transport, sink, log_target_rx)?;
        info!(host = %dashboard.endpoint.host, "Live dashboard started");
        Ok(dashboard)
    }

    fn spawn_feeds(
        &mut self,
        config: &LiveConfig,
        transport: Arc<dyn Transport>,
        sink: Arc<dyn NotificationSink>,
        log_target_rx: watch::Receiver<Option<LogTarget>>,
    ) -> Result<()> {
        let max_attempts = config.reconnect.max_attempts;

        let sessions_state = Arc::clone(&self.sessions);
        let sessions = ConnectionManager::builder()
            .name(SESSIONS_FEED)
            .source(SubscriptionUrlResolver::sessions(
                self.endpoint.clone(),
                Arc::clone(&self.auth),
            ))
            .router(FeedRouter, |routing| {
                routing
                    .handler(FeedRoute::Sessions, SessionsFeedHandler::new(Arc::clone(&sessions_state)))
                    .handler(FeedRoute::SessionEvents, SessionsFeedHandler::new(sessions_state))
            })
            .shared_transport(Arc::clone(&transport))
            .reconnect_policy(config.reconnect.build_policy())
            .max_attempts(max_attempts)
            .hooks(ExhaustionNotifier {
                feed: SESSIONS_FEED,
                sink: Arc::clone(&sink),
            })
            .build()
            .context("failed to build sessions feed")?;

        let cluster_state = Arc::clone(&self.cluster);
        let cluster = ConnectionManager::builder()
            .name(CLUSTER_FEED)
            .source(SubscriptionUrlResolver::cluster(
                self.endpoint.clone(),
                Arc::clone(&self.auth),
            ))
            .router(FeedRouter, |routing| {
                routing.handler(FeedRoute::Metrics, ClusterFeedHandler::new(cluster_state))
            })
            .shared_transport(Arc::clone(&transport))
            .reconnect_policy(config.reconnect.build_policy())
            .max_attempts(max_attempts)
            .hooks(ExhaustionNotifier {
                feed: CLUSTER_FEED,
                sink: Arc::clone(&sink),
            })
            .build()
            .context("failed to build cluster feed")?;

        let log_buffer = Arc::clone(&self.logs);
        let log_hooks = LogFeedHooks {
            exhaustion: ExhaustionNotifier { feed: LOGS_FEED, sink },
            buffer: Arc::clone(&self.logs),
            tailing: log_target_rx
                .borrow()
                .clone()
                .map(|target| without_query(&self.endpoint.url_for(&FeedPath::Logs(target), "")).to_string())
                .unwrap_or_default(),
        };
        let logs = ConnectionManager::builder()
            .name(LOGS_FEED)
            .source(SubscriptionUrlResolver::logs(
                self.endpoint.clone(),
                Arc::clone(&self.auth),
                log_target_rx,
            ))
            .router(LogTailRouter, |routing| {
                routing.handler(FeedRoute::Logs, LogTailHandler::new(log_buffer))
            })
            .shared_transport(transport)
            .reconnect_policy(config.reconnect.build_policy())
            .max_attempts(max_attempts)
            .hooks(log_hooks)
            .build()
            .context("failed to build log feed")?;

        self.feeds.add_feed(SESSIONS_FEED, sessions)?;
        self.feeds.add_feed(CLUSTER_FEED, cluster)?;
        self.feeds.add_feed(LOGS_FEED, logs)?;
        Ok(())
    }

    /// Fetch the session list over REST and feed it to the tracker
    ///
    /// Returns the number of sessions seeded; 0 when signed out.
    pub async fn seed_sessions(&self) -> Result<usize> {
        let Some(token) = self.auth.token() else {
            return Ok(0);
        };

        let client = StreamSpaceRestClient::for_endpoint(&self.endpoint)?;
        let sessions = client.list_sessions(&token).await?;
        let count = sessions.len();
        self.sessions.apply_snapshot(sessions, None);
        Ok(count)
    }

    /// Re-target the log tail; `None` disconnects it
    ///
    /// Returns false when `target` is already the current one. The buffer is
    /// cleared by the log feed once the previous tail is closed.
    pub fn set_log_target(&self, target: Option<LogTarget>) -> bool {
        let changed = self.log_target.send_if_modified(|current| {
            if *current == target {
                false
            } else {
                *current = target.clone();
                true
            }
        });

        if changed {
            match &target {
                Some(t) => info!("Tailing logs of {}/{}", t.namespace, t.pod),
                None => info!("Log tail stopped"),
            }
        }
        changed
    }

    pub fn log_target(&self) -> Option<LogTarget> {
        self.log_target.borrow().clone()
    }

    pub fn sessions(&self) -> &Arc<SessionsState> {
        &self.sessions
    }

    pub fn cluster(&self) -> &Arc<ClusterState> {
        &self.cluster
    }

    pub fn logs(&self) -> &Arc<LogBuffer> {
        &self.logs
    }

    pub fn notifications(&self) -> &Arc<NotificationQueue> {
        &self.notifications
    }

    pub fn feeds(&self) -> &FeedManager {
        &self.feeds
    }

    pub fn health(&self) -> BTreeMap<String, ConnectionHealth> {
        self.feeds.health_by_feed()
    }

    /// Manually re-arm every feed that gave up
    pub fn reconnect_failed(&self) -> usize {
        self.feeds.reconnect_failed()
    }

    /// Close every feed and wait for their tasks
    pub async fn shutdown(self) -> Result<()> {
        self.reaper.abort();
        self.feeds.shutdown().await?;
        info!("Live dashboard stopped");
        Ok(())
    }
}
