use crate::core::{ClientEvent, ConnectionHealth, ConnectionManager, ConnectionState, Metrics};
use crate::traits::{Result, SocketError};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Unique identifier for a feed
pub type FeedId = String;

/// Named collection of connection managers
///
/// Every feed keeps its own reconnect policy and budget; the manager only
/// aggregates. Health is projected from each feed's state at read time, so
/// there is no monitor task and nothing to go stale.
///
/// # Example
/// ```ignore
/// let feeds = FeedManager::new();
/// feeds.add_feed("sessions", sessions)?;
/// feeds.add_feed("cluster", cluster)?;
///
/// if !feeds.all_connected() {
///     println!("Feeds down: {:?}", feeds.disconnected_feeds());
/// }
/// ```
#[derive(Default)]
pub struct FeedManager {
    feeds: RwLock<BTreeMap<FeedId, ConnectionManager>>,
}

impl FeedManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a feed under a unique id
    pub fn add_feed(&self, id: impl Into<FeedId>, feed: ConnectionManager) -> Result<()> {
        let id = id.into();
        let mut feeds = self.feeds.write();

        if feeds.contains_key(&id) {
            return Err(SocketError::Configuration(format!(
                "Feed with id '{}' already exists",
                id
            )));
        }

        feeds.insert(id.clone(), feed);
        info!("Added feed '{}'", id);
        Ok(())
    }

    /// Remove a feed and shut it down
    pub async fn remove_feed(&self, id: &str) -> Result<()> {
        let feed = self.feeds.write().remove(id);

        match feed {
            Some(feed) => {
                debug!("Removing feed '{}'", id);
                feed.shutdown().await?;
                info!("Removed feed '{}'", id);
                Ok(())
            }
            None => Err(SocketError::Configuration(format!("Feed '{}' not found", id))),
        }
    }

    pub fn has_feed(&self, id: &str) -> bool {
        self.feeds.read().contains_key(id)
    }

    pub fn list_feeds(&self) -> Vec<FeedId> {
        self.feeds.read().keys().cloned().collect()
    }

    pub fn feed_count(&self) -> usize {
        self.feeds.read().len()
    }

    pub fn health(&self, id: &str) -> Option<ConnectionHealth> {
        self.feeds.read().get(id).map(|feed| feed.health())
    }

    pub fn health_by_feed(&self) -> BTreeMap<FeedId, ConnectionHealth> {
        self.feeds
            .read()
            .iter()
            .map(|(id, feed)| (id.clone(), feed.health()))
            .collect()
    }

    pub fn states(&self) -> BTreeMap<FeedId, ConnectionState> {
        self.feeds
            .read()
            .iter()
            .map(|(id, feed)| (id.clone(), feed.state()))
            .collect()
    }

    pub fn metrics(&self, id: &str) -> Option<Metrics> {
        self.feeds.read().get(id).map(|feed| feed.metrics())
    }

    /// True when every feed has an open socket (vacuously true when empty)
    pub fn all_connected(&self) -> bool {
        self.feeds.read().values().all(|feed| feed.is_connected())
    }

    /// Feeds without an open socket, in id order
    pub fn disconnected_feeds(&self) -> Vec<FeedId> {
        self.feeds
            .read()
            .iter()
            .filter(|(_, feed)| !feed.is_connected())
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Feeds that spent their reconnect budget
    pub fn exhausted_feeds(&self) -> Vec<FeedId> {
        self.feeds
            .read()
            .iter()
            .filter(|(_, feed)| feed.health().needs_manual_reconnect())
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Manually reconnect one feed
    pub fn reconnect(&self, id: &str) -> Result<()> {
        let feeds = self.feeds.read();
        let feed = feeds
            .get(id)
            .ok_or_else(|| SocketError::Configuration(format!("Feed '{}' not found", id)))?;
        feed.reconnect()
    }

    /// Manually reconnect every exhausted feed; returns how many were re-armed
    pub fn reconnect_failed(&self) -> usize {
        let feeds = self.feeds.read();
        let mut count = 0;

        for (id, feed) in feeds.iter() {
            if !feed.health().needs_manual_reconnect() {
                continue;
            }
            match feed.reconnect() {
                Ok(()) => count += 1,
                Err(e) => warn!("Failed to reconnect feed '{}': {}", id, e),
            }
        }

        count
    }

    /// Close every feed; they stay registered and can be reconnected
    pub fn close_all(&self) {
        for feed in self.feeds.read().values() {
            feed.close();
        }
    }

    /// Drain pending events from every feed (non-blocking)
    pub fn collect_events(&self) -> Vec<(FeedId, ClientEvent)> {
        let feeds = self.feeds.read();
        let mut events = Vec::new();

        for (id, feed) in feeds.iter() {
            while let Some(event) = feed.try_recv_event() {
                events.push((id.clone(), event));
            }
        }

        events
    }

    /// Shut down every feed and wait for their tasks
    pub async fn shutdown(self) -> Result<()> {
        info!("Shutting down feed manager");

        let feeds = std::mem::take(&mut *self.feeds.write());

        for (id, feed) in feeds {
            debug!("Shutting down feed '{}'", id);
            if let Err(e) = feed.shutdown().await {
                warn!("Error shutting down feed '{}': {}", id, e);
            }
        }

        info!("Feed manager shutdown complete");
        Ok(())
    }
}
