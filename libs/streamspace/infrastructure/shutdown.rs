//! Process shutdown for the live monitor
//!
//! Ctrl+C (or [`ShutdownManager::trigger`]) flips a watch flag. The status
//! loop ticks on it and [`ShutdownManager::close`] runs the dashboard teardown.

use crate::app::LiveDashboard;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;

#[derive(Clone)]
pub struct ShutdownManager {
    stop: Arc<watch::Sender<bool>>,
}

impl ShutdownManager {
    pub fn new() -> Self {
        let (stop, _) = watch::channel(false);
        Self { stop: Arc::new(stop) }
    }

    /// Spawn a Ctrl+C handler that triggers shutdown
    pub fn spawn_signal_handler(&self) {
        let stop = Arc::clone(&self.stop);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Received shutdown signal (Ctrl+C), closing feeds...");
                stop.send_replace(true);
            }
        });
    }

    pub fn is_running(&self) -> bool {
        !*self.stop.borrow()
    }

    pub fn trigger(&self) {
        self.stop.send_replace(true);
    }

    /// Resolves once shutdown has been triggered
    pub async fn triggered(&self) {
        let mut rx = self.stop.subscribe();
        // the sender lives in self, so the wait cannot fail
        let _ = rx.wait_for(|stop| *stop).await;
    }

    /// Wait one status interval. Returns false as soon as shutdown is
    /// triggered, without waiting out the rest of the interval.
    pub async fn tick(&self, interval: Duration) -> bool {
        tokio::select! {
            _ = self.triggered() => false,
            _ = tokio::time::sleep(interval) => self.is_running(),
        }
    }

    /// Close every feed of `dashboard` and wait for the connection tasks.
    /// Triggers shutdown first so other holders stop ticking.
    pub async fn close(&self, dashboard: LiveDashboard) -> Result<()> {
        self.trigger();
        let feeds = dashboard.health().len();
        dashboard.shutdown().await?;
        info!(feeds, "All feeds closed");
        Ok(())
    }
}

impl Default for ShutdownManager {
    fn default() -> Self {
        Self::new()
    }
}
