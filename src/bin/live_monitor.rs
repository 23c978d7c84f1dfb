//! Live Monitor - headless StreamSpace dashboard
//!
//! Follows the sessions and cluster feeds, logs every notification and
//! every change of feed health until Ctrl+C.
//!
//! Usage:
//!   STREAMSPACE_TOKEN=... ./live-monitor                    # sessions + cluster
//!   STREAMSPACE_TOKEN=... ./live-monitor streamspace/pod-0  # also tail a pod
//!   ./live-monitor --config other.yaml                       # LIVE_CONFIG_PATH works too

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use streamspace_live::bin_common::MonitorArgs;
use streamspace_live::streamsockets::{ConnectionHealth, TokenStore};
use streamspace_live::streamspace::{
    init_tracing_with_level, LiveConfig, LiveDashboard, Severity, ShutdownManager, SESSIONS_FEED,
};
use tracing::{error, info, warn};

/// How often health is sampled for the status log
const STATUS_INTERVAL: Duration = Duration::from_millis(500);

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let args = MonitorArgs::from_env()?;
    let config = LiveConfig::load(&args.config_path)?;

    init_tracing_with_level(&config.log_level);

    let token = LiveConfig::token_from_env();
    if token.is_none() {
        warn!("STREAMSPACE_TOKEN is not set, feeds stay disconnected");
    }
    let auth = Arc::new(TokenStore::new(token));

    print_banner(&config);

    let shutdown = ShutdownManager::new();
    shutdown.spawn_signal_handler();

    let dashboard = LiveDashboard::start(&config, auth).await?;
    if args.log_target.is_some() {
        dashboard.set_log_target(args.log_target);
    }
    let notifications = dashboard.notifications().subscribe();

    let mut last_health = dashboard.health();
    let mut log_cursor = 0u64;
    loop {
        while let Ok(n) = notifications.try_recv() {
            match n.severity {
                Severity::Error => error!("[{}] {}: {}", n.priority, n.title, n.message),
                Severity::Warning => warn!("[{}] {}: {}", n.priority, n.title, n.message),
                _ => info!("[{}] {}: {}", n.priority, n.title, n.message),
            }
        }

        let health = dashboard.health();
        if health != last_health {
            for (feed, h) in &health {
                if last_health.get(feed) != Some(h) {
                    info!(feed = %feed, "Feed is {}", h.label());
                    if *h == ConnectionHealth::Connected && feed == SESSIONS_FEED {
                        info!("{} sessions live", dashboard.sessions().sessions().len());
                    }
                }
            }
            last_health = health;
        }

        let (lines, cursor) = dashboard.logs().lines_since(log_cursor);
        for line in &lines {
            info!(target: "pod", "{}", line);
        }
        log_cursor = cursor;

        if !shutdown.tick(STATUS_INTERVAL).await {
            break;
        }
    }

    shutdown.close(dashboard).await?;
    print_shutdown();
    Ok(())
}

fn print_banner(config: &LiveConfig) {
    info!("");
    info!("========================================");
    info!("StreamSpace Live Monitor");
    info!("  Server: {}", config.server.host);
    info!("  Reconnect: {:?}, max {} attempts", config.reconnect.policy, config.reconnect.max_attempts);
    info!("  Press Ctrl+C to stop");
    info!("========================================");
    info!("");
}

fn print_shutdown() {
    info!("");
    info!("========================================");
    info!("Live monitor stopped gracefully");
    info!("========================================");
}
