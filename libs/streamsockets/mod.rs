//! # StreamSockets
//!
//! Self-healing WebSocket feeds for live dashboards.
//!
//! Each [`ConnectionManager`] owns one logical socket on its own tokio task:
//! it resolves its URL from reactive inputs, reconnects with a pluggable
//! backoff policy and a bounded attempt budget, decodes frames through a
//! [`MessageRouter`] and hands them to per-route handlers.
//!
//! - **Type-state builder**: a manager cannot be built without a URL source and a router
//! - **Pluggable transport**: tokio-tungstenite by default, scripted transports in tests
//! - **Health projection**: [`ConnectionHealth`] derived from state on read

pub mod traits;
pub mod core;
pub mod manager;

// Re-export all traits
pub use traits::*;

// Re-export core functionality
pub use self::core::{
    builder, client, config, connection_state, health, resolver, tungstenite,
    builder::{states, ConnectionManagerBuilder, RoutingBuilder},
    client::{ClientEvent, ConnectionManager, Metrics},
    config::{ClientConfig, DEFAULT_MAX_ATTEMPTS},
    connection_state::{AtomicMetrics, ConnectionState, ConnectionStatus, SharedConnectionState},
    health::ConnectionHealth,
    resolver::{FeedEndpoint, FeedPath, LogTarget, Scheme, StaticUrl, SubscriptionUrlResolver, UrlSource},
    tungstenite::TungsteniteTransport,
};

// Re-export manager
pub use manager::FeedManager;
