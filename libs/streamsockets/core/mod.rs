//! Connection lifecycle: builder, manager task, state and URL resolution
//!
//! ## Example
//!
//! ```rust,ignore
//! use streamsockets::*;
//!
//! let auth = Arc::new(TokenStore::new(Some(token)));
//! let endpoint = FeedEndpoint::from_page("https", "streamspace.example.com");
//!
//! let sessions = streamsockets::builder()
//!     .name("sessions")
//!     .source(SubscriptionUrlResolver::sessions(endpoint, auth.clone()))
//!     .router(MyRouter, |routing| routing.handler(Route::Sessions, MyHandler))
//!     .reconnect_policy(CappedExponential::default())
//!     .build()?;
//!
//! while let Ok(event) = sessions.recv_event() {
//!     println!("{:?} -> {}", event, sessions.health());
//! }
//! ```

pub mod builder;
pub mod client;
pub mod config;
pub mod connection_state;
pub mod health;
pub mod resolver;
pub mod tungstenite;

// Re-export main types
pub use builder::{states, ConnectionManagerBuilder, RoutingBuilder};
pub use client::{ClientEvent, ConnectionManager, Metrics};
pub use config::{ClientConfig, DEFAULT_MAX_ATTEMPTS};
pub use connection_state::{AtomicMetrics, ConnectionState, ConnectionStatus, SharedConnectionState};
pub use health::ConnectionHealth;
pub use resolver::{FeedEndpoint, FeedPath, LogTarget, Scheme, StaticUrl, SubscriptionUrlResolver, UrlSource};
pub use tungstenite::TungsteniteTransport;

// Re-export traits for convenience
pub use crate::traits::*;

/// Create a new connection manager builder
pub fn builder() -> ConnectionManagerBuilder<builder::states::NoSource, builder::states::NoRouter> {
    ConnectionManagerBuilder::new()
}
