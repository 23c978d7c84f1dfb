//! # StreamSockets Traits
//!
//! The seams of the realtime layer:
//!
//! - **ReconnectPolicy**: attempt number → backoff delay
//! - **Transport / Connection**: open sockets and read their events
//! - **MessageRouter / MessageHandler**: decode frames and dispatch them
//! - **AuthProvider**: reactive auth token consumed by URL resolvers
//! - **LifecycleHooks**: open/close/error/exhausted callbacks

pub mod auth;
pub mod error;
pub mod hooks;
pub mod parser;
pub mod reconnect;
pub mod router;
pub mod transport;

// Re-export commonly used types
pub use auth::{AuthProvider, TokenStore};
pub use error::{Result, SocketError};
pub use hooks::{LifecycleHooks, NoHooks};
pub use parser::WsMessage;
pub use reconnect::{CappedExponential, FixedDelay, FixedEscalation, ReconnectPolicy};
pub use router::{MessageHandler, MessageRouter};
pub use transport::{Connection, Transport};
