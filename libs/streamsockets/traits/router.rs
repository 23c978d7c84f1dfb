//! Message Routing System
//!
//! Every inbound frame on a feed goes through a router and then to exactly
//! one handler, on the connection task, in the order the transport
//! delivered it.
//!
//! ```text
//! Transport → Router::parse → Some(message) → route_key → Handler
//!                  │                                ↓
//!                  ├─ Err  → logged, dropped       (no handler → ignored)
//!                  └─ None → unknown kind, ignored
//! ```
//!
//! A frame that fails to decode never closes the connection and never
//! reaches a handler.

use crate::{Result, WsMessage};
use std::fmt::Debug;
use std::hash::Hash;

/// Message router that decodes WebSocket frames and determines routing
///
/// The router has two responsibilities:
/// 1. Decode the raw frame into a typed message
/// 2. Extract a route key that selects the handler for it
///
/// # Example
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// enum Route { Sessions, Metrics }
///
/// struct DashboardRouter;
///
/// impl MessageRouter for DashboardRouter {
///     type Message = DashboardMessage;
///     type RouteKey = Route;
///
///     fn parse(&self, message: WsMessage) -> Result<Option<Self::Message>> {
///         // Decode JSON, Ok(None) for kinds this feed does not know
///     }
///
///     fn route_key(&self, message: &Self::Message) -> Self::RouteKey {
///         match message {
///             DashboardMessage::Sessions(_) => Route::Sessions,
///             DashboardMessage::Metrics(_) => Route::Metrics,
///         }
///     }
/// }
/// ```
pub trait MessageRouter: Send + Sync + 'static {
    /// The decoded message type
    type Message: Send + Debug + 'static;

    /// The route key type (determines which handler processes the message)
    type RouteKey: Hash + Eq + Clone + Send + Sync + Debug + 'static;

    /// Decode a raw frame
    ///
    /// * `Ok(Some(message))` - dispatch to the handler for its route key
    /// * `Ok(None)` - a well-formed frame of a kind this router ignores
    /// * `Err(SocketError::Parse)` - malformed frame, logged and dropped
    fn parse(&self, message: WsMessage) -> Result<Option<Self::Message>>;

    /// Extract the route key from a decoded message
    fn route_key(&self, message: &Self::Message) -> Self::RouteKey;
}

/// Message handler that processes typed messages sequentially
///
/// Handlers run on the connection task. Messages of one feed reach their
/// handler in exactly the order the transport delivered them.
///
/// # Errors
/// A returned error is logged; the connection and the handler keep
/// running. A panic inside `handle` is caught and logged the same way.
pub trait MessageHandler<M>: Send + 'static
where
    M: Send + Debug + 'static,
{
    /// Handle a decoded message
    fn handle(&mut self, message: M) -> Result<()>;
}

