use crate::resolver::UrlSource;
use crate::traits::*;
use std::collections::HashMap;
use std::sync::Arc;

/// Default reconnect budget
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Configuration for one connection manager
///
/// Built by the type-state builder and moved into the connection task,
/// which owns the router, the handlers and the URL source from then on.
pub struct ClientConfig<R>
where
    R: MessageRouter,
{
    /// Feed name used in logs and by the feed manager
    pub(crate) name: String,

    /// Reactive URL source (empty URL = do not connect)
    pub(crate) source: Box<dyn UrlSource>,

    /// Decodes inbound frames
    pub(crate) router: R,

    /// One handler per route key
    pub(crate) handlers: HashMap<R::RouteKey, Box<dyn MessageHandler<R::Message>>>,

    /// Opens sockets
    pub(crate) transport: Arc<dyn Transport>,

    /// Backoff between reconnect attempts
    pub(crate) reconnect_policy: Box<dyn ReconnectPolicy>,

    /// Reconnects allowed without a successful open in between
    pub(crate) max_attempts: u32,

    /// Lifecycle callbacks
    pub(crate) hooks: Box<dyn LifecycleHooks>,
}

impl<R> ClientConfig<R>
where
    R: MessageRouter,
{
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn policy_name(&self) -> &'static str {
        self.reconnect_policy.name()
    }

    /// Get the number of configured handlers
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}
