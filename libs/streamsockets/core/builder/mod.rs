pub mod states;

use crate::client::ConnectionManager;
use crate::config::{ClientConfig, DEFAULT_MAX_ATTEMPTS};
use crate::resolver::{StaticUrl, UrlSource};
use crate::tungstenite::TungsteniteTransport;
use crate::traits::*;
use states::*;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

/// Type-state builder for [`ConnectionManager`]
///
/// A manager needs a URL source and a router; `build()` only exists once
/// both are set.
///
/// ```ignore
/// let sessions = ConnectionManager::builder()
///     .name("sessions")
///     .source(SubscriptionUrlResolver::sessions(endpoint, auth))
///     .router(FeedRouter, |routing| {
///         routing.handler(FeedRoute::Sessions, SessionsFeedHandler::new(queue))
///     })
///     .reconnect_policy(FixedEscalation)
///     .max_attempts(5)
///     .build()?;
/// ```
pub struct ConnectionManagerBuilder<S, Rt>
where
    S: SourceState,
    Rt: RouterState,
{
    _source_state: PhantomData<S>,
    name: String,
    source: Option<Box<dyn UrlSource>>,
    routing: Rt,
    transport: Option<Arc<dyn Transport>>,
    reconnect_policy: Option<Box<dyn ReconnectPolicy>>,
    max_attempts: u32,
    hooks: Option<Box<dyn LifecycleHooks>>,
}

impl ConnectionManagerBuilder<NoSource, NoRouter> {
    /// Create a new builder instance
    pub fn new() -> Self {
        Self {
            _source_state: PhantomData,
            name: "feed".to_string(),
            source: None,
            routing: NoRouter,
            transport: None,
            reconnect_policy: None,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            hooks: None,
        }
    }
}

impl Default for ConnectionManagerBuilder<NoSource, NoRouter> {
    fn default() -> Self {
        Self::new()
    }
}

// URL source setting
impl<Rt> ConnectionManagerBuilder<NoSource, Rt>
where
    Rt: RouterState,
{
    /// Connect to a fixed URL
    pub fn url(self, url: impl Into<String>) -> ConnectionManagerBuilder<HasSource, Rt> {
        self.source(StaticUrl(url.into()))
    }

    /// Connect to whatever `source` resolves, following its changes
    pub fn source(self, source: impl UrlSource) -> ConnectionManagerBuilder<HasSource, Rt> {
        ConnectionManagerBuilder {
            _source_state: PhantomData,
            name: self.name,
            source: Some(Box::new(source)),
            routing: self.routing,
            transport: self.transport,
            reconnect_policy: self.reconnect_policy,
            max_attempts: self.max_attempts,
            hooks: self.hooks,
        }
    }
}

/// Routing builder helper
///
/// Holds the router and the handler registered for each route key.
pub struct RoutingBuilder<R>
where
    R: MessageRouter,
{
    router: R,
    handlers: HashMap<R::RouteKey, Box<dyn MessageHandler<R::Message>>>,
}

impl<R> RouterState for RoutingBuilder<R> where R: MessageRouter {}

impl<R> RoutingBuilder<R>
where
    R: MessageRouter,
{
    fn new(router: R) -> Self {
        Self {
            router,
            handlers: HashMap::new(),
        }
    }

    /// Add a handler for a specific route key
    ///
    /// Registering a second handler for the same key replaces the first.
    pub fn handler<H>(mut self, route_key: R::RouteKey, handler: H) -> Self
    where
        H: MessageHandler<R::Message>,
    {
        if self.handlers.insert(route_key.clone(), Box::new(handler)).is_some() {
            debug!("Replaced handler for route {:?}", route_key);
        }
        self
    }
}

// Router setting
impl<S> ConnectionManagerBuilder<S, NoRouter>
where
    S: SourceState,
{
    pub fn router<R, F>(
        self,
        router: R,
        configure_routing: F,
    ) -> ConnectionManagerBuilder<S, RoutingBuilder<R>>
    where
        R: MessageRouter,
        F: FnOnce(RoutingBuilder<R>) -> RoutingBuilder<R>,
    {
        let routing = configure_routing(RoutingBuilder::new(router));

        ConnectionManagerBuilder {
            _source_state: PhantomData,
            name: self.name,
            source: self.source,
            routing,
            transport: self.transport,
            reconnect_policy: self.reconnect_policy,
            max_attempts: self.max_attempts,
            hooks: self.hooks,
        }
    }
}

// Optional configuration methods
impl<S, Rt> ConnectionManagerBuilder<S, Rt>
where
    S: SourceState,
    Rt: RouterState,
{
    /// Feed name used in logs
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Replace the default tokio-tungstenite transport
    pub fn transport(mut self, transport: impl Transport) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Share a transport between several managers
    pub fn shared_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Backoff between reconnects (default: capped exponential, 3s base)
    pub fn reconnect_policy(mut self, policy: impl ReconnectPolicy + 'static) -> Self {
        self.reconnect_policy = Some(Box::new(policy));
        self
    }

    /// Reconnects allowed without a successful open in between
    ///
    /// `0` disables reconnection entirely.
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn hooks(mut self, hooks: impl LifecycleHooks) -> Self {
        self.hooks = Some(Box::new(hooks));
        self
    }
}

// Build method - only available when all required fields are set
impl<R> ConnectionManagerBuilder<HasSource, RoutingBuilder<R>>
where
    R: MessageRouter,
{
    /// Spawn the connection task and return its handle
    ///
    /// Must be called inside a tokio runtime.
    pub fn build(self) -> Result<ConnectionManager> {
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(SocketError::Configuration(
                "ConnectionManager must be built inside a tokio runtime".to_string(),
            ));
        }

        let source = self
            .source
            .ok_or_else(|| SocketError::Configuration("URL source must be set".to_string()))?;

        let reconnect_policy = self
            .reconnect_policy
            .unwrap_or_else(|| Box::new(CappedExponential::default()));

        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(TungsteniteTransport));

        let RoutingBuilder { router, handlers } = self.routing;

        let config = ClientConfig {
            name: self.name,
            source,
            router,
            handlers,
            transport,
            reconnect_policy,
            max_attempts: self.max_attempts,
            hooks: self.hooks.unwrap_or_else(|| Box::new(NoHooks)),
        };

        debug!(
            feed = %config.name(),
            policy = config.policy_name(),
            max_attempts = config.max_attempts(),
            handlers = config.handler_count(),
            "Building connection manager"
        );

        Ok(ConnectionManager::spawn(config))
    }
}
