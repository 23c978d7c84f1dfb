use crate::builder::{states, ConnectionManagerBuilder};
use crate::config::ClientConfig;
use crate::connection_state::{AtomicMetrics, ConnectionState, ConnectionStatus, SharedConnectionState};
use crate::health::ConnectionHealth;
use crate::resolver::UrlSource;
use crate::traits::*;
use crossbeam_channel::{unbounded, Receiver, Sender};
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

/// Internal command messages for the connection task
#[derive(Debug)]
enum ClientCommand {
    /// Tear down the socket and any pending reconnect, stay idle
    Close,
    /// Connect now (re-arm after close or exhaustion)
    Reconnect,
    /// Tear down and end the task
    Shutdown,
}

/// Lifecycle events published by a connection manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// The socket opened
    Connected,
    /// The socket closed
    Disconnected,
    /// Reconnect `attempt` scheduled in `delay`
    Reconnecting { attempt: u32, delay: Duration },
    /// Reconnect budget spent
    Exhausted { attempts: u32 },
    /// The resolved URL changed
    UrlChanged,
    /// Transport error (handshake failure or error on an open socket)
    Error(String),
}

/// Manager metrics snapshot
#[derive(Debug, Clone)]
pub struct Metrics {
    pub messages_received: u64,
    pub messages_dropped: u64,
    pub reconnects: u64,
    pub state: ConnectionState,
}

/// Owns one logical socket's full lifecycle
///
/// The socket, the reconnect timer, the router, the handlers and the URL
/// source all live on a single tokio task; this handle only reads the
/// published state and sends commands. Dropping the handle tears the feed
/// down.
///
/// ```text
/// Idle ──url──▶ Connecting ──open──▶ Open
///   ▲               │                 │
///   │             close             close
///   │               ▼                 ▼
///   └──close()── Closed ◀─────────────┘
///                   │ attempt < max: wait policy.delay(attempt), then Connecting
///                   └ otherwise: Exhausted (until reconnect() or a new URL)
/// ```
pub struct ConnectionManager {
    name: String,
    state: SharedConnectionState,
    metrics: Arc<AtomicMetrics>,
    /// Cleared by `close()` before anything else, checked before every connect
    should_reconnect: Arc<AtomicBool>,
    command_tx: mpsc::UnboundedSender<ClientCommand>,
    event_rx: Receiver<ClientEvent>,
    task_handle: Option<tokio::task::JoinHandle<()>>,
}

impl ConnectionManager {
    /// Start building a connection manager
    pub fn builder() -> ConnectionManagerBuilder<states::NoSource, states::NoRouter> {
        ConnectionManagerBuilder::new()
    }

    pub(crate) fn spawn<R>(config: ClientConfig<R>) -> Self
    where
        R: MessageRouter,
    {
        let state = SharedConnectionState::new();
        let metrics = Arc::new(AtomicMetrics::new());
        let should_reconnect = Arc::new(AtomicBool::new(true));
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = unbounded();
        let name = config.name.clone();

        let driver = Driver {
            name: config.name,
            source: config.source,
            source_live: true,
            router: config.router,
            handlers: config.handlers,
            transport: config.transport,
            policy: config.reconnect_policy,
            max_attempts: config.max_attempts,
            hooks: config.hooks,
            state: state.clone(),
            metrics: Arc::clone(&metrics),
            should_reconnect: Arc::clone(&should_reconnect),
            command_rx,
            event_tx,
            url: String::new(),
        };

        let task_handle = tokio::spawn(driver.run());

        Self {
            name,
            state,
            metrics,
            should_reconnect,
            command_tx,
            event_rx,
            task_handle: Some(task_handle),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current state snapshot
    #[inline]
    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    #[inline]
    pub fn status(&self) -> ConnectionStatus {
        self.state.status()
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.state.status() == ConnectionStatus::Open
    }

    /// Display projection of the current state
    pub fn health(&self) -> ConnectionHealth {
        ConnectionHealth::from_state(&self.state.get())
    }

    /// Receiver that observes every state transition
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub fn metrics(&self) -> Metrics {
        Metrics {
            messages_received: self.metrics.messages_received(),
            messages_dropped: self.metrics.messages_dropped(),
            reconnects: self.metrics.reconnects(),
            state: self.state.get(),
        }
    }

    /// Try to receive an event (non-blocking)
    pub fn try_recv_event(&self) -> Option<ClientEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Receive an event (blocking)
    pub fn recv_event(&self) -> std::result::Result<ClientEvent, crossbeam_channel::RecvError> {
        self.event_rx.recv()
    }

    /// Stop the feed: no reconnects, pending timer cancelled, socket closed
    ///
    /// `should_reconnect` is cleared synchronously, so a reconnect timer
    /// that fires before the task handles the close cannot open a socket.
    /// Calling `close()` again is a no-op.
    pub fn close(&self) {
        if !self.should_reconnect.swap(false, Ordering::AcqRel) {
            debug!(feed = %self.name, "Already closed");
            return;
        }

        info!(feed = %self.name, "Closing feed");
        if self.command_tx.send(ClientCommand::Close).is_err() {
            debug!(feed = %self.name, "Connection task already gone");
        }
    }

    /// Re-arm after `close()` or exhaustion and connect immediately
    ///
    /// The attempt counter is not reset: if this attempt fails too, no
    /// further reconnect is scheduled unless the budget allows it.
    pub fn reconnect(&self) -> Result<()> {
        self.should_reconnect.store(true, Ordering::Release);
        self.command_tx
            .send(ClientCommand::Reconnect)
            .map_err(|e| SocketError::ChannelSend(e.to_string()))
    }

    /// Close the feed and wait for the connection task to finish
    pub async fn shutdown(mut self) -> Result<()> {
        info!(feed = %self.name, "Shutting down feed");
        self.should_reconnect.store(false, Ordering::Release);
        let _ = self.command_tx.send(ClientCommand::Shutdown);

        if let Some(handle) = self.task_handle.take() {
            handle
                .await
                .map_err(|e| SocketError::Other(format!("connection task failed: {}", e)))?;
        }
        Ok(())
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.should_reconnect.store(false, Ordering::Release);
        if self.task_handle.is_some() {
            let _ = self.command_tx.send(ClientCommand::Shutdown);
        }
    }
}

/// What the connection task is currently waiting on
enum Activity {
    /// No socket, no timer
    Dormant,
    Connecting(BoxFuture<'static, Result<Box<dyn Connection>>>),
    Open(Box<dyn Connection>),
    Backoff(Pin<Box<tokio::time::Sleep>>),
}

/// One event observed by the connection task
enum Step {
    UrlChanged(bool),
    Command(Option<ClientCommand>),
    Handshake(Result<Box<dyn Connection>>),
    Transport(Option<Result<WsMessage>>),
    BackoffElapsed,
}

/// The connection task
struct Driver<R>
where
    R: MessageRouter,
{
    name: String,
    source: Box<dyn UrlSource>,
    /// False once the source reported it can never change again
    source_live: bool,
    router: R,
    handlers: HashMap<R::RouteKey, Box<dyn MessageHandler<R::Message>>>,
    transport: Arc<dyn Transport>,
    policy: Box<dyn ReconnectPolicy>,
    max_attempts: u32,
    hooks: Box<dyn LifecycleHooks>,
    state: SharedConnectionState,
    metrics: Arc<AtomicMetrics>,
    should_reconnect: Arc<AtomicBool>,
    command_rx: mpsc::UnboundedReceiver<ClientCommand>,
    event_tx: Sender<ClientEvent>,
    /// Last resolved URL
    url: String,
}

impl<R> Driver<R>
where
    R: MessageRouter,
{
    async fn run(mut self) {
        self.url = self.source.current();
        let mut activity = if self.url.is_empty() {
            debug!(feed = %self.name, "No URL yet, staying idle");
            Activity::Dormant
        } else {
            self.start_connect()
        };

        loop {
            let step = self.next_step(&mut activity).await;
            activity = match self.apply(step, activity).await {
                Some(next) => next,
                None => break,
            };
        }

        info!(feed = %self.name, "Connection task exiting");
    }

    async fn next_step(&mut self, activity: &mut Activity) -> Step {
        let source_live = self.source_live;

        match activity {
            Activity::Dormant => tokio::select! {
                changed = self.source.changed(), if source_live => Step::UrlChanged(changed),
                cmd = self.command_rx.recv() => Step::Command(cmd),
            },
            Activity::Connecting(handshake) => tokio::select! {
                result = handshake.as_mut() => Step::Handshake(result),
                changed = self.source.changed(), if source_live => Step::UrlChanged(changed),
                cmd = self.command_rx.recv() => Step::Command(cmd),
            },
            Activity::Open(conn) => tokio::select! {
                event = conn.recv() => Step::Transport(event),
                changed = self.source.changed(), if source_live => Step::UrlChanged(changed),
                cmd = self.command_rx.recv() => Step::Command(cmd),
            },
            Activity::Backoff(sleep) => tokio::select! {
                _ = sleep.as_mut() => Step::BackoffElapsed,
                changed = self.source.changed(), if source_live => Step::UrlChanged(changed),
                cmd = self.command_rx.recv() => Step::Command(cmd),
            },
        }
    }

    /// Apply one step; `None` ends the task
    async fn apply(&mut self, step: Step, activity: Activity) -> Option<Activity> {
        match step {
            Step::UrlChanged(true) => Some(self.on_url_changed(activity).await),
            Step::UrlChanged(false) => {
                debug!(feed = %self.name, "URL source closed, URL is now fixed");
                self.source_live = false;
                Some(activity)
            }
            Step::Command(Some(ClientCommand::Close)) => {
                self.teardown(activity).await;
                self.go_idle();
                Some(Activity::Dormant)
            }
            Step::Command(Some(ClientCommand::Reconnect)) => Some(self.on_reconnect_requested(activity)),
            Step::Command(Some(ClientCommand::Shutdown)) | Step::Command(None) => {
                self.teardown(activity).await;
                self.go_idle();
                None
            }
            Step::Handshake(Ok(conn)) => Some(self.on_open(conn)),
            Step::Handshake(Err(e)) => {
                self.report_error(&e.to_string());
                Some(self.on_close())
            }
            Step::Transport(Some(Ok(frame))) => {
                self.metrics.increment_received();
                self.dispatch(frame);
                Some(activity)
            }
            Step::Transport(Some(Err(e))) => {
                self.report_error(&e.to_string());
                Some(activity)
            }
            Step::Transport(None) => {
                info!(feed = %self.name, "Connection closed by peer");
                Some(self.on_close())
            }
            Step::BackoffElapsed => Some(self.on_backoff_elapsed()),
        }
    }

    fn start_connect(&mut self) -> Activity {
        let state = self.state.set_status(ConnectionStatus::Connecting);
        debug!(
            feed = %self.name,
            attempt = state.attempt,
            "Connecting to {}",
            redact(&self.url)
        );

        let transport = Arc::clone(&self.transport);
        let url = self.url.clone();
        Activity::Connecting(Box::pin(async move { transport.connect(&url).await }))
    }

    fn on_open(&mut self, conn: Box<dyn Connection>) -> Activity {
        self.state.update(|s| {
            s.status = ConnectionStatus::Open;
            s.attempt = 0;
        });
        info!(feed = %self.name, "Connected to {}", redact(&self.url));
        self.hooks.on_open(&self.url);
        let _ = self.event_tx.send(ClientEvent::Connected);
        Activity::Open(conn)
    }

    /// Close event: the socket is gone, decide whether to retry
    fn on_close(&mut self) -> Activity {
        let state = self.state.set_status(ConnectionStatus::Closed);
        self.hooks.on_close(&self.url);
        let _ = self.event_tx.send(ClientEvent::Disconnected);

        if !self.should_reconnect.load(Ordering::Acquire) {
            debug!(feed = %self.name, "Closed while reconnection disabled");
            self.go_idle();
            return Activity::Dormant;
        }

        if self.url.is_empty() {
            self.go_idle();
            return Activity::Dormant;
        }

        let attempt = state.attempt;
        if attempt < self.max_attempts {
            let delay = self.policy.delay(attempt);
            let next = attempt + 1;
            self.state.update(|s| s.attempt = next);
            self.metrics.increment_reconnects();
            info!(
                feed = %self.name,
                policy = self.policy.name(),
                "Reconnecting in {:?} (attempt {}/{})",
                delay,
                next,
                self.max_attempts
            );
            let _ = self.event_tx.send(ClientEvent::Reconnecting {
                attempt: next,
                delay,
            });
            Activity::Backoff(Box::pin(tokio::time::sleep(delay)))
        } else {
            self.state.set_status(ConnectionStatus::Exhausted);
            warn!(
                feed = %self.name,
                "Reconnection budget exhausted after {} attempts, staying down",
                attempt
            );
            self.hooks.on_exhausted(attempt);
            let _ = self.event_tx.send(ClientEvent::Exhausted { attempts: attempt });
            Activity::Dormant
        }
    }

    fn on_backoff_elapsed(&mut self) -> Activity {
        if !self.should_reconnect.load(Ordering::Acquire) || self.url.is_empty() {
            self.go_idle();
            return Activity::Dormant;
        }
        self.start_connect()
    }

    async fn on_url_changed(&mut self, activity: Activity) -> Activity {
        let url = self.source.current();
        if url == self.url {
            debug!(feed = %self.name, "URL inputs changed, resolved URL did not");
            return activity;
        }

        let _ = self.event_tx.send(ClientEvent::UrlChanged);
        self.teardown(activity).await;
        self.url = url;
        self.hooks.on_url_changed(&self.url);

        if self.url.is_empty() {
            info!(feed = %self.name, "URL cleared, disconnecting");
            self.go_idle();
            return Activity::Dormant;
        }

        if !self.should_reconnect.load(Ordering::Acquire) {
            debug!(feed = %self.name, "Feed closed, not following URL change");
            self.go_idle();
            return Activity::Dormant;
        }

        info!(feed = %self.name, "URL changed, connecting to {}", redact(&self.url));
        self.start_connect()
    }

    fn on_reconnect_requested(&mut self, activity: Activity) -> Activity {
        if !self.should_reconnect.load(Ordering::Acquire) {
            // close() arrived after reconnect()
            return activity;
        }

        match activity {
            Activity::Connecting(_) | Activity::Open(_) => activity,
            Activity::Dormant | Activity::Backoff(_) => {
                if self.url.is_empty() {
                    debug!(feed = %self.name, "Reconnect requested without a URL");
                    self.go_idle();
                    Activity::Dormant
                } else {
                    info!(feed = %self.name, "Manual reconnect");
                    self.start_connect()
                }
            }
        }
    }

    /// Drop whatever is live: socket, handshake or timer
    async fn teardown(&mut self, activity: Activity) {
        match activity {
            Activity::Open(mut conn) => {
                self.state.set_status(ConnectionStatus::Closing);
                conn.close().await;
                info!(feed = %self.name, "Closed connection to {}", redact(&self.url));
                self.hooks.on_close(&self.url);
                let _ = self.event_tx.send(ClientEvent::Disconnected);
            }
            Activity::Connecting(_) => debug!(feed = %self.name, "Cancelled pending handshake"),
            Activity::Backoff(_) => debug!(feed = %self.name, "Cancelled pending reconnect"),
            Activity::Dormant => {}
        }
    }

    fn go_idle(&mut self) {
        if self.state.status() != ConnectionStatus::Idle {
            self.state.set_status(ConnectionStatus::Idle);
            debug!(feed = %self.name, "Idle");
        }
    }

    fn report_error(&mut self, message: &str) {
        warn!(feed = %self.name, "Transport error: {}", message);
        self.state.update(|s| s.last_error = Some(message.to_string()));
        self.hooks.on_error(message);
        let _ = self.event_tx.send(ClientEvent::Error(message.to_string()));
    }

    /// Decode one frame and hand it to its handler
    ///
    /// Nothing in here can end the connection: decode failures, handler
    /// errors and handler panics are logged and the frame is dropped.
    fn dispatch(&mut self, frame: WsMessage) {
        let message = match self.router.parse(frame) {
            Ok(Some(message)) => message,
            Ok(None) => {
                debug!(feed = %self.name, "Ignoring frame of unknown kind");
                return;
            }
            Err(e) => {
                self.metrics.increment_dropped();
                warn!(feed = %self.name, "Dropping malformed frame: {}", e);
                return;
            }
        };

        let route_key = self.router.route_key(&message);
        let Some(handler) = self.handlers.get_mut(&route_key) else {
            debug!(feed = %self.name, "No handler configured for route key: {:?}", route_key);
            return;
        };

        match catch_unwind(AssertUnwindSafe(|| handler.handle(message))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(feed = %self.name, "Handler error for route {:?}: {}", route_key, e),
            Err(_) => error!(feed = %self.name, "Handler panicked for route {:?}", route_key),
        }
    }
}

/// URL without its query string, so tokens never reach the logs
fn redact(url: &str) -> &str {
    url.split_once('?').map_or(url, |(base, _)| base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_strips_token() {
        assert_eq!(
            redact("wss://host/api/v1/ws/sessions?token=secret"),
            "wss://host/api/v1/ws/sessions"
        );
        assert_eq!(redact("ws://127.0.0.1:9000"), "ws://127.0.0.1:9000");
    }
}
