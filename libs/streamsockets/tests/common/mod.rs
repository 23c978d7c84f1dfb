//! Common test utilities for StreamSockets integration tests
//!
//! A scripted in-memory transport for driving the connection manager under
//! a paused clock, and a real WebSocket server for end-to-end checks.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use streamsockets::{
    Connection, ConnectionState, MessageHandler, MessageRouter, Result, SocketError, Transport,
    WsMessage,
};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch, Notify};

/// Macro for verbose test output (controlled by TEST_VERBOSE env var)
#[macro_export]
macro_rules! verbose_println {
    ($($arg:tt)*) => {
        if std::env::var("TEST_VERBOSE").is_ok() {
            println!($($arg)*);
        }
    };
}

/// What the next handshake does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Accept,
    Refuse,
    /// Never completes
    Hang,
}

enum SocketEvent {
    Frame(WsMessage),
    Error(String),
    Close,
}

/// Test-side handle to one socket the mock transport opened
#[derive(Clone)]
pub struct MockSocket {
    events: mpsc::UnboundedSender<SocketEvent>,
    closed: Arc<AtomicBool>,
}

impl MockSocket {
    pub fn send_text(&self, text: &str) {
        let _ = self.events.send(SocketEvent::Frame(WsMessage::Text(text.to_string())));
    }

    pub fn error(&self, message: &str) {
        let _ = self.events.send(SocketEvent::Error(message.to_string()));
    }

    pub fn close_from_server(&self) {
        let _ = self.events.send(SocketEvent::Close);
    }

    /// Whether the client closed this socket
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

struct MockConnection {
    events: mpsc::UnboundedReceiver<SocketEvent>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl Connection for MockConnection {
    async fn recv(&mut self) -> Option<Result<WsMessage>> {
        match self.events.recv().await? {
            SocketEvent::Frame(frame) => Some(Ok(frame)),
            SocketEvent::Error(message) => Some(Err(SocketError::WebSocket(message))),
            SocketEvent::Close => None,
        }
    }

    async fn close(&mut self) {
        self.closed.store(true, Ordering::Release);
        self.events.close();
    }
}

#[derive(Default)]
struct MockState {
    script: VecDeque<Outcome>,
    urls: Vec<String>,
    sockets: Vec<MockSocket>,
}

/// Scripted transport: each connect pops the next outcome, falling back to
/// the default once the script is empty
#[derive(Clone)]
pub struct MockTransport {
    default: Outcome,
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new(default: Outcome) -> Self {
        Self {
            default,
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    pub fn scripted(script: impl IntoIterator<Item = Outcome>, default: Outcome) -> Self {
        let transport = Self::new(default);
        transport.state.lock().script.extend(script);
        transport
    }

    pub fn connect_count(&self) -> usize {
        self.state.lock().urls.len()
    }

    pub fn urls(&self) -> Vec<String> {
        self.state.lock().urls.clone()
    }

    /// Socket opened by the `index`-th accepted handshake
    pub fn socket(&self, index: usize) -> MockSocket {
        self.state.lock().sockets[index].clone()
    }

    pub fn socket_count(&self) -> usize {
        self.state.lock().sockets.len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self, url: &str) -> Result<Box<dyn Connection>> {
        let outcome = {
            let mut state = self.state.lock();
            state.urls.push(url.to_string());
            state.script.pop_front().unwrap_or(self.default)
        };

        match outcome {
            Outcome::Accept => {
                let (tx, rx) = mpsc::unbounded_channel();
                let closed = Arc::new(AtomicBool::new(false));
                self.state.lock().sockets.push(MockSocket {
                    events: tx,
                    closed: Arc::clone(&closed),
                });
                Ok(Box::new(MockConnection { events: rx, closed }))
            }
            Outcome::Refuse => Err(SocketError::WebSocket("connection refused".to_string())),
            Outcome::Hang => {
                std::future::pending::<()>().await;
                Err(SocketError::Timeout("unreachable".to_string()))
            }
        }
    }
}

/// Routes JSON frames by their `type` field
pub struct TypeRouter;

impl MessageRouter for TypeRouter {
    type Message = Value;
    type RouteKey = String;

    fn parse(&self, frame: WsMessage) -> Result<Option<Value>> {
        let text = frame
            .as_text()
            .ok_or_else(|| SocketError::Parse("binary frame".to_string()))?;
        Ok(Some(serde_json::from_str(text)?))
    }

    fn route_key(&self, message: &Value) -> String {
        message
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }
}

/// Counts handled messages; panics on a `"boom": true` payload
#[derive(Clone, Default)]
pub struct CountingHandler {
    pub count: Arc<AtomicUsize>,
}

impl CountingHandler {
    pub fn count(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }
}

impl MessageHandler<Value> for CountingHandler {
    fn handle(&mut self, message: Value) -> Result<()> {
        if message.get("boom").and_then(Value::as_bool) == Some(true) {
            panic!("handler blew up");
        }
        self.count.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }
}

/// Poll `condition` on the (usually paused) clock until it holds
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    for _ in 0..10_000 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
}

/// Wait until the published state satisfies `predicate`
pub async fn wait_for_state(
    rx: &mut watch::Receiver<ConnectionState>,
    predicate: impl Fn(&ConnectionState) -> bool,
) -> ConnectionState {
    let wait = async {
        loop {
            {
                let state = rx.borrow_and_update();
                if predicate(&state) {
                    return state.clone();
                }
            }
            if rx.changed().await.is_err() {
                panic!("connection task ended");
            }
        }
    };

    tokio::time::timeout(Duration::from_secs(3600), wait)
        .await
        .expect("state not reached")
}

/// A real WebSocket server that pushes `frames` to every client, then
/// holds the connection open until shut down
pub struct MockWsServer {
    pub addr: SocketAddr,
    accepted: Arc<AtomicUsize>,
    shutdown: Arc<Notify>,
}

impl MockWsServer {
    pub async fn start(frames: Vec<String>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accepted = Arc::new(AtomicUsize::new(0));
        let shutdown = Arc::new(Notify::new());
        let accepted_clone = Arc::clone(&accepted);
        let shutdown_clone = Arc::clone(&shutdown);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, _)) => {
                                accepted_clone.fetch_add(1, Ordering::AcqRel);
                                let frames = frames.clone();
                                let shutdown = Arc::clone(&shutdown_clone);
                                tokio::spawn(async move {
                                    Self::handle_connection(stream, frames, shutdown).await;
                                });
                            }
                            Err(e) => {
                                eprintln!("Accept error: {}", e);
                                break;
                            }
                        }
                    }
                    _ = shutdown_clone.notified() => {
                        break;
                    }
                }
            }
        });

        Self {
            addr,
            accepted,
            shutdown,
        }
    }

    async fn handle_connection(stream: tokio::net::TcpStream, frames: Vec<String>, shutdown: Arc<Notify>) {
        use futures::{SinkExt, StreamExt};
        use tokio_tungstenite::{accept_async, tungstenite::Message};

        let mut ws_stream = match accept_async(stream).await {
            Ok(ws) => ws,
            Err(e) => {
                eprintln!("WebSocket handshake failed: {}", e);
                return;
            }
        };

        for frame in frames {
            if ws_stream.send(Message::Text(frame)).await.is_err() {
                return;
            }
        }

        loop {
            tokio::select! {
                msg = ws_stream.next() => {
                    match msg {
                        Some(Ok(msg)) if msg.is_close() => break,
                        Some(Ok(_)) => {}
                        Some(Err(_)) | None => break,
                    }
                }
                _ = shutdown.notified() => {
                    let _ = ws_stream.close(None).await;
                    break;
                }
            }
        }
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::Acquire)
    }

    pub fn shutdown(&self) {
        self.shutdown.notify_waiters();
    }
}

impl Drop for MockWsServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}
