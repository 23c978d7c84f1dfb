//! Common test utilities for StreamSpace integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use streamsockets::{Connection, Result, Transport, WsMessage};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// Macro for verbose test output (controlled by TEST_VERBOSE env var)
#[macro_export]
macro_rules! verbose_println {
    ($($arg:tt)*) => {
        if std::env::var("TEST_VERBOSE").is_ok() {
            println!($($arg)*);
        }
    };
}

/// Server side of one in-memory socket
#[derive(Clone)]
pub struct ServerSocket {
    pub url: String,
    frames: mpsc::UnboundedSender<WsMessage>,
    closed: Arc<AtomicBool>,
}

impl ServerSocket {
    pub fn push(&self, text: &str) {
        let _ = self.frames.send(WsMessage::Text(text.to_string()));
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

struct InMemoryConnection {
    frames: mpsc::UnboundedReceiver<WsMessage>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl Connection for InMemoryConnection {
    async fn recv(&mut self) -> Option<Result<WsMessage>> {
        self.frames.recv().await.map(Ok)
    }

    async fn close(&mut self) {
        self.closed.store(true, Ordering::Release);
        self.frames.close();
    }
}

/// Transport that accepts every connect and records the socket
#[derive(Clone, Default)]
pub struct InMemoryTransport {
    sockets: Arc<Mutex<Vec<ServerSocket>>>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sockets(&self) -> Vec<ServerSocket> {
        self.sockets.lock().clone()
    }

    /// Most recent socket whose URL contains `fragment`
    pub fn latest(&self, fragment: &str) -> Option<ServerSocket> {
        self.sockets
            .lock()
            .iter()
            .rev()
            .find(|s| s.url.contains(fragment))
            .cloned()
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn connect(&self, url: &str) -> Result<Box<dyn Connection>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));
        self.sockets.lock().push(ServerSocket {
            url: url.to_string(),
            frames: tx,
            closed: Arc::clone(&closed),
        });
        Ok(Box::new(InMemoryConnection { frames: rx, closed }))
    }
}

/// Poll `condition` on the paused clock until it holds
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    for _ in 0..10_000 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
}

/// Serve `body` as the JSON answer to one HTTP request on a local port.
/// Returns `host:port`.
pub async fn serve_json_once(body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut chunk = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            match stream.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => request.extend_from_slice(&chunk[..n]),
            }
        }
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        let _ = stream.write_all(response.as_bytes()).await;
        let _ = stream.shutdown().await;
    });
    addr
}
