//! Production transport on top of tokio-tungstenite

use crate::traits::{Connection, Result, SocketError, Transport, WsMessage};
use async_trait::async_trait;
use futures::StreamExt;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;

/// How long a client-initiated close may take before the socket is dropped
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Opens real WebSocket connections (ws:// and wss://)
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteTransport;

#[async_trait]
impl Transport for TungsteniteTransport {
    async fn connect(&self, url: &str) -> Result<Box<dyn Connection>> {
        let (stream, _response) = connect_async(url)
            .await
            .map_err(|e| SocketError::WebSocket(e.to_string()))?;
        Ok(Box::new(TungsteniteConnection {
            stream,
            failed: false,
        }))
    }
}

struct TungsteniteConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    /// tungstenite errors are fatal to the stream; the next recv is the close
    failed: bool,
}

#[async_trait]
impl Connection for TungsteniteConnection {
    async fn recv(&mut self) -> Option<Result<WsMessage>> {
        if self.failed {
            return None;
        }

        loop {
            match self.stream.next().await? {
                Ok(msg) => {
                    if let Some(ws_msg) = tungstenite_to_ws_message(msg) {
                        return Some(Ok(ws_msg));
                    }
                    // control frame, tungstenite already answered it
                }
                Err(e) => {
                    self.failed = true;
                    return Some(Err(SocketError::WebSocket(e.to_string())));
                }
            }
        }
    }

    async fn close(&mut self) {
        match tokio::time::timeout(CLOSE_TIMEOUT, self.stream.close(None)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!("Close handshake failed: {}", e),
            Err(_) => debug!("Close handshake timed out"),
        }
    }
}

/// Convert tungstenite Message to WsMessage
fn tungstenite_to_ws_message(msg: Message) -> Option<WsMessage> {
    match msg {
        Message::Text(text) => Some(WsMessage::Text(text)),
        Message::Binary(data) => Some(WsMessage::Binary(data)),
        Message::Ping(_) | Message::Pong(_) | Message::Close(_) | Message::Frame(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_frames_are_filtered() {
        assert_eq!(
            tungstenite_to_ws_message(Message::Text("hi".into())),
            Some(WsMessage::Text("hi".into()))
        );
        assert_eq!(tungstenite_to_ws_message(Message::Ping(vec![1])), None);
        assert_eq!(tungstenite_to_ws_message(Message::Close(None)), None);
    }
}
