//! Routers turning raw feed frames into [`FeedMessage`]s

use super::types::{FeedMessage, FeedRoute, MetricsUpdate, SessionEvent, SessionsUpdate, SESSION_EVENT_TYPES};
use serde_json::Value;
use streamsockets::{MessageRouter, SocketError, WsMessage};
use tracing::debug;

// =============================================================================
// JSON envelope router (sessions and cluster feeds)
// =============================================================================

/// Decodes `{"type": ..., ...}` envelopes
///
/// Frames that are not JSON are errors (the connection manager drops and
/// counts them). Envelopes with an unknown or missing `type` decode to
/// `Ok(None)` and are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeedRouter;

impl FeedRouter {
    pub fn new() -> Self {
        Self
    }

    /// Decode one JSON envelope
    pub fn decode(text: &str) -> streamsockets::Result<Option<FeedMessage>> {
        let value: Value = serde_json::from_str(text)?;

        let kind = match value.get("type").and_then(Value::as_str) {
            Some(kind) => kind.to_string(),
            None => {
                debug!("Ignoring envelope without a type");
                return Ok(None);
            }
        };

        let message = match kind.as_str() {
            "sessions_update" => FeedMessage::SessionsUpdate(serde_json::from_value::<SessionsUpdate>(value)?),
            "metrics_update" => FeedMessage::MetricsUpdate(serde_json::from_value::<MetricsUpdate>(value)?),
            k if SESSION_EVENT_TYPES.contains(&k) => {
                FeedMessage::SessionEvent(serde_json::from_value::<SessionEvent>(value)?)
            }
            other => {
                debug!("Ignoring message of unknown type '{}'", other);
                return Ok(None);
            }
        };

        Ok(Some(message))
    }
}

impl MessageRouter for FeedRouter {
    type Message = FeedMessage;
    type RouteKey = FeedRoute;

    fn parse(&self, message: WsMessage) -> streamsockets::Result<Option<Self::Message>> {
        match message {
            WsMessage::Text(text) => Self::decode(&text),
            WsMessage::Binary(data) => {
                let text = std::str::from_utf8(&data)
                    .map_err(|e| SocketError::Parse(format!("binary frame is not UTF-8: {}", e)))?;
                Self::decode(text)
            }
        }
    }

    fn route_key(&self, message: &Self::Message) -> Self::RouteKey {
        message.route()
    }
}

// =============================================================================
// Log tail router
// =============================================================================

/// Passes every frame through as a raw log line
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTailRouter;

impl MessageRouter for LogTailRouter {
    type Message = FeedMessage;
    type RouteKey = FeedRoute;

    fn parse(&self, message: WsMessage) -> streamsockets::Result<Option<Self::Message>> {
        let line = match message {
            WsMessage::Text(text) => text,
            WsMessage::Binary(data) => String::from_utf8_lossy(&data).into_owned(),
        };
        Ok(Some(FeedMessage::LogLine(line)))
    }

    fn route_key(&self, _message: &Self::Message) -> Self::RouteKey {
        FeedRoute::Logs
    }
}
