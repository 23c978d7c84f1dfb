//! REST client for seeding feeds before the first push

use crate::feeds::Session;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use streamsockets::FeedEndpoint;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum RestError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Not authenticated")]
    Unauthorized,

    #[error("Deserialization failed: {0}")]
    DeserializeFailed(String),
}

pub type Result<T> = std::result::Result<T, RestError>;

#[derive(Debug, Deserialize)]
struct SessionList {
    #[serde(default)]
    sessions: Vec<Session>,
    /// Server side count; can run ahead of `sessions` when paginated
    #[serde(default)]
    total: Option<usize>,
}

/// StreamSpace API client
pub struct StreamSpaceRestClient {
    base_url: String,
    client: Client,
}

impl StreamSpaceRestClient {
    /// Client for the same host the feeds use
    pub fn for_endpoint(endpoint: &FeedEndpoint) -> Result<Self> {
        Self::with_base_url(format!("{}://{}", endpoint.scheme.http_scheme(), endpoint.host))
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into();
        let mut builder = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(30));
        // local dev servers are never behind the system proxy
        if is_loopback(&base_url) {
            builder = builder.no_proxy();
        }

        Ok(Self {
            base_url,
            client: builder.build()?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /api/v1/sessions`
    pub async fn list_sessions(&self, token: &str) -> Result<Vec<Session>> {
        let url = format!("{}/api/v1/sessions", self.base_url);
        debug!("GET {}", url);

        let response = self.client.get(&url).bearer_auth(token).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(RestError::Unauthorized);
        }

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(RestError::ApiError(format!(
                "Failed to list sessions ({}): {}",
                status, error_text
            )));
        }

        let list: SessionList = response
            .json()
            .await
            .map_err(|e| RestError::DeserializeFailed(e.to_string()))?;

        match list.total {
            Some(total) if total != list.sessions.len() => {
                warn!(total, "Fetched {} sessions, server reports more", list.sessions.len())
            }
            _ => debug!("Fetched {} sessions", list.sessions.len()),
        }
        Ok(list.sessions)
    }
}

fn is_loopback(base_url: &str) -> bool {
    let host = base_url.split_once("://").map_or(base_url, |(_, rest)| rest);
    host.starts_with("localhost") || host.starts_with("127.0.0.1") || host.starts_with("[::1]")
}

#[cfg(test)]
mod tests {
    use super::*;
    use streamsockets::Scheme;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const LIST_BODY: &str = r#"{
        "sessions": [
            {
                "name": "user1-firefox",
                "namespace": "streamspace",
                "user": "user1",
                "template": "firefox-browser",
                "state": "running",
                "status": {
                    "phase": "Running",
                    "podName": "user1-firefox-0",
                    "url": "https://user1-firefox.streamspace.local",
                    "lastActivity": "2025-01-01T10:00:00Z"
                },
                "persistentHome": true,
                "idleTimeout": "30m",
                "platform": "kubernetes",
                "activeConnections": 1
            },
            {"name": "user1-vscode", "state": "hibernated"}
        ],
        "total": 2
    }"#;

    /// Answer one request on a local port, handing back the request head
    async fn serve_once(status: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut chunk = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&chunk[..n]);
            }
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
            String::from_utf8_lossy(&request).into_owned()
        });
        (addr, handle)
    }

    #[test]
    fn test_base_url_follows_socket_scheme() {
        let client =
            StreamSpaceRestClient::for_endpoint(&FeedEndpoint::new(Scheme::Wss, "streamspace.test")).unwrap();
        assert_eq!(client.base_url(), "https://streamspace.test");

        let client =
            StreamSpaceRestClient::for_endpoint(&FeedEndpoint::new(Scheme::Ws, "localhost:8000")).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000");
    }

    #[test]
    fn test_session_list_decodes_extra_fields() {
        let list: SessionList = serde_json::from_str(LIST_BODY).unwrap();

        assert_eq!(list.total, Some(2));
        assert_eq!(list.sessions.len(), 2);
        let first = &list.sessions[0];
        assert_eq!(first.state, "running");
        assert_eq!(first.status.pod_name, "user1-firefox-0");
        assert_eq!(
            first.status.last_activity.map(|t| t.to_rfc3339()),
            Some("2025-01-01T10:00:00+00:00".to_string())
        );
        assert_eq!(first.active_connections, 1);
        assert_eq!(list.sessions[1].state, "hibernated");
        assert!(list.sessions[1].status.last_activity.is_none());
    }

    #[tokio::test]
    async fn test_list_sessions_sends_bearer_token() {
        let (addr, server) = serve_once("200 OK", LIST_BODY).await;
        let client = StreamSpaceRestClient::with_base_url(format!("http://{}", addr)).unwrap();

        let sessions = client.list_sessions("tok").await.unwrap();
        let request = server.await.unwrap();

        assert!(request.starts_with("GET /api/v1/sessions "), "{}", request);
        assert!(request.to_ascii_lowercase().contains("authorization: bearer tok"));
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].name, "user1-firefox");
    }

    #[tokio::test]
    async fn test_list_sessions_errors() {
        let (addr, _server) = serve_once("401 Unauthorized", "{}").await;
        let client = StreamSpaceRestClient::with_base_url(format!("http://{}", addr)).unwrap();
        assert!(matches!(client.list_sessions("stale").await, Err(RestError::Unauthorized)));

        let (addr, _server) = serve_once("500 Internal Server Error", "{\"error\":\"db down\"}").await;
        let client = StreamSpaceRestClient::with_base_url(format!("http://{}", addr)).unwrap();
        match client.list_sessions("tok").await {
            Err(RestError::ApiError(message)) => assert!(message.contains("db down"), "{}", message),
            other => panic!("expected ApiError, got {:?}", other),
        }

        let (addr, _server) = serve_once("200 OK", "not json").await;
        let client = StreamSpaceRestClient::with_base_url(format!("http://{}", addr)).unwrap();
        assert!(matches!(
            client.list_sessions("tok").await,
            Err(RestError::DeserializeFailed(_))
        ));
    }
}
