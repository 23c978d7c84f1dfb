//! Connection URL resolution
//!
//! A feed's URL is derived from reactive inputs: the auth token and, for log
//! tails, the namespace/pod being tailed. An empty URL means "do not
//! connect". The connection manager polls a [`UrlSource`] and re-runs its
//! lifecycle whenever the resolved URL changes.

use crate::traits::AuthProvider;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// WebSocket scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Ws,
    Wss,
}

impl Scheme {
    /// Derive the socket scheme from the page (HTTP) scheme: https → wss
    pub fn from_page_scheme(page_scheme: &str) -> Self {
        let page_scheme = page_scheme.trim_end_matches(':');
        if page_scheme.eq_ignore_ascii_case("https") || page_scheme.eq_ignore_ascii_case("wss") {
            Scheme::Wss
        } else {
            Scheme::Ws
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Ws => "ws",
            Scheme::Wss => "wss",
        }
    }

    /// Matching HTTP scheme, for REST calls against the same host
    pub fn http_scheme(&self) -> &'static str {
        match self {
            Scheme::Ws => "http",
            Scheme::Wss => "https",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Server the feeds connect to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEndpoint {
    pub scheme: Scheme,
    /// host[:port]
    pub host: String,
}

impl FeedEndpoint {
    pub fn new(scheme: Scheme, host: impl Into<String>) -> Self {
        Self {
            scheme,
            host: host.into(),
        }
    }

    pub fn from_page(page_scheme: &str, host: impl Into<String>) -> Self {
        Self::new(Scheme::from_page_scheme(page_scheme), host)
    }

    /// Full socket URL for `path` with the token as a query parameter
    pub fn url_for(&self, path: &FeedPath, token: &str) -> String {
        format!(
            "{}://{}{}?token={}",
            self.scheme,
            self.host,
            path.to_path(),
            urlencoding::encode(token)
        )
    }
}

/// Namespace/pod pair a log tail follows
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogTarget {
    pub namespace: String,
    pub pod: String,
}

impl LogTarget {
    pub fn new(namespace: impl Into<String>, pod: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            pod: pod.into(),
        }
    }
}

/// Server-side feed paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedPath {
    Sessions,
    Cluster,
    Logs(LogTarget),
}

impl FeedPath {
    pub fn to_path(&self) -> String {
        match self {
            FeedPath::Sessions => "/api/v1/ws/sessions".to_string(),
            FeedPath::Cluster => "/api/v1/ws/cluster".to_string(),
            FeedPath::Logs(target) => format!(
                "/api/v1/ws/logs/{}/{}",
                urlencoding::encode(&target.namespace),
                urlencoding::encode(&target.pod)
            ),
        }
    }
}

/// Reactive source of a connection URL
///
/// `current` resolves the URL from the latest inputs; an empty string means
/// "do not connect". `changed` resolves when any input changed since the
/// last `current`, or returns `false` once the inputs can never change
/// again.
#[async_trait]
pub trait UrlSource: Send + 'static {
    fn current(&mut self) -> String;

    async fn changed(&mut self) -> bool;
}

/// A URL that never changes
#[derive(Debug, Clone)]
pub struct StaticUrl(pub String);

#[async_trait]
impl UrlSource for StaticUrl {
    fn current(&mut self) -> String {
        self.0.clone()
    }

    async fn changed(&mut self) -> bool {
        std::future::pending::<()>().await;
        false
    }
}

/// A URL pushed through a watch channel
#[async_trait]
impl UrlSource for watch::Receiver<String> {
    fn current(&mut self) -> String {
        self.borrow_and_update().clone()
    }

    async fn changed(&mut self) -> bool {
        watch::Receiver::changed(self).await.is_ok()
    }
}

enum Target {
    Fixed(FeedPath),
    Logs(watch::Receiver<Option<LogTarget>>),
}

/// Resolves a feed URL from the auth token and the feed target
///
/// ```ignore
/// let auth = Arc::new(TokenStore::signed_out());
/// let mut sessions = SubscriptionUrlResolver::sessions(endpoint, auth.clone());
/// assert_eq!(sessions.resolve(), "");
///
/// auth.login("t0k3n");
/// assert_eq!(sessions.resolve(), "wss://host/api/v1/ws/sessions?token=t0k3n");
/// ```
pub struct SubscriptionUrlResolver {
    endpoint: FeedEndpoint,
    token: watch::Receiver<Option<String>>,
    target: Target,
}

impl SubscriptionUrlResolver {
    pub fn new(endpoint: FeedEndpoint, auth: Arc<dyn AuthProvider>, path: FeedPath) -> Self {
        Self {
            endpoint,
            token: auth.watch(),
            target: Target::Fixed(path),
        }
    }

    pub fn sessions(endpoint: FeedEndpoint, auth: Arc<dyn AuthProvider>) -> Self {
        Self::new(endpoint, auth, FeedPath::Sessions)
    }

    pub fn cluster(endpoint: FeedEndpoint, auth: Arc<dyn AuthProvider>) -> Self {
        Self::new(endpoint, auth, FeedPath::Cluster)
    }

    /// Log tail following whatever target `targets` currently holds
    pub fn logs(
        endpoint: FeedEndpoint,
        auth: Arc<dyn AuthProvider>,
        targets: watch::Receiver<Option<LogTarget>>,
    ) -> Self {
        Self {
            endpoint,
            token: auth.watch(),
            target: Target::Logs(targets),
        }
    }

    /// Resolve from the latest inputs without marking them seen
    pub fn resolve(&self) -> String {
        let token = self.token.borrow().clone();
        let path = match &self.target {
            Target::Fixed(path) => Some(path.clone()),
            Target::Logs(targets) => targets.borrow().clone().map(FeedPath::Logs),
        };
        self.build(token, path)
    }

    fn build(&self, token: Option<String>, path: Option<FeedPath>) -> String {
        match (token, path) {
            (Some(token), Some(path)) if !token.is_empty() => self.endpoint.url_for(&path, &token),
            _ => String::new(),
        }
    }
}

#[async_trait]
impl UrlSource for SubscriptionUrlResolver {
    fn current(&mut self) -> String {
        let token = self.token.borrow_and_update().clone();
        let path = match &mut self.target {
            Target::Fixed(path) => Some(path.clone()),
            Target::Logs(targets) => targets.borrow_and_update().clone().map(FeedPath::Logs),
        };
        self.build(token, path)
    }

    async fn changed(&mut self) -> bool {
        match &mut self.target {
            Target::Fixed(_) => self.token.changed().await.is_ok(),
            Target::Logs(targets) => {
                // a closed input stops being watched; the feed ends only when both are
                let mut token_open = true;
                let mut targets_open = true;
                while token_open || targets_open {
                    tokio::select! {
                        r = self.token.changed(), if token_open => match r {
                            Ok(()) => return true,
                            Err(_) => token_open = false,
                        },
                        r = targets.changed(), if targets_open => match r {
                            Ok(()) => return true,
                            Err(_) => targets_open = false,
                        },
                    }
                }
                false
            }
        }
    }
}
