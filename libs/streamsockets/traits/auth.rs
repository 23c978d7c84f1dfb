use tokio::sync::watch;

/// Source of the reactive auth token
///
/// Connection URLs embed the token, so every feed re-resolves its URL when
/// the token changes. `None` means "signed out": feeds stay disconnected.
///
/// Many feeds read the same provider; none of them write to it.
pub trait AuthProvider: Send + Sync {
    /// Current token, if signed in
    fn token(&self) -> Option<String>;

    /// Receiver notified on every token change
    fn watch(&self) -> watch::Receiver<Option<String>>;
}

/// In-process token store backed by a watch channel
///
/// Login, logout and token refresh all go through [`TokenStore::set_token`].
/// Setting the same token twice does not wake subscribers.
#[derive(Debug)]
pub struct TokenStore {
    tx: watch::Sender<Option<String>>,
}

impl TokenStore {
    pub fn new(initial: Option<String>) -> Self {
        let (tx, _rx) = watch::channel(normalize(initial));
        Self { tx }
    }

    /// Store signed out
    pub fn signed_out() -> Self {
        Self::new(None)
    }

    /// Replace the token. Returns true if subscribers were notified.
    pub fn set_token(&self, token: Option<String>) -> bool {
        let token = normalize(token);
        self.tx.send_if_modified(|current| {
            if *current == token {
                false
            } else {
                *current = token;
                true
            }
        })
    }

    pub fn login(&self, token: impl Into<String>) -> bool {
        self.set_token(Some(token.into()))
    }

    pub fn logout(&self) -> bool {
        self.set_token(None)
    }
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::signed_out()
    }
}

impl AuthProvider for TokenStore {
    fn token(&self) -> Option<String> {
        self.tx.borrow().clone()
    }

    fn watch(&self) -> watch::Receiver<Option<String>> {
        self.tx.subscribe()
    }
}

// An empty token is the same as no token.
fn normalize(token: Option<String>) -> Option<String> {
    token.filter(|t| !t.is_empty())
}
