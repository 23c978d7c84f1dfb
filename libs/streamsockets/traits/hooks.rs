/// Optional lifecycle callbacks for a connection manager
///
/// All methods run on the connection task, synchronously with the state
/// transition that triggered them. Keep them short.
pub trait LifecycleHooks: Send + 'static {
    /// The socket opened; the attempt counter was reset
    fn on_open(&mut self, _url: &str) {}

    /// The socket closed (unexpectedly, after a failed handshake, or torn down)
    fn on_close(&mut self, _url: &str) {}

    /// The resolved URL changed and the previous socket is already gone.
    /// `url` is empty when the feed was told not to connect.
    fn on_url_changed(&mut self, _url: &str) {}

    /// The transport reported an error. Does not imply a close.
    fn on_error(&mut self, _error: &str) {}

    /// The reconnect budget is spent; the manager stays down until re-armed
    fn on_exhausted(&mut self, _attempts: u32) {}
}

/// Hooks that do nothing
pub struct NoHooks;

impl LifecycleHooks for NoHooks {}
