use crate::error::Result;
use crate::parser::WsMessage;
use async_trait::async_trait;

/// Opens sockets
///
/// `connect` resolving to `Ok` is the transport's open event. `Err` is a
/// failed handshake: the manager reports it as an error and then handles
/// it exactly like a close event.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn connect(&self, url: &str) -> Result<Box<dyn Connection>>;
}

/// One live socket
#[async_trait]
pub trait Connection: Send {
    /// Next transport event
    ///
    /// * `Some(Ok(frame))` - a data frame
    /// * `Some(Err(e))` - a transport error; the socket stays open
    /// * `None` - the close event; no further events follow
    async fn recv(&mut self) -> Option<Result<WsMessage>>;

    /// Close the socket. Must be safe to call on an already closed socket.
    async fn close(&mut self);
}
