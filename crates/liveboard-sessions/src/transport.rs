//! Transport abstraction over one client connection.
//!
//! The session logic only ever sees ordered text frames — the gateway
//! adapts a real WebSocket onto these traits, tests use in-memory
//! channels. Framing, ping/pong and close handshakes belong to the
//! implementation behind the trait.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("transport error: {0}")]
pub struct TransportError(pub String);

/// Write half of a connection.
#[async_trait]
pub trait TransportTx: Send {
    /// Send one text frame. Frames arrive at the peer in send order.
    async fn send(&mut self, text: String) -> Result<(), TransportError>;

    /// Close the connection. Best-effort; errors are swallowed.
    async fn close(&mut self);
}

/// Read half of a connection.
#[async_trait]
pub trait TransportRx: Send {
    /// Receive the next text frame. `None` means the peer closed the
    /// connection cleanly.
    async fn recv(&mut self) -> Option<Result<String, TransportError>>;
}
