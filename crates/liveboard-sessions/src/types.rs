/// Lifecycle state of a session — linear progression, no backwards
/// transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// Subscribed topics receive fan-out; the pump is serving the peer.
    Active,
    /// Membership removed from every feed; pending writes may still be
    /// flushed best-effort.
    Draining,
    /// Fully torn down.
    Closed,
}

/// Why a session ended. Determines the final frame sent to the peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The peer closed the connection.
    ClientGone,
    /// The transport failed mid-send or mid-receive.
    TransportFailed,
    /// The peer sent a malformed message.
    Protocol,
    /// The peer sent a frame above the size cap.
    PayloadTooLarge,
    /// The peer's outbound queue overflowed during fan-out.
    SlowConsumer,
}
