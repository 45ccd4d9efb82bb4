use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use liveboard_core::{Event, SessionId};

/// Why an enqueue onto a subscriber's outbound queue did not happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueError {
    /// The queue is full — the session is not draining fast enough and
    /// must be evicted.
    Overflow,
    /// The receiving end is gone — the session already shut down.
    Closed,
}

/// Non-owning reference to one session held by the topic registry.
///
/// The registry can push events at the session and fire its cancellation
/// token, but never controls the session's lifecycle — the connection task
/// owns that.
#[derive(Debug, Clone)]
pub struct SubscriberHandle {
    session: SessionId,
    tx: mpsc::Sender<Event>,
    kill: CancellationToken,
}

impl SubscriberHandle {
    pub fn new(session: SessionId, tx: mpsc::Sender<Event>, kill: CancellationToken) -> Self {
        Self { session, tx, kill }
    }

    pub fn session(&self) -> &SessionId {
        &self.session
    }

    /// Push one event onto the session's outbound queue without blocking.
    ///
    /// Fan-out calls this under the feed lock; a `try_send` keeps the
    /// critical section bounded no matter how slow the peer is.
    pub fn enqueue(&self, event: Event) -> Result<(), EnqueueError> {
        self.tx.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => EnqueueError::Overflow,
            mpsc::error::TrySendError::Closed(_) => EnqueueError::Closed,
        })
    }

    /// Force the owning connection task to shut the session down.
    pub fn cancel(&self) {
        self.kill.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
