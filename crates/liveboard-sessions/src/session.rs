use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use liveboard_core::config::LimitsConfig;
use liveboard_core::{Event, SessionId, TopicId};
use liveboard_feeds::{SubscriberHandle, TopicRegistry};

use crate::error::{Result, SessionError};
use crate::types::Liveness;

/// Server-side state of one client connection: its subscriptions, their
/// delivery cursors, and the sending side of its outbound queue.
///
/// Owned exclusively by the connection task. Feeds hold only
/// `SubscriberHandle`s — queue sender plus cancellation token — so
/// nothing outside the connection task ever drives the lifecycle.
pub struct Session {
    id: SessionId,
    registry: Arc<TopicRegistry>,
    tx: mpsc::Sender<Event>,
    kill: CancellationToken,
    /// topic → last sequence written to the transport.
    subscriptions: HashMap<TopicId, u64>,
    liveness: Liveness,
    max_subscriptions: usize,
}

impl Session {
    /// Create a session and its outbound queue receiver. The receiver is
    /// drained by the connection pump; the queue bound is the
    /// slow-consumer threshold.
    pub fn new(registry: Arc<TopicRegistry>, limits: &LimitsConfig) -> (Self, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(limits.outbound_queue.max(1));
        let session = Self {
            id: SessionId::new(),
            registry,
            tx,
            kill: CancellationToken::new(),
            subscriptions: HashMap::new(),
            liveness: Liveness::Active,
            max_subscriptions: limits.max_subscriptions,
        };
        (session, rx)
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn kill_token(&self) -> CancellationToken {
        self.kill.clone()
    }

    pub fn liveness(&self) -> Liveness {
        self.liveness
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    fn handle(&self) -> SubscriberHandle {
        SubscriberHandle::new(self.id.clone(), self.tx.clone(), self.kill.clone())
    }

    /// Register interest in a topic from its current head — no replay.
    /// Returns the starting cursor.
    pub fn subscribe(&mut self, topic: TopicId) -> Result<u64> {
        if self.subscriptions.contains_key(&topic) {
            return Err(SessionError::AlreadySubscribed { topic });
        }
        if self.subscriptions.len() >= self.max_subscriptions {
            return Err(SessionError::TooManySubscriptions {
                max: self.max_subscriptions,
            });
        }
        let head = self.registry.feed(&topic).subscribe(self.handle());
        debug!(session = %self.id, topic = %topic, seq = head, "subscribed");
        let _ = self.subscriptions.insert(topic, head);
        Ok(head)
    }

    /// Rejoin a topic after a gap, replaying every retained event past
    /// `last_seen`. Replaces an existing subscription to the same topic,
    /// so a client reconciling a gap does not need to unsubscribe first.
    pub fn resubscribe(&mut self, topic: TopicId, last_seen: u64) -> Result<(u64, usize)> {
        if !self.subscriptions.contains_key(&topic)
            && self.subscriptions.len() >= self.max_subscriptions
        {
            return Err(SessionError::TooManySubscriptions {
                max: self.max_subscriptions,
            });
        }
        let (head, replayed) = self
            .registry
            .feed(&topic)
            .resubscribe(self.handle(), last_seen)?;
        debug!(session = %self.id, topic = %topic, last_seen, replayed, "resubscribed");
        let _ = self.subscriptions.insert(topic, last_seen);
        Ok((head, replayed))
    }

    /// Drop interest in a topic. Idempotent — unsubscribing a topic that
    /// was never subscribed is a no-op, not an error.
    pub fn unsubscribe(&mut self, topic: &TopicId) {
        if self.subscriptions.remove(topic).is_some() {
            if let Some(feed) = self.registry.get(topic) {
                feed.unsubscribe(&self.id);
            }
            debug!(session = %self.id, topic = %topic, "unsubscribed");
        }
    }

    /// Gate one queued event against the topic cursor. Returns whether it
    /// should be written to the transport, advancing the cursor if so.
    ///
    /// Drops events for topics no longer subscribed and events at or
    /// below the cursor — the replay/live overlap and any
    /// unsubscribe/resubscribe race never reach the client twice.
    pub fn record_delivery(&mut self, event: &Event) -> bool {
        match self.subscriptions.get_mut(&event.topic) {
            Some(cursor) if event.seq > *cursor => {
                *cursor = event.seq;
                true
            }
            _ => false,
        }
    }

    /// Remove this session from every feed it is registered in. After
    /// this returns no further event can be enqueued; cursors survive so
    /// a best-effort drain can still gate what is already queued.
    pub fn detach(&mut self) {
        if self.liveness != Liveness::Active {
            return;
        }
        self.liveness = Liveness::Draining;
        for topic in self.subscriptions.keys() {
            if let Some(feed) = self.registry.get(topic) {
                feed.unsubscribe(&self.id);
            }
        }
    }

    /// Final transition; clears all subscription state. Idempotent.
    pub fn finish(&mut self) {
        self.detach();
        self.subscriptions.clear();
        self.liveness = Liveness::Closed;
    }
}
