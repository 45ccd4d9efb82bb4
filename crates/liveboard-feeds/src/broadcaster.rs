use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use liveboard_core::{EventKind, TopicId};

use crate::registry::TopicRegistry;

/// The single entry point by which the rest of the application announces
/// a change: append to the topic's log, fan out to every current
/// subscriber, evict the ones that cannot keep up.
#[derive(Clone)]
pub struct Broadcaster {
    registry: Arc<TopicRegistry>,
}

impl Broadcaster {
    pub fn new(registry: Arc<TopicRegistry>) -> Self {
        Self { registry }
    }

    /// Publish one mutation event. Returns the assigned sequence number.
    ///
    /// Every session subscribed at the moment this call begins receives
    /// the event at-least-once or is observably evicted; sessions that
    /// unsubscribed strictly before never receive it. Events on different
    /// topics are independently ordered.
    pub fn publish(&self, topic: &TopicId, kind: EventKind, payload: Value) -> u64 {
        let feed = self.registry.feed(topic);
        let (event, evicted) = feed.publish(kind, payload);
        for session in &evicted {
            warn!(topic = %topic, session = %session, seq = event.seq,
                  "slow consumer evicted during fan-out");
        }
        debug!(topic = %topic, seq = event.seq, kind = %event.kind,
               subscribers = feed.subscriber_count(), "event published");
        event.seq
    }

    /// Snapshot API for the initial-fetch HTTP layer: the sequence number
    /// a freshly rendered page should resume from.
    pub fn current_sequence(&self, topic: &TopicId) -> u64 {
        self.registry.current_sequence(topic)
    }
}
