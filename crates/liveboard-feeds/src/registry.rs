use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use serde_json::Value;
use tracing::debug;

use liveboard_core::config::RetentionConfig;
use liveboard_core::{Event, EventKind, SessionId, TopicId};

use crate::error::Result;
use crate::log::EventLog;
use crate::types::{EnqueueError, SubscriberHandle};

/// One topic's live state: its event log plus its current subscribers.
///
/// A single mutex guards both so that appends, membership changes and
/// fan-out for one topic are serialized against each other, while
/// different topics proceed independently. Every operation inside the
/// lock is non-blocking (`try_send` only), keeping the critical section
/// bounded regardless of peer speed.
pub struct Feed {
    topic: TopicId,
    state: Mutex<FeedState>,
}

struct FeedState {
    log: EventLog,
    subscribers: HashMap<SessionId, SubscriberHandle>,
}

impl Feed {
    fn new(topic: TopicId, retention: &RetentionConfig) -> Self {
        Self {
            topic: topic.clone(),
            state: Mutex::new(FeedState {
                log: EventLog::new(topic, retention),
                subscribers: HashMap::new(),
            }),
        }
    }

    pub fn topic(&self) -> &TopicId {
        &self.topic
    }

    /// Register a subscriber from the topic's current head — no replay.
    /// Returns the head sequence, the subscriber's starting cursor.
    pub fn subscribe(&self, handle: SubscriberHandle) -> u64 {
        let mut state = self.state.lock().expect("feed lock poisoned");
        let head = state.log.head();
        let _ = state.subscribers.insert(handle.session().clone(), handle);
        head
    }

    /// Register a subscriber and replay every retained event after
    /// `last_seen` onto its queue before any newer event can be fanned
    /// out — replay and registration happen under the same lock, so the
    /// subscriber observes a gapless ascending sequence.
    ///
    /// Returns `(head, replayed)`. If the replay itself overflows the
    /// subscriber's queue the handle is cancelled and dropped — the
    /// session is evicted as a slow consumer, never left with a gap.
    pub fn resubscribe(&self, handle: SubscriberHandle, last_seen: u64) -> Result<(u64, usize)> {
        let mut state = self.state.lock().expect("feed lock poisoned");
        let events = state.log.replay(last_seen)?;
        let replayed = events.len();
        for event in events {
            if handle.enqueue(event).is_err() {
                handle.cancel();
                let _ = state.subscribers.remove(handle.session());
                return Ok((state.log.head(), replayed));
            }
        }
        let head = state.log.head();
        let _ = state.subscribers.insert(handle.session().clone(), handle);
        Ok((head, replayed))
    }

    /// Remove a subscriber. No-op when it was not subscribed.
    pub fn unsubscribe(&self, session: &SessionId) {
        let mut state = self.state.lock().expect("feed lock poisoned");
        let _ = state.subscribers.remove(session);
    }

    /// Append an event and enqueue it to every current subscriber.
    ///
    /// Subscribers whose queue is full are removed and their cancellation
    /// token fired; their ids are returned so the caller can log the
    /// eviction. Subscribers whose receiving end is already gone are
    /// pruned silently.
    pub fn publish(&self, kind: EventKind, payload: Value) -> (Event, Vec<SessionId>) {
        let mut state = self.state.lock().expect("feed lock poisoned");
        let event = state.log.append(kind, payload);

        let mut evicted = Vec::new();
        let mut gone = Vec::new();
        for (session, handle) in &state.subscribers {
            match handle.enqueue(event.clone()) {
                Ok(()) => {}
                Err(EnqueueError::Overflow) => {
                    handle.cancel();
                    evicted.push(session.clone());
                }
                Err(EnqueueError::Closed) => gone.push(session.clone()),
            }
        }
        for session in evicted.iter().chain(&gone) {
            let _ = state.subscribers.remove(session);
        }
        (event, evicted)
    }

    /// Current head sequence (0 when the topic has no events yet).
    pub fn head(&self) -> u64 {
        self.state.lock().expect("feed lock poisoned").log.head()
    }

    /// Stable snapshot of current subscriber ids.
    pub fn subscribers(&self) -> Vec<SessionId> {
        self.state
            .lock()
            .expect("feed lock poisoned")
            .subscribers
            .keys()
            .cloned()
            .collect()
    }

    pub fn subscriber_count(&self) -> usize {
        self.state
            .lock()
            .expect("feed lock poisoned")
            .subscribers
            .len()
    }
}

/// Process-wide map from topic id to its feed.
///
/// Feeds are created lazily on first subscribe or publish and live for the
/// process lifetime; the retention window bounds each log's size, not the
/// feed's existence.
pub struct TopicRegistry {
    feeds: DashMap<TopicId, Arc<Feed>>,
    retention: RetentionConfig,
}

impl TopicRegistry {
    pub fn new(retention: RetentionConfig) -> Self {
        Self {
            feeds: DashMap::new(),
            retention,
        }
    }

    /// The feed for a topic, creating it if this is the first reference.
    pub fn feed(&self, topic: &TopicId) -> Arc<Feed> {
        if let Some(feed) = self.feeds.get(topic) {
            return Arc::clone(&feed);
        }
        let entry = self
            .feeds
            .entry(topic.clone())
            .or_insert_with(|| {
                debug!(topic = %topic, "creating feed");
                Arc::new(Feed::new(topic.clone(), &self.retention))
            });
        Arc::clone(&entry)
    }

    /// The feed for a topic, if one exists.
    pub fn get(&self, topic: &TopicId) -> Option<Arc<Feed>> {
        self.feeds.get(topic).map(|f| Arc::clone(&f))
    }

    /// Head sequence of a topic, 0 when it has never seen an event.
    pub fn current_sequence(&self, topic: &TopicId) -> u64 {
        self.get(topic).map_or(0, |feed| feed.head())
    }

    pub fn topic_count(&self) -> usize {
        self.feeds.len()
    }
}
