use std::collections::VecDeque;

use serde_json::Value;

use liveboard_core::config::RetentionConfig;
use liveboard_core::{Event, EventKind, TopicId};

use crate::error::{FeedError, Result};

/// Append-only, monotonically sequenced record of one topic's mutations.
///
/// Sequence numbers are strictly increasing and gapless from the oldest
/// retained event to the newest. The log is single-writer per topic — the
/// owning feed serializes appends under its lock; the struct itself holds
/// no synchronization.
#[derive(Debug)]
pub struct EventLog {
    topic: TopicId,
    entries: VecDeque<Event>,
    /// Last assigned sequence number; 0 before the first append.
    head: u64,
    min_events: usize,
    min_age_ms: i64,
}

impl EventLog {
    pub fn new(topic: TopicId, retention: &RetentionConfig) -> Self {
        Self {
            topic,
            entries: VecDeque::new(),
            head: 0,
            min_events: retention.min_events,
            min_age_ms: (retention.min_seconds as i64).saturating_mul(1000),
        }
    }

    /// Sequence number of the newest event, 0 when none was ever appended.
    pub fn head(&self) -> u64 {
        self.head
    }

    /// Sequence number of the oldest retained event. When nothing is
    /// retained the floor is `head + 1` — the next append.
    pub fn floor(&self) -> u64 {
        self.entries.front().map_or(self.head + 1, |e| e.seq)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append a new event, assigning the next sequence number, then trim
    /// anything that fell out of the retention window.
    pub fn append(&mut self, kind: EventKind, payload: Value) -> Event {
        self.head += 1;
        let event = Event {
            topic: self.topic.clone(),
            seq: self.head,
            kind,
            payload,
            ts: chrono::Utc::now().timestamp_millis(),
        };
        self.entries.push_back(event.clone());
        self.trim();
        event
    }

    /// All retained events with sequence strictly greater than
    /// `from_exclusive`, in ascending order.
    ///
    /// Fails when the span `(from_exclusive, head]` is no longer fully
    /// retained — the caller missed more than the window holds.
    pub fn replay(&self, from_exclusive: u64) -> Result<Vec<Event>> {
        if from_exclusive >= self.head {
            return Ok(Vec::new());
        }
        if from_exclusive + 1 < self.floor() {
            return Err(FeedError::SequenceTooOld {
                requested: from_exclusive,
                floor: self.floor(),
            });
        }
        Ok(self
            .entries
            .iter()
            .filter(|e| e.seq > from_exclusive)
            .cloned()
            .collect())
    }

    /// Drop oldest entries that exceed BOTH retention bounds: outside the
    /// newest `min_events` and at least `min_age_ms` old. Trimming never
    /// reorders what remains.
    fn trim(&mut self) {
        let now = chrono::Utc::now().timestamp_millis();
        while self.entries.len() > self.min_events {
            match self.entries.front() {
                Some(oldest) if now - oldest.ts >= self.min_age_ms => {
                    let _ = self.entries.pop_front();
                }
                _ => break,
            }
        }
    }
}
