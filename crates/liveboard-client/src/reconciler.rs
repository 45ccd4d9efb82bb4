use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use liveboard_core::{Event, EventKind, TopicId};

use crate::model::ThreadView;

/// Sync state of one watched topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    /// Applying events as they arrive, cursor is current.
    Subscribed,
    /// A gap was detected; out-of-order events are buffered until the
    /// requested backfill closes it.
    Backfilling,
}

/// Something the reconciler needs the embedding UI to do. The reconciler
/// itself never renders, never talks to the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// The view model changed — re-render this topic.
    Refresh(TopicId),
    /// A gap was detected — send `resubscribe {topic, last_seen: from}`.
    Resubscribe { topic: TopicId, from: u64 },
    /// The thread is gone — drop the view and send `unsubscribe`.
    Teardown(TopicId),
    /// Local state is unrecoverable — refetch the full snapshot over
    /// HTTP, then call [`Reconciler::subscribed`] with its sequence.
    Refetch(TopicId),
}

#[derive(Debug)]
struct TopicSync {
    cursor: u64,
    state: ViewState,
    pending: BTreeMap<u64, Event>,
    view: ThreadView,
}

/// Gap-aware ordered-apply state machine over all watched topics.
///
/// Per topic: `Idle → Subscribed`; each event with `seq == cursor + 1`
/// is applied and advances the cursor; anything at or below the cursor
/// is a duplicate and dropped; anything further ahead is buffered while
/// a backfill is requested. `thread-deleted` ends the topic.
#[derive(Debug, Default)]
pub struct Reconciler {
    topics: HashMap<TopicId, TopicSync>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or restart, after a snapshot refetch) watching a topic.
    /// `seq` is the cursor base: the sequence confirmed by the subscribe
    /// response or reported by the snapshot API.
    pub fn subscribed(&mut self, topic: TopicId, seq: u64) {
        debug!(topic = %topic, seq, "watching topic");
        let _ = self.topics.insert(
            topic,
            TopicSync {
                cursor: seq,
                state: ViewState::Subscribed,
                pending: BTreeMap::new(),
                view: ThreadView::default(),
            },
        );
    }

    /// Stop watching a topic (user navigated away).
    pub fn unsubscribed(&mut self, topic: &TopicId) {
        let _ = self.topics.remove(topic);
    }

    /// The server rejected our backfill cursor: everything local is
    /// stale. Drop the topic and ask the UI for a full resync.
    pub fn sequence_too_old(&mut self, topic: &TopicId) -> Vec<Action> {
        match self.topics.remove(topic) {
            Some(_) => vec![Action::Refetch(topic.clone())],
            None => Vec::new(),
        }
    }

    pub fn view(&self, topic: &TopicId) -> Option<&ThreadView> {
        self.topics.get(topic).map(|s| &s.view)
    }

    pub fn cursor(&self, topic: &TopicId) -> Option<u64> {
        self.topics.get(topic).map(|s| s.cursor)
    }

    pub fn state(&self, topic: &TopicId) -> Option<ViewState> {
        self.topics.get(topic).map(|s| s.state)
    }

    /// Feed one inbound event through the ordered-apply rule.
    pub fn on_event(&mut self, event: Event) -> Vec<Action> {
        let topic = event.topic.clone();
        let Some(sync) = self.topics.get_mut(&topic) else {
            // not watching (or already torn down) — stale delivery
            return Vec::new();
        };

        if event.seq <= sync.cursor {
            return Vec::new();
        }

        if event.seq > sync.cursor + 1 {
            let first_gap = sync.state != ViewState::Backfilling;
            let from = sync.cursor;
            let _ = sync.pending.insert(event.seq, event);
            sync.state = ViewState::Backfilling;
            return if first_gap {
                debug!(topic = %topic, from, "gap detected, requesting backfill");
                vec![Action::Resubscribe { topic, from }]
            } else {
                Vec::new()
            };
        }

        // In order: apply, then drain the buffer while it stays contiguous.
        let mut changed = false;
        let mut deleted = false;
        let mut next = event;
        loop {
            sync.cursor = next.seq;
            if next.kind == EventKind::ThreadDeleted {
                deleted = true;
                break;
            }
            changed |= sync.view.apply(&next);
            match sync.pending.pop_first() {
                Some((seq, buffered)) if seq == sync.cursor + 1 => next = buffered,
                Some((seq, buffered)) => {
                    // still a hole in front of the buffer — put it back
                    let _ = sync.pending.insert(seq, buffered);
                    break;
                }
                None => break,
            }
        }

        if deleted {
            let _ = self.topics.remove(&topic);
            return vec![Action::Teardown(topic)];
        }
        if sync.pending.is_empty() {
            sync.state = ViewState::Subscribed;
        }
        if changed {
            vec![Action::Refresh(topic)]
        } else {
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use liveboard_core::types::Post;

    fn topic() -> TopicId {
        TopicId::Thread(42)
    }

    fn post_added(seq: u64, id: u64) -> Event {
        Event {
            topic: topic(),
            seq,
            kind: EventKind::PostAdded,
            payload: serde_json::json!({ "post": { "id": id, "body": "hi", "time": 0 } }),
            ts: 0,
        }
    }

    fn bare(seq: u64, kind: EventKind) -> Event {
        Event {
            topic: topic(),
            seq,
            kind,
            payload: serde_json::json!({}),
            ts: 0,
        }
    }

    #[test]
    fn in_order_events_apply_and_advance_the_cursor() {
        let mut rec = Reconciler::new();
        rec.subscribed(topic(), 10);

        let actions = rec.on_event(post_added(11, 1));
        assert_eq!(actions, vec![Action::Refresh(topic())]);
        assert_eq!(rec.cursor(&topic()), Some(11));

        let actions = rec.on_event(post_added(12, 2));
        assert_eq!(actions, vec![Action::Refresh(topic())]);
        assert_eq!(rec.view(&topic()).unwrap().len(), 2);
        assert_eq!(rec.state(&topic()), Some(ViewState::Subscribed));
    }

    #[test]
    fn duplicates_at_or_below_the_cursor_are_dropped() {
        let mut rec = Reconciler::new();
        rec.subscribed(topic(), 10);
        assert!(rec.on_event(post_added(11, 1)).len() == 1);

        assert!(rec.on_event(post_added(11, 1)).is_empty());
        assert!(rec.on_event(post_added(9, 7)).is_empty());
        assert_eq!(rec.view(&topic()).unwrap().len(), 1);
        assert_eq!(rec.cursor(&topic()), Some(11));
    }

    #[test]
    fn gap_buffers_and_requests_one_backfill() {
        let mut rec = Reconciler::new();
        rec.subscribed(topic(), 11);

        let actions = rec.on_event(post_added(13, 3));
        assert_eq!(
            actions,
            vec![Action::Resubscribe {
                topic: topic(),
                from: 11
            }]
        );
        assert_eq!(rec.state(&topic()), Some(ViewState::Backfilling));
        // a second out-of-order event must not spam another backfill
        assert!(rec.on_event(post_added(14, 4)).is_empty());
        // nothing applied yet
        assert_eq!(rec.view(&topic()).unwrap().len(), 0);
        assert_eq!(rec.cursor(&topic()), Some(11));
    }

    #[test]
    fn backfill_closes_the_gap_and_applies_in_sequence_order() {
        let mut rec = Reconciler::new();
        rec.subscribed(topic(), 11);
        let _ = rec.on_event(post_added(13, 3));
        let _ = rec.on_event(post_added(14, 4));

        // the replayed event arrives — everything buffered drains in order
        let actions = rec.on_event(post_added(12, 2));
        assert_eq!(actions, vec![Action::Refresh(topic())]);
        assert_eq!(rec.cursor(&topic()), Some(14));
        assert_eq!(rec.state(&topic()), Some(ViewState::Subscribed));

        let ids: Vec<u64> = rec
            .view(&topic())
            .unwrap()
            .posts()
            .map(|p: &Post| p.id)
            .collect();
        assert_eq!(ids, vec![2, 3, 4]);
    }

    #[test]
    fn partial_backfill_stays_backfilling() {
        let mut rec = Reconciler::new();
        rec.subscribed(topic(), 11);
        let _ = rec.on_event(post_added(13, 3));
        let _ = rec.on_event(post_added(15, 5));

        // 12 arrives: 12 and 13 apply, 15 still waits on 14
        let _ = rec.on_event(post_added(12, 2));
        assert_eq!(rec.cursor(&topic()), Some(13));
        assert_eq!(rec.state(&topic()), Some(ViewState::Backfilling));

        let _ = rec.on_event(post_added(14, 4));
        assert_eq!(rec.cursor(&topic()), Some(15));
        assert_eq!(rec.state(&topic()), Some(ViewState::Subscribed));
    }

    #[test]
    fn lock_and_unlock_toggle_the_flag_without_touching_posts() {
        let mut rec = Reconciler::new();
        rec.subscribed(topic(), 0);
        let _ = rec.on_event(post_added(1, 1));

        let actions = rec.on_event(bare(2, EventKind::ThreadLocked));
        assert_eq!(actions, vec![Action::Refresh(topic())]);
        assert!(rec.view(&topic()).unwrap().locked());
        assert_eq!(rec.view(&topic()).unwrap().len(), 1);

        let _ = rec.on_event(bare(3, EventKind::ThreadUnlocked));
        assert!(!rec.view(&topic()).unwrap().locked());
    }

    #[test]
    fn thread_deleted_tears_the_view_down() {
        let mut rec = Reconciler::new();
        rec.subscribed(topic(), 0);
        let _ = rec.on_event(post_added(1, 1));

        let actions = rec.on_event(bare(2, EventKind::ThreadDeleted));
        assert_eq!(actions, vec![Action::Teardown(topic())]);
        assert!(rec.view(&topic()).is_none());

        // anything arriving afterwards is stale and ignored
        assert!(rec.on_event(post_added(3, 3)).is_empty());
    }

    #[test]
    fn deleted_mid_drain_discards_the_rest() {
        let mut rec = Reconciler::new();
        rec.subscribed(topic(), 0);
        let _ = rec.on_event(bare(2, EventKind::ThreadDeleted));
        let _ = rec.on_event(post_added(3, 3));

        // backfill fills seq 1; the buffered deletion at 2 ends the topic
        let actions = rec.on_event(post_added(1, 1));
        assert_eq!(actions, vec![Action::Teardown(topic())]);
        assert!(rec.view(&topic()).is_none());
    }

    #[test]
    fn sequence_too_old_forces_a_refetch() {
        let mut rec = Reconciler::new();
        rec.subscribed(topic(), 5);
        let actions = rec.sequence_too_old(&topic());
        assert_eq!(actions, vec![Action::Refetch(topic())]);
        assert!(rec.view(&topic()).is_none());

        // resync: snapshot said we are at 20 now
        rec.subscribed(topic(), 20);
        assert!(rec.on_event(post_added(21, 9)).len() == 1);
    }

    #[test]
    fn events_for_unwatched_topics_are_ignored() {
        let mut rec = Reconciler::new();
        assert!(rec.on_event(post_added(1, 1)).is_empty());
    }

    #[test]
    fn post_edit_replaces_the_body() {
        let mut rec = Reconciler::new();
        rec.subscribed(topic(), 0);
        let _ = rec.on_event(post_added(1, 7));

        let edit = Event {
            topic: topic(),
            seq: 2,
            kind: EventKind::PostEdited,
            payload: serde_json::json!({ "id": 7, "body": "edited" }),
            ts: 0,
        };
        let actions = rec.on_event(edit);
        assert_eq!(actions, vec![Action::Refresh(topic())]);
        assert_eq!(rec.view(&topic()).unwrap().post(7).unwrap().body, "edited");
    }
}
