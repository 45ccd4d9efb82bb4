use std::collections::BTreeMap;

use tracing::warn;

use liveboard_core::types::{Post, PostAdded, PostEdited};
use liveboard_core::{Event, EventKind};

/// Thin local model of one watched topic: posts in id order plus the
/// thread lock flag. Presentation is someone else's job — this only
/// holds the state a renderer would read.
#[derive(Debug, Clone, Default)]
pub struct ThreadView {
    posts: BTreeMap<u64, Post>,
    locked: bool,
}

impl ThreadView {
    pub fn posts(&self) -> impl Iterator<Item = &Post> {
        self.posts.values()
    }

    pub fn post(&self, id: u64) -> Option<&Post> {
        self.posts.get(&id)
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn locked(&self) -> bool {
        self.locked
    }

    /// Apply one in-order event. Returns whether anything a renderer
    /// would show actually changed.
    pub(crate) fn apply(&mut self, event: &Event) -> bool {
        match event.kind {
            EventKind::PostAdded => {
                let Ok(PostAdded { post }) = serde_json::from_value(event.payload.clone()) else {
                    warn!(topic = %event.topic, seq = event.seq, "undecodable post-added payload");
                    return false;
                };
                let _ = self.posts.insert(post.id, post);
                true
            }
            EventKind::PostEdited => {
                let Ok(PostEdited { id, body }) = serde_json::from_value(event.payload.clone())
                else {
                    warn!(topic = %event.topic, seq = event.seq, "undecodable post-edited payload");
                    return false;
                };
                match self.posts.get_mut(&id) {
                    Some(post) => {
                        post.body = body;
                        true
                    }
                    // an edit for a post outside the local window (e.g.
                    // trimmed from a board page) changes nothing visible
                    None => false,
                }
            }
            EventKind::ThreadLocked => {
                let changed = !self.locked;
                self.locked = true;
                changed
            }
            EventKind::ThreadUnlocked => {
                let changed = self.locked;
                self.locked = false;
                changed
            }
            // teardown is the reconciler's decision, not a model mutation
            EventKind::ThreadDeleted => false,
        }
    }
}
