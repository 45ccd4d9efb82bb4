//! Request parameter and response payload shapes for the subscription methods.

use serde::{Deserialize, Serialize};

use liveboard_core::TopicId;

/// Params of `subscribe`: start watching a topic from its current head.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscribeParams {
    pub topic: TopicId,
}

/// Params of `resubscribe`: rejoin a topic, replaying everything after
/// `last_seen` first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResubscribeParams {
    pub topic: TopicId,
    pub last_seen: u64,
}

/// Params of `unsubscribe`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnsubscribeParams {
    pub topic: TopicId,
}

/// Payload of a successful `subscribe` response. `seq` is the topic's
/// current head — the client's starting cursor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscribedOk {
    pub topic: TopicId,
    pub seq: u64,
}

/// Payload of a successful `resubscribe` response. `replayed` events with
/// sequence in `(last_seen, seq]` follow as ordinary EVENT frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResubscribedOk {
    pub topic: TopicId,
    pub seq: u64,
    pub replayed: usize,
}

/// Payload of a successful `unsubscribe` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnsubscribedOk {
    pub topic: TopicId,
}
