use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::LiveboardError;

/// Longest allowed board name. Board names are lowercase ASCII alphanumerics.
pub const MAX_BOARD_NAME_LEN: usize = 10;

/// A logical channel that events belong to and clients subscribe to:
/// either one board page or one thread.
///
/// The wire representation is a single string — all-digit strings are
/// thread numbers, everything else must be a valid board name. `"0"` and
/// digit strings with leading zeros are rejected so every topic has exactly
/// one canonical spelling.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TopicId {
    Board(String),
    Thread(u64),
}

impl TopicId {
    pub fn board(name: impl Into<String>) -> Self {
        Self::Board(name.into())
    }

    pub fn thread(id: u64) -> Self {
        Self::Thread(id)
    }
}

impl fmt::Display for TopicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopicId::Board(name) => write!(f, "{name}"),
            TopicId::Thread(id) => write!(f, "{id}"),
        }
    }
}

impl FromStr for TopicId {
    type Err = LiveboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s.len() > MAX_BOARD_NAME_LEN {
            return Err(LiveboardError::InvalidTopic(s.to_string()));
        }
        if s.bytes().all(|b| b.is_ascii_digit()) {
            // Thread number. Leading zeros would give the same thread two
            // spellings, and thread ids start at 1.
            if s.starts_with('0') {
                return Err(LiveboardError::InvalidTopic(s.to_string()));
            }
            let id = s
                .parse::<u64>()
                .map_err(|_| LiveboardError::InvalidTopic(s.to_string()))?;
            return Ok(TopicId::Thread(id));
        }
        if s.bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
        {
            Ok(TopicId::Board(s.to_string()))
        } else {
            Err(LiveboardError::InvalidTopic(s.to_string()))
        }
    }
}

impl Serialize for TopicId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TopicId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// The closed set of mutation notifications a topic can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    PostAdded,
    PostEdited,
    ThreadLocked,
    ThreadUnlocked,
    ThreadDeleted,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::PostAdded => "post-added",
            EventKind::PostEdited => "post-edited",
            EventKind::ThreadLocked => "thread-locked",
            EventKind::ThreadUnlocked => "thread-unlocked",
            EventKind::ThreadDeleted => "thread-deleted",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable, sequenced mutation notification for a topic.
///
/// Sequence numbers are per-topic, strictly increasing and gapless within
/// the retained window. The first event of a topic has seq 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub topic: TopicId,
    pub seq: u64,
    pub kind: EventKind,
    pub payload: serde_json::Value,
    /// Server-side append time, Unix milliseconds. Drives age-based
    /// retention trimming; not part of the ordering contract.
    pub ts: i64,
}

/// Unique identifier for one server-side connection session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single post as the client-side model sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: u64,
    pub body: String,
    /// Post creation time, Unix seconds.
    pub time: i64,
}

/// Payload of a `post-added` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostAdded {
    pub post: Post,
}

/// Payload of a `post-edited` event. Carries the full replacement body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostEdited {
    pub id: u64,
    pub body: String,
}
