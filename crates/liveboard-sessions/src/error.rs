use thiserror::Error;

use liveboard_core::TopicId;
use liveboard_feeds::FeedError;

/// Errors reported back to the client on subscription operations. The
/// connection stays open for all of these — they are client misuse or
/// recoverable resource limits, not protocol violations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("already subscribed to topic {topic}")]
    AlreadySubscribed { topic: TopicId },

    #[error("subscription limit reached: max {max} topics per session")]
    TooManySubscriptions { max: usize },

    #[error(transparent)]
    Feed(#[from] FeedError),
}

impl SessionError {
    /// Short error code string sent to clients in RES frames.
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::AlreadySubscribed { .. } => "ALREADY_SUBSCRIBED",
            SessionError::TooManySubscriptions { .. } => "TOO_MANY_SUBSCRIPTIONS",
            SessionError::Feed(FeedError::SequenceTooOld { .. }) => "SEQUENCE_TOO_OLD",
        }
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
