use thiserror::Error;

/// Errors surfaced by a topic's event log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FeedError {
    /// The requested resume point precedes the retention window. The
    /// client must discard local state and refetch a full snapshot.
    #[error("sequence {requested} precedes the retained floor {floor}")]
    SequenceTooOld { requested: u64, floor: u64 },
}

pub type Result<T> = std::result::Result<T, FeedError>;
