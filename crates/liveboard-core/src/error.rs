use thiserror::Error;

#[derive(Debug, Error)]
pub enum LiveboardError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Invalid topic: {0}")]
    InvalidTopic(String),

    #[error("Already subscribed to topic {topic}")]
    AlreadySubscribed { topic: String },

    #[error("Not subscribed to topic {topic}")]
    NotSubscribed { topic: String },

    #[error("Subscription limit reached: max {max} topics per session")]
    TooManySubscriptions { max: usize },

    #[error("Sequence {requested} precedes the retained floor {floor}")]
    SequenceTooOld { requested: u64, floor: u64 },

    #[error("Outbound queue overflow — session evicted as slow consumer")]
    SlowConsumer,

    #[error("Payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl LiveboardError {
    /// Short error code string sent to clients in RES and DISCONNECT frames.
    pub fn code(&self) -> &'static str {
        match self {
            LiveboardError::Config(_) => "CONFIG_ERROR",
            LiveboardError::Protocol(_) => "PROTOCOL_ERROR",
            LiveboardError::InvalidTopic(_) => "INVALID_TOPIC",
            LiveboardError::AlreadySubscribed { .. } => "ALREADY_SUBSCRIBED",
            LiveboardError::NotSubscribed { .. } => "NOT_SUBSCRIBED",
            LiveboardError::TooManySubscriptions { .. } => "TOO_MANY_SUBSCRIPTIONS",
            LiveboardError::SequenceTooOld { .. } => "SEQUENCE_TOO_OLD",
            LiveboardError::SlowConsumer => "SLOW_CONSUMER",
            LiveboardError::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            LiveboardError::Serialization(_) => "SERIALIZATION_ERROR",
            LiveboardError::Io(_) => "IO_ERROR",
            LiveboardError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, LiveboardError>;
