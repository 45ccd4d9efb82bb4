pub mod config;
pub mod error;
pub mod types;

pub use config::LiveboardConfig;
pub use error::LiveboardError;
pub use types::{Event, EventKind, SessionId, TopicId};
