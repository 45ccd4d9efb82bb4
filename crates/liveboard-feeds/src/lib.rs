pub mod broadcaster;
pub mod error;
pub mod log;
pub mod registry;
pub mod types;

pub use broadcaster::Broadcaster;
pub use error::FeedError;
pub use log::EventLog;
pub use registry::{Feed, TopicRegistry};
pub use types::SubscriberHandle;
