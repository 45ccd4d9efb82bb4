//! Method names accepted in REQ frames.

pub const SUBSCRIBE: &str = "subscribe";
pub const RESUBSCRIBE: &str = "resubscribe";
pub const UNSUBSCRIBE: &str = "unsubscribe";
pub const PING: &str = "ping";
