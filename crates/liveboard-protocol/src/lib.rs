pub mod frames;
pub mod methods;
pub mod params;

pub use frames::{DisconnectFrame, EventFrame, HeartbeatFrame, InboundFrame, ReqFrame, ResFrame};
