pub mod error;
pub mod pump;
pub mod session;
pub mod transport;
pub mod types;

pub use error::SessionError;
pub use pump::run_session;
pub use session::Session;
pub use transport::{TransportError, TransportRx, TransportTx};
pub use types::{CloseReason, Liveness};
