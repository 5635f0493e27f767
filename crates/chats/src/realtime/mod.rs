//! Live connections: the broadcast hub and the per-connection session.

pub mod hub;
pub mod session;

pub use hub::{BroadcastHub, DeliveryError, SessionHandle, SessionId};
pub use session::{ChatSession, SessionState};
