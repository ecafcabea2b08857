//! Session controller: ties signaling, peers and local media together for
//! one meeting room.
pub mod engine;
pub mod events;
mod inbound;
mod negotiation;
pub(crate) mod room_session;
pub mod session_config;
pub mod session_error;
pub(crate) mod timers;

pub use engine::Engine;
pub use events::{SessionEvent, TransportEvent};
pub use session_config::SessionConfig;
pub use session_error::SessionError;
