//! Wire protocol spoken with the room signaling server.
//!
//! Every frame is one JSON [`SignalEnvelope`]; [`SignalMsg`] is its typed
//! view.
pub mod caption;
pub mod envelope;
pub mod host_command;
pub mod msg;
pub mod protocol_error;
pub mod sdp;
pub mod types;

pub use caption::CaptionEvent;
pub use envelope::SignalEnvelope;
pub use host_command::HostCommand;
pub use msg::{SignalBody, SignalMsg, SignalPayload};
pub use protocol_error::ProtocolError;
pub use sdp::{IceCandidate, IceServer, SdpType, SessionDescription};
pub use types::{Participant, PeerId};
