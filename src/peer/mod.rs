//! Per-remote-peer state and the peer connection backend seam.
pub mod peer_connection;
pub mod peer_entry;
pub mod peer_error;
pub mod peer_event;
pub mod peer_registry;

pub use peer_connection::{
    DataChannel, PeerConnection, PeerConnectionFactory, PeerConnectionState, RtpSenderInfo,
    SenderId,
};
pub use peer_entry::{NegotiationRole, PeerEntry, PeerOptions, PeerState};
pub use peer_error::PeerError;
pub use peer_event::{PeerEvent, PeerEventSender};
pub use peer_registry::PeerRegistry;

/// Label of the data channel used for caption relay.
pub const CAPTION_CHANNEL_LABEL: &str = "captions";
