//! Native peer connections over the `webrtc` crate.
//!
//! The crate is async; the engine is not. [`WebRtcFactory`] owns a tokio
//! runtime, blocks on it for every call the engine makes, and turns the
//! crate's callbacks into [`PeerEvent`](crate::peer::PeerEvent)s on the
//! engine queue.
pub mod convert;
pub mod webrtc_data_channel;
pub mod webrtc_factory;
pub mod webrtc_peer_connection;

pub use webrtc_data_channel::WebRtcDataChannel;
pub use webrtc_factory::WebRtcFactory;
pub use webrtc_peer_connection::WebRtcPeerConnection;
