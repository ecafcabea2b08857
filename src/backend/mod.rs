//! Peer connection backends behind the [`peer`](crate::peer) traits.
pub mod webrtc_rs;

pub use webrtc_rs::{WebRtcDataChannel, WebRtcFactory, WebRtcPeerConnection};
