use std::fmt;

use crate::{
    media::{MediaTrack, TrackKind},
    peer::{peer_error::PeerError, peer_event::PeerEventSender},
    signaling::{IceCandidate, IceServer, SessionDescription},
};

/// Connection state as reported by the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PeerConnectionState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

impl PeerConnectionState {
    pub fn as_str(self) -> &'static str {
        match self {
            PeerConnectionState::New => "new",
            PeerConnectionState::Connecting => "connecting",
            PeerConnectionState::Connected => "connected",
            PeerConnectionState::Disconnected => "disconnected",
            PeerConnectionState::Failed => "failed",
            PeerConnectionState::Closed => "closed",
        }
    }

    /// States that start the grace-period teardown.
    pub fn is_down(self) -> bool {
        matches!(
            self,
            PeerConnectionState::Disconnected
                | PeerConnectionState::Failed
                | PeerConnectionState::Closed
        )
    }
}

impl fmt::Display for PeerConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle of one outgoing RTP sender on a connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SenderId(pub u32);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RtpSenderInfo {
    pub id: SenderId,
    pub kind: TrackKind,
    /// `None` after `replace_track(.., None)`.
    pub track_id: Option<String>,
}

/// One WebRTC peer connection.
///
/// Calls are synchronous from the caller's point of view; backends with an
/// async core block on it internally. Anything the backend learns on its own
/// (local candidates, state changes, inbound tracks and channels) goes
/// through the [`PeerEventSender`] handed to the factory.
pub trait PeerConnection {
    /// # Errors
    /// Backend failure.
    fn create_offer(&mut self) -> Result<SessionDescription, PeerError>;
    /// # Errors
    /// Backend failure, typically no remote offer set.
    fn create_answer(&mut self) -> Result<SessionDescription, PeerError>;
    /// # Errors
    /// Backend failure.
    fn set_local_description(&mut self, desc: &SessionDescription) -> Result<(), PeerError>;
    /// # Errors
    /// Backend failure, e.g. an unparsable SDP.
    fn set_remote_description(&mut self, desc: &SessionDescription) -> Result<(), PeerError>;
    fn has_remote_description(&self) -> bool;
    /// # Errors
    /// Backend failure. Callers must only add candidates once a remote
    /// description is set.
    fn add_ice_candidate(&mut self, candidate: &IceCandidate) -> Result<(), PeerError>;
    /// # Errors
    /// Backend failure.
    fn add_track(&mut self, track: &MediaTrack, stream_id: &str) -> Result<SenderId, PeerError>;
    fn senders(&self) -> Vec<RtpSenderInfo>;
    /// Swaps the track of an existing sender without renegotiation.
    ///
    /// # Errors
    /// [`PeerError::UnknownSender`] or backend failure.
    fn replace_track(
        &mut self,
        sender: SenderId,
        track: Option<&MediaTrack>,
    ) -> Result<(), PeerError>;
    /// # Errors
    /// Backend failure.
    fn create_data_channel(
        &mut self,
        label: &str,
        ordered: bool,
    ) -> Result<Box<dyn DataChannel>, PeerError>;
    fn connection_state(&self) -> PeerConnectionState;
    /// Idempotent.
    fn close(&mut self);
}

/// Creates connections for the peer registry.
pub trait PeerConnectionFactory {
    /// # Errors
    /// Backend failure while building the connection.
    fn create(
        &self,
        peer_id: &str,
        ice_servers: &[IceServer],
        events: PeerEventSender,
    ) -> Result<Box<dyn PeerConnection>, PeerError>;
}

/// Text data channel. Open/message/close arrive as peer events.
pub trait DataChannel: Send {
    fn label(&self) -> &str;
    fn is_open(&self) -> bool;
    /// # Errors
    /// [`PeerError::ChannelNotOpen`] or backend failure.
    fn send_text(&mut self, text: &str) -> Result<(), PeerError>;
    fn close(&mut self);
}
