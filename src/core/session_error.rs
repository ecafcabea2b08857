use std::fmt;

use crate::{
    config::ConfigError, media::MediaError, peer::PeerError, signaling::ProtocolError,
    signaling_client::SignalingClientError,
};

/// Errors returned by [`Engine`](super::engine::Engine) operations.
#[derive(Debug)]
pub enum SessionError {
    /// The operation needs a room session and there is none.
    NotConnected,
    Signaling(SignalingClientError),
    Peer { peer_id: String, source: PeerError },
    Media(MediaError),
    Config(ConfigError),
    /// An outbound message could not be encoded.
    Protocol(ProtocolError),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::NotConnected => write!(f, "not connected to a room"),
            SessionError::Signaling(e) => write!(f, "signaling: {e}"),
            SessionError::Peer { peer_id, source } => write!(f, "peer {peer_id}: {source}"),
            SessionError::Media(e) => write!(f, "media: {e}"),
            SessionError::Config(e) => write!(f, "config: {e}"),
            SessionError::Protocol(e) => write!(f, "protocol: {e}"),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::NotConnected => None,
            SessionError::Signaling(e) => Some(e),
            SessionError::Peer { source, .. } => Some(source),
            SessionError::Media(e) => Some(e),
            SessionError::Config(e) => Some(e),
            SessionError::Protocol(e) => Some(e),
        }
    }
}

impl From<SignalingClientError> for SessionError {
    fn from(e: SignalingClientError) -> Self {
        SessionError::Signaling(e)
    }
}

impl From<MediaError> for SessionError {
    fn from(e: MediaError) -> Self {
        SessionError::Media(e)
    }
}

impl From<ConfigError> for SessionError {
    fn from(e: ConfigError) -> Self {
        SessionError::Config(e)
    }
}

impl From<ProtocolError> for SessionError {
    fn from(e: ProtocolError) -> Self {
        SessionError::Protocol(e)
    }
}
