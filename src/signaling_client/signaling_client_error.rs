use std::{fmt, io};

/// Errors of the signaling socket and its URL.
#[derive(Debug)]
pub enum SignalingClientError {
    InvalidUrl(String),
    InvalidRoomId(String),
    Io(io::Error),
    Tls(String),
    Ws(String),
    /// The server closed the socket (with its reason, if any).
    Closed(Option<String>),
    /// The network thread is gone.
    Disconnected,
}

impl fmt::Display for SignalingClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidUrl(u) => write!(f, "invalid signaling url: {u}"),
            Self::InvalidRoomId(r) => write!(f, "invalid room id: {r:?}"),
            Self::Io(e) => write!(f, "IO error: {e}"),
            Self::Tls(e) => write!(f, "TLS error: {e}"),
            Self::Ws(e) => write!(f, "websocket error: {e}"),
            Self::Closed(Some(reason)) => write!(f, "closed by server: {reason}"),
            Self::Closed(None) => write!(f, "closed by server"),
            Self::Disconnected => write!(f, "signaling client disconnected"),
        }
    }
}

impl std::error::Error for SignalingClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for SignalingClientError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}
