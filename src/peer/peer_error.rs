use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerError {
    /// The backend rejected an operation (`op` names it, e.g. `set_remote_description`).
    Backend { op: &'static str, reason: String },
    UnknownSender(u32),
    ChannelNotOpen,
    Closed,
}

impl PeerError {
    pub fn backend(op: &'static str, reason: impl fmt::Display) -> Self {
        PeerError::Backend {
            op,
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for PeerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeerError::Backend { op, reason } => write!(f, "{op} failed: {reason}"),
            PeerError::UnknownSender(id) => write!(f, "no sender with id {id}"),
            PeerError::ChannelNotOpen => write!(f, "data channel is not open"),
            PeerError::Closed => write!(f, "peer connection is closed"),
        }
    }
}

impl std::error::Error for PeerError {}
