use std::fmt;

/// Capture failures reported by [`MediaDevices`](super::MediaDevices).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaError {
    /// The device cannot satisfy a preferred setting.
    Overconstrained { constraint: String },
    /// The user or platform refused access.
    NotAllowed,
    NotFound(String),
    /// An operation needs local media that has not been acquired.
    NoLocalMedia,
    Device(String),
}

impl fmt::Display for MediaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaError::Overconstrained { constraint } => {
                write!(f, "device cannot satisfy constraint {constraint}")
            }
            MediaError::NotAllowed => write!(f, "media access not allowed"),
            MediaError::NotFound(what) => write!(f, "no such media device: {what}"),
            MediaError::NoLocalMedia => write!(f, "local media has not been started"),
            MediaError::Device(e) => write!(f, "media device error: {e}"),
        }
    }
}

impl std::error::Error for MediaError {}
