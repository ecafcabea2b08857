use serde::{Deserialize, Serialize};

/// Participant identifier assigned by the signaling server (its socket id).
pub type PeerId = String;

/// One roster entry as pushed by the server in `participants`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub socket_id: PeerId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_host: bool,
    #[serde(default)]
    pub muted: bool,
}

impl Participant {
    pub fn new(socket_id: impl Into<PeerId>, name: impl Into<String>) -> Self {
        Self {
            socket_id: socket_id.into(),
            name: name.into(),
            is_host: false,
            muted: false,
        }
    }
}
