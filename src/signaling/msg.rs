use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::signaling::{
    host_command::HostCommand,
    sdp::{IceCandidate, SessionDescription},
    types::{Participant, PeerId},
};

/// Message kinds, as they appear in the envelope's `type` field.
pub mod kind {
    pub const INTRODUCE: &str = "introduce";
    pub const ASSIGN_ID: &str = "assign-id";
    pub const PARTICIPANTS: &str = "participants";
    pub const SIGNAL: &str = "signal";
    pub const CHAT_MESSAGE: &str = "chat-message";
    pub const HOST_COMMAND: &str = "host-command";
    pub const LEAVE: &str = "leave";
}

/// Typed view of one signaling frame.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalMsg {
    /// client → server, sent once the socket opens.
    Introduce { name: String, room_id: String },
    /// server → client, our participant id for this socket.
    AssignId { id: PeerId },
    /// server → client, the full current roster (ourselves included).
    Participants(Vec<Participant>),
    /// Offer/answer/candidate relayed between two participants.
    Signal(SignalPayload),
    /// Room chat, including caption payloads. Relayed unchanged.
    ChatMessage(Value),
    HostCommand(HostCommand),
    /// client → server, best-effort goodbye.
    Leave { room_id: String },
}

impl SignalMsg {
    pub fn kind(&self) -> &'static str {
        match self {
            SignalMsg::Introduce { .. } => kind::INTRODUCE,
            SignalMsg::AssignId { .. } => kind::ASSIGN_ID,
            SignalMsg::Participants(_) => kind::PARTICIPANTS,
            SignalMsg::Signal(_) => kind::SIGNAL,
            SignalMsg::ChatMessage(_) => kind::CHAT_MESSAGE,
            SignalMsg::HostCommand(_) => kind::HOST_COMMAND,
            SignalMsg::Leave { .. } => kind::LEAVE,
        }
    }
}

/// Payload of a `signal` frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<PeerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<PeerId>,
    pub signal: SignalBody,
}

impl SignalPayload {
    pub fn to_peer(to: &str, from: Option<&str>, signal: SignalBody) -> Self {
        Self {
            to: Some(to.to_owned()),
            from: from.map(str::to_owned),
            signal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SignalBody {
    Offer { sdp: String },
    Answer { sdp: String },
    Candidate { candidate: IceCandidate },
}

impl From<SessionDescription> for SignalBody {
    fn from(desc: SessionDescription) -> Self {
        match desc.sdp_type {
            crate::signaling::sdp::SdpType::Offer => SignalBody::Offer { sdp: desc.sdp },
            crate::signaling::sdp::SdpType::Answer => SignalBody::Answer { sdp: desc.sdp },
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct IntroducePayload {
    pub name: String,
    pub room_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct AssignIdPayload {
    pub id: PeerId,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LeavePayload {
    pub room_id: String,
}
