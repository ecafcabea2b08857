use std::fmt;

use serde_json::Value;

use crate::{
    media::{LocalMediaSnapshot, MediaStream},
    peer::PeerConnectionState,
    signaling::{HostCommand, Participant, PeerId},
};

/// Names subscribers register for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventName {
    WsOpen,
    WsClosed,
    WsError,
    AssignId,
    Participants,
    RemoteStreams,
    ChatMessage,
    HostCommand,
    DcOpen,
    DcMessage,
    DcClosed,
    LocalMediaUpdated,
    PeerState,
}

impl EventName {
    pub const ALL: [EventName; 13] = [
        EventName::WsOpen,
        EventName::WsClosed,
        EventName::WsError,
        EventName::AssignId,
        EventName::Participants,
        EventName::RemoteStreams,
        EventName::ChatMessage,
        EventName::HostCommand,
        EventName::DcOpen,
        EventName::DcMessage,
        EventName::DcClosed,
        EventName::LocalMediaUpdated,
        EventName::PeerState,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EventName::WsOpen => "ws-open",
            EventName::WsClosed => "ws-closed",
            EventName::WsError => "ws-error",
            EventName::AssignId => "assign-id",
            EventName::Participants => "participants",
            EventName::RemoteStreams => "remote-streams",
            EventName::ChatMessage => "chat-message",
            EventName::HostCommand => "host-command",
            EventName::DcOpen => "dc-open",
            EventName::DcMessage => "dc-message",
            EventName::DcClosed => "dc-closed",
            EventName::LocalMediaUpdated => "local-media-updated",
            EventName::PeerState => "peer-state",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|n| n.as_str() == name)
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A remote participant's accumulated inbound stream plus roster details.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteStreamView {
    pub peer_id: PeerId,
    pub name: String,
    pub muted: bool,
    pub is_host: bool,
    pub stream: MediaStream,
}

#[derive(Clone, Debug, PartialEq)]
pub enum BusEvent {
    WsOpen,
    WsClosed { reason: Option<String> },
    WsError(String),
    AssignId(PeerId),
    Participants(Vec<Participant>),
    RemoteStreams(Vec<RemoteStreamView>),
    ChatMessage(Value),
    HostCommand(HostCommand),
    DcOpen { peer_id: PeerId },
    DcMessage { peer_id: PeerId, text: String },
    DcClosed { peer_id: PeerId },
    LocalMediaUpdated(LocalMediaSnapshot),
    PeerState {
        peer_id: PeerId,
        state: PeerConnectionState,
    },
}

impl BusEvent {
    pub fn name(&self) -> EventName {
        match self {
            BusEvent::WsOpen => EventName::WsOpen,
            BusEvent::WsClosed { .. } => EventName::WsClosed,
            BusEvent::WsError(_) => EventName::WsError,
            BusEvent::AssignId(_) => EventName::AssignId,
            BusEvent::Participants(_) => EventName::Participants,
            BusEvent::RemoteStreams(_) => EventName::RemoteStreams,
            BusEvent::ChatMessage(_) => EventName::ChatMessage,
            BusEvent::HostCommand(_) => EventName::HostCommand,
            BusEvent::DcOpen { .. } => EventName::DcOpen,
            BusEvent::DcMessage { .. } => EventName::DcMessage,
            BusEvent::DcClosed { .. } => EventName::DcClosed,
            BusEvent::LocalMediaUpdated(_) => EventName::LocalMediaUpdated,
            BusEvent::PeerState { .. } => EventName::PeerState,
        }
    }
}
