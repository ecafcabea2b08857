use std::{fmt, sync::mpsc::Sender};

use crate::{
    core::events::SessionEvent,
    media::MediaTrack,
    peer::peer_connection::{DataChannel, PeerConnectionState},
    signaling::IceCandidate,
};

/// Something a peer connection backend observed.
pub enum PeerEvent {
    /// A locally gathered candidate to trickle to the remote side.
    IceCandidate(IceCandidate),
    StateChanged(PeerConnectionState),
    /// An inbound remote track.
    Track(MediaTrack),
    /// A data channel opened by the remote side.
    DataChannel(Box<dyn DataChannel>),
    DataChannelOpen,
    DataChannelMessage(String),
    DataChannelClosed,
}

impl fmt::Debug for PeerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeerEvent::IceCandidate(c) => f.debug_tuple("IceCandidate").field(c).finish(),
            PeerEvent::StateChanged(s) => f.debug_tuple("StateChanged").field(s).finish(),
            PeerEvent::Track(t) => f.debug_tuple("Track").field(t).finish(),
            PeerEvent::DataChannel(dc) => f.debug_tuple("DataChannel").field(&dc.label()).finish(),
            PeerEvent::DataChannelOpen => f.write_str("DataChannelOpen"),
            PeerEvent::DataChannelMessage(m) => {
                f.debug_tuple("DataChannelMessage").field(m).finish()
            }
            PeerEvent::DataChannelClosed => f.write_str("DataChannelClosed"),
        }
    }
}

/// Backend-side handle that queues [`PeerEvent`]s for the engine.
///
/// It is tagged with the session epoch and the connection id, so events from
/// a connection that has since been replaced or closed are recognised and
/// dropped by the engine.
#[derive(Clone, Debug)]
pub struct PeerEventSender {
    tx: Sender<SessionEvent>,
    epoch: u64,
    peer_id: String,
    conn_id: u64,
}

impl PeerEventSender {
    pub fn new(tx: Sender<SessionEvent>, epoch: u64, peer_id: &str, conn_id: u64) -> Self {
        Self {
            tx,
            epoch,
            peer_id: peer_id.to_owned(),
            conn_id,
        }
    }

    pub fn peer_id(&self) -> &str {
        &self.peer_id
    }

    pub fn conn_id(&self) -> u64 {
        self.conn_id
    }

    /// Queues an event. Returns `false` once the engine is gone.
    pub fn send(&self, event: PeerEvent) -> bool {
        self.tx
            .send(SessionEvent::Peer {
                epoch: self.epoch,
                peer_id: self.peer_id.clone(),
                conn_id: self.conn_id,
                event,
            })
            .is_ok()
    }
}
