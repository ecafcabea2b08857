use std::collections::HashSet;

use crate::{
    event_bus::RemoteStreamView,
    peer::{PeerOptions, PeerRegistry},
    signaling::{Participant, PeerId, SignalMsg},
    signaling_client::SignalingTransport,
};

/// State of one `connect()`: the socket, the peers and the roster.
///
/// Dropped as a whole on `disconnect()`, which closes every connection.
pub(crate) struct RoomSession {
    pub epoch: u64,
    pub room_id: String,
    pub name: String,
    /// Assigned by the server; `None` until `assign-id`.
    pub local_id: Option<PeerId>,
    /// `None` while the socket is down between reconnect attempts.
    pub transport: Option<SignalingTransport>,
    pub link_id: u64,
    pub peers: PeerRegistry,
    /// Last roster pushed by the server, ourselves included.
    pub roster: Vec<Participant>,
    /// Peers with a staggered offer timer armed.
    pub offer_scheduled: HashSet<PeerId>,
    pub reconnect_attempts: u32,
}

impl RoomSession {
    pub fn new(
        epoch: u64,
        room_id: &str,
        name: &str,
        transport: SignalingTransport,
        peers: PeerRegistry,
    ) -> Self {
        Self {
            epoch,
            room_id: room_id.to_owned(),
            name: name.to_owned(),
            local_id: None,
            link_id: transport.link_id(),
            transport: Some(transport),
            peers,
            roster: Vec::new(),
            offer_scheduled: HashSet::new(),
            reconnect_attempts: 0,
        }
    }

    /// Fire-and-forget; `false` if the socket is not open.
    pub fn send(&self, msg: &SignalMsg) -> bool {
        self.transport.as_ref().is_some_and(|t| t.send(msg))
    }

    pub fn is_local(&self, peer_id: &str) -> bool {
        self.local_id.as_deref() == Some(peer_id)
    }

    /// The lower id of a pair offers.
    pub fn is_designated_offerer(&self, peer_id: &str) -> bool {
        self.local_id
            .as_deref()
            .is_some_and(|me| me < peer_id)
    }

    pub fn roster_entry(&self, peer_id: &str) -> Option<&Participant> {
        self.roster.iter().find(|p| p.socket_id == peer_id)
    }

    pub fn in_roster(&self, peer_id: &str) -> bool {
        self.roster_entry(peer_id).is_some()
    }

    pub fn peer_options(&self, peer_id: &str) -> PeerOptions {
        self.roster_entry(peer_id)
            .map(PeerOptions::from)
            .unwrap_or_default()
    }

    pub fn remote_streams(&self) -> Vec<RemoteStreamView> {
        self.peers
            .all()
            .map(|e| RemoteStreamView {
                peer_id: e.peer_id().to_owned(),
                name: e.display_name().to_owned(),
                muted: e.is_muted(),
                is_host: e.is_host(),
                stream: e.remote_stream().clone(),
            })
            .collect()
    }
}
