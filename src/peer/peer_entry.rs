use std::{collections::VecDeque, time::Instant};

use crate::{
    media::MediaStream,
    peer::peer_connection::{DataChannel, PeerConnection},
    signaling::{IceCandidate, Participant, PeerId},
};

/// Negotiation progress of one peer.
///
/// A failed connection is absorbed into `Closed`; the entry is removed
/// shortly after entering it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PeerState {
    New,
    Negotiating,
    Connected,
    Closed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NegotiationRole {
    Offerer,
    Answerer,
}

/// Roster details copied onto a new entry.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PeerOptions {
    pub display_name: Option<String>,
    pub muted: bool,
    pub is_host: bool,
}

impl From<&Participant> for PeerOptions {
    fn from(p: &Participant) -> Self {
        Self {
            display_name: (!p.name.is_empty()).then(|| p.name.clone()),
            muted: p.muted,
            is_host: p.is_host,
        }
    }
}

/// Everything held for one remote participant.
pub struct PeerEntry {
    pub(crate) peer_id: PeerId,
    pub(crate) conn_id: u64,
    pub(crate) connection: Box<dyn PeerConnection>,
    pub(crate) remote_stream: MediaStream,
    /// Candidates received before the remote description, in arrival order.
    pub(crate) pending_candidates: VecDeque<IceCandidate>,
    pub(crate) display_name: String,
    pub(crate) muted: bool,
    pub(crate) is_host: bool,
    pub(crate) data_channel: Option<Box<dyn DataChannel>>,
    pub(crate) dc_open: bool,
    pub(crate) state: PeerState,
    pub(crate) role: Option<NegotiationRole>,
    /// Deadline of the pending grace-period teardown, if one is armed.
    pub(crate) teardown_at: Option<Instant>,
}

impl PeerEntry {
    pub(crate) fn new(
        peer_id: &str,
        conn_id: u64,
        connection: Box<dyn PeerConnection>,
        opts: &PeerOptions,
    ) -> Self {
        Self {
            peer_id: peer_id.to_owned(),
            conn_id,
            connection,
            remote_stream: MediaStream::new(format!("remote-{peer_id}")),
            pending_candidates: VecDeque::new(),
            display_name: opts.display_name.clone().unwrap_or_default(),
            muted: opts.muted,
            is_host: opts.is_host,
            data_channel: None,
            dc_open: false,
            state: PeerState::New,
            role: None,
            teardown_at: None,
        }
    }

    pub fn peer_id(&self) -> &str {
        &self.peer_id
    }

    /// Unique per created connection; a re-created peer gets a new one.
    pub fn conn_id(&self) -> u64 {
        self.conn_id
    }

    pub fn state(&self) -> PeerState {
        self.state
    }

    pub fn role(&self) -> Option<NegotiationRole> {
        self.role
    }

    /// Created by an early candidate and never offered or answered.
    pub fn awaiting_offer(&self) -> bool {
        self.state == PeerState::New && self.role.is_none()
    }

    pub fn connection(&self) -> &dyn PeerConnection {
        self.connection.as_ref()
    }

    pub fn connection_mut(&mut self) -> &mut dyn PeerConnection {
        self.connection.as_mut()
    }

    pub fn remote_stream(&self) -> &MediaStream {
        &self.remote_stream
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn is_host(&self) -> bool {
        self.is_host
    }

    pub fn pending_candidates(&self) -> usize {
        self.pending_candidates.len()
    }

    pub fn has_data_channel(&self) -> bool {
        self.data_channel.is_some()
    }

    pub fn is_data_channel_open(&self) -> bool {
        self.dc_open
    }

    pub(crate) fn apply_roster(&mut self, p: &Participant) {
        if !p.name.is_empty() {
            self.display_name.clone_from(&p.name);
        }
        self.muted = p.muted;
        self.is_host = p.is_host;
    }

    /// Closes the data channel and the connection.
    pub(crate) fn close(&mut self) {
        if let Some(dc) = self.data_channel.as_mut() {
            dc.close();
        }
        self.dc_open = false;
        self.connection.close();
        self.state = PeerState::Closed;
    }
}
