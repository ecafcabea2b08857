//! In-memory peer connection backend for unit tests.
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{
    cell::RefCell,
    collections::BTreeMap,
    rc::Rc,
    sync::{
        Arc, Mutex,
        mpsc::{self, Receiver},
    },
};

use crate::{
    core::events::SessionEvent,
    log::NoopLogSink,
    media::{MediaTrack, TrackKind},
    peer::{
        DataChannel, PeerConnection, PeerConnectionFactory, PeerConnectionState, PeerError,
        PeerEvent, PeerEventSender, PeerRegistry, RtpSenderInfo, SenderId,
    },
    signaling::{IceCandidate, IceServer, SdpType, SessionDescription},
};

#[derive(Default)]
pub struct DcState {
    pub open: bool,
    pub sent: Vec<String>,
    pub closed: bool,
}

pub struct FakeDc {
    label: String,
    pub state: Arc<Mutex<DcState>>,
}

impl DataChannel for FakeDc {
    fn label(&self) -> &str {
        &self.label
    }

    fn is_open(&self) -> bool {
        self.state.lock().unwrap().open
    }

    fn send_text(&mut self, text: &str) -> Result<(), PeerError> {
        let mut st = self.state.lock().unwrap();
        if !st.open {
            return Err(PeerError::ChannelNotOpen);
        }
        st.sent.push(text.to_owned());
        Ok(())
    }

    fn close(&mut self) {
        let mut st = self.state.lock().unwrap();
        st.open = false;
        st.closed = true;
    }
}

pub struct PcState {
    pub conn_id: u64,
    pub events: PeerEventSender,
    pub local: Option<SessionDescription>,
    pub remote: Option<SessionDescription>,
    pub candidates: Vec<IceCandidate>,
    pub senders: Vec<RtpSenderInfo>,
    pub replace_calls: usize,
    pub channels: Vec<Arc<Mutex<DcState>>>,
    pub state: PeerConnectionState,
    pub closed: bool,
    pub fail_tracks: bool,
}

pub struct FakePc(Rc<RefCell<PcState>>);

impl PeerConnection for FakePc {
    fn create_offer(&mut self) -> Result<SessionDescription, PeerError> {
        let st = self.0.borrow();
        Ok(SessionDescription::offer(format!("offer#{}", st.conn_id)))
    }

    fn create_answer(&mut self) -> Result<SessionDescription, PeerError> {
        let st = self.0.borrow();
        match &st.remote {
            Some(d) if d.sdp_type == SdpType::Offer => {
                Ok(SessionDescription::answer(format!("answer#{}", st.conn_id)))
            }
            _ => Err(PeerError::backend("create_answer", "no remote offer")),
        }
    }

    fn set_local_description(&mut self, desc: &SessionDescription) -> Result<(), PeerError> {
        self.0.borrow_mut().local = Some(desc.clone());
        Ok(())
    }

    fn set_remote_description(&mut self, desc: &SessionDescription) -> Result<(), PeerError> {
        if desc.sdp.starts_with("bad") {
            return Err(PeerError::backend("set_remote_description", "unparsable"));
        }
        self.0.borrow_mut().remote = Some(desc.clone());
        Ok(())
    }

    fn has_remote_description(&self) -> bool {
        self.0.borrow().remote.is_some()
    }

    fn add_ice_candidate(&mut self, candidate: &IceCandidate) -> Result<(), PeerError> {
        let mut st = self.0.borrow_mut();
        if st.remote.is_none() {
            return Err(PeerError::backend("add_ice_candidate", "no remote description"));
        }
        st.candidates.push(candidate.clone());
        Ok(())
    }

    fn add_track(&mut self, track: &MediaTrack, _stream_id: &str) -> Result<SenderId, PeerError> {
        let mut st = self.0.borrow_mut();
        if st.fail_tracks {
            return Err(PeerError::backend("add_track", "refused"));
        }
        let id = SenderId(u32::try_from(st.senders.len()).unwrap());
        st.senders.push(RtpSenderInfo {
            id,
            kind: track.kind(),
            track_id: Some(track.id().to_owned()),
        });
        Ok(id)
    }

    fn senders(&self) -> Vec<RtpSenderInfo> {
        self.0.borrow().senders.clone()
    }

    fn replace_track(
        &mut self,
        sender: SenderId,
        track: Option<&MediaTrack>,
    ) -> Result<(), PeerError> {
        let mut st = self.0.borrow_mut();
        if st.fail_tracks {
            return Err(PeerError::backend("replace_track", "refused"));
        }
        st.replace_calls += 1;
        let s = st
            .senders
            .iter_mut()
            .find(|s| s.id == sender)
            .ok_or(PeerError::UnknownSender(sender.0))?;
        s.track_id = track.map(|t| t.id().to_owned());
        Ok(())
    }

    fn create_data_channel(
        &mut self,
        label: &str,
        _ordered: bool,
    ) -> Result<Box<dyn DataChannel>, PeerError> {
        let state = Arc::new(Mutex::new(DcState::default()));
        self.0.borrow_mut().channels.push(state.clone());
        Ok(Box::new(FakeDc {
            label: label.to_owned(),
            state,
        }))
    }

    fn connection_state(&self) -> PeerConnectionState {
        self.0.borrow().state
    }

    fn close(&mut self) {
        let mut st = self.0.borrow_mut();
        st.closed = true;
        st.state = PeerConnectionState::Closed;
    }
}

/// Records every connection it creates, keyed by peer id (latest wins).
#[derive(Clone, Default)]
pub struct FakeFactory {
    pub pcs: Rc<RefCell<BTreeMap<String, Rc<RefCell<PcState>>>>>,
    pub created: Rc<RefCell<Vec<String>>>,
}

impl FakeFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pc(&self, peer_id: &str) -> Rc<RefCell<PcState>> {
        self.pcs.borrow().get(peer_id).cloned().unwrap()
    }

    pub fn created_for(&self, peer_id: &str) -> usize {
        self.created.borrow().iter().filter(|p| *p == peer_id).count()
    }

    /// Reports a state change the way a backend would.
    pub fn set_state(&self, peer_id: &str, state: PeerConnectionState) {
        let pc = self.pc(peer_id);
        let mut st = pc.borrow_mut();
        st.state = state;
        st.events.send(PeerEvent::StateChanged(state));
    }
}

impl PeerConnectionFactory for FakeFactory {
    fn create(
        &self,
        peer_id: &str,
        _ice_servers: &[IceServer],
        events: PeerEventSender,
    ) -> Result<Box<dyn PeerConnection>, PeerError> {
        if peer_id.starts_with("broken") {
            return Err(PeerError::backend("create", "refused"));
        }
        let st = Rc::new(RefCell::new(PcState {
            conn_id: events.conn_id(),
            events,
            local: None,
            remote: None,
            candidates: Vec::new(),
            senders: Vec::new(),
            replace_calls: 0,
            channels: Vec::new(),
            state: PeerConnectionState::New,
            closed: false,
            fail_tracks: false,
        }));
        self.pcs.borrow_mut().insert(peer_id.to_owned(), st.clone());
        self.created.borrow_mut().push(peer_id.to_owned());
        Ok(Box::new(FakePc(st)))
    }
}

pub fn registry_with(factory: &FakeFactory) -> (PeerRegistry, Receiver<SessionEvent>) {
    let (tx, rx) = mpsc::channel();
    let reg = PeerRegistry::new(
        Rc::new(factory.clone()),
        vec![IceServer::stun("stun:stun.example:3478")],
        tx,
        1,
        Arc::new(NoopLogSink),
    );
    (reg, rx)
}

pub fn video_senders(pc: &Rc<RefCell<PcState>>) -> usize {
    pc.borrow()
        .senders
        .iter()
        .filter(|s| s.kind == TrackKind::Video)
        .count()
}
