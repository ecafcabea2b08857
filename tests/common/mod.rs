//! Shared fixtures: a routed in-memory room server and a peer connection
//! backend that "connects" as soon as both descriptions are set.
#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::{
    cell::RefCell,
    rc::Rc,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use meshrtc::{
    core::{Engine, SessionConfig},
    log::NoopLogSink,
    media::{MediaTrack, SyntheticDevices, TrackKind, TrackSource},
    peer::{
        DataChannel, PeerConnection, PeerConnectionFactory, PeerConnectionState, PeerError,
        PeerEvent, PeerEventSender, RtpSenderInfo, SenderId,
    },
    signaling::{IceCandidate, IceServer, Participant, SdpType, SessionDescription, SignalMsg},
    signaling_client::{
        Connector,
        memory_link::{MemoryConnector, MemoryServer, ServerSocket},
    },
};

pub const WAIT: Duration = Duration::from_secs(5);

// ---- peer connection backend ----

pub struct ClosedChannel {
    label: String,
}

impl DataChannel for ClosedChannel {
    fn label(&self) -> &str {
        &self.label
    }

    fn is_open(&self) -> bool {
        false
    }

    fn send_text(&mut self, _text: &str) -> Result<(), PeerError> {
        Err(PeerError::ChannelNotOpen)
    }

    fn close(&mut self) {}
}

#[derive(Default)]
pub struct PcLog {
    pub local: Option<SessionDescription>,
    pub remote: Option<SessionDescription>,
    pub candidates: Vec<IceCandidate>,
    pub senders: Vec<RtpSenderInfo>,
    pub closed: bool,
}

pub struct MeshPc {
    log: Rc<RefCell<PcLog>>,
    events: PeerEventSender,
    state: PeerConnectionState,
}

impl MeshPc {
    /// Reports connected, a local candidate and one remote track once both
    /// descriptions are in place.
    fn maybe_connect(&mut self) {
        let ready = {
            let log = self.log.borrow();
            log.local.is_some() && log.remote.is_some()
        };
        if !ready || self.state == PeerConnectionState::Connected {
            return;
        }
        self.state = PeerConnectionState::Connected;
        self.events.send(PeerEvent::IceCandidate(IceCandidate::new(
            "candidate:0 1 udp 2122260223 127.0.0.1 50000 typ host",
        )));
        self.events
            .send(PeerEvent::StateChanged(PeerConnectionState::Connected));
        self.events.send(PeerEvent::Track(MediaTrack::new(
            TrackKind::Video,
            TrackSource::Remote,
            "remote video",
        )));
    }
}

impl PeerConnection for MeshPc {
    fn create_offer(&mut self) -> Result<SessionDescription, PeerError> {
        Ok(SessionDescription::offer(format!(
            "v=0 offer {}",
            self.events.conn_id()
        )))
    }

    fn create_answer(&mut self) -> Result<SessionDescription, PeerError> {
        match &self.log.borrow().remote {
            Some(d) if d.sdp_type == SdpType::Offer => Ok(SessionDescription::answer(format!(
                "v=0 answer {}",
                self.events.conn_id()
            ))),
            _ => Err(PeerError::backend("create_answer", "no remote offer")),
        }
    }

    fn set_local_description(&mut self, desc: &SessionDescription) -> Result<(), PeerError> {
        self.log.borrow_mut().local = Some(desc.clone());
        self.maybe_connect();
        Ok(())
    }

    fn set_remote_description(&mut self, desc: &SessionDescription) -> Result<(), PeerError> {
        self.log.borrow_mut().remote = Some(desc.clone());
        self.maybe_connect();
        Ok(())
    }

    fn has_remote_description(&self) -> bool {
        self.log.borrow().remote.is_some()
    }

    fn add_ice_candidate(&mut self, candidate: &IceCandidate) -> Result<(), PeerError> {
        let mut log = self.log.borrow_mut();
        if log.remote.is_none() {
            return Err(PeerError::backend("add_ice_candidate", "no remote description"));
        }
        log.candidates.push(candidate.clone());
        Ok(())
    }

    fn add_track(&mut self, track: &MediaTrack, _stream_id: &str) -> Result<SenderId, PeerError> {
        let mut log = self.log.borrow_mut();
        let id = SenderId(u32::try_from(log.senders.len()).unwrap());
        log.senders.push(RtpSenderInfo {
            id,
            kind: track.kind(),
            track_id: Some(track.id().to_owned()),
        });
        Ok(id)
    }

    fn senders(&self) -> Vec<RtpSenderInfo> {
        self.log.borrow().senders.clone()
    }

    fn replace_track(
        &mut self,
        sender: SenderId,
        track: Option<&MediaTrack>,
    ) -> Result<(), PeerError> {
        let mut log = self.log.borrow_mut();
        let s = log
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
        Ok(Box::new(ClosedChannel {
            label: label.to_owned(),
        }))
    }

    fn connection_state(&self) -> PeerConnectionState {
        self.state
    }

    fn close(&mut self) {
        self.log.borrow_mut().closed = true;
        self.state = PeerConnectionState::Closed;
    }
}

/// Remembers every connection it built, in creation order.
#[derive(Clone, Default)]
pub struct MeshFactory {
    pub created: Rc<RefCell<Vec<(String, Rc<RefCell<PcLog>>)>>>,
}

impl MeshFactory {
    pub fn created_for(&self, peer_id: &str) -> usize {
        self.created
            .borrow()
            .iter()
            .filter(|(p, _)| p == peer_id)
            .count()
    }

    pub fn total(&self) -> usize {
        self.created.borrow().len()
    }

    pub fn all_closed(&self) -> bool {
        self.created.borrow().iter().all(|(_, log)| log.borrow().closed)
    }
}

impl PeerConnectionFactory for MeshFactory {
    fn create(
        &self,
        peer_id: &str,
        _ice_servers: &[IceServer],
        events: PeerEventSender,
    ) -> Result<Box<dyn PeerConnection>, PeerError> {
        let log = Rc::new(RefCell::new(PcLog::default()));
        self.created
            .borrow_mut()
            .push((peer_id.to_owned(), log.clone()));
        Ok(Box::new(MeshPc {
            log,
            events,
            state: PeerConnectionState::New,
        }))
    }
}

// ---- room server ----

struct Client {
    id: String,
    name: String,
    sock: ServerSocket,
    joined: bool,
    gone: bool,
}

/// Signaling server for one room: assigns ids, pushes the roster, routes
/// `signal` frames by `to` and relays chat and host commands to everyone
/// else.
pub struct RoomServer {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl RoomServer {
    pub fn start(server: MemoryServer) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = stop.clone();
        let handle = thread::spawn(move || serve(&server, &flag));
        Self {
            stop,
            handle: Some(handle),
        }
    }
}

impl Drop for RoomServer {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

fn serve(server: &MemoryServer, stop: &AtomicBool) {
    let mut clients: Vec<Client> = Vec::new();
    let mut next_id = 0;

    while !stop.load(Ordering::Acquire) {
        while let Some(sock) = server.accept(Duration::from_millis(1)) {
            next_id += 1;
            clients.push(Client {
                id: format!("peer-{next_id}"),
                name: String::new(),
                sock,
                joined: false,
                gone: false,
            });
        }

        let mut roster_dirty = false;
        let mut outbox: Vec<(Option<String>, Option<String>, SignalMsg)> = Vec::new();
        for c in &mut clients {
            loop {
                let text = match c.sock.recv(Duration::ZERO) {
                    Ok(Some(t)) => t,
                    Ok(None) => break,
                    Err(_) => {
                        c.gone = true;
                        break;
                    }
                };
                let Ok(msg) = SignalMsg::decode(&text) else {
                    continue;
                };
                match msg {
                    SignalMsg::Introduce { name, .. } => {
                        c.name = name;
                        c.joined = true;
                        c.sock.send(
                            &SignalMsg::AssignId { id: c.id.clone() }
                                .encode()
                                .unwrap(),
                        );
                        roster_dirty = true;
                    }
                    SignalMsg::Signal(mut p) => {
                        p.from = Some(c.id.clone());
                        outbox.push((p.to.clone(), None, SignalMsg::Signal(p)));
                    }
                    SignalMsg::Leave { .. } => c.gone = true,
                    other @ (SignalMsg::ChatMessage(_) | SignalMsg::HostCommand(_)) => {
                        outbox.push((None, Some(c.id.clone()), other));
                    }
                    SignalMsg::AssignId { .. } | SignalMsg::Participants(_) => {}
                }
            }
        }

        if clients.iter().any(|c| c.gone) {
            for c in clients.iter().filter(|c| c.gone) {
                c.sock.close();
            }
            clients.retain(|c| !c.gone);
            roster_dirty = true;
        }

        for (to, except, msg) in outbox {
            let text = msg.encode().unwrap();
            for c in clients.iter().filter(|c| c.joined) {
                let wanted = match (&to, &except) {
                    (Some(to), _) => *to == c.id,
                    (None, Some(sender)) => *sender != c.id,
                    (None, None) => true,
                };
                if wanted {
                    c.sock.send(&text);
                }
            }
        }

        if roster_dirty {
            let roster = SignalMsg::Participants(
                clients
                    .iter()
                    .filter(|c| c.joined)
                    .map(|c| Participant::new(c.id.clone(), c.name.clone()))
                    .collect(),
            )
            .encode()
            .unwrap();
            for c in clients.iter().filter(|c| c.joined) {
                c.sock.send(&roster);
            }
        }
    }
}

// ---- engines ----

pub fn config() -> SessionConfig {
    SessionConfig {
        offer_stagger_max: Duration::from_millis(20),
        disconnect_grace: Duration::from_millis(50),
        ..SessionConfig::default()
    }
}

/// A memory connector wired to a running room server.
pub fn room() -> (Arc<dyn Connector>, RoomServer) {
    let (connector, server) = MemoryConnector::new();
    (Arc::new(connector), RoomServer::start(server))
}

pub fn engine(connector: &Arc<dyn Connector>, cfg: SessionConfig) -> (Engine, MeshFactory) {
    let factory = MeshFactory::default();
    let engine = Engine::new(
        cfg,
        Rc::new(factory.clone()),
        Box::new(SyntheticDevices::default()),
        connector.clone(),
        Arc::new(NoopLogSink),
    );
    (engine, factory)
}

/// Polls every engine until `cond` holds.
pub fn pump_until(engines: &mut [Engine], what: &str, cond: impl Fn(&[Engine]) -> bool) {
    let deadline = Instant::now() + WAIT;
    loop {
        for e in engines.iter_mut() {
            e.wait_and_poll(Duration::from_millis(2));
        }
        if cond(engines) {
            return;
        }
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
    }
}

/// Polls every engine for `dur`.
pub fn pump_for(engines: &mut [Engine], dur: Duration) {
    let until = Instant::now() + dur;
    while Instant::now() < until {
        for e in engines.iter_mut() {
            e.wait_and_poll(Duration::from_millis(2));
        }
    }
}

/// Every peer of `e` is connected and there are `n` of them.
pub fn fully_connected(e: &Engine, n: usize) -> bool {
    let ids = e.peer_ids();
    ids.len() == n
        && ids.iter().all(|id| {
            e.peer(id)
                .is_some_and(|p| p.state() == meshrtc::peer::PeerState::Connected)
        })
}
