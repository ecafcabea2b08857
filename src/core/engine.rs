use std::{
    rc::Rc,
    sync::{
        Arc,
        mpsc::{self, Receiver, RecvTimeoutError, Sender},
    },
    time::{Duration, Instant},
};

use serde_json::Value;

use crate::{
    clock,
    core::{
        events::SessionEvent,
        room_session::RoomSession,
        session_config::SessionConfig,
        session_error::SessionError,
        timers::{Timer, TimerKind, TimerQueue},
    },
    event_bus::{BusEvent, EventBus, RemoteStreamView},
    log::LogSink,
    media::{
        DeviceInfo, LocalMedia, MediaConstraints, MediaDevices, MediaStream, MediaTrack,
        TrackKind, sender_sync,
    },
    peer::{PeerConnectionFactory, PeerEntry, PeerRegistry, PeerState},
    signaling::{CaptionEvent, HostCommand, Participant, PeerId, SignalMsg},
    signaling_client::{Connector, SignalingTransport, signaling_url},
    sink_debug, sink_info, sink_trace, sink_warn,
};

/// Session controller for one meeting view.
///
/// Owns the signaling socket, the peer registry and the local media. Socket
/// frames and backend callbacks are queued from other threads and handled
/// one at a time by [`poll`](Self::poll) on the owner's thread, which also
/// fires the engine's timers. Consumers observe everything through
/// [`bus`](Self::bus).
pub struct Engine {
    pub(super) config: SessionConfig,
    pub(super) factory: Rc<dyn PeerConnectionFactory>,
    pub(super) connector: Arc<dyn Connector>,
    pub(super) local_media: LocalMedia,
    pub(super) bus: EventBus,
    pub(super) session: Option<RoomSession>,
    pub(super) timers: TimerQueue,
    pub(super) events_tx: Sender<SessionEvent>,
    events_rx: Receiver<SessionEvent>,
    next_epoch: u64,
    next_link_id: u64,
    pub(super) log: Arc<dyn LogSink>,
}

impl Engine {
    pub fn new(
        config: SessionConfig,
        factory: Rc<dyn PeerConnectionFactory>,
        devices: Box<dyn MediaDevices>,
        connector: Arc<dyn Connector>,
        log: Arc<dyn LogSink>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        let local_media = LocalMedia::new(devices, config.default_constraints.clone(), log.clone());
        Self {
            config,
            factory,
            connector,
            local_media,
            bus: EventBus::new(log.clone()),
            session: None,
            timers: TimerQueue::default(),
            events_tx,
            events_rx,
            next_epoch: 0,
            next_link_id: 0,
            log,
        }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    // ---- session control ----

    /// Joins `room_id` as `name`, leaving any current room first.
    ///
    /// Returns once the socket thread is started; `ws-open`, `assign-id` and
    /// `participants` follow through the bus as [`poll`](Self::poll) runs.
    ///
    /// # Errors
    /// Invalid room id or signaling URL, or the socket thread could not be
    /// started. No session is left behind.
    pub fn connect(&mut self, room_id: &str, name: &str) -> Result<(), SessionError> {
        self.disconnect();

        let url = signaling_url(&self.config.signaling, room_id)?;
        let intro = SignalMsg::Introduce {
            name: name.to_owned(),
            room_id: room_id.to_owned(),
        }
        .encode()?;

        self.next_epoch += 1;
        let epoch = self.next_epoch;
        let transport = self.open_transport(url, intro)?;
        let peers = PeerRegistry::new(
            self.factory.clone(),
            self.config.ice_servers.clone(),
            self.events_tx.clone(),
            epoch,
            self.log.clone(),
        );
        sink_info!(
            self.log,
            "[session] joining room {room_id} as {name} (epoch {epoch}, link {})",
            transport.link_id()
        );
        self.session = Some(RoomSession::new(epoch, room_id, name, transport, peers));
        Ok(())
    }

    /// Leaves the room: closes every peer connection, sends `leave` and
    /// closes the socket. Local media is kept. A no-op without a session.
    pub fn disconnect(&mut self) {
        self.timers.clear();
        let Some(mut session) = self.session.take() else {
            return;
        };
        if let Some(transport) = session.transport.take() {
            transport.disconnect(Some(&SignalMsg::Leave {
                room_id: session.room_id.clone(),
            }));
        }
        let closed = session.peers.len();
        session.peers.clear();
        sink_info!(
            self.log,
            "[session] left room {} (closed {closed} peer connection(s))",
            session.room_id
        );
        self.bus.emit(&BusEvent::Participants(Vec::new()));
        self.bus.emit(&BusEvent::RemoteStreams(Vec::new()));
    }

    pub(super) fn open_transport(
        &mut self,
        url: String,
        intro: String,
    ) -> Result<SignalingTransport, SessionError> {
        self.next_link_id += 1;
        let transport = SignalingTransport::open(
            self.connector.clone(),
            url,
            intro,
            self.events_tx.clone(),
            self.next_link_id,
            self.log.clone(),
        )?;
        Ok(transport)
    }

    // ---- event loop ----

    /// Handles every queued event, then every due timer. Returns how many
    /// were handled.
    pub fn poll(&mut self) -> usize {
        self.poll_at(Instant::now())
    }

    /// [`poll`](Self::poll) with an explicit clock, for driving timers.
    pub fn poll_at(&mut self, now: Instant) -> usize {
        let mut handled = 0;
        while let Ok(ev) = self.events_rx.try_recv() {
            self.dispatch(ev, now);
            handled += 1;
        }
        while let Some(timer) = self.timers.pop_due(now) {
            self.fire_timer(timer, now);
            handled += 1;
        }
        handled
    }

    /// Blocks until an event arrives, a timer is due or `max_wait` passes,
    /// then polls.
    pub fn wait_and_poll(&mut self, max_wait: Duration) -> usize {
        let now = Instant::now();
        let wait = self
            .timers
            .next_deadline()
            .map_or(max_wait, |at| at.saturating_duration_since(now).min(max_wait));
        match self.events_rx.recv_timeout(wait) {
            Ok(ev) => {
                self.dispatch(ev, Instant::now());
                1 + self.poll()
            }
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => self.poll(),
        }
    }

    /// Earliest pending timer, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    fn dispatch(&mut self, ev: SessionEvent, now: Instant) {
        match ev {
            SessionEvent::Transport { link_id, event } => {
                self.on_transport_event(link_id, event, now);
            }
            SessionEvent::Peer {
                epoch,
                peer_id,
                conn_id,
                event,
            } => self.on_peer_event(epoch, &peer_id, conn_id, event, now),
        }
    }

    fn fire_timer(&mut self, timer: Timer, now: Instant) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.epoch != timer.epoch {
            sink_trace!(self.log, "[session] dropped stale timer {:?}", timer.kind);
            return;
        }
        match timer.kind {
            TimerKind::StaggeredOffer { peer_id } => {
                session.offer_scheduled.remove(&peer_id);
                let handled = session
                    .peers
                    .get(&peer_id)
                    .is_some_and(|e| !e.awaiting_offer());
                if !session.in_roster(&peer_id) || handled {
                    return;
                }
                if let Err(e) = self.offer_at(&peer_id, now) {
                    sink_warn!(self.log, "[peer {peer_id}] offer failed: {e}");
                }
            }
            TimerKind::GraceTeardown {
                peer_id,
                conn_id,
                due,
            } => {
                let Some(entry) = session.peers.get_mut(&peer_id) else {
                    return;
                };
                // A recovery disarms the pending deadline; a later drop arms a new one.
                if entry.conn_id != conn_id || entry.teardown_at != Some(due) {
                    sink_trace!(self.log, "[peer {peer_id}] dropped superseded grace timer");
                    return;
                }
                entry.teardown_at = None;
                let state = entry.connection.connection_state();
                if !state.is_down() {
                    sink_debug!(self.log, "[peer {peer_id}] recovered ({state}); keeping it");
                    return;
                }
                self.teardown_peer(&peer_id, "connection lost");
            }
            TimerKind::NegotiationTimeout { peer_id, conn_id } => {
                let Some(entry) = session.peers.get(&peer_id) else {
                    return;
                };
                if entry.conn_id != conn_id
                    || !matches!(entry.state, PeerState::New | PeerState::Negotiating)
                {
                    return;
                }
                let retry = session.in_roster(&peer_id) && session.is_designated_offerer(&peer_id);
                sink_warn!(self.log, "[peer {peer_id}] negotiation timed out");
                self.teardown_peer(&peer_id, "negotiation timed out");
                if retry {
                    self.schedule_offer(&peer_id, now);
                }
            }
            TimerKind::Reconnect { attempt } => self.reconnect(attempt, now),
        }
    }

    fn reconnect(&mut self, attempt: u32, now: Instant) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        if session.transport.is_some() {
            return;
        }
        let room_id = session.room_id.clone();
        let name = session.name.clone();
        sink_info!(self.log, "[signaling] reconnect attempt {attempt} to room {room_id}");

        let opened = signaling_url(&self.config.signaling, &room_id)
            .map_err(SessionError::from)
            .and_then(|url| {
                let intro = SignalMsg::Introduce {
                    name,
                    room_id: room_id.clone(),
                }
                .encode()?;
                self.open_transport(url, intro)
            });
        match opened {
            Ok(transport) => {
                if let Some(session) = self.session.as_mut() {
                    session.link_id = transport.link_id();
                    session.transport = Some(transport);
                }
            }
            Err(e) => {
                sink_warn!(self.log, "[signaling] reconnect attempt {attempt} failed: {e}");
                self.bus.emit(&BusEvent::WsError(e.to_string()));
                self.schedule_reconnect(now);
            }
        }
    }

    /// Arms the next reconnect per policy, if any attempts are left.
    pub(super) fn schedule_reconnect(&mut self, now: Instant) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let attempt = session.reconnect_attempts;
        match self.config.reconnect.next_delay(attempt) {
            Some(delay) => {
                session.reconnect_attempts += 1;
                sink_info!(
                    self.log,
                    "[signaling] reconnecting in {} ms (attempt {})",
                    delay.as_millis(),
                    attempt + 1
                );
                self.timers.schedule(
                    now + delay,
                    Timer {
                        epoch: session.epoch,
                        kind: TimerKind::Reconnect {
                            attempt: attempt + 1,
                        },
                    },
                );
            }
            None => sink_info!(self.log, "[signaling] socket closed; not reconnecting"),
        }
    }

    // ---- local media ----

    /// Opens camera and microphone (retrying relaxed on failure) and feeds
    /// the tracks to every peer, replacing existing senders.
    ///
    /// # Errors
    /// [`SessionError::Media`] when even the relaxed request fails.
    pub fn start_local_media(
        &mut self,
        constraints: Option<MediaConstraints>,
    ) -> Result<MediaStream, SessionError> {
        let stream = self.local_media.acquire(constraints.as_ref())?.clone();
        if let Some(session) = self.session.as_mut() {
            sender_sync::propagate_stream(&mut session.peers, &stream, &self.log);
        }
        self.emit_local_media();
        Ok(stream)
    }

    /// Stops every local track and silences every sender.
    pub fn stop_local_media(&mut self) {
        if !self.local_media.stop() {
            return;
        }
        if let Some(session) = self.session.as_mut() {
            for kind in [TrackKind::Video, TrackKind::Audio] {
                sender_sync::propagate_track(&mut session.peers, kind, None, "", &self.log);
            }
        }
        self.emit_local_media();
    }

    /// Returns the new `enabled` flag, `None` without a video track.
    pub fn toggle_video(&mut self) -> Option<bool> {
        let now = self.local_media.toggle_video();
        if now.is_some() {
            self.emit_local_media();
        }
        now
    }

    pub fn toggle_audio(&mut self) -> Option<bool> {
        let now = self.local_media.toggle_audio();
        if now.is_some() {
            self.emit_local_media();
        }
        now
    }

    /// Switches the camera to `device_id` on every connection.
    ///
    /// # Errors
    /// [`SessionError::Media`]; the previous camera stays in place.
    pub fn select_device(&mut self, device_id: &str) -> Result<(), SessionError> {
        let track = self.local_media.select_device(device_id)?;
        self.propagate_video(Some(&track));
        self.emit_local_media();
        Ok(())
    }

    /// # Errors
    /// [`SessionError::Media`] when display capture is refused.
    pub fn start_screen_share(&mut self) -> Result<(), SessionError> {
        let screen = self.local_media.start_screen_share()?;
        self.propagate_video(Some(&screen));
        self.emit_local_media();
        Ok(())
    }

    /// Restores the camera on every connection. No-op when not sharing.
    pub fn stop_screen_share(&mut self) {
        let Some(camera) = self.local_media.stop_screen_share() else {
            return;
        };
        self.propagate_video(camera.as_ref());
        self.emit_local_media();
    }

    fn propagate_video(&mut self, track: Option<&MediaTrack>) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let stream_id = self
            .local_media
            .stream()
            .map(|s| s.id().to_owned())
            .unwrap_or_default();
        sender_sync::propagate_track(
            &mut session.peers,
            TrackKind::Video,
            track,
            &stream_id,
            &self.log,
        );
    }

    pub(super) fn emit_local_media(&self) {
        self.bus
            .emit(&BusEvent::LocalMediaUpdated(self.local_media.snapshot()));
    }

    pub fn local_media(&self) -> &LocalMedia {
        &self.local_media
    }

    pub fn enumerate_devices(&self) -> Vec<DeviceInfo> {
        self.local_media.enumerate_devices()
    }

    // ---- messaging ----

    /// Broadcasts a chat payload through signaling. Fire-and-forget.
    pub fn send_chat(&self, payload: Value) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.send(&SignalMsg::ChatMessage(payload)))
    }

    /// Relays a caption over every open data channel, and through signaling
    /// as well when some peer has no open channel.
    ///
    /// # Errors
    /// [`SessionError::NotConnected`] without a session.
    pub fn send_caption(
        &mut self,
        text: &str,
        is_final: bool,
        translations: Option<Value>,
    ) -> Result<CaptionEvent, SessionError> {
        let session = self.session.as_mut().ok_or(SessionError::NotConnected)?;
        let caption = CaptionEvent {
            text: text.to_owned(),
            from: session
                .local_id
                .clone()
                .unwrap_or_else(|| session.name.clone()),
            time: clock::now_millis(),
            is_final,
            translations,
        };
        let payload = caption.to_chat_payload()?;
        let wire = payload.to_string();

        let mut needs_broadcast = session.peers.is_empty();
        for entry in session.peers.all_mut() {
            let mut sent = false;
            if entry.dc_open {
                if let Some(dc) = entry.data_channel.as_mut() {
                    match dc.send_text(&wire) {
                        Ok(()) => sent = true,
                        Err(e) => sink_debug!(
                            self.log,
                            "[peer {}] caption over channel failed: {e}",
                            entry.peer_id
                        ),
                    }
                }
            }
            needs_broadcast |= !sent;
        }
        if needs_broadcast {
            session.send(&SignalMsg::ChatMessage(payload));
        }
        Ok(caption)
    }

    /// Sends a host command, stamped with our id when it has no sender.
    pub fn send_host_command(&self, command: HostCommand) -> bool {
        let Some(session) = self.session.as_ref() else {
            return false;
        };
        let command = match session.local_id.as_deref() {
            Some(me) => command.with_sender(me),
            None => command,
        };
        session.send(&SignalMsg::HostCommand(command))
    }

    // ---- accessors ----

    pub fn local_id(&self) -> Option<&str> {
        self.session.as_ref()?.local_id.as_deref()
    }

    pub fn room_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.room_id.as_str())
    }

    /// A room session exists, whether or not its socket is up right now.
    pub fn in_session(&self) -> bool {
        self.session.is_some()
    }

    /// The signaling socket is open.
    pub fn is_connected(&self) -> bool {
        self.session
            .as_ref()
            .and_then(|s| s.transport.as_ref())
            .is_some_and(SignalingTransport::is_open)
    }

    pub fn peer_ids(&self) -> Vec<PeerId> {
        self.session
            .as_ref()
            .map(|s| s.peers.ids())
            .unwrap_or_default()
    }

    pub fn peer(&self, peer_id: &str) -> Option<&PeerEntry> {
        self.session.as_ref()?.peers.get(peer_id)
    }

    pub fn roster(&self) -> &[Participant] {
        self.session
            .as_ref()
            .map(|s| s.roster.as_slice())
            .unwrap_or_default()
    }

    pub fn remote_streams(&self) -> Vec<RemoteStreamView> {
        self.session
            .as_ref()
            .map(RoomSession::remote_streams)
            .unwrap_or_default()
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.disconnect();
    }
}
