//! Handling of socket frames and backend callbacks drained by the poll loop.
use std::time::Instant;

use crate::{
    core::{
        engine::Engine,
        events::TransportEvent,
        timers::{Timer, TimerKind},
    },
    event_bus::BusEvent,
    peer::{PeerConnectionState, PeerEntry, PeerEvent, PeerState},
    signaling::{HostCommand, Participant, PeerId, SignalBody, SignalMsg, SignalPayload},
    sink_debug, sink_info, sink_trace, sink_warn,
};

impl Engine {
    pub(super) fn on_transport_event(&mut self, link_id: u64, event: TransportEvent, now: Instant) {
        let Some(session) = self.session.as_mut() else {
            sink_trace!(self.log, "[signaling] link {link_id} event without a session");
            return;
        };
        if session.link_id != link_id || session.transport.is_none() {
            sink_trace!(self.log, "[signaling] dropped event from stale link {link_id}");
            return;
        }

        match event {
            TransportEvent::Open => {
                session.reconnect_attempts = 0;
                self.bus.emit(&BusEvent::WsOpen);
            }
            TransportEvent::Message(text) => match SignalMsg::decode(&text) {
                Ok(msg) => self.on_signal_msg(msg, now),
                Err(e) => sink_warn!(self.log, "[signaling] dropped malformed frame: {e}"),
            },
            TransportEvent::Error(e) => {
                sink_warn!(self.log, "[signaling] socket error: {e}");
                self.bus.emit(&BusEvent::WsError(e));
            }
            TransportEvent::Closed { reason } => {
                session.transport = None;
                sink_info!(
                    self.log,
                    "[signaling] socket closed ({})",
                    reason.as_deref().unwrap_or("no reason")
                );
                self.bus.emit(&BusEvent::WsClosed { reason });
                self.schedule_reconnect(now);
            }
        }
    }

    fn on_signal_msg(&mut self, msg: SignalMsg, now: Instant) {
        match msg {
            SignalMsg::AssignId { id } => self.on_assign_id(id, now),
            SignalMsg::Participants(list) => self.on_participants(list, now),
            SignalMsg::Signal(payload) => self.on_signal(payload, now),
            SignalMsg::ChatMessage(payload) => self.bus.emit(&BusEvent::ChatMessage(payload)),
            SignalMsg::HostCommand(cmd) => self.on_host_command(cmd),
            other @ (SignalMsg::Introduce { .. } | SignalMsg::Leave { .. }) => {
                sink_debug!(self.log, "[signaling] ignoring inbound {}", other.kind());
            }
        }
    }

    fn on_assign_id(&mut self, id: PeerId, now: Instant) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let changed = session.local_id.as_ref().is_some_and(|old| *old != id);
        if changed {
            sink_warn!(
                self.log,
                "[session] local id changed to {id}; dropping {} peer(s)",
                session.peers.len()
            );
            session.peers.clear();
            session.offer_scheduled.clear();
        } else {
            sink_info!(self.log, "[session] assigned id {id}");
        }
        session.local_id = Some(id.clone());

        self.bus.emit(&BusEvent::AssignId(id));
        if changed {
            self.emit_peer_refresh();
        }
        self.diff_roster(now);
    }

    fn on_participants(&mut self, list: Vec<Participant>, now: Instant) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.roster.clone_from(&list);
        let waiting = session.local_id.is_none();
        self.bus.emit(&BusEvent::Participants(list));
        if waiting {
            sink_debug!(self.log, "[session] roster cached until our id is assigned");
            return;
        }
        self.diff_roster(now);
    }

    /// Refreshes roster flags, tears down peers that left and schedules
    /// offers to unseen peers we are the designated offerer for.
    fn diff_roster(&mut self, now: Instant) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.local_id.is_none() {
            return;
        }

        let mut updated = false;
        for p in &session.roster {
            if let Some(entry) = session.peers.get_mut(&p.socket_id) {
                let before = (entry.display_name.clone(), entry.muted, entry.is_host);
                entry.apply_roster(p);
                updated |= before != (entry.display_name.clone(), entry.muted, entry.is_host);
            }
        }

        let gone: Vec<PeerId> = session
            .peers
            .ids()
            .into_iter()
            .filter(|id| !session.in_roster(id))
            .collect();
        let unseen: Vec<PeerId> = session
            .roster
            .iter()
            .map(|p| p.socket_id.clone())
            .filter(|id| {
                !session.is_local(id)
                    && session.peers.get(id).is_none_or(PeerEntry::awaiting_offer)
                    && session.is_designated_offerer(id)
            })
            .collect();

        for id in unseen {
            self.schedule_offer(&id, now);
        }
        let mut removed = false;
        for id in gone {
            removed |= self.teardown_peer(&id, "left the room");
        }
        if updated && !removed {
            self.emit_peer_refresh();
        }
    }

    fn on_signal(&mut self, payload: SignalPayload, now: Instant) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let Some(from) = payload.from else {
            sink_debug!(self.log, "[signaling] signal without sender dropped");
            return;
        };
        if let (Some(to), Some(me)) = (payload.to.as_deref(), session.local_id.as_deref()) {
            if to != me {
                sink_trace!(self.log, "[signaling] signal for {to} is not ours");
                return;
            }
        }
        match payload.signal {
            SignalBody::Offer { sdp } => self.on_offer(&from, sdp, now),
            SignalBody::Answer { sdp } => self.on_answer(&from, sdp),
            SignalBody::Candidate { candidate } => self.on_candidate(&from, candidate, now),
        }
    }

    fn on_host_command(&mut self, cmd: HostCommand) {
        self.bus.emit(&BusEvent::HostCommand(cmd.clone()));
        let Some(session) = self.session.as_ref() else {
            return;
        };
        match cmd {
            HostCommand::Kicked {
                target: Some(target),
            } if !session.is_local(&target) => {
                self.teardown_peer(&target, "removed by the host");
            }
            // Ours, or untargeted and therefore addressed to us alone.
            HostCommand::Kicked { .. } => {
                sink_info!(self.log, "[session] removed from the room by the host");
                self.disconnect();
            }
            HostCommand::EndMeeting { .. } => {
                sink_info!(self.log, "[session] meeting ended by the host");
                self.disconnect();
            }
            HostCommand::MuteAll { from } => {
                if from.as_deref().is_some_and(|f| session.is_local(f)) {
                    return;
                }
                if self.local_media.set_audio_enabled(false) {
                    sink_info!(self.log, "[media] muted by the host");
                    self.emit_local_media();
                }
            }
            HostCommand::Raise { .. } | HostCommand::Reaction { .. } | HostCommand::Unknown => {}
        }
    }

    pub(super) fn on_peer_event(
        &mut self,
        epoch: u64,
        peer_id: &str,
        conn_id: u64,
        event: PeerEvent,
        now: Instant,
    ) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let current = session.epoch == epoch
            && session
                .peers
                .get(peer_id)
                .is_some_and(|e| e.conn_id == conn_id);
        if !current {
            sink_trace!(self.log, "[peer {peer_id}] dropped late event from connection #{conn_id}");
            return;
        }
        let Some(entry) = session.peers.get_mut(peer_id) else {
            return;
        };

        match event {
            PeerEvent::IceCandidate(candidate) => {
                let signal = SignalPayload::to_peer(
                    peer_id,
                    session.local_id.as_deref(),
                    SignalBody::Candidate { candidate },
                );
                session.send(&SignalMsg::Signal(signal));
            }
            PeerEvent::StateChanged(state) => {
                sink_debug!(self.log, "[peer {peer_id}] connection {state}");
                match state {
                    PeerConnectionState::Connected => {
                        entry.state = PeerState::Connected;
                        entry.teardown_at = None;
                    }
                    s if s.is_down() && entry.teardown_at.is_none() => {
                        let due = now + self.config.disconnect_grace;
                        entry.teardown_at = Some(due);
                        self.timers.schedule(
                            due,
                            Timer {
                                epoch,
                                kind: TimerKind::GraceTeardown {
                                    peer_id: peer_id.to_owned(),
                                    conn_id,
                                    due,
                                },
                            },
                        );
                    }
                    _ => {}
                }
                self.bus.emit(&BusEvent::PeerState {
                    peer_id: peer_id.to_owned(),
                    state,
                });
            }
            PeerEvent::Track(track) => {
                sink_debug!(self.log, "[peer {peer_id}] inbound {} track", track.kind());
                if entry.remote_stream.add_track(track) {
                    self.bus
                        .emit(&BusEvent::RemoteStreams(session.remote_streams()));
                }
            }
            PeerEvent::DataChannel(dc) => {
                sink_debug!(self.log, "[peer {peer_id}] inbound data channel {}", dc.label());
                entry.dc_open = dc.is_open();
                if let Some(mut old) = entry.data_channel.replace(dc) {
                    old.close();
                }
            }
            PeerEvent::DataChannelOpen => {
                entry.dc_open = true;
                self.bus.emit(&BusEvent::DcOpen {
                    peer_id: peer_id.to_owned(),
                });
            }
            PeerEvent::DataChannelMessage(text) => {
                self.bus.emit(&BusEvent::DcMessage {
                    peer_id: peer_id.to_owned(),
                    text,
                });
            }
            PeerEvent::DataChannelClosed => {
                entry.dc_open = false;
                self.bus.emit(&BusEvent::DcClosed {
                    peer_id: peer_id.to_owned(),
                });
            }
        }
    }
}
