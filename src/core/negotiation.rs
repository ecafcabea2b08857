//! Offer/answer/candidate exchange for one peer at a time.
//!
//! The lower participant id of a pair is the offerer. When both sides offer
//! anyway (glare), the lower id keeps its offer and ignores the inbound one;
//! the higher id drops its own attempt and answers.
use std::{
    collections::VecDeque,
    sync::Arc,
    time::{Duration, Instant},
};

use rand::Rng;

use crate::{
    core::{
        engine::Engine,
        session_error::SessionError,
        timers::{Timer, TimerKind},
    },
    event_bus::BusEvent,
    log::LogSink,
    media::{MediaStream, sender_sync},
    peer::{CAPTION_CHANNEL_LABEL, NegotiationRole, PeerEntry, PeerError, PeerState},
    signaling::{IceCandidate, SessionDescription, SignalMsg, SignalPayload},
    sink_debug, sink_info, sink_trace, sink_warn,
};

/// Data channel, local tracks, offer, local description.
fn prepare_offer(
    entry: &mut PeerEntry,
    local: Option<&MediaStream>,
) -> Result<SessionDescription, PeerError> {
    if entry.data_channel.is_none() {
        let dc = entry
            .connection
            .create_data_channel(CAPTION_CHANNEL_LABEL, true)?;
        entry.data_channel = Some(dc);
    }
    if let Some(stream) = local {
        sender_sync::attach_stream(entry.connection.as_mut(), stream)?;
    }
    let offer = entry.connection.create_offer()?;
    entry.connection.set_local_description(&offer)?;
    Ok(offer)
}

/// Local tracks, remote offer, answer, local description.
fn prepare_answer(
    entry: &mut PeerEntry,
    local: Option<&MediaStream>,
    sdp: String,
) -> Result<SessionDescription, PeerError> {
    if let Some(stream) = local {
        sender_sync::attach_stream(entry.connection.as_mut(), stream)?;
    }
    entry
        .connection
        .set_remote_description(&SessionDescription::offer(sdp))?;
    let answer = entry.connection.create_answer()?;
    entry.connection.set_local_description(&answer)?;
    Ok(answer)
}

/// Applies queued candidates in arrival order. A rejected candidate is
/// logged and skipped.
fn flush_candidates(entry: &mut PeerEntry, log: &Arc<dyn LogSink>) {
    let queued = entry.pending_candidates.len();
    while let Some(candidate) = entry.pending_candidates.pop_front() {
        if let Err(e) = entry.connection.add_ice_candidate(&candidate) {
            sink_warn!(log, "[peer {}] queued candidate rejected: {e}", entry.peer_id);
        }
    }
    if queued > 0 {
        sink_debug!(log, "[peer {}] flushed {queued} queued candidate(s)", entry.peer_id);
    }
}

impl Engine {
    /// Starts negotiation towards `peer_id` as the offerer.
    ///
    /// Does nothing for our own id or for a peer that is already
    /// negotiating or connected.
    ///
    /// # Errors
    /// [`SessionError::NotConnected`] without a session; [`SessionError::Peer`]
    /// when the backend fails, in which case the peer has been torn down.
    pub fn make_offer(&mut self, peer_id: &str) -> Result<(), SessionError> {
        self.offer_at(peer_id, Instant::now())
    }

    pub(super) fn offer_at(&mut self, peer_id: &str, now: Instant) -> Result<(), SessionError> {
        let session = self.session.as_mut().ok_or(SessionError::NotConnected)?;
        if session.is_local(peer_id) {
            return Ok(());
        }
        let opts = session.peer_options(peer_id);
        let (entry, _) = session
            .peers
            .get_or_create(peer_id, &opts)
            .map_err(|source| SessionError::Peer {
                peer_id: peer_id.to_owned(),
                source,
            })?;
        if entry.state != PeerState::New {
            sink_debug!(
                self.log,
                "[peer {peer_id}] not offering, already {:?}",
                entry.state
            );
            return Ok(());
        }

        match prepare_offer(entry, self.local_media.stream()) {
            Ok(offer) => {
                entry.state = PeerState::Negotiating;
                entry.role = Some(NegotiationRole::Offerer);
                let conn_id = entry.conn_id;
                let epoch = session.epoch;
                let signal = SignalPayload::to_peer(peer_id, session.local_id.as_deref(), offer.into());
                session.send(&SignalMsg::Signal(signal));
                sink_info!(self.log, "[peer {peer_id}] offer sent (connection #{conn_id})");
                self.arm_negotiation_timeout(epoch, peer_id, conn_id, now);
                Ok(())
            }
            Err(source) => {
                sink_warn!(self.log, "[peer {peer_id}] could not create offer: {source}");
                self.teardown_peer(peer_id, "offer failed");
                Err(SessionError::Peer {
                    peer_id: peer_id.to_owned(),
                    source,
                })
            }
        }
    }

    pub(super) fn on_offer(&mut self, from: &str, sdp: String, now: Instant) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.is_local(from) {
            return;
        }

        let we_offer = session.is_designated_offerer(from);
        let mut carried = VecDeque::new();
        if let Some(entry) = session.peers.get_mut(from) {
            match (entry.state, entry.role) {
                (PeerState::Connected, _)
                | (PeerState::Negotiating, Some(NegotiationRole::Answerer)) => {
                    sink_debug!(self.log, "[peer {from}] ignoring offer while {:?}", entry.state);
                    return;
                }
                (PeerState::Negotiating, Some(NegotiationRole::Offerer))
                    if entry.connection.has_remote_description() =>
                {
                    sink_debug!(self.log, "[peer {from}] ignoring offer, our offer was answered");
                    return;
                }
                (PeerState::Negotiating, Some(NegotiationRole::Offerer)) => {
                    if we_offer {
                        sink_debug!(self.log, "[peer {from}] glare: keeping our offer");
                        return;
                    }
                    sink_info!(self.log, "[peer {from}] glare: yielding to their offer");
                    carried = std::mem::take(&mut entry.pending_candidates);
                    session.peers.remove(from);
                }
                _ => {}
            }
        }

        let opts = session.peer_options(from);
        let entry = match session.peers.get_or_create(from, &opts) {
            Ok((entry, _)) => entry,
            Err(e) => {
                sink_warn!(self.log, "[peer {from}] could not create connection: {e}");
                return;
            }
        };
        if !carried.is_empty() {
            carried.append(&mut entry.pending_candidates);
            entry.pending_candidates = carried;
        }

        match prepare_answer(entry, self.local_media.stream(), sdp) {
            Ok(answer) => {
                entry.state = PeerState::Negotiating;
                entry.role = Some(NegotiationRole::Answerer);
                let conn_id = entry.conn_id;
                let epoch = session.epoch;
                let signal = SignalPayload::to_peer(from, session.local_id.as_deref(), answer.into());
                session.send(&SignalMsg::Signal(signal));
                sink_info!(self.log, "[peer {from}] answer sent (connection #{conn_id})");
                if let Some(entry) = session.peers.get_mut(from) {
                    flush_candidates(entry, &self.log);
                }
                self.arm_negotiation_timeout(epoch, from, conn_id, now);
            }
            Err(e) => {
                sink_warn!(self.log, "[peer {from}] could not answer: {e}");
                self.teardown_peer(from, "answer failed");
            }
        }
    }

    pub(super) fn on_answer(&mut self, from: &str, sdp: String) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(entry) = session.peers.get_mut(from) else {
            sink_debug!(self.log, "[peer {from}] answer for unknown peer dropped");
            return;
        };
        if entry.role != Some(NegotiationRole::Offerer) || entry.connection.has_remote_description()
        {
            sink_debug!(self.log, "[peer {from}] unexpected answer dropped");
            return;
        }
        match entry
            .connection
            .set_remote_description(&SessionDescription::answer(sdp))
        {
            Ok(()) => {
                sink_debug!(self.log, "[peer {from}] answer applied");
                flush_candidates(entry, &self.log);
            }
            Err(e) => {
                sink_warn!(self.log, "[peer {from}] bad answer: {e}");
                self.teardown_peer(from, "answer rejected");
            }
        }
    }

    /// Adds the candidate now if the remote description is set, otherwise
    /// queues it behind the ones already waiting.
    pub(super) fn on_candidate(&mut self, from: &str, candidate: IceCandidate, now: Instant) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.is_local(from) {
            return;
        }
        let opts = session.peer_options(from);
        let (entry, created) = match session.peers.get_or_create(from, &opts) {
            Ok(found) => found,
            Err(e) => {
                sink_warn!(self.log, "[peer {from}] could not create connection: {e}");
                return;
            }
        };
        if entry.connection.has_remote_description() {
            if let Err(e) = entry.connection.add_ice_candidate(&candidate) {
                sink_warn!(self.log, "[peer {from}] candidate rejected: {e}");
            }
        } else {
            entry.pending_candidates.push_back(candidate);
            sink_trace!(
                self.log,
                "[peer {from}] candidate queued ({} waiting)",
                entry.pending_candidates.len()
            );
        }
        if created {
            let (epoch, conn_id) = (session.epoch, entry.conn_id);
            self.arm_negotiation_timeout(epoch, from, conn_id, now);
        }
    }

    /// Closes and forgets the peer, then refreshes roster consumers.
    pub(super) fn teardown_peer(&mut self, peer_id: &str, reason: &str) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if !session.peers.remove(peer_id) {
            return false;
        }
        sink_info!(self.log, "[peer {peer_id}] closed: {reason}");
        self.emit_peer_refresh();
        true
    }

    /// `participants` followed by `remote-streams`.
    pub(super) fn emit_peer_refresh(&self) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        self.bus
            .emit(&BusEvent::Participants(session.roster.clone()));
        self.bus
            .emit(&BusEvent::RemoteStreams(session.remote_streams()));
    }

    fn arm_negotiation_timeout(&mut self, epoch: u64, peer_id: &str, conn_id: u64, now: Instant) {
        let Some(timeout) = self.config.negotiation_timeout else {
            return;
        };
        self.timers.schedule(
            now + timeout,
            Timer {
                epoch,
                kind: TimerKind::NegotiationTimeout {
                    peer_id: peer_id.to_owned(),
                    conn_id,
                },
            },
        );
    }

    /// Arms a staggered offer unless one is already pending.
    pub(super) fn schedule_offer(&mut self, peer_id: &str, now: Instant) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if !session.offer_scheduled.insert(peer_id.to_owned()) {
            return;
        }
        let max_ms = u64::try_from(self.config.offer_stagger_max.as_millis()).unwrap_or(u64::MAX);
        let delay = if max_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
        };
        sink_debug!(self.log, "[peer {peer_id}] offer in {} ms", delay.as_millis());
        self.timers.schedule(
            now + delay,
            Timer {
                epoch: session.epoch,
                kind: TimerKind::StaggeredOffer {
                    peer_id: peer_id.to_owned(),
                },
            },
        );
    }
}
