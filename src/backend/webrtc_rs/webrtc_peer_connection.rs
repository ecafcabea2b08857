use std::sync::Arc;

use tokio::runtime::Runtime;
use webrtc::{
    data_channel::{RTCDataChannel, data_channel_init::RTCDataChannelInit},
    ice_transport::ice_candidate::RTCIceCandidate,
    peer_connection::{RTCPeerConnection, peer_connection_state::RTCPeerConnectionState},
    rtp_transceiver::{
        RTCRtpTransceiver, rtp_receiver::RTCRtpReceiver, rtp_sender::RTCRtpSender,
    },
    track::track_remote::TrackRemote,
};

use crate::{
    backend::webrtc_rs::{convert, webrtc_data_channel::WebRtcDataChannel},
    log::LogSink,
    media::{MediaTrack, TrackSource},
    peer::{
        DataChannel, PeerConnection, PeerConnectionState, PeerError, PeerEvent, PeerEventSender,
        RtpSenderInfo, SenderId,
    },
    signaling::{IceCandidate, SessionDescription},
    sink_warn,
};

struct Sender {
    info: RtpSenderInfo,
    rtp: Arc<RTCRtpSender>,
    stream_id: String,
}

/// [`PeerConnection`] over an `RTCPeerConnection`, driven synchronously on
/// the factory's runtime.
pub struct WebRtcPeerConnection {
    pc: Arc<RTCPeerConnection>,
    rt: Arc<Runtime>,
    events: PeerEventSender,
    senders: Vec<Sender>,
    next_sender: u32,
    remote_set: bool,
    closed: bool,
}

impl WebRtcPeerConnection {
    pub(crate) fn new(
        pc: Arc<RTCPeerConnection>,
        rt: Arc<Runtime>,
        events: PeerEventSender,
        log: Arc<dyn LogSink>,
    ) -> Self {
        Self::wire(&pc, &rt, &events, log);
        Self {
            pc,
            rt,
            events,
            senders: Vec::new(),
            next_sender: 0,
            remote_set: false,
            closed: false,
        }
    }

    fn wire(pc: &RTCPeerConnection, rt: &Runtime, events: &PeerEventSender, log: Arc<dyn LogSink>) {
        let tx = events.clone();
        let candidate_log = log.clone();
        pc.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            // `None` marks the end of gathering.
            if let Some(c) = c {
                match convert::from_rtc_candidate(&c) {
                    Ok(candidate) => {
                        tx.send(PeerEvent::IceCandidate(candidate));
                    }
                    Err(e) => sink_warn!(candidate_log, "[peer {}] {e}", tx.peer_id()),
                }
            }
            Box::pin(async {})
        }));

        let tx = events.clone();
        pc.on_peer_connection_state_change(Box::new(move |s: RTCPeerConnectionState| {
            tx.send(PeerEvent::StateChanged(convert::connection_state(s)));
            Box::pin(async {})
        }));

        let tx = events.clone();
        pc.on_track(Box::new(
            move |track: Arc<TrackRemote>, _: Arc<RTCRtpReceiver>, _: Arc<RTCRtpTransceiver>| {
                match convert::track_kind(track.kind()) {
                    Some(kind) => {
                        let label = format!("{kind} from {}", tx.peer_id());
                        tx.send(PeerEvent::Track(MediaTrack::with_id(
                            track.id(),
                            kind,
                            TrackSource::Remote,
                            label,
                            None,
                        )));
                    }
                    None => sink_warn!(log, "[peer {}] track of unknown kind", tx.peer_id()),
                }
                Box::pin(async {})
            },
        ));

        let tx = events.clone();
        let handle = rt.handle().clone();
        pc.on_data_channel(Box::new(move |dc: Arc<RTCDataChannel>| {
            let channel = WebRtcDataChannel::wire(dc, handle.clone(), &tx);
            tx.send(PeerEvent::DataChannel(Box::new(channel)));
            Box::pin(async {})
        }));
    }

    fn sender_mut(&mut self, id: SenderId) -> Result<&mut Sender, PeerError> {
        self.senders
            .iter_mut()
            .find(|s| s.info.id == id)
            .ok_or(PeerError::UnknownSender(id.0))
    }

    fn ensure_open(&self) -> Result<(), PeerError> {
        if self.closed {
            Err(PeerError::Closed)
        } else {
            Ok(())
        }
    }
}

impl PeerConnection for WebRtcPeerConnection {
    fn create_offer(&mut self) -> Result<SessionDescription, PeerError> {
        self.ensure_open()?;
        let offer = self
            .rt
            .block_on(self.pc.create_offer(None))
            .map_err(|e| PeerError::backend("create_offer", e))?;
        convert::from_rtc_description(offer)
    }

    fn create_answer(&mut self) -> Result<SessionDescription, PeerError> {
        self.ensure_open()?;
        let answer = self
            .rt
            .block_on(self.pc.create_answer(None))
            .map_err(|e| PeerError::backend("create_answer", e))?;
        convert::from_rtc_description(answer)
    }

    fn set_local_description(&mut self, desc: &SessionDescription) -> Result<(), PeerError> {
        self.ensure_open()?;
        let desc = convert::to_rtc_description(desc)?;
        self.rt
            .block_on(self.pc.set_local_description(desc))
            .map_err(|e| PeerError::backend("set_local_description", e))
    }

    fn set_remote_description(&mut self, desc: &SessionDescription) -> Result<(), PeerError> {
        self.ensure_open()?;
        let desc = convert::to_rtc_description(desc)?;
        self.rt
            .block_on(self.pc.set_remote_description(desc))
            .map_err(|e| PeerError::backend("set_remote_description", e))?;
        self.remote_set = true;
        Ok(())
    }

    fn has_remote_description(&self) -> bool {
        self.remote_set
    }

    fn add_ice_candidate(&mut self, candidate: &IceCandidate) -> Result<(), PeerError> {
        self.ensure_open()?;
        self.rt
            .block_on(self.pc.add_ice_candidate(convert::to_rtc_candidate(candidate)))
            .map_err(|e| PeerError::backend("add_ice_candidate", e))
    }

    fn add_track(&mut self, track: &MediaTrack, stream_id: &str) -> Result<SenderId, PeerError> {
        self.ensure_open()?;
        let rtp = self
            .rt
            .block_on(self.pc.add_track(convert::local_track(track, stream_id)))
            .map_err(|e| PeerError::backend("add_track", e))?;
        let id = SenderId(self.next_sender);
        self.next_sender += 1;
        self.senders.push(Sender {
            info: RtpSenderInfo {
                id,
                kind: track.kind(),
                track_id: Some(track.id().to_owned()),
            },
            rtp,
            stream_id: stream_id.to_owned(),
        });
        Ok(id)
    }

    fn senders(&self) -> Vec<RtpSenderInfo> {
        self.senders.iter().map(|s| s.info.clone()).collect()
    }

    fn replace_track(
        &mut self,
        sender: SenderId,
        track: Option<&MediaTrack>,
    ) -> Result<(), PeerError> {
        self.ensure_open()?;
        let rt = self.rt.clone();
        let s = self.sender_mut(sender)?;
        if let Some(t) = track {
            if t.kind() != s.info.kind {
                return Err(PeerError::backend(
                    "replace_track",
                    format!("cannot put a {} track on a {} sender", t.kind(), s.info.kind),
                ));
            }
        }
        let local = track.map(|t| convert::local_track(t, &s.stream_id));
        rt.block_on(s.rtp.replace_track(local))
            .map_err(|e| PeerError::backend("replace_track", e))?;
        s.info.track_id = track.map(|t| t.id().to_owned());
        Ok(())
    }

    fn create_data_channel(
        &mut self,
        label: &str,
        ordered: bool,
    ) -> Result<Box<dyn DataChannel>, PeerError> {
        self.ensure_open()?;
        let init = RTCDataChannelInit {
            ordered: Some(ordered),
            ..Default::default()
        };
        let dc = self
            .rt
            .block_on(self.pc.create_data_channel(label, Some(init)))
            .map_err(|e| PeerError::backend("create_data_channel", e))?;
        Ok(Box::new(WebRtcDataChannel::wire(
            dc,
            self.rt.handle().clone(),
            &self.events,
        )))
    }

    fn connection_state(&self) -> PeerConnectionState {
        if self.closed {
            return PeerConnectionState::Closed;
        }
        convert::connection_state(self.pc.connection_state())
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let _ = self.rt.block_on(self.pc.close());
    }
}

impl Drop for WebRtcPeerConnection {
    fn drop(&mut self) {
        self.close();
    }
}
