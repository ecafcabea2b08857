use std::sync::Arc;

use webrtc::{
    api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8},
    ice_transport::{
        ice_candidate::{RTCIceCandidate, RTCIceCandidateInit},
        ice_server::RTCIceServer,
    },
    peer_connection::{
        peer_connection_state::RTCPeerConnectionState,
        sdp::{sdp_type::RTCSdpType, session_description::RTCSessionDescription},
    },
    rtp_transceiver::rtp_codec::{RTCRtpCodecCapability, RTPCodecType},
    track::track_local::{TrackLocal, track_local_static_sample::TrackLocalStaticSample},
};

use crate::{
    media::{MediaTrack, TrackKind},
    peer::{PeerConnectionState, PeerError},
    signaling::{IceCandidate, IceServer, SdpType, SessionDescription},
};

pub fn ice_servers(servers: &[IceServer]) -> Vec<RTCIceServer> {
    servers
        .iter()
        .map(|s| RTCIceServer {
            urls: s.urls.clone(),
            username: s.username.clone().unwrap_or_default(),
            credential: s.credential.clone().unwrap_or_default(),
            ..Default::default()
        })
        .collect()
}

pub fn connection_state(state: RTCPeerConnectionState) -> PeerConnectionState {
    match state {
        RTCPeerConnectionState::Unspecified | RTCPeerConnectionState::New => {
            PeerConnectionState::New
        }
        RTCPeerConnectionState::Connecting => PeerConnectionState::Connecting,
        RTCPeerConnectionState::Connected => PeerConnectionState::Connected,
        RTCPeerConnectionState::Disconnected => PeerConnectionState::Disconnected,
        RTCPeerConnectionState::Failed => PeerConnectionState::Failed,
        RTCPeerConnectionState::Closed => PeerConnectionState::Closed,
    }
}

pub fn to_rtc_description(desc: &SessionDescription) -> Result<RTCSessionDescription, PeerError> {
    let parsed = match desc.sdp_type {
        SdpType::Offer => RTCSessionDescription::offer(desc.sdp.clone()),
        SdpType::Answer => RTCSessionDescription::answer(desc.sdp.clone()),
    };
    parsed.map_err(|e| PeerError::backend("parse_description", e))
}

pub fn from_rtc_description(desc: RTCSessionDescription) -> Result<SessionDescription, PeerError> {
    match desc.sdp_type {
        RTCSdpType::Offer => Ok(SessionDescription::offer(desc.sdp)),
        RTCSdpType::Answer => Ok(SessionDescription::answer(desc.sdp)),
        other => Err(PeerError::backend(
            "describe",
            format!("unsupported description type {other}"),
        )),
    }
}

pub fn to_rtc_candidate(c: &IceCandidate) -> RTCIceCandidateInit {
    RTCIceCandidateInit {
        candidate: c.candidate.clone(),
        sdp_mid: c.sdp_mid.clone(),
        sdp_mline_index: c.sdp_m_line_index,
        username_fragment: c.username_fragment.clone(),
    }
}

pub fn from_rtc_candidate(c: &RTCIceCandidate) -> Result<IceCandidate, PeerError> {
    let init = c
        .to_json()
        .map_err(|e| PeerError::backend("candidate_to_json", e))?;
    Ok(IceCandidate {
        candidate: init.candidate,
        sdp_mid: init.sdp_mid,
        sdp_m_line_index: init.sdp_mline_index,
        username_fragment: init.username_fragment,
    })
}

pub fn track_kind(kind: RTPCodecType) -> Option<TrackKind> {
    match kind {
        RTPCodecType::Audio => Some(TrackKind::Audio),
        RTPCodecType::Video => Some(TrackKind::Video),
        RTPCodecType::Unspecified => None,
    }
}

/// Outgoing RTP track standing in for a local [`MediaTrack`]. Ids are kept so
/// the remote side sees the same track and stream ids.
pub fn local_track(track: &MediaTrack, stream_id: &str) -> Arc<dyn TrackLocal + Send + Sync> {
    let mime_type = match track.kind() {
        TrackKind::Audio => MIME_TYPE_OPUS,
        TrackKind::Video => MIME_TYPE_VP8,
    };
    Arc::new(TrackLocalStaticSample::new(
        RTCRtpCodecCapability {
            mime_type: mime_type.to_owned(),
            ..Default::default()
        },
        track.id().to_owned(),
        stream_id.to_owned(),
    ))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    #[test]
    fn turn_credentials_carry_over() {
        let servers = ice_servers(&[IceServer {
            urls: vec!["turn:turn.example.org:3478".into()],
            username: Some("u".into()),
            credential: Some("p".into()),
        }]);
        assert_eq!(servers[0].urls, ["turn:turn.example.org:3478"]);
        assert_eq!(servers[0].username, "u");
        assert_eq!(servers[0].credential, "p");
    }

    #[test]
    fn unspecified_state_reads_as_new() {
        assert_eq!(
            connection_state(RTCPeerConnectionState::Unspecified),
            PeerConnectionState::New
        );
        assert!(connection_state(RTCPeerConnectionState::Failed).is_down());
    }

    #[test]
    fn candidate_fields_map_one_to_one() {
        let c = IceCandidate {
            candidate: "candidate:1 1 udp 1 10.0.0.1 5000 typ host".into(),
            sdp_mid: Some("0".into()),
            sdp_m_line_index: Some(0),
            username_fragment: Some("abcd".into()),
        };
        let init = to_rtc_candidate(&c);
        assert_eq!(init.candidate, c.candidate);
        assert_eq!(init.sdp_mid.as_deref(), Some("0"));
        assert_eq!(init.sdp_mline_index, Some(0));
        assert_eq!(init.username_fragment.as_deref(), Some("abcd"));
    }
}
