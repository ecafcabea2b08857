//! Keeps every peer connection's outgoing senders in step with local media.
//!
//! The rule everywhere: replace the track of an existing sender of the same
//! kind, add a sender only when none of that kind exists. The number of
//! senders per connection never changes because a track was swapped, so no
//! renegotiation is needed mid-call.
use std::sync::Arc;

use crate::{
    log::LogSink,
    media::{MediaStream, MediaTrack, TrackKind},
    peer::{PeerConnection, PeerError, PeerRegistry},
    sink_warn,
};

/// Attaches every track of `stream` to `pc` following the replace-first rule.
///
/// # Errors
/// The first backend failure; earlier tracks stay attached.
pub fn attach_stream(pc: &mut dyn PeerConnection, stream: &MediaStream) -> Result<(), PeerError> {
    for track in stream.tracks() {
        set_outgoing(pc, track.kind(), Some(track), stream.id())?;
    }
    Ok(())
}

/// Points the sender of `kind` at `track` (or silences it with `None`).
///
/// With `None` and no sender of that kind nothing happens.
///
/// # Errors
/// Backend failure from `replace_track` or `add_track`.
pub fn set_outgoing(
    pc: &mut dyn PeerConnection,
    kind: TrackKind,
    track: Option<&MediaTrack>,
    stream_id: &str,
) -> Result<(), PeerError> {
    let existing = pc.senders().into_iter().find(|s| s.kind == kind);
    match (existing, track) {
        (Some(sender), Some(t)) if sender.track_id.as_deref() == Some(t.id()) => Ok(()),
        (Some(sender), t) => pc.replace_track(sender.id, t),
        (None, Some(t)) => pc.add_track(t, stream_id).map(|_| ()),
        (None, None) => Ok(()),
    }
}

/// Applies [`set_outgoing`] on every peer. A failing peer is logged and
/// skipped; returns how many failed.
pub fn propagate_track(
    peers: &mut PeerRegistry,
    kind: TrackKind,
    track: Option<&MediaTrack>,
    stream_id: &str,
    log: &Arc<dyn LogSink>,
) -> usize {
    let mut failures = 0;
    for entry in peers.all_mut() {
        if let Err(e) = set_outgoing(entry.connection_mut(), kind, track, stream_id) {
            failures += 1;
            sink_warn!(
                log,
                "[media] could not update {kind} sender for {}: {e}",
                entry.peer_id()
            );
        }
    }
    failures
}

/// Applies [`attach_stream`] on every peer. Returns how many failed.
pub fn propagate_stream(
    peers: &mut PeerRegistry,
    stream: &MediaStream,
    log: &Arc<dyn LogSink>,
) -> usize {
    let mut failures = 0;
    for entry in peers.all_mut() {
        if let Err(e) = attach_stream(entry.connection_mut(), stream) {
            failures += 1;
            sink_warn!(
                log,
                "[media] could not attach local media for {}: {e}",
                entry.peer_id()
            );
        }
    }
    failures
}
