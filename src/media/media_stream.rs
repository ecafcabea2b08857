use rand::Rng;

use crate::media::media_track::{MediaTrack, TrackKind};

/// Ordered set of tracks under one stream id.
///
/// Replacing a track keeps the stream id, so anything keyed on the stream
/// keeps pointing at the same stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaStream {
    id: String,
    tracks: Vec<MediaTrack>,
}

impl MediaStream {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tracks: Vec::new(),
        }
    }

    pub fn with_random_id() -> Self {
        Self::new(format!("stream-{:08x}", rand::thread_rng().r#gen::<u32>()))
    }

    pub fn from_tracks(id: impl Into<String>, tracks: impl IntoIterator<Item = MediaTrack>) -> Self {
        let mut stream = Self::new(id);
        for t in tracks {
            stream.add_track(t);
        }
        stream
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn tracks(&self) -> &[MediaTrack] {
        &self.tracks
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn first_of_kind(&self, kind: TrackKind) -> Option<&MediaTrack> {
        self.tracks.iter().find(|t| t.kind() == kind)
    }

    pub fn video_track(&self) -> Option<&MediaTrack> {
        self.first_of_kind(TrackKind::Video)
    }

    pub fn audio_track(&self) -> Option<&MediaTrack> {
        self.first_of_kind(TrackKind::Audio)
    }

    /// Adds a track unless one with the same id is already present.
    /// Returns whether the stream changed.
    pub fn add_track(&mut self, track: MediaTrack) -> bool {
        if self.tracks.iter().any(|t| t.id() == track.id()) {
            return false;
        }
        self.tracks.push(track);
        true
    }

    pub fn remove_track(&mut self, track_id: &str) -> Option<MediaTrack> {
        let idx = self.tracks.iter().position(|t| t.id() == track_id)?;
        Some(self.tracks.remove(idx))
    }

    /// Puts `track` in the slot of the first track of the same kind, or
    /// appends it. Returns the track it displaced.
    pub fn replace_track_of_kind(&mut self, track: MediaTrack) -> Option<MediaTrack> {
        match self.tracks.iter().position(|t| t.kind() == track.kind()) {
            Some(idx) => Some(std::mem::replace(&mut self.tracks[idx], track)),
            None => {
                self.tracks.push(track);
                None
            }
        }
    }

    pub fn remove_kind(&mut self, kind: TrackKind) -> Vec<MediaTrack> {
        let (gone, kept) = std::mem::take(&mut self.tracks)
            .into_iter()
            .partition(|t| t.kind() == kind);
        self.tracks = kept;
        gone
    }

    pub fn stop_all(&self) {
        for t in &self.tracks {
            t.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::media_track::TrackSource;

    fn cam(label: &str) -> MediaTrack {
        MediaTrack::new(TrackKind::Video, TrackSource::Camera, label)
    }

    #[test]
    fn replace_keeps_position_and_stream_id() {
        let mic = MediaTrack::new(TrackKind::Audio, TrackSource::Microphone, "mic");
        let old = cam("front");
        let mut s = MediaStream::from_tracks("local", [old.clone(), mic.clone()]);
        let new = cam("back");
        let displaced = s.replace_track_of_kind(new.clone());
        assert_eq!(displaced, Some(old));
        assert_eq!(s.id(), "local");
        assert_eq!(s.tracks(), &[new, mic]);
    }

    #[test]
    fn add_is_idempotent_per_track() {
        let t = cam("c");
        let mut s = MediaStream::new("s");
        assert!(s.add_track(t.clone()));
        assert!(!s.add_track(t.clone()));
        assert_eq!(s.tracks().len(), 1);
        assert_eq!(s.remove_track(t.id()), Some(t));
        assert!(s.is_empty());
    }

    #[test]
    fn remove_kind_leaves_other_kinds() {
        let mic = MediaTrack::new(TrackKind::Audio, TrackSource::Microphone, "mic");
        let mut s = MediaStream::from_tracks("s", [cam("a"), mic.clone()]);
        assert_eq!(s.remove_kind(TrackKind::Video).len(), 1);
        assert_eq!(s.tracks(), &[mic]);
    }
}
