use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use rand::Rng;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Audio,
    Video,
}

impl TrackKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TrackKind::Audio => "audio",
            TrackKind::Video => "video",
        }
    }
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a track's media comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackSource {
    Camera,
    Microphone,
    Screen,
    /// Received from a peer.
    Remote,
}

struct TrackInner {
    id: String,
    kind: TrackKind,
    source: TrackSource,
    label: String,
    device_id: Option<String>,
    enabled: AtomicBool,
    ended: AtomicBool,
}

/// Shared handle to one media track.
///
/// Clones refer to the same track: flipping `enabled` through one clone is
/// seen by every peer connection holding another.
#[derive(Clone)]
pub struct MediaTrack {
    inner: Arc<TrackInner>,
}

impl MediaTrack {
    pub fn new(kind: TrackKind, source: TrackSource, label: impl Into<String>) -> Self {
        let id = format!("{}-{:08x}", kind.as_str(), rand::thread_rng().r#gen::<u32>());
        Self::with_id(id, kind, source, label, None)
    }

    pub fn with_id(
        id: impl Into<String>,
        kind: TrackKind,
        source: TrackSource,
        label: impl Into<String>,
        device_id: Option<String>,
    ) -> Self {
        Self {
            inner: Arc::new(TrackInner {
                id: id.into(),
                kind,
                source,
                label: label.into(),
                device_id,
                enabled: AtomicBool::new(true),
                ended: AtomicBool::new(false),
            }),
        }
    }

    /// A track captured from a specific device.
    pub fn from_device(
        kind: TrackKind,
        source: TrackSource,
        label: impl Into<String>,
        device_id: impl Into<String>,
    ) -> Self {
        let id = format!("{}-{:08x}", kind.as_str(), rand::thread_rng().r#gen::<u32>());
        Self::with_id(id, kind, source, label, Some(device_id.into()))
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn kind(&self) -> TrackKind {
        self.inner.kind
    }

    pub fn source(&self) -> TrackSource {
        self.inner.source
    }

    pub fn label(&self) -> &str {
        &self.inner.label
    }

    pub fn device_id(&self) -> Option<&str> {
        self.inner.device_id.as_deref()
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::Acquire)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.inner.enabled.store(enabled, Ordering::Release);
    }

    /// Stops capture. An ended track never restarts.
    pub fn stop(&self) {
        self.inner.ended.store(true, Ordering::Release);
    }

    pub fn is_ended(&self) -> bool {
        self.inner.ended.load(Ordering::Acquire)
    }

    /// True if both handles refer to the same underlying track.
    pub fn same_track(&self, other: &MediaTrack) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for MediaTrack {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for MediaTrack {}

impl fmt::Debug for MediaTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaTrack")
            .field("id", &self.inner.id)
            .field("kind", &self.inner.kind)
            .field("source", &self.inner.source)
            .field("enabled", &self.is_enabled())
            .field("ended", &self.is_ended())
            .finish()
    }
}
