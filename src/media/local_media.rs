use std::sync::Arc;

use crate::{
    log::LogSink,
    media::{
        constraints::MediaConstraints,
        media_devices::{DeviceInfo, MediaDevices},
        media_error::MediaError,
        media_stream::MediaStream,
        media_track::{MediaTrack, TrackKind},
    },
    sink_info, sink_warn,
};

/// What `local-media-updated` carries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalMediaSnapshot {
    pub stream: Option<MediaStream>,
    pub video_enabled: Option<bool>,
    pub audio_enabled: Option<bool>,
    pub screen_sharing: bool,
}

/// Owner of the single local stream shared by every peer connection.
///
/// Only this type adds, removes or replaces local tracks. Tracks are swapped
/// inside the one stream so its id never changes; pushing the change out to
/// peers is done with [`sender_sync`](super::sender_sync).
pub struct LocalMedia {
    devices: Box<dyn MediaDevices>,
    default_constraints: MediaConstraints,
    stream: Option<MediaStream>,
    /// Camera track parked while a screen share occupies the video slot.
    parked_camera: Option<MediaTrack>,
    screen_sharing: bool,
    log: Arc<dyn LogSink>,
}

impl LocalMedia {
    pub fn new(
        devices: Box<dyn MediaDevices>,
        default_constraints: MediaConstraints,
        log: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            devices,
            default_constraints,
            stream: None,
            parked_camera: None,
            screen_sharing: false,
            log,
        }
    }

    pub fn stream(&self) -> Option<&MediaStream> {
        self.stream.as_ref()
    }

    pub fn is_screen_sharing(&self) -> bool {
        self.screen_sharing
    }

    pub fn default_constraints(&self) -> &MediaConstraints {
        &self.default_constraints
    }

    pub fn enumerate_devices(&self) -> Vec<DeviceInfo> {
        self.devices.enumerate_devices()
    }

    pub fn snapshot(&self) -> LocalMediaSnapshot {
        let enabled = |kind| {
            self.stream
                .as_ref()
                .and_then(|s| s.first_of_kind(kind))
                .map(MediaTrack::is_enabled)
        };
        LocalMediaSnapshot {
            stream: self.stream.clone(),
            video_enabled: enabled(TrackKind::Video),
            audio_enabled: enabled(TrackKind::Audio),
            screen_sharing: self.screen_sharing,
        }
    }

    /// Opens camera and microphone.
    ///
    /// Any failure with the requested constraints is retried once with
    /// [`MediaConstraints::relaxed`]. Acquired tracks replace same-kind
    /// tracks of an existing stream in place; displaced tracks are stopped.
    ///
    /// # Errors
    /// The error of the relaxed attempt (or of the only attempt when the
    /// request already was relaxed).
    pub fn acquire(&mut self, constraints: Option<&MediaConstraints>) -> Result<&MediaStream, MediaError> {
        let wanted = constraints.unwrap_or(&self.default_constraints).clone();
        let tracks = match self.devices.get_user_media(&wanted) {
            Ok(t) => t,
            Err(e) if wanted != MediaConstraints::relaxed() => {
                sink_warn!(self.log, "[media] capture failed ({e}); retrying relaxed");
                self.devices.get_user_media(&MediaConstraints::relaxed())?
            }
            Err(e) => return Err(e),
        };

        let stream = self.stream.get_or_insert_with(MediaStream::with_random_id);
        for track in tracks {
            if self.screen_sharing && track.kind() == TrackKind::Video {
                if let Some(old) = self.parked_camera.replace(track) {
                    old.stop();
                }
                continue;
            }
            if let Some(old) = stream.replace_track_of_kind(track) {
                old.stop();
            }
        }
        sink_info!(
            self.log,
            "[media] local stream {} has {} track(s)",
            stream.id(),
            stream.tracks().len()
        );
        Ok(stream)
    }

    /// Flips `enabled` on the outgoing video track. `None` without one.
    pub fn toggle_video(&mut self) -> Option<bool> {
        self.toggle(TrackKind::Video)
    }

    pub fn toggle_audio(&mut self) -> Option<bool> {
        self.toggle(TrackKind::Audio)
    }

    fn toggle(&mut self, kind: TrackKind) -> Option<bool> {
        let track = self.stream.as_ref()?.first_of_kind(kind)?;
        let now = !track.is_enabled();
        track.set_enabled(now);
        Some(now)
    }

    /// Sets the microphone's `enabled` flag. Returns whether it changed.
    pub fn set_audio_enabled(&mut self, enabled: bool) -> bool {
        match self.stream.as_ref().and_then(MediaStream::audio_track) {
            Some(t) if t.is_enabled() != enabled => {
                t.set_enabled(enabled);
                true
            }
            _ => false,
        }
    }

    /// Reopens only the camera, from `device_id`.
    ///
    /// The new track inherits the old one's `enabled` flag. During a screen
    /// share the parked camera is swapped instead and the screen keeps the
    /// video slot. Returns the track that should now be outgoing for video.
    ///
    /// # Errors
    /// [`MediaError::NoLocalMedia`] before `acquire`, or the capture error.
    pub fn select_device(&mut self, device_id: &str) -> Result<MediaTrack, MediaError> {
        if self.stream.is_none() {
            return Err(MediaError::NoLocalMedia);
        }
        let req = MediaConstraints::video_from_device(&self.default_constraints, device_id);
        let track = self
            .devices
            .get_user_media(&req)?
            .into_iter()
            .find(|t| t.kind() == TrackKind::Video)
            .ok_or_else(|| MediaError::NotFound(device_id.to_owned()))?;

        if self.screen_sharing {
            if let Some(old) = self.parked_camera.replace(track.clone()) {
                track.set_enabled(old.is_enabled());
                old.stop();
            }
            return self
                .stream
                .as_ref()
                .and_then(MediaStream::video_track)
                .cloned()
                .ok_or(MediaError::NoLocalMedia);
        }

        let stream = self.stream.as_mut().ok_or(MediaError::NoLocalMedia)?;
        if let Some(old) = stream.video_track() {
            track.set_enabled(old.is_enabled());
        }
        if let Some(old) = stream.replace_track_of_kind(track.clone()) {
            old.stop();
        }
        sink_info!(self.log, "[media] switched camera to {device_id}");
        Ok(track)
    }

    /// Puts a display-capture track in the video slot, parking the camera.
    /// Starting while already sharing returns the current screen track.
    ///
    /// # Errors
    /// The capture error; the camera stays in place.
    pub fn start_screen_share(&mut self) -> Result<MediaTrack, MediaError> {
        if self.screen_sharing {
            if let Some(t) = self.stream.as_ref().and_then(MediaStream::video_track) {
                return Ok(t.clone());
            }
        }
        let screen = self.devices.get_display_media()?;
        let stream = self.stream.get_or_insert_with(MediaStream::with_random_id);
        self.parked_camera = stream.replace_track_of_kind(screen.clone());
        self.screen_sharing = true;
        sink_info!(self.log, "[media] screen share started");
        Ok(screen)
    }

    /// Stops the screen track and puts the parked camera back.
    ///
    /// Returns `None` when nothing was being shared, otherwise
    /// `Some(camera)` where the camera is `None` if there was none to restore.
    pub fn stop_screen_share(&mut self) -> Option<Option<MediaTrack>> {
        if !self.screen_sharing {
            return None;
        }
        self.screen_sharing = false;
        let stream = self.stream.as_mut()?;
        let camera = self.parked_camera.take();
        match &camera {
            Some(cam) => {
                if let Some(screen) = stream.replace_track_of_kind(cam.clone()) {
                    screen.stop();
                }
            }
            None => {
                for screen in stream.remove_kind(TrackKind::Video) {
                    screen.stop();
                }
            }
        }
        sink_info!(self.log, "[media] screen share stopped");
        Some(camera)
    }

    /// Stops and forgets every local track. Returns whether anything was live.
    pub fn stop(&mut self) -> bool {
        if let Some(cam) = self.parked_camera.take() {
            cam.stop();
        }
        self.screen_sharing = false;
        match self.stream.take() {
            Some(stream) => {
                stream.stop_all();
                true
            }
            None => false,
        }
    }
}
