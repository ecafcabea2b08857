use crate::media::{
    constraints::MediaConstraints, media_error::MediaError, media_track::MediaTrack,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceKind {
    VideoInput,
    AudioInput,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceInfo {
    pub device_id: String,
    pub kind: DeviceKind,
    pub label: String,
}

/// Capture backend: cameras, microphones and screen capture.
pub trait MediaDevices {
    /// Opens camera and/or microphone as requested.
    ///
    /// # Errors
    /// [`MediaError::Overconstrained`] when preferences cannot be met, or any
    /// other capture failure.
    fn get_user_media(&mut self, constraints: &MediaConstraints)
    -> Result<Vec<MediaTrack>, MediaError>;

    /// Opens a display-capture video track.
    ///
    /// # Errors
    /// Typically [`MediaError::NotAllowed`] when the user cancels.
    fn get_display_media(&mut self) -> Result<MediaTrack, MediaError>;

    fn enumerate_devices(&self) -> Vec<DeviceInfo>;
}
