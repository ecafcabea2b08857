use crate::media::{
    constraints::{MediaConstraints, VideoConstraint},
    media_devices::{DeviceInfo, DeviceKind, MediaDevices},
    media_error::MediaError,
    media_track::{MediaTrack, TrackKind, TrackSource},
};

/// A camera the synthetic backend pretends to have.
#[derive(Clone, Debug)]
pub struct SyntheticCamera {
    pub device_id: String,
    pub label: String,
    pub max_width: u32,
    pub max_height: u32,
    pub max_frame_rate: u32,
}

/// Frameless capture backend for headless clients and tests.
///
/// Tracks carry ids, kinds and device ids but no media. Requests beyond a
/// camera's declared limits fail with `Overconstrained` the way a browser
/// does.
#[derive(Clone, Debug)]
pub struct SyntheticDevices {
    pub cameras: Vec<SyntheticCamera>,
    pub microphones: Vec<DeviceInfo>,
    pub screen_capture_allowed: bool,
    /// Simulates a denied permission prompt.
    pub deny_all: bool,
}

impl Default for SyntheticDevices {
    fn default() -> Self {
        Self {
            cameras: vec![SyntheticCamera {
                device_id: "synthetic-cam-0".into(),
                label: "Synthetic Camera".into(),
                max_width: 1280,
                max_height: 720,
                max_frame_rate: 30,
            }],
            microphones: vec![DeviceInfo {
                device_id: "synthetic-mic-0".into(),
                kind: DeviceKind::AudioInput,
                label: "Synthetic Microphone".into(),
            }],
            screen_capture_allowed: true,
            deny_all: false,
        }
    }
}

impl SyntheticDevices {
    pub fn with_camera(mut self, camera: SyntheticCamera) -> Self {
        self.cameras.push(camera);
        self
    }

    fn pick_camera(&self, video: &VideoConstraint) -> Result<&SyntheticCamera, MediaError> {
        let cam = match video.device_id() {
            Some(id) => self
                .cameras
                .iter()
                .find(|c| c.device_id == id)
                .ok_or_else(|| MediaError::NotFound(id.to_owned()))?,
            None => self
                .cameras
                .first()
                .ok_or_else(|| MediaError::NotFound("camera".into()))?,
        };

        if let VideoConstraint::Preferred {
            width,
            height,
            frame_rate,
            ..
        } = video
        {
            let checks = [
                ("width", *width, cam.max_width),
                ("height", *height, cam.max_height),
                ("frameRate", *frame_rate, cam.max_frame_rate),
            ];
            for (name, wanted, max) in checks {
                if wanted.is_some_and(|w| w > max) {
                    return Err(MediaError::Overconstrained {
                        constraint: name.into(),
                    });
                }
            }
        }
        Ok(cam)
    }
}

impl MediaDevices for SyntheticDevices {
    fn get_user_media(
        &mut self,
        constraints: &MediaConstraints,
    ) -> Result<Vec<MediaTrack>, MediaError> {
        if self.deny_all {
            return Err(MediaError::NotAllowed);
        }
        let mut tracks = Vec::new();
        if constraints.video.is_requested() {
            let cam = self.pick_camera(&constraints.video)?;
            tracks.push(MediaTrack::from_device(
                TrackKind::Video,
                TrackSource::Camera,
                cam.label.clone(),
                cam.device_id.clone(),
            ));
        }
        if constraints.audio {
            let mic = self
                .microphones
                .first()
                .ok_or_else(|| MediaError::NotFound("microphone".into()))?;
            tracks.push(MediaTrack::from_device(
                TrackKind::Audio,
                TrackSource::Microphone,
                mic.label.clone(),
                mic.device_id.clone(),
            ));
        }
        Ok(tracks)
    }

    fn get_display_media(&mut self) -> Result<MediaTrack, MediaError> {
        if self.deny_all || !self.screen_capture_allowed {
            return Err(MediaError::NotAllowed);
        }
        Ok(MediaTrack::new(
            TrackKind::Video,
            TrackSource::Screen,
            "Synthetic Screen",
        ))
    }

    fn enumerate_devices(&self) -> Vec<DeviceInfo> {
        self.cameras
            .iter()
            .map(|c| DeviceInfo {
                device_id: c.device_id.clone(),
                kind: DeviceKind::VideoInput,
                label: c.label.clone(),
            })
            .chain(self.microphones.iter().cloned())
            .collect()
    }
}
