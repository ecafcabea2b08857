/// Video part of a capture request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VideoConstraint {
    Off,
    /// Any camera, any resolution.
    Any,
    /// Preferred settings; a device that cannot meet them reports
    /// [`MediaError::Overconstrained`](super::MediaError::Overconstrained).
    Preferred {
        width: Option<u32>,
        height: Option<u32>,
        frame_rate: Option<u32>,
        device_id: Option<String>,
    },
}

impl VideoConstraint {
    pub fn is_requested(&self) -> bool {
        !matches!(self, VideoConstraint::Off)
    }

    pub fn device_id(&self) -> Option<&str> {
        match self {
            VideoConstraint::Preferred { device_id, .. } => device_id.as_deref(),
            VideoConstraint::Off | VideoConstraint::Any => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaConstraints {
    pub video: VideoConstraint,
    pub audio: bool,
}

impl MediaConstraints {
    /// Camera and microphone with no preferences; the fallback request.
    pub fn relaxed() -> Self {
        Self {
            video: VideoConstraint::Any,
            audio: true,
        }
    }

    pub fn preferred(width: u32, height: u32, frame_rate: u32) -> Self {
        Self {
            video: VideoConstraint::Preferred {
                width: Some(width),
                height: Some(height),
                frame_rate: Some(frame_rate),
                device_id: None,
            },
            audio: true,
        }
    }

    /// Video only, from one device, keeping the resolution preferences of `base`.
    pub fn video_from_device(base: &MediaConstraints, device_id: &str) -> Self {
        let video = match &base.video {
            VideoConstraint::Preferred {
                width,
                height,
                frame_rate,
                ..
            } => VideoConstraint::Preferred {
                width: *width,
                height: *height,
                frame_rate: *frame_rate,
                device_id: Some(device_id.to_owned()),
            },
            VideoConstraint::Off | VideoConstraint::Any => VideoConstraint::Preferred {
                width: None,
                height: None,
                frame_rate: None,
                device_id: Some(device_id.to_owned()),
            },
        };
        Self {
            video,
            audio: false,
        }
    }
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self::preferred(1280, 720, 30)
    }
}
