//! Local and remote media handles, device access and sender propagation.
pub mod constraints;
pub mod local_media;
pub mod media_devices;
pub mod media_error;
pub mod media_stream;
pub mod media_track;
pub mod sender_sync;
pub mod synthetic_devices;

pub use constraints::{MediaConstraints, VideoConstraint};
pub use local_media::{LocalMedia, LocalMediaSnapshot};
pub use media_devices::{DeviceInfo, DeviceKind, MediaDevices};
pub use media_error::MediaError;
pub use media_stream::MediaStream;
pub use media_track::{MediaTrack, TrackKind, TrackSource};
pub use synthetic_devices::SyntheticDevices;
