//! celebcam-hw — Camera capture and snapshot encoding.
//!
//! Provides V4L2-based colour capture and turns frames into the base64 JPEG
//! stills the recognition service accepts.

pub mod camera;
pub mod frame;
pub mod snapshot;

pub use camera::{Camera, CameraError, DeviceInfo, FrameSource, PixelFormat};
pub use frame::Frame;
pub use snapshot::{EncodeError, Snapshot, SnapshotEncoder};
