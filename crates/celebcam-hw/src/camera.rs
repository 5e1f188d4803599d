//! V4L2 camera capture via the `v4l` crate.

use crate::frame::{self, Frame};
use std::path::Path;
use thiserror::Error;
use v4l::buffer::Type as BufType;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::FourCC;

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("device not found: {0}")]
    DeviceNotFound(String),
    #[error("capture failed: {0}")]
    CaptureFailed(String),
    #[error("device busy")]
    DeviceBusy,
    #[error("format negotiation failed: {0}")]
    FormatNegotiationFailed(String),
    #[error("streaming not supported")]
    StreamingNotSupported,
    #[error("frame conversion failed: {0}")]
    Frame(#[from] frame::FrameError),
}

/// Info about a discovered V4L2 device.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub path: String,
    pub name: String,
    pub driver: String,
    pub bus: String,
}

/// Negotiated pixel format for the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// YUYV 4:2:2 packed (2 bytes/pixel), the usual webcam default.
    Yuyv,
    /// Motion-JPEG, one JPEG image per buffer.
    Mjpg,
    /// 8-bit grayscale (1 byte/pixel).
    Grey,
}

impl PixelFormat {
    fn from_fourcc(fourcc: FourCC) -> Option<Self> {
        match &fourcc.repr {
            b"YUYV" => Some(Self::Yuyv),
            b"MJPG" => Some(Self::Mjpg),
            b"GREY" => Some(Self::Grey),
            _ => None,
        }
    }

    /// Convert a raw driver buffer to packed RGB8.
    fn to_rgb(self, buf: &[u8], width: u32, height: u32) -> Result<(Vec<u8>, u32, u32), CameraError> {
        match self {
            Self::Yuyv => Ok((frame::yuyv_to_rgb(buf, width, height)?, width, height)),
            Self::Grey => Ok((frame::grey_to_rgb(buf, width, height)?, width, height)),
            Self::Mjpg => Ok(frame::mjpg_to_rgb(buf)?),
        }
    }
}

/// Anything that can hand out still frames on demand.
pub trait FrameSource {
    fn capture_frame(&mut self) -> Result<Frame, CameraError>;

    /// Drop `count` frames, e.g. while auto-exposure settles.
    fn skip_frames(&mut self, count: usize) -> Result<(), CameraError> {
        for _ in 0..count {
            self.capture_frame()?;
        }
        Ok(())
    }
}

/// Number of mmap buffers queued with the driver.
const BUFFER_COUNT: u32 = 2;

/// V4L2 camera with a capture stream that stays open until it is dropped.
pub struct Camera {
    stream: MmapStream<'static>,
    pub width: u32,
    pub height: u32,
    pub fourcc: FourCC,
    pixel_format: PixelFormat,
}

impl Camera {
    /// Open a V4L2 camera device by path (e.g., "/dev/video0"), request
    /// the given resolution and start streaming. The driver may settle on
    /// a different size.
    pub fn open(device_path: &str, width: u32, height: u32) -> Result<Self, CameraError> {
        if !Path::new(device_path).exists() {
            return Err(CameraError::DeviceNotFound(device_path.to_string()));
        }

        let device = Device::with_path(device_path).map_err(|e| {
            if e.to_string().contains("busy") || e.to_string().contains("EBUSY") {
                CameraError::DeviceBusy
            } else {
                CameraError::DeviceNotFound(format!("{device_path}: {e}"))
            }
        })?;

        let caps = device.query_caps().map_err(|e| {
            CameraError::CaptureFailed(format!("failed to query capabilities: {e}"))
        })?;

        tracing::info!(
            device = device_path,
            driver = %caps.driver,
            card = %caps.card,
            "opened camera"
        );

        if !caps.capabilities.contains(v4l::capability::Flags::VIDEO_CAPTURE) {
            return Err(CameraError::StreamingNotSupported);
        }

        // Ask for YUYV; accept MJPG or GREY if that is what the driver negotiates.
        let mut fmt = device.format().map_err(|e| {
            CameraError::FormatNegotiationFailed(format!("failed to get format: {e}"))
        })?;

        fmt.fourcc = FourCC::new(b"YUYV");
        fmt.width = width;
        fmt.height = height;

        let negotiated = device.set_format(&fmt).map_err(|e| {
            CameraError::FormatNegotiationFailed(format!("failed to set format: {e}"))
        })?;

        let fourcc = negotiated.fourcc;
        let pixel_format = PixelFormat::from_fourcc(fourcc).ok_or_else(|| {
            CameraError::FormatNegotiationFailed(format!(
                "unsupported pixel format: {fourcc:?} (need YUYV, MJPG, or GREY)"
            ))
        })?;

        tracing::info!(
            width = negotiated.width,
            height = negotiated.height,
            fourcc = ?fourcc,
            ?pixel_format,
            "negotiated format"
        );

        // The stream holds its own reference to the device handle.
        let stream = MmapStream::with_buffers(&device, BufType::VideoCapture, BUFFER_COUNT)
            .map_err(|e| CameraError::CaptureFailed(format!("failed to create mmap stream: {e}")))?;

        Ok(Self {
            stream,
            width: negotiated.width,
            height: negotiated.height,
            fourcc,
            pixel_format,
        })
    }

    fn dequeue(&mut self) -> Result<(&[u8], &v4l::buffer::Metadata), CameraError> {
        self.stream
            .next()
            .map_err(|e| CameraError::CaptureFailed(format!("failed to dequeue buffer: {e}")))
    }

    /// List available V4L2 video capture devices.
    pub fn list_devices() -> Vec<DeviceInfo> {
        let mut devices = Vec::new();

        for i in 0..16 {
            let path = format!("/dev/video{i}");
            if !Path::new(&path).exists() {
                continue;
            }
            let Ok(dev) = Device::with_path(&path) else {
                continue;
            };
            let Ok(caps) = dev.query_caps() else {
                continue;
            };
            if !caps.capabilities.contains(v4l::capability::Flags::VIDEO_CAPTURE) {
                continue;
            }
            devices.push(DeviceInfo {
                path,
                name: caps.card.clone(),
                driver: caps.driver.clone(),
                bus: caps.bus.clone(),
            });
        }

        devices
    }
}

impl FrameSource for Camera {
    /// Capture the newest frame as RGB.
    ///
    /// Buffers the driver filled while nobody was asking are stale, so they
    /// are dequeued and requeued first; the frame returned is captured after
    /// this call started.
    fn capture_frame(&mut self) -> Result<Frame, CameraError> {
        for _ in 0..BUFFER_COUNT {
            self.dequeue()?;
        }

        let (format, width, height) = (self.pixel_format, self.width, self.height);
        let (buf, meta) = self.dequeue()?;

        // MJPG buffers are sized to the payload; trim to bytesused when reported.
        let used = meta.bytesused as usize;
        let buf = if used > 0 && used <= buf.len() { &buf[..used] } else { buf };
        let sequence = meta.sequence;

        let (rgb, width, height) = format.to_rgb(buf, width, height)?;
        let frame = Frame::from_rgb(rgb, width, height, sequence)?;

        tracing::debug!(
            seq = frame.sequence,
            brightness = frame.avg_brightness(),
            "captured frame"
        );

        Ok(frame)
    }

    fn skip_frames(&mut self, count: usize) -> Result<(), CameraError> {
        for _ in 0..count {
            self.dequeue()?;
        }
        Ok(())
    }
}
