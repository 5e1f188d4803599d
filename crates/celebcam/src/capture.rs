//! Camera worker thread.
//!
//! The camera is owned by one OS thread; async callers reach it through a
//! cloneable [`CaptureHandle`] and get encoded snapshots back over oneshot
//! channels.

use celebcam_hw::{Camera, CameraError, EncodeError, FrameSource, Snapshot, SnapshotEncoder};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("camera error: {0}")]
    Camera(#[from] CameraError),
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),
    #[error("failed to start camera worker: {0}")]
    Spawn(std::io::Error),
    #[error("camera worker exited")]
    ChannelClosed,
}

/// Messages sent from async callers to the camera worker thread.
enum CaptureRequest {
    Snapshot {
        reply: oneshot::Sender<Result<Snapshot, CaptureError>>,
    },
}

/// Clone-safe handle for requesting snapshots from the worker.
#[derive(Clone)]
pub struct CaptureHandle {
    tx: mpsc::Sender<CaptureRequest>,
}

impl CaptureHandle {
    /// Capture the current frame and encode it for upload.
    pub async fn snapshot(&self) -> Result<Snapshot, CaptureError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(CaptureRequest::Snapshot { reply: reply_tx })
            .await
            .map_err(|_| CaptureError::ChannelClosed)?;
        reply_rx.await.map_err(|_| CaptureError::ChannelClosed)?
    }
}

/// Owns the camera worker thread. The frame source is released once this
/// and every [`CaptureHandle`] cloned from it are gone.
pub struct CaptureWorker {
    handle: CaptureHandle,
    thread: std::thread::JoinHandle<()>,
}

impl CaptureWorker {
    pub fn handle(&self) -> CaptureHandle {
        self.handle.clone()
    }

    /// Stop accepting requests and wait for the worker to close the source.
    pub async fn shutdown(self) {
        let Self { handle, thread } = self;
        drop(handle);
        match tokio::task::spawn_blocking(move || thread.join()).await {
            Ok(Ok(())) => tracing::info!("camera released"),
            Ok(Err(_)) => tracing::error!("camera worker panicked"),
            Err(e) => tracing::error!(error = %e, "failed to join camera worker"),
        }
    }
}

/// Open the V4L2 camera and start a worker for it.
///
/// Fails fast if the device cannot be opened. Warmup frames are discarded
/// on the worker thread before it starts taking requests.
pub fn open_camera(
    device: &str,
    width: u32,
    height: u32,
    warmup_frames: usize,
    encoder: SnapshotEncoder,
) -> Result<CaptureWorker, CaptureError> {
    let camera = Camera::open(device, width, height)?;
    tracing::info!(
        device,
        width = camera.width,
        height = camera.height,
        fourcc = ?camera.fourcc,
        "camera opened"
    );

    spawn_worker(camera, encoder, warmup_frames)
}

/// Run `source` on a dedicated OS thread, serving snapshot requests in order.
pub fn spawn_worker<S>(
    mut source: S,
    encoder: SnapshotEncoder,
    warmup_frames: usize,
) -> Result<CaptureWorker, CaptureError>
where
    S: FrameSource + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel::<CaptureRequest>(4);

    let thread = std::thread::Builder::new()
        .name("celebcam-camera".into())
        .spawn(move || {
            tracing::info!("camera worker started");
            if warmup_frames > 0 {
                tracing::info!(count = warmup_frames, "discarding warmup frames");
                if let Err(e) = source.skip_frames(warmup_frames) {
                    tracing::warn!(error = %e, "warmup capture failed");
                }
            }
            while let Some(req) = rx.blocking_recv() {
                match req {
                    CaptureRequest::Snapshot { reply } => {
                        if reply.is_closed() {
                            tracing::debug!("snapshot request abandoned before capture");
                            continue;
                        }
                        let result = source
                            .capture_frame()
                            .map_err(CaptureError::from)
                            .and_then(|frame| encoder.encode(&frame).map_err(CaptureError::from));
                        let _ = reply.send(result);
                    }
                }
            }
            tracing::info!("camera worker exiting");
        })
        .map_err(CaptureError::Spawn)?;

    Ok(CaptureWorker {
        handle: CaptureHandle { tx },
        thread,
    })
}
