//! The capture session: camera, recognition client and result panel.
//!
//! Each capture is one async operation that ends by updating the panel.
//! Captures started through [`CaptureSession::submit`] cancel whatever was
//! in flight, and a result is only applied if no newer capture has started
//! since, so the panel always reflects the most recently started capture.

use crate::capture::{CaptureError, CaptureWorker};
use celebcam_client::{ClientError, RecognitionClient};
use celebcam_core::{render, RecognitionResponse, ResultPanel, ResultView, RETRY_MESSAGE};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinHandle};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Client(#[from] ClientError),
}

/// A file picked for upload.
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl SelectedFile {
    pub async fn read(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self { name, bytes })
    }
}

/// What to recognize.
#[derive(Debug, Clone)]
pub enum Capture {
    /// Take a snapshot from the live camera.
    Snapshot,
    /// Upload the first of the selected files.
    Files(Vec<SelectedFile>),
}

/// How a capture ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The panel now shows `items` result entries.
    Rendered { items: usize },
    /// The capture failed and the panel shows the retry message.
    Failed,
    /// A newer capture started first; the panel was left alone.
    Superseded,
    /// Nothing to capture (no camera stream or no file); no request was made.
    Inert,
}

pub struct CaptureSession {
    client: RecognitionClient,
    camera: Mutex<Option<CaptureWorker>>,
    panel: Mutex<ResultPanel>,
    generation: AtomicU64,
    in_flight: Mutex<Option<AbortHandle>>,
    updates: watch::Sender<ResultView>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl CaptureSession {
    /// `camera` is `None` when no stream could be acquired; snapshots are
    /// then inert while file uploads keep working.
    pub fn new(client: RecognitionClient, camera: Option<CaptureWorker>) -> Self {
        let (updates, _) = watch::channel(ResultView::default());
        Self {
            client,
            camera: Mutex::new(camera),
            panel: Mutex::new(ResultPanel::new()),
            generation: AtomicU64::new(0),
            in_flight: Mutex::new(None),
            updates,
        }
    }

    pub fn has_camera(&self) -> bool {
        lock(&self.camera).is_some()
    }

    /// Receive a copy of the panel content after every update.
    pub fn subscribe(&self) -> watch::Receiver<ResultView> {
        self.updates.subscribe()
    }

    pub fn view(&self) -> ResultView {
        lock(&self.panel).view().clone()
    }

    pub fn revision(&self) -> u64 {
        lock(&self.panel).revision()
    }

    /// Start `capture` in the background, cancelling the one in flight.
    pub fn submit(self: &Arc<Self>, capture: Capture) -> JoinHandle<Outcome> {
        let generation = self.begin();
        let session = Arc::clone(self);
        let task = tokio::spawn(async move { session.perform(generation, capture).await });

        if let Some(previous) = lock(&self.in_flight).replace(task.abort_handle()) {
            if !previous.is_finished() {
                tracing::debug!("cancelling in-flight capture");
                previous.abort();
            }
        }
        task
    }

    /// Run `capture` to completion on the current task.
    pub async fn run(&self, capture: Capture) -> Outcome {
        let generation = self.begin();
        self.perform(generation, capture).await
    }

    /// Take a snapshot and recognize it. Inert without a camera stream.
    pub async fn snapshot(&self) -> Outcome {
        self.run(Capture::Snapshot).await
    }

    /// Upload the first selected file. Inert for an empty selection.
    pub async fn upload(&self, files: Vec<SelectedFile>) -> Outcome {
        self.run(Capture::Files(files)).await
    }

    /// Cancel any in-flight capture and release the camera.
    pub async fn release(&self) {
        if let Some(task) = lock(&self.in_flight).take() {
            task.abort();
        }
        let worker = lock(&self.camera).take();
        if let Some(worker) = worker {
            worker.shutdown().await;
        }
    }

    fn begin(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    async fn perform(&self, generation: u64, capture: Capture) -> Outcome {
        let (source, result) = match capture {
            Capture::Snapshot => {
                let camera = lock(&self.camera).as_ref().map(CaptureWorker::handle);
                let Some(camera) = camera else {
                    tracing::debug!("no camera stream attached; snapshot ignored");
                    return Outcome::Inert;
                };
                let result = async {
                    let snap = camera.snapshot().await?;
                    Ok::<_, SessionError>(self.client.recognize_snapshot(&snap.to_base64()).await?)
                }
                .await;
                ("snapshot", result)
            }
            Capture::Files(files) => {
                let Some(file) = files.into_iter().next() else {
                    tracing::debug!("no file selected");
                    return Outcome::Inert;
                };
                tracing::info!(file = %file.name, bytes = file.bytes.len(), "uploading selected file");
                let result = self
                    .client
                    .recognize_file(&file.name, file.bytes)
                    .await
                    .map_err(SessionError::from);
                ("file", result)
            }
        };
        self.apply(generation, source, result)
    }

    fn apply(
        &self,
        generation: u64,
        source: &'static str,
        result: Result<RecognitionResponse, SessionError>,
    ) -> Outcome {
        let mut panel = lock(&self.panel);
        if self.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(source, generation, "discarding result of superseded capture");
            return Outcome::Superseded;
        }

        let outcome = match result {
            Ok(response) => {
                let view = render(&response);
                let items = view.items.len();
                panel.replace(view);
                Outcome::Rendered { items }
            }
            Err(e) => {
                tracing::error!(source, error = %e, "recognition failed");
                panel.show_error(RETRY_MESSAGE);
                Outcome::Failed
            }
        };
        self.updates.send_replace(panel.view().clone());
        outcome
    }
}
