use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

mod capture;
mod config;
mod display;
mod session;

use capture::CaptureWorker;
use celebcam_client::RecognitionClient;
use celebcam_hw::{Camera, SnapshotEncoder};
use config::Config;
use display::Format;
use session::{Capture, CaptureSession, Outcome, SelectedFile};

#[derive(Parser)]
#[command(name = "celebcam", about = "Identify celebrities from a webcam snapshot or an image file")]
struct Cli {
    /// Config file (default: $XDG_CONFIG_HOME/celebcam/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Base URL of the recognition service
    #[arg(long, global = true)]
    server: Option<String>,
    /// V4L2 camera device
    #[arg(long, global = true)]
    device: Option<String>,
    /// Do not open the camera
    #[arg(long, global = true)]
    no_camera: bool,
    /// Output format for results
    #[arg(long, value_enum, default_value_t = Format::Text, global = true)]
    format: Format,
    /// Also write each result as a standalone HTML page
    #[arg(long, global = true)]
    html_out: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Take one camera snapshot and recognize it
    Snap,
    /// Upload an image file and recognize it (only the first file is sent)
    Upload {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Read commands from stdin: `s` or empty line = snapshot, a path = upload, `q` = quit
    Interactive,
    /// List V4L2 capture devices
    Devices,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(server) = &self.server {
            config.server_url = server.clone();
        }
        if let Some(device) = &self.device {
            config.camera_device = device.clone();
        }
        if self.no_camera {
            config.camera_enabled = false;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply(&mut config);
    tracing::debug!(?config, "configuration loaded");

    let client = RecognitionClient::new(&config.server_url, config.request_timeout())?;
    let html_out = cli.html_out.as_deref();

    match cli.command {
        Commands::Snap => {
            let session = CaptureSession::new(client, start_camera(&config));
            let outcome = session.snapshot().await;
            session.release().await;
            finish(&session, outcome, cli.format, html_out)?;
        }
        Commands::Upload { files } => {
            let mut selected = Vec::with_capacity(1);
            if let Some(path) = files.first() {
                let file = SelectedFile::read(path)
                    .await
                    .with_context(|| format!("failed to read {}", path.display()))?;
                selected.push(file);
            }
            let session = CaptureSession::new(client, None);
            let outcome = session.upload(selected).await;
            finish(&session, outcome, cli.format, html_out)?;
        }
        Commands::Interactive => {
            let session = Arc::new(CaptureSession::new(client, start_camera(&config)));
            interactive(session, cli.format, html_out.map(Path::to_path_buf)).await?;
        }
        Commands::Devices => {
            let devices = Camera::list_devices();
            let mut out = std::io::stdout().lock();
            if devices.is_empty() {
                writeln!(out, "No V4L2 capture devices found")?;
            }
            for dev in devices {
                writeln!(out, "{}\t{} ({}, {})", dev.path, dev.name, dev.driver, dev.bus)?;
            }
        }
    }

    Ok(())
}

/// Acquire the camera once. Failure is logged and leaves snapshots inert.
fn start_camera(config: &Config) -> Option<CaptureWorker> {
    if !config.camera_enabled {
        tracing::info!("camera disabled; snapshots unavailable");
        return None;
    }

    let encoder = match SnapshotEncoder::new(config.canvas_width, config.canvas_height, config.jpeg_quality) {
        Ok(e) => e,
        Err(e) => {
            tracing::error!(error = %e, "invalid snapshot settings; camera not started");
            return None;
        }
    };

    match capture::open_camera(
        &config.camera_device,
        config.camera_width,
        config.camera_height,
        config.warmup_frames,
        encoder,
    ) {
        Ok(worker) => Some(worker),
        Err(e) => {
            tracing::error!(device = %config.camera_device, error = %e, "failed to acquire camera");
            None
        }
    }
}

fn finish(session: &CaptureSession, outcome: Outcome, format: Format, html_out: Option<&Path>) -> Result<()> {
    tracing::debug!(?outcome, revision = session.revision(), "capture finished");
    match outcome {
        Outcome::Inert => bail!("nothing to recognize: no camera stream attached"),
        Outcome::Rendered { .. } | Outcome::Superseded => display::emit(&session.view(), format, html_out),
        Outcome::Failed => {
            display::emit(&session.view(), format, html_out)?;
            bail!("recognition failed")
        }
    }
}

async fn interactive(session: Arc<CaptureSession>, format: Format, html_out: Option<PathBuf>) -> Result<()> {
    let mut updates = session.subscribe();
    let printer = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let view = updates.borrow_and_update().clone();
            if let Err(e) = display::emit(&view, format, html_out.as_deref()) {
                tracing::error!(error = %e, "failed to write result");
            }
        }
    });

    eprintln!("celebcam: `s` or Enter = snapshot, <path> = upload file, `q` = quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut last = None;
    let mut quit = false;
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "q" | "quit" => {
                quit = true;
                break;
            }
            "" | "s" => {
                if !session.has_camera() {
                    tracing::warn!("no camera stream attached; snapshot ignored");
                    continue;
                }
                last = Some(session.submit(Capture::Snapshot));
            }
            path => match SelectedFile::read(Path::new(path)).await {
                Ok(file) => last = Some(session.submit(Capture::Files(vec![file]))),
                Err(e) => tracing::error!(path, error = %e, "failed to read file"),
            },
        }
    }

    // On end of input let the last capture finish; on quit it is cancelled.
    if let Some(task) = last {
        if !quit {
            let _ = task.await;
        }
    }
    session.release().await;
    drop(session);
    let _ = printer.await;
    Ok(())
}
