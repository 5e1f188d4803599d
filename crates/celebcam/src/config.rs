use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Client configuration.
///
/// Layered as: defaults, optional TOML file, `CELEBCAM_*` environment
/// variables. Command-line flags are applied on top by `main`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the recognition service.
    pub server_url: String,
    /// Whether to open the camera at startup.
    pub camera_enabled: bool,
    /// V4L2 device path (default: /dev/video0).
    pub camera_device: String,
    /// Capture resolution requested from the driver.
    pub camera_width: u32,
    pub camera_height: u32,
    /// Size of the surface snapshots are drawn onto before encoding.
    pub canvas_width: u32,
    pub canvas_height: u32,
    /// JPEG quality for snapshots (1-100).
    pub jpeg_quality: u8,
    /// Frames discarded after opening the camera (AGC/AE stabilization).
    pub warmup_frames: usize,
    /// Per-request timeout in seconds; 0 disables it.
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8000".to_string(),
            camera_enabled: true,
            camera_device: "/dev/video0".to_string(),
            camera_width: 640,
            camera_height: 480,
            canvas_width: 640,
            canvas_height: 480,
            jpeg_quality: 85,
            warmup_frames: 4,
            request_timeout_secs: 0,
        }
    }
}

impl Config {
    /// Load the config file (if any) and apply environment overrides.
    ///
    /// `explicit` names a file that must exist; otherwise `CELEBCAM_CONFIG`
    /// or `$XDG_CONFIG_HOME/celebcam/config.toml` is used when present.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(p) => Some(p.to_path_buf()),
            None => std::env::var("CELEBCAM_CONFIG")
                .map(PathBuf::from)
                .ok()
                .or_else(|| Some(default_config_path()).filter(|p| p.exists())),
        };

        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                    path: path.clone(),
                    source,
                })?;
                tracing::debug!(path = %path.display(), "loaded config file");
                Self::from_toml_str(&text)?
            }
            None => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Override fields from `CELEBCAM_*` variables. Unparseable values are
    /// ignored with a warning.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("CELEBCAM_SERVER_URL") {
            self.server_url = v;
        }
        if let Some(v) = lookup("CELEBCAM_CAMERA_DEVICE") {
            self.camera_device = v;
        }
        if let Some(v) = lookup("CELEBCAM_CAMERA_ENABLED") {
            self.camera_enabled = v != "0";
        }
        env_parse(&lookup, "CELEBCAM_CAMERA_WIDTH", &mut self.camera_width);
        env_parse(&lookup, "CELEBCAM_CAMERA_HEIGHT", &mut self.camera_height);
        env_parse(&lookup, "CELEBCAM_CANVAS_WIDTH", &mut self.canvas_width);
        env_parse(&lookup, "CELEBCAM_CANVAS_HEIGHT", &mut self.canvas_height);
        env_parse(&lookup, "CELEBCAM_JPEG_QUALITY", &mut self.jpeg_quality);
        env_parse(&lookup, "CELEBCAM_WARMUP_FRAMES", &mut self.warmup_frames);
        env_parse(&lookup, "CELEBCAM_REQUEST_TIMEOUT_SECS", &mut self.request_timeout_secs);
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }
}

fn default_config_path() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        })
        .join("celebcam/config.toml")
}

fn env_parse<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, slot: &mut T) {
    let Some(raw) = lookup(key) else {
        return;
    };
    match raw.parse() {
        Ok(v) => *slot = v,
        Err(_) => tracing::warn!(key, value = %raw, "ignoring unparseable environment value"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
            server_url = "http://recognizer:9000"
            jpeg_quality = 70
            "#,
        )
        .unwrap();
        assert_eq!(config.server_url, "http://recognizer:9000");
        assert_eq!(config.jpeg_quality, 70);
        assert_eq!(config.camera_device, "/dev/video0");
        assert_eq!(config.canvas_width, 640);
    }

    #[test]
    fn test_bad_toml() {
        assert!(Config::from_toml_str("jpeg_quality = \"high\"").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("CELEBCAM_SERVER_URL", "http://10.0.0.2:8000"),
            ("CELEBCAM_CAMERA_ENABLED", "0"),
            ("CELEBCAM_CANVAS_WIDTH", "320"),
            ("CELEBCAM_WARMUP_FRAMES", "lots"),
        ]);
        let mut config = Config::default();
        config.apply_env(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.server_url, "http://10.0.0.2:8000");
        assert!(!config.camera_enabled);
        assert_eq!(config.canvas_width, 320);
        // Unparseable value leaves the default in place.
        assert_eq!(config.warmup_frames, 4);
    }

    #[test]
    fn test_request_timeout() {
        let mut config = Config::default();
        assert_eq!(config.request_timeout(), None);
        config.request_timeout_secs = 15;
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(15)));
    }
}
