use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub schema_version: u32,

    // Storage
    pub log_path: PathBuf,
    pub chart_path: PathBuf,

    // Backend names, highest priority first
    pub backend_priority: Vec<String>,

    // DeepFace REST service
    pub deepface_url: String,
    pub detector_backend: String,
    pub enforce_detection: bool,

    // FER ONNX model
    pub fer_model_path: PathBuf,

    // Camera capture argv; `{output}` is replaced with the frame path
    pub capture_command: Vec<String>,

    // Polling / reporting
    pub poll_interval_secs: u64,
    pub recent_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        let base = Self::default_config_dir().unwrap_or_else(|_| PathBuf::from(".moodtracker"));
        Self {
            schema_version: 1,
            log_path: base.join("data").join("mood_log.csv"),
            chart_path: base.join("visuals").join("daily_mood_chart.png"),
            backend_priority: vec!["deepface".to_string(), "fer".to_string()],
            deepface_url: "http://127.0.0.1:5005".to_string(),
            detector_backend: "opencv".to_string(),
            enforce_detection: false,
            fer_model_path: base.join("models").join("fer_mini_xception.onnx"),
            capture_command: default_capture_command(),
            poll_interval_secs: 5,
            recent_limit: 10,
        }
    }
}

impl Config {
    /// Load config from file, or create default
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .context("Failed to read config file")?;
            serde_json::from_str(&content)
                .context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }
        let content = serde_json::to_string_pretty(self)
            .context("Failed to serialize config")?;
        std::fs::write(path, content)
            .context("Failed to write config file")
    }

    /// Get the default config directory
    pub fn default_config_dir() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .context("Failed to get home directory")?;
        Ok(home.join(".moodtracker"))
    }

    /// Get the default config file path
    pub fn default_config_path() -> Result<PathBuf> {
        Ok(Self::default_config_dir()?.join("config.json"))
    }
}

#[cfg(target_os = "linux")]
fn default_capture_command() -> Vec<String> {
    [
        "ffmpeg", "-loglevel", "error", "-y", "-f", "v4l2", "-i", "/dev/video0", "-frames:v",
        "1", "{output}",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[cfg(target_os = "macos")]
fn default_capture_command() -> Vec<String> {
    ["imagesnap", "-q", "{output}"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
fn default_capture_command() -> Vec<String> {
    [
        "ffmpeg", "-loglevel", "error", "-y", "-f", "dshow", "-i", "video=Integrated Camera",
        "-frames:v", "1", "{output}",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
