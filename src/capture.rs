//! Single-frame camera capture through an external command.
//!
//! The configured command (ffmpeg, imagesnap, ...) writes one image to a
//! path inside a fresh temporary directory. The device is opened and released
//! by that process on every call; nothing is held between captures.

use std::process::Command;
use thiserror::Error;
use tracing::{debug, info};

use crate::frame::Frame;

/// Placeholder in the capture command replaced with the output path
pub const OUTPUT_PLACEHOLDER: &str = "{output}";

const FRAME_FILENAME: &str = "frame.jpg";

/// Errors that can occur while capturing a frame
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Capture command is empty")]
    EmptyCommand,

    #[error("Failed to start capture command '{0}': {1}")]
    Spawn(String, std::io::Error),

    #[error("Camera unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Failed to decode captured frame: {0}")]
    Decode(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Camera capture via an external command
#[derive(Debug, Clone)]
pub struct CameraCapture {
    command: Vec<String>,
}

impl CameraCapture {
    pub fn new(command: Vec<String>) -> Result<Self, CaptureError> {
        if command.is_empty() {
            return Err(CaptureError::EmptyCommand);
        }
        Ok(Self { command })
    }

    pub fn command(&self) -> &[String] {
        &self.command
    }

    /// Capture one BGR frame
    pub fn capture(&self) -> Result<Frame, CaptureError> {
        let scratch = tempfile::Builder::new()
            .prefix("moodtracker-capture-")
            .tempdir()?;
        let output_path = scratch.path().join(FRAME_FILENAME);
        let output_str = output_path.to_string_lossy();

        let args: Vec<String> = self
            .command
            .iter()
            .map(|arg| arg.replace(OUTPUT_PLACEHOLDER, &output_str))
            .collect();
        let (program, rest) = args.split_first().ok_or(CaptureError::EmptyCommand)?;

        debug!("Running capture command: {:?}", args);
        let output = Command::new(program)
            .args(rest)
            .output()
            .map_err(|e| CaptureError::Spawn(program.clone(), e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CaptureError::DeviceUnavailable(format!(
                "{} exited with {}: {}",
                program,
                output.status,
                stderr.trim()
            )));
        }

        if !output_path.exists() {
            return Err(CaptureError::DeviceUnavailable(format!(
                "{} produced no image",
                program
            )));
        }

        let frame = Frame::open(&output_path).map_err(|e| CaptureError::Decode(format!("{:#}", e)))?;
        info!("Captured {}x{} frame", frame.width(), frame.height());
        // `scratch` is removed on drop
        Ok(frame)
    }
}
