//! DeepFace backend, served by the DeepFace REST API (`deepface api`).
//!
//! Frames are JPEG-encoded and posted as a base64 data URI to `/analyze`.
//! The service answers with one entry per detected face; only the first face
//! is used.

use base64::{engine::general_purpose::STANDARD, Engine};
use image::codecs::jpeg::JpegEncoder;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

use super::backend::{BackendError, BackendKind, Capability};
use super::normalize::RawScores;
use super::result::Detection;
use crate::frame::Frame;

/// Timeout for a single analysis request
const ANALYZE_TIMEOUT: Duration = Duration::from_secs(60);

/// Timeout for the startup availability probe
const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

const JPEG_QUALITY: u8 = 90;

#[derive(Debug, Serialize)]
struct AnalyzeRequest<'a> {
    img: String,
    actions: [&'a str; 1],
    detector_backend: &'a str,
    enforce_detection: bool,
}

/// Client for a running DeepFace service
#[derive(Debug)]
pub struct DeepFaceClient {
    client: reqwest::blocking::Client,
    base_url: String,
    detector_backend: String,
    enforce_detection: bool,
}

impl DeepFaceClient {
    pub fn new(
        base_url: &str,
        detector_backend: &str,
        enforce_detection: bool,
    ) -> Result<Self, String> {
        let cleaned_url = base_url.trim_end_matches('/');

        let parsed = reqwest::Url::parse(cleaned_url)
            .map_err(|e| format!("Invalid DeepFace URL '{}': {}", cleaned_url, e))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(format!(
                "DeepFace URL must use http or https scheme, got: {}",
                parsed.scheme()
            ));
        }

        let client = reqwest::blocking::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(ANALYZE_TIMEOUT)
            .build()
            .map_err(|e| format!("Failed to create HTTP client: {}", e))?;

        info!(
            "DeepFaceClient created for {} (detector: {})",
            cleaned_url, detector_backend
        );

        Ok(Self {
            client,
            base_url: cleaned_url.to_string(),
            detector_backend: detector_backend.to_string(),
            enforce_detection,
        })
    }

    /// Check whether the service answers at `base_url`
    pub fn probe(base_url: &str) -> Capability {
        let unavailable = |reason: String| Capability::Unavailable {
            kind: BackendKind::DeepFace,
            reason,
        };

        let client = match reqwest::blocking::Client::builder()
            .timeout(PROBE_TIMEOUT)
            .build()
        {
            Ok(client) => client,
            Err(e) => return unavailable(format!("Failed to create HTTP client: {}", e)),
        };

        let url = format!("{}/", base_url.trim_end_matches('/'));
        debug!("Probing DeepFace service at {}", url);
        match client.get(&url).send() {
            Ok(response) if response.status().is_success() => {
                Capability::Available(BackendKind::DeepFace)
            }
            Ok(response) => unavailable(format!(
                "DeepFace service at {} answered {}",
                base_url,
                response.status()
            )),
            Err(e) => unavailable(format!("DeepFace service not reachable at {}: {}", base_url, e)),
        }
    }

    pub fn detect(&mut self, frame: &Frame) -> Result<Option<Detection>, BackendError> {
        if frame.is_empty() {
            return Ok(None);
        }

        let jpeg = encode_jpeg(frame)?;
        let request = AnalyzeRequest {
            img: format!("data:image/jpeg;base64,{}", STANDARD.encode(&jpeg)),
            actions: ["emotion"],
            detector_backend: &self.detector_backend,
            enforce_detection: self.enforce_detection,
        };

        let url = format!("{}/analyze", self.base_url);
        debug!("Posting {} byte frame to {}", jpeg.len(), url);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .map_err(|e| BackendError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            // DeepFace answers 400 when enforce_detection is on and no face is found
            let body = response.text().unwrap_or_default();
            return Err(BackendError::Inference(format!(
                "DeepFace returned {}: {}",
                status,
                truncate(&body, 200)
            )));
        }

        let body: Value = response
            .json()
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;

        Ok(parse_analysis(&body))
    }
}

/// Convert BGR to RGB and JPEG-encode
fn encode_jpeg(frame: &Frame) -> Result<Vec<u8>, BackendError> {
    let rgb = frame.to_rgb_image();
    let mut buf = Vec::new();
    {
        let mut encoder = JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY);
        encoder
            .encode_image(&rgb)
            .map_err(|e| BackendError::Inference(format!("JPEG encode failed: {}", e)))?;
    }
    Ok(buf)
}

/// Extract the first face's emotion scores from an `/analyze` response.
///
/// Accepts `{"results": [...]}`, a bare list, or a single face object.
fn parse_analysis(body: &Value) -> Option<Detection> {
    let first = match body {
        Value::Object(map) => match map.get("results") {
            Some(Value::Array(faces)) => faces.first()?,
            Some(_) => return None,
            None => body,
        },
        Value::Array(faces) => faces.first()?,
        _ => return None,
    };

    let emotions = first
        .get("emotion")
        .or_else(|| first.get("emotions"))?
        .as_object()?;

    let scores: RawScores = emotions
        .iter()
        .filter_map(|(label, value)| coerce_score(value).map(|v| (label.clone(), v)))
        .collect();
    if scores.is_empty() {
        return None;
    }

    let mut detection = Detection::new(scores);
    if let Some(dominant) = first.get("dominant_emotion").and_then(Value::as_str) {
        if !dominant.is_empty() {
            detection = detection.with_reported_dominant(dominant);
        }
    }
    Some(detection)
}

/// Numbers and numeric strings become `f64`; anything else is dropped
fn coerce_score(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
