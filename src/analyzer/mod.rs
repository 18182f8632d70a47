//! Emotion analysis over interchangeable face-emotion backends.
//!
//! Two backends are supported: a DeepFace REST service and an in-process FER
//! ONNX model. Which ones exist is decided once at startup by
//! [`BackendAvailability::probe`]; the analyzer is built from the first
//! available backend in priority order and then passed by reference to
//! whatever loop needs it.

mod backend;
mod deepface;
mod fer;
mod normalize;
mod result;

pub use backend::{
    select_backend, Backend, BackendAvailability, BackendError, BackendKind, Capability,
    EmotionBackend,
};
pub use deepface::DeepFaceClient;
pub use fer::{FerModel, FER_LABELS};
pub use normalize::{dominant_label, normalize_scores, RawScores};
pub use result::{Detection, EmotionResult};

use chrono::Utc;
use thiserror::Error;
use tracing::debug;

use crate::config::Config;
use crate::frame::Frame;

/// Threads for in-process inference
const FER_THREADS: usize = 1;

/// Errors constructing an analyzer
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("No emotion detection backend available ({0}). Start the DeepFace service or install the FER model.")]
    BackendUnavailable(String),

    #[error("Failed to initialise {backend} backend: {reason}")]
    BackendInit { backend: BackendKind, reason: String },
}

/// Emotion analyzer bound to a single backend
pub struct EmotionAnalyzer<B: EmotionBackend = Backend> {
    backend: B,
}

impl EmotionAnalyzer<Backend> {
    /// Build the analyzer from the first available backend in
    /// `config.backend_priority`.
    pub fn new(config: &Config, availability: &BackendAvailability) -> Result<Self, AnalyzerError> {
        let kind = select_backend(&config.backend_priority, availability).ok_or_else(|| {
            let reason = if availability.any_available() {
                format!(
                    "none of [{}] is available",
                    config.backend_priority.join(", ")
                )
            } else {
                availability.unavailable_summary()
            };
            AnalyzerError::BackendUnavailable(reason)
        })?;

        let backend = match kind {
            BackendKind::DeepFace => DeepFaceClient::new(
                &config.deepface_url,
                &config.detector_backend,
                config.enforce_detection,
            )
            .map(Backend::DeepFace)
            .map_err(|reason| AnalyzerError::BackendInit {
                backend: kind,
                reason,
            })?,
            BackendKind::Fer => FerModel::new(&config.fer_model_path, FER_THREADS)
                .map(Backend::Fer)
                .map_err(|e| AnalyzerError::BackendInit {
                    backend: kind,
                    reason: e.to_string(),
                })?,
        };

        Ok(Self { backend })
    }
}

impl<B: EmotionBackend> EmotionAnalyzer<B> {
    /// Wrap an already constructed backend
    pub fn with_backend(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    /// Infer the emotion for a single BGR frame.
    ///
    /// Returns `None` when no face is found, when the backend fails, or when
    /// its scores cannot be normalised. None of these are errors: the caller
    /// moves on to the next frame.
    pub fn analyze(&mut self, frame: &Frame) -> Option<EmotionResult> {
        if frame.is_empty() {
            debug!("Received empty frame for analysis");
            return None;
        }

        let detection = match self.backend.detect(frame) {
            Ok(Some(detection)) => detection,
            Ok(None) => {
                debug!("{} found no face in frame", self.backend.kind());
                return None;
            }
            Err(e) => {
                debug!("{} failed to analyze frame: {}", self.backend.kind(), e);
                return None;
            }
        };

        let result = EmotionResult::from_detection(&detection, Utc::now());
        if result.is_none() {
            debug!("{} returned no usable scores", self.backend.kind());
        }
        result
    }
}
