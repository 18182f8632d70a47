//! Backend capability detection and selection.
//!
//! Availability is probed once at startup and then treated as static for the
//! life of the process.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::deepface::DeepFaceClient;
use super::fer::FerModel;
use super::result::Detection;
use crate::config::Config;
use crate::frame::Frame;

/// Errors from a single backend detection call
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Failed to load model: {0}")]
    ModelLoad(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Feature not enabled")]
    FeatureNotEnabled,
}

/// Supported emotion backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    DeepFace,
    Fer,
}

impl BackendKind {
    pub const ALL: [BackendKind; 2] = [BackendKind::DeepFace, BackendKind::Fer];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DeepFace => "deepface",
            Self::Fer => "fer",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "deepface" => Ok(Self::DeepFace),
            "fer" => Ok(Self::Fer),
            _ => Err(format!("Unknown emotion backend: {}", s)),
        }
    }
}

/// Outcome of probing one backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capability {
    Available(BackendKind),
    Unavailable { kind: BackendKind, reason: String },
}

impl Capability {
    pub fn kind(&self) -> BackendKind {
        match self {
            Self::Available(kind) => *kind,
            Self::Unavailable { kind, .. } => *kind,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }
}

/// Availability of every known backend, determined once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendAvailability {
    capabilities: Vec<Capability>,
}

impl BackendAvailability {
    pub fn new(capabilities: Vec<Capability>) -> Self {
        Self { capabilities }
    }

    /// Probe every backend against the current configuration
    pub fn probe(config: &Config) -> Self {
        let capabilities = BackendKind::ALL
            .iter()
            .map(|kind| {
                let capability = match kind {
                    BackendKind::DeepFace => DeepFaceClient::probe(&config.deepface_url),
                    BackendKind::Fer => FerModel::probe(&config.fer_model_path),
                };
                match &capability {
                    Capability::Available(kind) => debug!("Backend {} available", kind),
                    Capability::Unavailable { kind, reason } => {
                        debug!("Backend {} unavailable: {}", kind, reason)
                    }
                }
                capability
            })
            .collect();
        Self { capabilities }
    }

    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    pub fn is_available(&self, kind: BackendKind) -> bool {
        self.capabilities
            .iter()
            .any(|c| c.kind() == kind && c.is_available())
    }

    pub fn any_available(&self) -> bool {
        self.capabilities.iter().any(Capability::is_available)
    }

    /// Reasons for every unavailable backend, joined for display
    pub fn unavailable_summary(&self) -> String {
        self.capabilities
            .iter()
            .filter_map(|c| match c {
                Capability::Unavailable { kind, reason } => Some(format!("{}: {}", kind, reason)),
                Capability::Available(_) => None,
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// First backend in `priority` that is available. Unknown names are skipped.
pub fn select_backend<S: AsRef<str>>(
    priority: &[S],
    availability: &BackendAvailability,
) -> Option<BackendKind> {
    for name in priority {
        match name.as_ref().parse::<BackendKind>() {
            Ok(kind) if availability.is_available(kind) => {
                info!("Using emotion backend: {}", kind);
                return Some(kind);
            }
            Ok(kind) => debug!("Skipping unavailable backend {}", kind),
            Err(e) => warn!("{}", e),
        }
    }
    None
}

/// A face-emotion classifier
pub trait EmotionBackend {
    fn kind(&self) -> BackendKind;

    /// Classify the first face in a BGR frame.
    ///
    /// `Ok(None)` means the backend ran but found no face.
    fn detect(&mut self, frame: &Frame) -> Result<Option<Detection>, BackendError>;
}

/// The closed set of concrete backends
pub enum Backend {
    DeepFace(DeepFaceClient),
    Fer(FerModel),
}

impl EmotionBackend for Backend {
    fn kind(&self) -> BackendKind {
        match self {
            Self::DeepFace(_) => BackendKind::DeepFace,
            Self::Fer(_) => BackendKind::Fer,
        }
    }

    fn detect(&mut self, frame: &Frame) -> Result<Option<Detection>, BackendError> {
        match self {
            Self::DeepFace(client) => client.detect(frame),
            Self::Fer(model) => model.detect(frame),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn availability(deepface: bool, fer: bool) -> BackendAvailability {
        let cap = |kind, ok| {
            if ok {
                Capability::Available(kind)
            } else {
                Capability::Unavailable {
                    kind,
                    reason: "not installed".to_string(),
                }
            }
        };
        BackendAvailability::new(vec![
            cap(BackendKind::DeepFace, deepface),
            cap(BackendKind::Fer, fer),
        ])
    }

    #[test]
    fn test_backend_kind_parse() {
        assert_eq!("deepface".parse::<BackendKind>().unwrap(), BackendKind::DeepFace);
        assert_eq!("FER".parse::<BackendKind>().unwrap(), BackendKind::Fer);
        assert!("opencv".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_backend_kind_serialization() {
        assert_eq!(serde_json::to_string(&BackendKind::DeepFace).unwrap(), "\"deepface\"");
        let kind: BackendKind = serde_json::from_str("\"fer\"").unwrap();
        assert_eq!(kind, BackendKind::Fer);
    }

    #[test]
    fn test_select_first_available_in_priority() {
        let avail = availability(true, true);
        assert_eq!(select_backend(&["deepface", "fer"], &avail), Some(BackendKind::DeepFace));
        assert_eq!(select_backend(&["fer", "deepface"], &avail), Some(BackendKind::Fer));
    }

    #[test]
    fn test_select_falls_through_unavailable() {
        let avail = availability(false, true);
        assert_eq!(select_backend(&["deepface", "fer"], &avail), Some(BackendKind::Fer));
    }

    #[test]
    fn test_select_none_available() {
        let avail = availability(false, false);
        assert_eq!(select_backend(&["deepface", "fer"], &avail), None);
        assert!(!avail.any_available());
        assert!(avail.unavailable_summary().contains("deepface: not installed"));
    }

    #[test]
    fn test_select_respects_priority_subset() {
        let avail = availability(true, false);
        assert_eq!(select_backend(&["fer"], &avail), None);
        let empty: [&str; 0] = [];
        assert_eq!(select_backend(&empty, &avail), None);
    }

    #[test]
    fn test_select_skips_unknown_names() {
        let avail = availability(false, true);
        assert_eq!(select_backend(&["mediapipe", "fer"], &avail), Some(BackendKind::Fer));
    }
}
