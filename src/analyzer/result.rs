use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::normalize::{dominant_label, normalize_scores, RawScores};

/// Raw output of one backend call for the first detected face
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Detection {
    pub scores: RawScores,
    /// Dominant label reported by the backend itself, if any
    pub reported_dominant: Option<String>,
}

impl Detection {
    pub fn new(scores: RawScores) -> Self {
        Self {
            scores,
            reported_dominant: None,
        }
    }

    pub fn with_reported_dominant(mut self, label: impl Into<String>) -> Self {
        self.reported_dominant = Some(label.into());
        self
    }
}

/// A single emotion prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionResult {
    pub dominant_emotion: String,
    /// Normalised share of the dominant label (0.0-1.0)
    pub confidence: f64,
    /// Full distribution, summing to 1.0
    pub emotions: BTreeMap<String, f64>,
    pub timestamp: DateTime<Utc>,
}

impl EmotionResult {
    /// Normalise a detection into a result stamped with `timestamp`.
    ///
    /// Returns `None` when the scores carry no usable mass.
    pub fn from_detection(detection: &Detection, timestamp: DateTime<Utc>) -> Option<Self> {
        let emotions = normalize_scores(&detection.scores);

        let dominant = match detection.reported_dominant.as_deref() {
            Some(label) if emotions.contains_key(label) => label.to_string(),
            _ => dominant_label(&emotions)?.to_string(),
        };
        let confidence = emotions.get(&dominant).copied().unwrap_or(0.0);

        Some(Self {
            dominant_emotion: dominant,
            confidence,
            emotions,
            timestamp,
        })
    }
}
