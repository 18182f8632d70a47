//! FER backend using the mini-Xception ONNX model.
//!
//! The model takes a 64x64 grayscale face scaled to [-1, 1] (NHWC
//! `[1, 64, 64, 1]`) and outputs one score per label in [`FER_LABELS`]
//! order. Face localisation is left to the capture side: the centred square
//! of the frame is classified.

#[cfg(feature = "fer")]
use ort::{
    session::{builder::GraphOptimizationLevel, Session},
    value::Value,
};
use image::imageops::{self, FilterType};
use std::path::Path;

use super::backend::{BackendError, BackendKind, Capability};
#[cfg(feature = "fer")]
use super::normalize::RawScores;
use super::result::Detection;
use crate::frame::Frame;

/// Output order of the mini-Xception classifier
pub const FER_LABELS: [&str; 7] = ["angry", "disgust", "fear", "happy", "sad", "surprise", "neutral"];

/// Model input edge length
pub const FER_INPUT_SIZE: u32 = 64;

/// Centre-crop, grayscale and scale a BGR frame into model input
#[cfg_attr(not(feature = "fer"), allow(dead_code))]
fn preprocess(frame: &Frame) -> Option<Vec<f32>> {
    if frame.is_empty() {
        return None;
    }

    let rgb = frame.to_rgb_image();
    let side = rgb.width().min(rgb.height());
    let x = (rgb.width() - side) / 2;
    let y = (rgb.height() - side) / 2;
    let square = imageops::crop_imm(&rgb, x, y, side, side).to_image();
    let gray = imageops::grayscale(&square);
    let resized = imageops::resize(&gray, FER_INPUT_SIZE, FER_INPUT_SIZE, FilterType::Triangle);

    Some(
        resized
            .as_raw()
            .iter()
            .map(|&p| (p as f32 / 255.0 - 0.5) * 2.0)
            .collect(),
    )
}

/// Emotion classifier backed by an ONNX session
#[cfg(feature = "fer")]
pub struct FerModel {
    session: Session,
}

#[cfg(feature = "fer")]
impl FerModel {
    /// Load the model from disk
    pub fn new(model_path: &Path, n_threads: usize) -> Result<Self, BackendError> {
        if !model_path.exists() {
            return Err(BackendError::ModelLoad(format!(
                "Model not found at {:?}",
                model_path
            )));
        }

        let session = Session::builder()
            .map_err(|e: ort::Error| BackendError::ModelLoad(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e: ort::Error| BackendError::ModelLoad(e.to_string()))?
            .with_intra_threads(n_threads)
            .map_err(|e: ort::Error| BackendError::ModelLoad(e.to_string()))?
            .commit_from_file(model_path)
            .map_err(|e: ort::Error| BackendError::ModelLoad(e.to_string()))?;

        tracing::info!("FER model loaded from {:?}", model_path);

        Ok(Self { session })
    }

    pub fn probe(model_path: &Path) -> Capability {
        if model_path.exists() {
            Capability::Available(BackendKind::Fer)
        } else {
            Capability::Unavailable {
                kind: BackendKind::Fer,
                reason: format!("Model not found at {:?}", model_path),
            }
        }
    }

    pub fn detect(&mut self, frame: &Frame) -> Result<Option<Detection>, BackendError> {
        let Some(input) = preprocess(frame) else {
            return Ok(None);
        };

        let side = FER_INPUT_SIZE as usize;
        let input_shape = [1_usize, side, side, 1];
        let input_tensor = Value::from_array((input_shape, input))
            .map_err(|e: ort::Error| BackendError::Inference(e.to_string()))?;

        let outputs = self
            .session
            .run(ort::inputs![input_tensor])
            .map_err(|e: ort::Error| BackendError::Inference(e.to_string()))?;

        let output = outputs
            .iter()
            .next()
            .ok_or_else(|| BackendError::Inference("No output from model".to_string()))?;

        let output_tensor = output
            .1
            .try_extract_tensor::<f32>()
            .map_err(|e: ort::Error| BackendError::Inference(e.to_string()))?;

        let values: Vec<f32> = output_tensor.1.iter().copied().collect();
        if values.len() != FER_LABELS.len() {
            tracing::warn!("Unexpected output shape from FER model: {}", values.len());
            return Err(BackendError::InvalidResponse(format!(
                "expected {} scores, got {}",
                FER_LABELS.len(),
                values.len()
            )));
        }

        let scores: RawScores = FER_LABELS
            .iter()
            .zip(values)
            .map(|(label, v)| (label.to_string(), v as f64))
            .collect();

        tracing::debug!("FER scores: {:?}", scores);
        Ok(Some(Detection::new(scores)))
    }
}

// Stub implementation when feature is not enabled
#[cfg(not(feature = "fer"))]
pub struct FerModel;

#[cfg(not(feature = "fer"))]
impl FerModel {
    pub fn new(_model_path: &Path, _n_threads: usize) -> Result<Self, BackendError> {
        Err(BackendError::FeatureNotEnabled)
    }

    pub fn probe(_model_path: &Path) -> Capability {
        Capability::Unavailable {
            kind: BackendKind::Fer,
            reason: "built without the `fer` feature".to_string(),
        }
    }

    pub fn detect(&mut self, _frame: &Frame) -> Result<Option<Detection>, BackendError> {
        Err(BackendError::FeatureNotEnabled)
    }
}
