//! Mark an analysed frame with its detected emotion.
//!
//! No fonts are bundled, so the label is encoded as colour: the classified
//! centre square is outlined in the emotion's colour and a strip along the
//! bottom edge fills in proportion to the confidence.

use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;
use std::path::Path;
use tracing::debug;

use crate::analyzer::EmotionResult;
use crate::frame::Frame;

const OUTLINE_THICKNESS: u32 = 4;
const STRIP_HEIGHT: u32 = 12;
const STRIP_BACKGROUND: Rgb<u8> = Rgb([32, 32, 32]);
const UNKNOWN: Rgb<u8> = Rgb([160, 160, 160]);

/// Colour used for an emotion label
pub fn emotion_color(label: &str) -> Rgb<u8> {
    match label {
        "angry" => Rgb([220, 40, 40]),
        "disgust" => Rgb([110, 160, 40]),
        "fear" => Rgb([150, 60, 190]),
        "happy" => Rgb([250, 200, 30]),
        "sad" => Rgb([50, 110, 220]),
        "surprise" => Rgb([250, 130, 20]),
        "neutral" => Rgb([230, 230, 230]),
        _ => UNKNOWN,
    }
}

/// Draw the outline and confidence strip onto a copy of the frame
pub fn annotate_frame(frame: &Frame, result: &EmotionResult) -> RgbImage {
    let mut img = frame.to_rgb_image();
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return img;
    }

    let color = emotion_color(&result.dominant_emotion);

    let side = width.min(height);
    let x = ((width - side) / 2) as i32;
    let y = ((height - side) / 2) as i32;
    for inset in 0..OUTLINE_THICKNESS.min(side / 2) {
        let edge = side - 2 * inset;
        if edge == 0 {
            break;
        }
        draw_hollow_rect_mut(
            &mut img,
            Rect::at(x + inset as i32, y + inset as i32).of_size(edge, edge),
            color,
        );
    }

    let strip = STRIP_HEIGHT.min(height);
    let strip_top = (height - strip) as i32;
    draw_filled_rect_mut(
        &mut img,
        Rect::at(0, strip_top).of_size(width, strip),
        STRIP_BACKGROUND,
    );
    let filled = (result.confidence.clamp(0.0, 1.0) * width as f64).round() as u32;
    if filled > 0 {
        draw_filled_rect_mut(&mut img, Rect::at(0, strip_top).of_size(filled, strip), color);
    }

    img
}

/// Annotate and write the frame; the format follows the file extension
pub fn save_annotated_frame(frame: &Frame, result: &EmotionResult, output_path: &Path) -> Result<()> {
    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {:?}", parent))?;
    }

    annotate_frame(frame, result)
        .save(output_path)
        .with_context(|| format!("Failed to write annotated image to {:?}", output_path))?;

    debug!(
        "Annotated {} ({:.2}) to {:?}",
        result.dominant_emotion, result.confidence, output_path
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    fn result(emotion: &str, confidence: f64) -> EmotionResult {
        EmotionResult {
            dominant_emotion: emotion.to_string(),
            confidence,
            emotions: BTreeMap::from([(emotion.to_string(), confidence)]),
            timestamp: Utc::now(),
        }
    }

    fn gray_frame(width: u32, height: u32) -> Frame {
        Frame::from_bgr(width, height, vec![0; (width * height * 3) as usize]).unwrap()
    }

    #[test]
    fn test_known_labels_have_distinct_colors() {
        let labels = ["angry", "disgust", "fear", "happy", "sad", "surprise", "neutral"];
        for (i, a) in labels.iter().enumerate() {
            assert_ne!(emotion_color(a), UNKNOWN);
            for b in &labels[i + 1..] {
                assert_ne!(emotion_color(a), emotion_color(b));
            }
        }
        assert_eq!(emotion_color("contempt"), UNKNOWN);
    }

    #[test]
    fn test_outline_surrounds_centre_square() {
        let img = annotate_frame(&gray_frame(100, 60), &result("happy", 0.5));
        let happy = emotion_color("happy");

        // 60x60 square centred horizontally starts at x = 20
        assert_eq!(*img.get_pixel(20, 0), happy);
        assert_eq!(*img.get_pixel(79, 0), happy);
        assert_eq!(*img.get_pixel(23, 30), happy);
        assert_ne!(*img.get_pixel(10, 0), happy);
        assert_ne!(*img.get_pixel(50, 30), happy);
    }

    #[test]
    fn test_strip_tracks_confidence() {
        let img = annotate_frame(&gray_frame(100, 60), &result("sad", 0.25));
        let sad = emotion_color("sad");
        let y = 59;

        let filled = (0..100).filter(|&x| *img.get_pixel(x, y) == sad).count();
        assert_eq!(filled, 25);
        assert_eq!(*img.get_pixel(99, y), STRIP_BACKGROUND);
    }

    #[test]
    fn test_tiny_frame_does_not_panic() {
        let img = annotate_frame(&gray_frame(1, 1), &result("fear", 1.0));
        assert_eq!(img.dimensions(), (1, 1));
        let empty = Frame::from_bgr(0, 0, Vec::new()).unwrap();
        assert_eq!(annotate_frame(&empty, &result("fear", 1.0)).dimensions(), (0, 0));
    }

    #[test]
    fn test_save_annotated_png() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out").join("annotated.png");

        save_annotated_frame(&gray_frame(40, 30), &result("angry", 0.9), &path).unwrap();

        let reloaded = image::open(&path).unwrap().to_rgb8();
        assert_eq!(reloaded.dimensions(), (40, 30));
        assert_eq!(*reloaded.get_pixel(0, 29), emotion_color("angry"));
    }
}
