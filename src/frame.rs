//! Three-channel image frames in BGR order.
//!
//! Frames follow the camera convention of blue-green-red byte order. Backends
//! that want RGB convert on their side of the seam.

use anyhow::{Context, Result};
use image::{ImageReader, RgbImage};
use std::path::Path;

/// An owned BGR image buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Frame {
    /// Wrap raw BGR bytes. Returns `None` if the buffer length does not
    /// match `width * height * 3`.
    pub fn from_bgr(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        if data.len() != width as usize * height as usize * 3 {
            return None;
        }
        Some(Self {
            width,
            height,
            data,
        })
    }

    /// Build a frame from an RGB image, swapping to BGR order
    pub fn from_rgb_image(image: &RgbImage) -> Self {
        let mut data = image.as_raw().clone();
        swap_red_blue(&mut data);
        Self {
            width: image.width(),
            height: image.height(),
            data,
        }
    }

    /// Decode an image file. The format is sniffed from the content, so the
    /// extension does not have to match.
    pub fn open(path: &Path) -> Result<Self> {
        let decoded = ImageReader::open(path)
            .with_context(|| format!("Failed to open image {:?}", path))?
            .with_guessed_format()
            .with_context(|| format!("Failed to read image {:?}", path))?
            .decode()
            .with_context(|| format!("Failed to decode image {:?}", path))?;
        Ok(Self::from_rgb_image(&decoded.to_rgb8()))
    }

    /// Convert to an RGB image (BGR→RGB)
    pub fn to_rgb_image(&self) -> RgbImage {
        let mut data = self.data.clone();
        swap_red_blue(&mut data);
        // Length is checked on construction
        RgbImage::from_raw(self.width, self.height, data)
            .unwrap_or_else(|| RgbImage::new(self.width, self.height))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_bgr(&self) -> &[u8] {
        &self.data
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

fn swap_red_blue(pixels: &mut [u8]) {
    for px in pixels.chunks_exact_mut(3) {
        px.swap(0, 2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_from_bgr_rejects_wrong_length() {
        assert!(Frame::from_bgr(2, 2, vec![0; 11]).is_none());
        assert!(Frame::from_bgr(2, 2, vec![0; 12]).is_some());
    }

    #[test]
    fn test_rgb_image_is_stored_as_bgr() {
        let mut img = RgbImage::new(1, 1);
        img.put_pixel(0, 0, Rgb([10, 20, 30]));

        let frame = Frame::from_rgb_image(&img);
        assert_eq!(frame.as_bgr(), &[30, 20, 10]);
        assert_eq!(frame.to_rgb_image().get_pixel(0, 0), &Rgb([10, 20, 30]));
    }

    #[test]
    fn test_open_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Frame::open(&dir.path().join("nope.png")).is_err());
    }

    #[test]
    fn test_open_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("face.png");
        let mut img = RgbImage::new(4, 3);
        img.put_pixel(1, 1, Rgb([255, 0, 0]));
        img.save(&path).unwrap();

        let frame = Frame::open(&path).unwrap();
        assert_eq!((frame.width(), frame.height()), (4, 3));
        // Red pixel lands in the last byte of its BGR triple
        let idx = (4 + 1) * 3;
        assert_eq!(&frame.as_bgr()[idx..idx + 3], &[0, 0, 255]);
    }
}
