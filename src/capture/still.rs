//! Capture from a still image standing in for the desktop.

use std::path::Path;

use anyhow::{Context, Result};
use image::RgbImage;

use super::{Frame, Rect, ScreenSource};
use crate::error::CaptureError;

/// A still image treated as the whole desktop, with its top-left pixel at `origin`.
///
/// Used to run recognition against saved screenshots, and as a deterministic
/// screen in tests.
#[derive(Debug, Clone)]
pub struct ImageScreen {
    image: RgbImage,
    origin: (i32, i32),
}

impl ImageScreen {
    pub fn new(image: RgbImage) -> Self {
        Self {
            image,
            origin: (0, 0),
        }
    }

    /// Places the image's top-left pixel at the given desktop coordinate.
    pub fn with_origin(mut self, x: i32, y: i32) -> Self {
        self.origin = (x, y);
        self
    }

    /// Loads a screenshot file.
    pub fn open(path: &Path) -> Result<Self> {
        let image = image::open(path)
            .with_context(|| format!("Failed to open screenshot {}", path.display()))?
            .to_rgb8();
        Ok(Self::new(image))
    }
}

impl ScreenSource for ImageScreen {
    fn grab(&self, rect: &Rect) -> Result<Frame, CaptureError> {
        let x = rect.left as i64 - self.origin.0 as i64;
        let y = rect.top as i64 - self.origin.1 as i64;
        let (w, h) = self.image.dimensions();

        if x < 0 || y < 0 || x + rect.width as i64 > w as i64 || y + rect.height as i64 > h as i64
        {
            return Err(CaptureError::Backend(format!(
                "region {}x{} at ({}, {}) lies outside the {}x{} screenshot",
                rect.width, rect.height, rect.left, rect.top, w, h
            )));
        }

        Ok(image::imageops::crop_imm(&self.image, x as u32, y as u32, rect.width, rect.height)
            .to_image())
    }
}
