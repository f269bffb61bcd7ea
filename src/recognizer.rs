//! The recognition engine: capture → preprocess → OCR → parse → fallback.

use std::path::Path;

use image::{Rgb, RgbImage};

use crate::capture::{self, Rect, ScreenSource};
use crate::error::{CaptureError, ExportError, OcrError, RecognitionError};
use crate::mask::{self, ExportOutcome};
use crate::ocr::{
    OcrAdapter, SegmentationConfig, WAVE_GLYPHS, extract_center_digits, parse_wave_number,
    prepare_for_ocr,
};

/// Tunables for a recognizer.
#[derive(Debug, Clone)]
pub struct RecognizerOptions {
    pub segmentation: SegmentationConfig,
    /// Run the digits-only center pass when the phrase parse misses
    pub fallback_enabled: bool,
}

impl Default for RecognizerOptions {
    fn default() -> Self {
        Self {
            segmentation: SegmentationConfig::default(),
            fallback_enabled: true,
        }
    }
}

/// Reads the wave number from a screen region.
///
/// Owns its screen source and OCR backend for its whole lifetime. All work
/// happens synchronously on the calling thread.
pub struct WaveRecognizer {
    screen: Box<dyn ScreenSource>,
    ocr: OcrAdapter,
    options: RecognizerOptions,
}

impl WaveRecognizer {
    pub fn new(screen: Box<dyn ScreenSource>, ocr: OcrAdapter, options: RecognizerOptions) -> Self {
        Self {
            screen,
            ocr,
            options,
        }
    }

    /// Captures the region spanned by two corners (any order) and reads the
    /// wave number from it.
    pub fn recognize(
        &self,
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
    ) -> Result<Option<String>, RecognitionError> {
        self.recognize_rect(&Rect::from_corners(x1, y1, x2, y2))
    }

    pub fn recognize_rect(&self, rect: &Rect) -> Result<Option<String>, RecognitionError> {
        let frame = capture::capture(self.screen.as_ref(), rect)?;
        Ok(self.recognize_frame(&frame)?)
    }

    /// Reads the wave number from an already captured frame.
    ///
    /// `Ok(None)` means no number was visible, which is the common case
    /// between waves.
    pub fn recognize_frame(&self, frame: &RgbImage) -> Result<Option<String>, OcrError> {
        let prepared = prepare_for_ocr(frame, &self.options.segmentation);
        tracing::debug!("Preprocessed with {:?}", prepared.strategy);

        let text = self.ocr.read_text(&prepared.image, WAVE_GLYPHS)?;
        if let Some(number) = parse_wave_number(&text) {
            tracing::info!("Wave number: {}", number);
            return Ok(Some(number));
        }

        if !self.options.fallback_enabled {
            tracing::debug!("No wave phrase in {:?}", text);
            return Ok(None);
        }

        tracing::debug!("No wave phrase in {:?}, trying center digits", text);
        let digits = extract_center_digits(frame, &self.ocr, &self.options.segmentation)?;
        match &digits {
            Some(number) => tracing::info!("Wave number (center digits): {}", number),
            None => tracing::debug!("No wave number found"),
        }
        Ok(digits)
    }

    /// Reads one screen pixel.
    pub fn sample_pixel(&self, x: i32, y: i32) -> Result<Rgb<u8>, CaptureError> {
        capture::sample_pixel(self.screen.as_ref(), x, y)
    }

    /// Exports a color mask of `rect`; see [`mask::export_mask`].
    pub fn export_mask(
        &self,
        rect: &Rect,
        sample_point: (i32, i32),
        dir: &Path,
    ) -> Result<ExportOutcome, ExportError> {
        mask::export_mask(self.screen.as_ref(), rect, sample_point, dir)
    }
}
