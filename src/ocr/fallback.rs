//! Digits-only second pass over the middle of the frame.
//!
//! In the wave banner the marker and unit glyphs sit near the left and right
//! edges with the number between them. When the phrase parse fails, cropping
//! the center and reading only digits often still recovers the number. This is
//! a positional heuristic, not a semantic parse.

use image::RgbImage;

use super::engine::{DIGIT_GLYPHS, OcrAdapter};
use super::preprocess::{RelativeRect, SegmentationConfig, crop_region, prepare_for_ocr};
use crate::error::OcrError;

/// Horizontal center 40% of the frame, full height.
pub const CENTER_BAND: RelativeRect = RelativeRect {
    x: 0.3,
    y: 0.0,
    width: 0.4,
    height: 1.0,
};

/// Re-reads the center band of `frame` with a digits-only allowlist.
///
/// Returns every digit found across all fragments, concatenated in fragment
/// order, or `None` if there were none.
pub fn extract_center_digits(
    frame: &RgbImage,
    ocr: &OcrAdapter,
    segmentation: &SegmentationConfig,
) -> Result<Option<String>, OcrError> {
    let cropped = crop_region(frame, &CENTER_BAND);
    if cropped.width() == 0 || cropped.height() == 0 {
        tracing::debug!("Frame too small for fallback digit crop");
        return Ok(None);
    }

    let prepared = prepare_for_ocr(&cropped, segmentation);
    let text = ocr.read_text(&prepared.image, DIGIT_GLYPHS)?;
    let digits = collect_digits(&text);

    tracing::debug!("Fallback digit pass read {:?} -> {:?}", text, digits);
    Ok(digits)
}

/// Concatenates the ASCII digits in `text`, or `None` if there are none.
pub fn collect_digits(text: &str) -> Option<String> {
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() { None } else { Some(digits) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedOcr;
    use image::Rgb;

    #[test]
    fn test_collect_digits_across_fragments() {
        assert_eq!(collect_digits("1\n 2a"), Some("12".to_string()));
        assert_eq!(collect_digits("第波"), None);
        assert_eq!(collect_digits(""), None);
    }

    #[test]
    fn test_extract_center_digits_uses_digit_allowlist() {
        let ocr = ScriptedOcr::new(vec![Ok(vec!["4".to_string(), "2".to_string()])]);
        let calls = ocr.calls();
        let adapter = OcrAdapter::new(Box::new(ocr));
        let frame = RgbImage::from_pixel(100, 20, Rgb([20, 20, 20]));

        let digits = extract_center_digits(&frame, &adapter, &SegmentationConfig::default());
        assert_eq!(digits.unwrap(), Some("42".to_string()));
        assert_eq!(*calls.lock().unwrap(), vec![Some(DIGIT_GLYPHS.to_string())]);
    }

    #[test]
    fn test_extract_center_digits_no_digits_is_none() {
        let ocr = ScriptedOcr::new(vec![Ok(vec!["波".to_string()])]);
        let adapter = OcrAdapter::new(Box::new(ocr));
        let frame = RgbImage::from_pixel(100, 20, Rgb([20, 20, 20]));

        let digits = extract_center_digits(&frame, &adapter, &SegmentationConfig::default());
        assert_eq!(digits.unwrap(), None);
    }

    #[test]
    fn test_extract_center_digits_skips_tiny_frames() {
        let ocr = ScriptedOcr::new(Vec::new());
        let calls = ocr.calls();
        let adapter = OcrAdapter::new(Box::new(ocr));
        let frame = RgbImage::from_pixel(2, 2, Rgb([20, 20, 20]));

        let digits = extract_center_digits(&frame, &adapter, &SegmentationConfig::default());
        assert_eq!(digits.unwrap(), None);
        assert!(calls.lock().unwrap().is_empty());
    }
}
