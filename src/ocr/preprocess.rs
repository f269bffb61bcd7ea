use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use serde::{Deserialize, Serialize};

/// Frames narrower than this are upscaled x3 instead of x2.
const SMALL_FRAME_WIDTH: u32 = 400;

/// Contrast gain applied by the generic enhancement.
pub const CONTRAST_GAIN: f32 = 1.6;

/// Brightness gain applied by the generic enhancement.
pub const BRIGHTNESS_GAIN: f32 = 1.1;

/// A sub-area of a frame as fractions of its size, e.g. the center band the
/// digit fallback reads from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RelativeRect {
    /// Left edge as a fraction of frame width
    pub x: f32,
    /// Top edge as a fraction of frame height
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Color segmentation parameters.
///
/// The defaults were fit against the in-game wave banner; keep them unless
/// the UI palette changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Foreground color the glyphs are drawn in
    pub target_color: [u8; 3],
    /// Maximum L1 (sum of per-channel differences) distance to count as foreground
    pub max_distance: u32,
    /// Below this foreground ratio the mask is considered noise
    pub min_ratio: f32,
    /// Above this foreground ratio the mask is considered background bleed
    pub max_ratio: f32,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            target_color: [255, 255, 255],
            max_distance: 90,
            min_ratio: 0.01,
            max_ratio: 0.45,
        }
    }
}

impl SegmentationConfig {
    /// Whether a mask with this foreground ratio is worth handing to OCR.
    pub fn is_plausible(&self, ratio: f32) -> bool {
        ratio >= self.min_ratio && ratio <= self.max_ratio
    }
}

/// Which preprocessing strategy produced an OCR input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PreprocessStrategy {
    /// Binary white-on-black mask from color segmentation
    Segmented,
    /// Upscaled, contrast-enhanced RGB
    Enhanced,
}

/// An image ready for OCR. Never persisted.
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub image: DynamicImage,
    pub strategy: PreprocessStrategy,
    /// Foreground ratio measured by segmentation, whichever strategy won
    pub foreground_ratio: f32,
}

/// Upscale factor for a frame of the given width.
pub fn upscale_factor(width: u32) -> u32 {
    if width < SMALL_FRAME_WIDTH { 3 } else { 2 }
}

/// Prepares a captured frame for OCR.
///
/// Tries color segmentation first and only trusts the mask when its
/// foreground ratio falls inside the configured band. Otherwise falls back to
/// the generic contrast enhancement.
pub fn prepare_for_ocr(frame: &RgbImage, config: &SegmentationConfig) -> PreparedImage {
    let (mask, ratio) = segment_color(frame, config);

    if config.is_plausible(ratio) {
        let factor = upscale_factor(frame.width());
        let scaled = imageops::resize(
            &mask,
            frame.width() * factor,
            frame.height() * factor,
            FilterType::Nearest,
        );
        tracing::debug!("Color segmentation accepted (foreground ratio {:.4})", ratio);
        return PreparedImage {
            image: DynamicImage::ImageLuma8(autocontrast_luma(&scaled)),
            strategy: PreprocessStrategy::Segmented,
            foreground_ratio: ratio,
        };
    }

    tracing::debug!(
        "Color segmentation rejected (foreground ratio {:.4} outside {}..={}), using enhancement",
        ratio,
        config.min_ratio,
        config.max_ratio
    );
    PreparedImage {
        image: DynamicImage::ImageRgb8(enhance(frame)),
        strategy: PreprocessStrategy::Enhanced,
        foreground_ratio: ratio,
    }
}

/// Generic enhancement: bicubic upscale, auto-contrast, contrast 1.6, brightness 1.1.
pub fn enhance(frame: &RgbImage) -> RgbImage {
    let factor = upscale_factor(frame.width());
    let scaled = imageops::resize(
        frame,
        frame.width() * factor,
        frame.height() * factor,
        FilterType::CatmullRom,
    );
    let stretched = autocontrast(&scaled);
    let contrasted = adjust_contrast(&stretched, CONTRAST_GAIN);
    adjust_brightness(&contrasted, BRIGHTNESS_GAIN)
}

/// Marks pixels within `max_distance` (L1) of the target color as white
/// foreground, everything else black.
///
/// Returns the mask and its foreground ratio.
pub fn segment_color(img: &RgbImage, config: &SegmentationConfig) -> (GrayImage, f32) {
    let [tr, tg, tb] = config.target_color;
    let mut foreground: u64 = 0;

    let mask = GrayImage::from_fn(img.width(), img.height(), |x, y| {
        let Rgb([r, g, b]) = *img.get_pixel(x, y);
        let distance = r.abs_diff(tr) as u32 + g.abs_diff(tg) as u32 + b.abs_diff(tb) as u32;
        if distance <= config.max_distance {
            foreground += 1;
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    });

    let total = img.width() as u64 * img.height() as u64;
    let ratio = if total == 0 {
        0.0
    } else {
        foreground as f32 / total as f32
    };

    (mask, ratio)
}

/// Builds a lookup table stretching `lo..=hi` onto `0..=255`.
fn stretch_lut(lo: u8, hi: u8) -> [u8; 256] {
    let mut lut = [0u8; 256];
    if hi <= lo {
        for (i, v) in lut.iter_mut().enumerate() {
            *v = i as u8;
        }
        return lut;
    }

    let (lo, hi) = (lo as usize, hi as usize);
    for (i, v) in lut.iter_mut().enumerate() {
        *v = match i {
            i if i <= lo => 0,
            i if i >= hi => 255,
            i => ((i - lo) * 255 / (hi - lo)) as u8,
        };
    }
    lut
}

/// Per-channel auto-contrast: maps each channel's darkest value to 0 and
/// brightest to 255.
pub fn autocontrast(img: &RgbImage) -> RgbImage {
    let mut lo = [u8::MAX; 3];
    let mut hi = [u8::MIN; 3];
    for pixel in img.pixels() {
        for c in 0..3 {
            lo[c] = lo[c].min(pixel[c]);
            hi[c] = hi[c].max(pixel[c]);
        }
    }

    let luts = [
        stretch_lut(lo[0], hi[0]),
        stretch_lut(lo[1], hi[1]),
        stretch_lut(lo[2], hi[2]),
    ];

    let mut output = img.clone();
    for pixel in output.pixels_mut() {
        for c in 0..3 {
            pixel[c] = luts[c][pixel[c] as usize];
        }
    }
    output
}

/// Single-channel auto-contrast.
pub fn autocontrast_luma(img: &GrayImage) -> GrayImage {
    let (lo, hi) = img
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p[0]), hi.max(p[0])));
    let lut = stretch_lut(lo, hi);

    let mut output = img.clone();
    for pixel in output.pixels_mut() {
        pixel[0] = lut[pixel[0] as usize];
    }
    output
}

/// Scales each channel's distance from the mean grey level by `factor`.
pub fn adjust_contrast(img: &RgbImage, factor: f32) -> RgbImage {
    let count = img.width() as u64 * img.height() as u64;
    if count == 0 {
        return img.clone();
    }

    // Mean of ITU-R 601 luma, rounded to the nearest level.
    let luma_sum: u64 = img
        .pixels()
        .map(|p| (p[0] as u64 * 299 + p[1] as u64 * 587 + p[2] as u64 * 114) / 1000)
        .sum();
    let mean = (luma_sum as f32 / count as f32 + 0.5).floor();

    let mut output = img.clone();
    for pixel in output.pixels_mut() {
        for c in 0..3 {
            pixel[c] = (mean + factor * (pixel[c] as f32 - mean)).clamp(0.0, 255.0) as u8;
        }
    }
    output
}

/// Multiplies every channel by `factor`.
pub fn adjust_brightness(img: &RgbImage, factor: f32) -> RgbImage {
    let mut output = img.clone();
    for pixel in output.pixels_mut() {
        for c in 0..3 {
            pixel[c] = (pixel[c] as f32 * factor).clamp(0.0, 255.0) as u8;
        }
    }
    output
}

/// Cuts `band` out of `frame`. Fractions are truncated to whole pixels and
/// the band is clipped to the frame, so the result may be empty.
pub fn crop_region(frame: &RgbImage, band: &RelativeRect) -> RgbImage {
    let (left, width) = band_span(band.x, band.width, frame.width());
    let (top, height) = band_span(band.y, band.height, frame.height());

    imageops::crop_imm(frame, left, top, width, height).to_image()
}

/// Start and length in pixels of a fractional span along an axis of `total`.
fn band_span(start: f32, len: f32, total: u32) -> (u32, u32) {
    let start = ((start * total as f32) as u32).min(total);
    let len = ((len * total as f32) as u32).min(total - start);
    (start, len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upscale_factor_threshold() {
        assert_eq!(upscale_factor(120), 3);
        assert_eq!(upscale_factor(399), 3);
        assert_eq!(upscale_factor(400), 2);
        assert_eq!(upscale_factor(1280), 2);
    }

    #[test]
    fn test_enhance_scales_small_and_wide_frames() {
        let small = RgbImage::from_pixel(100, 20, Rgb([40, 40, 40]));
        assert_eq!(enhance(&small).dimensions(), (300, 60));

        let wide = RgbImage::from_pixel(500, 20, Rgb([40, 40, 40]));
        assert_eq!(enhance(&wide).dimensions(), (1000, 40));
    }

    #[test]
    fn test_autocontrast_stretches_each_channel() {
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, Rgb([50, 10, 7]));
        img.put_pixel(1, 0, Rgb([150, 20, 7]));

        let result = autocontrast(&img);
        assert_eq!(*result.get_pixel(0, 0), Rgb([0, 0, 7]));
        assert_eq!(*result.get_pixel(1, 0), Rgb([255, 255, 7]));
    }

    #[test]
    fn test_adjust_contrast_pushes_away_from_mean() {
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, Rgb([100, 100, 100]));
        img.put_pixel(1, 0, Rgb([200, 200, 200]));

        // Mean grey is 150: 100 -> 70, 200 -> 230.
        let result = adjust_contrast(&img, 1.6);
        assert_eq!(*result.get_pixel(0, 0), Rgb([70, 70, 70]));
        assert_eq!(*result.get_pixel(1, 0), Rgb([230, 230, 230]));
    }

    #[test]
    fn test_adjust_brightness_clamps() {
        let img = RgbImage::from_pixel(1, 1, Rgb([100, 240, 0]));
        let result = adjust_brightness(&img, 1.1);
        assert_eq!(*result.get_pixel(0, 0), Rgb([110, 255, 0]));
    }

    #[test]
    fn test_segment_color_marks_near_pixels() {
        let config = SegmentationConfig::default();
        let mut img = RgbImage::from_pixel(4, 1, Rgb([0, 0, 0]));
        img.put_pixel(0, 0, Rgb([255, 255, 255]));
        img.put_pixel(1, 0, Rgb([225, 225, 225])); // distance 90: still foreground
        img.put_pixel(2, 0, Rgb([224, 225, 225])); // distance 91

        let (mask, ratio) = segment_color(&img, &config);
        assert_eq!(mask.get_pixel(0, 0)[0], 255);
        assert_eq!(mask.get_pixel(1, 0)[0], 255);
        assert_eq!(mask.get_pixel(2, 0)[0], 0);
        assert_eq!(mask.get_pixel(3, 0)[0], 0);
        assert!((ratio - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_prepare_uses_segmentation_when_ratio_plausible() {
        // 10% of the frame is white glyph ink on a dark background.
        let frame = RgbImage::from_fn(100, 10, |x, _| {
            if x < 10 { Rgb([250, 250, 250]) } else { Rgb([30, 60, 90]) }
        });

        let prepared = prepare_for_ocr(&frame, &SegmentationConfig::default());
        assert_eq!(prepared.strategy, PreprocessStrategy::Segmented);
        assert_eq!(prepared.image.width(), 300);
        assert_eq!(prepared.image.height(), 30);

        let luma = prepared.image.to_luma8();
        assert_eq!(luma.get_pixel(0, 0)[0], 255);
        assert_eq!(luma.get_pixel(299, 29)[0], 0);
    }

    #[test]
    fn test_prepare_falls_back_when_mask_too_sparse() {
        let frame = RgbImage::from_pixel(100, 10, Rgb([30, 60, 90]));
        let prepared = prepare_for_ocr(&frame, &SegmentationConfig::default());
        assert_eq!(prepared.strategy, PreprocessStrategy::Enhanced);
        assert_eq!(prepared.foreground_ratio, 0.0);
    }

    #[test]
    fn test_prepare_falls_back_when_mask_too_dense() {
        let frame = RgbImage::from_pixel(100, 10, Rgb([255, 255, 255]));
        let prepared = prepare_for_ocr(&frame, &SegmentationConfig::default());
        assert_eq!(prepared.strategy, PreprocessStrategy::Enhanced);
        assert!(matches!(prepared.image, DynamicImage::ImageRgb8(_)));
    }

    #[test]
    fn test_crop_region() {
        let img = RgbImage::from_fn(100, 200, |x, y| Rgb([x as u8, y as u8, 0]));

        let region = RelativeRect { x: 0.1, y: 0.25, width: 0.5, height: 0.1 };
        let cropped = crop_region(&img, &region);

        assert_eq!(cropped.dimensions(), (50, 20));
        assert_eq!(cropped.get_pixel(0, 0)[0], 10);
        assert_eq!(cropped.get_pixel(0, 0)[1], 50);
    }

    #[test]
    fn test_crop_region_clamps() {
        let img = RgbImage::new(100, 100);
        let region = RelativeRect { x: 0.9, y: 0.9, width: 0.5, height: 0.5 };
        let cropped = crop_region(&img, &region);

        assert_eq!(cropped.dimensions(), (10, 10));
    }

    #[test]
    fn test_crop_region_past_edge_is_empty() {
        let img = RgbImage::new(40, 10);
        let band = RelativeRect { x: 1.0, y: 0.0, width: 0.4, height: 1.0 };
        assert_eq!(crop_region(&img, &band).dimensions(), (0, 10));
    }
}
