//! Screen capture for recognition regions.
//!
//! This module provides:
//! - Region geometry (`Rect`, `normalize_box`)
//! - The `ScreenSource` abstraction over pixel capture
//! - Live desktop capture (`DesktopScreen`) and still-image capture (`ImageScreen`)

pub mod region;
pub mod screenshot;
pub mod still;

pub use region::{Rect, normalize_box};
pub use screenshot::DesktopScreen;
pub use still::ImageScreen;

use image::{Rgb, RgbImage};

use crate::error::CaptureError;

/// A captured frame: the RGB pixels of one region, owned by the caller.
pub type Frame = RgbImage;

/// Something that can hand back the pixels of a screen rectangle.
///
/// Implementations may assume the rectangle is non-empty; `capture` checks that.
pub trait ScreenSource: Send {
    fn grab(&self, rect: &Rect) -> Result<Frame, CaptureError>;
}

/// Captures `rect` from `source`, rejecting zero-sized regions.
pub fn capture(source: &dyn ScreenSource, rect: &Rect) -> Result<Frame, CaptureError> {
    if rect.is_empty() {
        return Err(CaptureError::EmptyRegion {
            width: rect.width,
            height: rect.height,
        });
    }

    let frame = source.grab(rect)?;
    if frame.dimensions() != (rect.width, rect.height) {
        return Err(CaptureError::Backend(format!(
            "expected a {}x{} frame, backend returned {}x{}",
            rect.width,
            rect.height,
            frame.width(),
            frame.height()
        )));
    }

    Ok(frame)
}

/// Reads the color of a single screen pixel as a 1x1 capture.
pub fn sample_pixel(source: &dyn ScreenSource, x: i32, y: i32) -> Result<Rgb<u8>, CaptureError> {
    let frame = capture(source, &Rect::new(x, y, 1, 1))?;
    Ok(*frame.get_pixel(0, 0))
}
