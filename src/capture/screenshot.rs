//! Live desktop capture.
//!
//! On Windows the region is copied out of the screen device context with GDI.
//! Elsewhere the `screenshots` feature provides capture; without it every grab fails.

use super::{Frame, Rect, ScreenSource};
use crate::error::CaptureError;

/// Captures regions of the live desktop in virtual-screen coordinates.
#[derive(Debug, Default, Clone, Copy)]
pub struct DesktopScreen;

impl DesktopScreen {
    pub fn new() -> Self {
        Self
    }
}

impl ScreenSource for DesktopScreen {
    fn grab(&self, rect: &Rect) -> Result<Frame, CaptureError> {
        tracing::debug!(
            "Capturing {}x{} at ({}, {})",
            rect.width,
            rect.height,
            rect.left,
            rect.top
        );
        grab_desktop(rect)
    }
}

/// Copies the region out of the screen DC into a top-down 32bpp DIB, then
/// converts BGRA to RGB.
#[cfg(windows)]
fn grab_desktop(rect: &Rect) -> Result<Frame, CaptureError> {
    use image::{Rgb, RgbImage};
    use windows::Win32::Foundation::HWND;
    use windows::Win32::Graphics::Gdi::{
        BI_RGB, BITMAPINFO, BITMAPINFOHEADER, BitBlt, CreateCompatibleBitmap, CreateCompatibleDC,
        DIB_RGB_COLORS, DeleteDC, DeleteObject, GetDC, GetDIBits, ReleaseDC, SRCCOPY, SelectObject,
    };

    let width = i32::try_from(rect.width)
        .map_err(|_| CaptureError::Backend(format!("region width {} too large", rect.width)))?;
    let height = i32::try_from(rect.height)
        .map_err(|_| CaptureError::Backend(format!("region height {} too large", rect.height)))?;

    let desktop = HWND(std::ptr::null_mut());
    let mut buffer = vec![0u8; rect.width as usize * rect.height as usize * 4];

    let (blit, lines) = unsafe {
        let screen_dc = GetDC(desktop);
        if screen_dc.is_invalid() {
            return Err(CaptureError::Backend(
                "GetDC failed for the desktop".to_string(),
            ));
        }

        let mem_dc = CreateCompatibleDC(screen_dc);
        let bitmap = CreateCompatibleBitmap(screen_dc, width, height);
        let previous = SelectObject(mem_dc, bitmap);

        let blit = BitBlt(
            mem_dc, 0, 0, width, height, screen_dc, rect.left, rect.top, SRCCOPY,
        );

        // Negative height requests a top-down DIB so rows come out in screen order.
        let mut info = BITMAPINFO {
            bmiHeader: BITMAPINFOHEADER {
                biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
                biWidth: width,
                biHeight: -height,
                biPlanes: 1,
                biBitCount: 32,
                biCompression: BI_RGB.0,
                ..Default::default()
            },
            ..Default::default()
        };

        let lines = GetDIBits(
            mem_dc,
            bitmap,
            0,
            height as u32,
            Some(buffer.as_mut_ptr().cast()),
            &mut info,
            DIB_RGB_COLORS,
        );

        SelectObject(mem_dc, previous);
        let _ = DeleteObject(bitmap);
        let _ = DeleteDC(mem_dc);
        let _ = ReleaseDC(desktop, screen_dc);

        (blit, lines)
    };

    blit.map_err(|e| CaptureError::Backend(format!("BitBlt failed: {}", e)))?;
    if lines != height {
        return Err(CaptureError::Backend(format!(
            "GetDIBits copied {} of {} rows",
            lines, height
        )));
    }

    let mut frame = RgbImage::new(rect.width, rect.height);
    for (pixel, bgra) in frame.pixels_mut().zip(buffer.chunks_exact(4)) {
        *pixel = Rgb([bgra[2], bgra[1], bgra[0]]);
    }
    Ok(frame)
}

#[cfg(all(not(windows), feature = "screenshots"))]
fn grab_desktop(rect: &Rect) -> Result<Frame, CaptureError> {
    use image::{DynamicImage, RgbaImage};
    use screenshots::Screen;

    let screen = Screen::from_point(rect.left, rect.top)
        .map_err(|e| CaptureError::Backend(format!("no display at ({}, {}): {}", rect.left, rect.top, e)))?;
    let captured = screen
        .capture_area(
            rect.left - screen.display_info.x,
            rect.top - screen.display_info.y,
            rect.width,
            rect.height,
        )
        .map_err(|e| CaptureError::Backend(e.to_string()))?;

    let bytes = captured.to_vec();
    let rgba = RgbaImage::from_raw(rect.width, rect.height, bytes).ok_or_else(|| {
        CaptureError::Backend("display returned an unexpected pixel buffer size".to_string())
    })?;

    Ok(DynamicImage::ImageRgba8(rgba).to_rgb8())
}

#[cfg(all(not(windows), not(feature = "screenshots")))]
fn grab_desktop(_rect: &Rect) -> Result<Frame, CaptureError> {
    Err(CaptureError::Backend(
        "no screen capture backend (build with the `screenshots` feature)".to_string(),
    ))
}
