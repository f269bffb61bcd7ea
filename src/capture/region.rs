//! Capture region geometry.

use serde::{Deserialize, Serialize};

/// Normalizes two arbitrary corner points into `(left, top, right, bottom)`.
///
/// The corners may be given in any order; the result always satisfies
/// `left <= right` and `top <= bottom`.
pub fn normalize_box(x1: i32, y1: i32, x2: i32, y2: i32) -> (i32, i32, i32, i32) {
    (x1.min(x2), y1.min(y2), x1.max(x2), y1.max(y2))
}

/// A screen rectangle in absolute pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(left: i32, top: i32, width: u32, height: u32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Builds a rectangle from two opposite corners given in any order.
    pub fn from_corners(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        let (left, top, right, bottom) = normalize_box(x1, y1, x2, y2);
        Self {
            left,
            top,
            width: right.abs_diff(left),
            height: bottom.abs_diff(top),
        }
    }

    pub fn right(&self) -> i64 {
        self.left as i64 + self.width as i64
    }

    pub fn bottom(&self) -> i64 {
        self.top as i64 + self.height as i64
    }

    /// True when either side is zero; such a region cannot be captured.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}
