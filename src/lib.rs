//! Wave number reader.
//!
//! Captures a screen region, isolates the "第X波" wave banner, runs Tesseract
//! over it and extracts the wave number. Also samples pixel colors and exports
//! deduplicated color masks of a region for tuning.

pub mod capture;
pub mod config;
pub mod error;
pub mod mask;
pub mod ocr;
pub mod paths;
pub mod recognizer;
pub mod regions;
pub mod watch;

#[cfg(test)]
mod testing;

pub use capture::{DesktopScreen, ImageScreen, Rect, ScreenSource, normalize_box};
pub use error::{CaptureError, ExportError, OcrError, RecognitionError};
pub use mask::ExportOutcome;
pub use recognizer::{RecognizerOptions, WaveRecognizer};
pub use watch::{WatchEvent, Watcher, spawn_watch};
