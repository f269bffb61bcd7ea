//! Error types surfaced by the recognition engine.
//!
//! A missing wave number is not an error: parsing reports it as `None`.

use std::path::PathBuf;

use thiserror::Error;

/// Screen capture failures.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("capture region must have a positive size, got {width}x{height}")]
    EmptyRegion { width: u32, height: u32 },
    #[error("screen capture failed: {0}")]
    Backend(String),
}

/// Failures raised by the OCR backend during recognition.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("OCR backend does not accept a character allowlist")]
    AllowlistUnsupported,
    #[error("OCR inference failed: {0}")]
    Inference(String),
    #[error("OCR I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode image for OCR: {0}")]
    Image(#[from] image::ImageError),
}

/// Failures of a full capture → OCR recognition pass.
#[derive(Debug, Error)]
pub enum RecognitionError {
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Inference(#[from] OcrError),
}

/// Failures while exporting a color mask.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error("mask export I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write mask image: {0}")]
    Image(#[from] image::ImageError),
}
