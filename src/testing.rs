//! Test doubles shared by the unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use image::{DynamicImage, Rgb, RgbImage};

use crate::capture::ImageScreen;
use crate::error::OcrError;
use crate::ocr::OcrBackend;

/// OCR backend that replays scripted responses and records the allowlist of
/// every call. Once the script runs out it keeps returning `repeat`.
pub struct ScriptedOcr {
    responses: Mutex<VecDeque<Result<Vec<String>, OcrError>>>,
    repeat: Vec<String>,
    calls: Arc<Mutex<Vec<Option<String>>>>,
}

impl ScriptedOcr {
    pub fn new(responses: Vec<Result<Vec<String>, OcrError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            repeat: Vec::new(),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Always answers with the single fragment `text`.
    pub fn repeating(text: &str) -> Self {
        let mut ocr = Self::new(Vec::new());
        ocr.repeat = vec![text.to_string()];
        ocr
    }

    /// Handle onto the recorded allowlists, usable after the backend is boxed.
    pub fn calls(&self) -> Arc<Mutex<Vec<Option<String>>>> {
        Arc::clone(&self.calls)
    }
}

impl OcrBackend for ScriptedOcr {
    fn recognize(
        &self,
        _image: &DynamicImage,
        allowlist: Option<&str>,
    ) -> Result<Vec<String>, OcrError> {
        self.calls.lock().unwrap().push(allowlist.map(str::to_string));
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(self.repeat.clone()))
    }
}

/// A screen whose pixel at (x, y) is `Rgb([x, y, 0])`.
pub fn gradient_screen(width: u32, height: u32) -> ImageScreen {
    ImageScreen::new(RgbImage::from_fn(width, height, |x, y| {
        Rgb([x as u8, y as u8, 0])
    }))
}
