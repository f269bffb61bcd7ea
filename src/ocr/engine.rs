use std::path::PathBuf;
use std::process::Command;

use image::DynamicImage;
use tempfile::NamedTempFile;

use crate::error::OcrError;

/// Glyphs that can appear in a wave banner: digits, the 第/波 marker and unit
/// (plus their common misreads 弟/坡), Chinese numerals, and space.
pub const WAVE_GLYPHS: &str = "0123456789第弟波坡零一二三四五六七八九十两 ";

/// Allowlist for the digits-only fallback pass.
pub const DIGIT_GLYPHS: &str = "0123456789";

/// An external text recognizer.
///
/// Returns recognized text fragments in whatever order the backend produces.
/// Backends that cannot restrict their vocabulary report
/// `OcrError::AllowlistUnsupported` when given an allowlist.
pub trait OcrBackend: Send {
    fn recognize(
        &self,
        image: &DynamicImage,
        allowlist: Option<&str>,
    ) -> Result<Vec<String>, OcrError>;
}

/// Wraps a long-lived OCR backend and joins its fragments into one text blob.
pub struct OcrAdapter {
    backend: Box<dyn OcrBackend>,
}

impl OcrAdapter {
    pub fn new(backend: Box<dyn OcrBackend>) -> Self {
        Self { backend }
    }

    /// Recognizes `image` restricted to `allowlist`, retrying without the
    /// restriction if the backend does not support one.
    ///
    /// Fragments are joined with newlines. Their order is backend-defined.
    pub fn read_text(&self, image: &DynamicImage, allowlist: &str) -> Result<String, OcrError> {
        let fragments = match self.backend.recognize(image, Some(allowlist)) {
            Err(OcrError::AllowlistUnsupported) => {
                tracing::warn!("OCR backend rejected the allowlist, retrying without it");
                self.backend.recognize(image, None)?
            }
            other => other?,
        };

        for (idx, fragment) in fragments.iter().enumerate() {
            tracing::debug!("OCR fragment [{}] {:?}", idx, fragment);
        }

        Ok(fragments.join("\n"))
    }
}

/// Runs the Tesseract executable on a temporary PNG and reads TSV output.
#[derive(Debug, Clone)]
pub struct TesseractBackend {
    executable: PathBuf,
    tessdata_dir: Option<PathBuf>,
    language: String,
    psm: u8,
}

impl TesseractBackend {
    pub fn new(executable: PathBuf, language: impl Into<String>) -> Self {
        Self {
            executable,
            tessdata_dir: None,
            language: language.into(),
            psm: 6,
        }
    }

    pub fn with_tessdata_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.tessdata_dir = dir;
        self
    }

    /// Page segmentation mode (6 = single uniform block of text).
    pub fn with_psm(mut self, psm: u8) -> Self {
        self.psm = psm;
        self
    }
}

impl OcrBackend for TesseractBackend {
    fn recognize(
        &self,
        image: &DynamicImage,
        allowlist: Option<&str>,
    ) -> Result<Vec<String>, OcrError> {
        let temp_input = NamedTempFile::with_suffix(".png")?;
        image.save(temp_input.path())?;

        let mut command = Command::new(&self.executable);
        command.arg(temp_input.path()).arg("stdout");
        if let Some(dir) = &self.tessdata_dir {
            command.arg("--tessdata-dir").arg(dir);
        }
        command
            .arg("-l")
            .arg(&self.language)
            .arg("--psm")
            .arg(self.psm.to_string());
        if let Some(chars) = allowlist {
            command
                .arg("-c")
                .arg(format!("tessedit_char_whitelist={}", chars));
        }
        command.arg("tsv");

        let output = command.output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if allowlist.is_some() && stderr.contains("tessedit_char_whitelist") {
                return Err(OcrError::AllowlistUnsupported);
            }
            return Err(OcrError::Inference(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(parse_tsv_paragraphs(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Parses Tesseract TSV output into paragraph fragments.
///
/// Words sharing a (block, paragraph) pair are merged with single spaces;
/// paragraphs keep the order Tesseract emitted them in.
pub fn parse_tsv_paragraphs(tsv: &str) -> Vec<String> {
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current_key: Option<(i32, i32)> = None;
    let mut current_words: Vec<&str> = Vec::new();

    for line in tsv.lines().skip(1) {
        // TSV fields: level, page_num, block_num, par_num, line_num, word_num,
        //             left, top, width, height, conf, text
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 12 {
            continue;
        }

        // Level 5 = word
        let level: i32 = fields[0].parse().unwrap_or(-1);
        if level != 5 {
            continue;
        }

        let conf: f32 = fields[10].parse().unwrap_or(-1.0);
        let text = fields[11].trim();
        if text.is_empty() || conf < 0.0 {
            continue;
        }

        let block: i32 = fields[2].parse().unwrap_or(-1);
        let par: i32 = fields[3].parse().unwrap_or(-1);
        let key = (block, par);

        if current_key != Some(key) && !current_words.is_empty() {
            paragraphs.push(current_words.join(" "));
            current_words.clear();
        }
        current_key = Some(key);
        current_words.push(text);
    }

    if !current_words.is_empty() {
        paragraphs.push(current_words.join(" "));
    }

    paragraphs
}
