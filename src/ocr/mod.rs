pub mod engine;
pub mod extract;
pub mod fallback;
pub mod preprocess;
pub mod setup;

pub use engine::{DIGIT_GLYPHS, OcrAdapter, OcrBackend, TesseractBackend, WAVE_GLYPHS};
pub use extract::{chinese_numeral_to_int, parse_wave_number};
pub use fallback::extract_center_digits;
pub use preprocess::{PreparedImage, PreprocessStrategy, SegmentationConfig, prepare_for_ocr};
pub use setup::{ensure_tessdata, find_tessdata_dir, find_tesseract_executable};
