//! Application configuration.
//!
//! Loaded from config.json at startup. Every field has a default so a partial
//! or missing file still yields a working setup.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::capture::Rect;
use crate::ocr::SegmentationConfig;
use crate::recognizer::RecognizerOptions;

/// Where and how to run Tesseract.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TesseractConfig {
    /// Explicit executable path; searched for when absent
    pub executable: Option<PathBuf>,
    /// Explicit tessdata directory; searched for when absent
    pub tessdata_dir: Option<PathBuf>,
    /// Tesseract language spec
    pub language: String,
    /// Page segmentation mode
    pub psm: u8,
}

impl Default for TesseractConfig {
    fn default() -> Self {
        Self {
            executable: None,
            tessdata_dir: None,
            language: "chi_sim+eng".to_string(),
            psm: 6,
        }
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Default capture region as two corners: [x1, y1, x2, y2]
    #[serde(default = "default_region")]
    pub region: [i32; 4],
    #[serde(default)]
    pub segmentation: SegmentationConfig,
    #[serde(default)]
    pub tesseract: TesseractConfig,
    /// Delay between recognitions while watching (milliseconds)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Run the digits-only center pass when the phrase parse misses
    #[serde(default = "default_fallback_enabled")]
    pub fallback_enabled: bool,
    /// Mask export directory; `<exe_dir>/masks` when absent
    #[serde(default)]
    pub mask_dir: Option<PathBuf>,
}

fn default_region() -> [i32; 4] {
    [800, 250, 1080, 350]
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_fallback_enabled() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            segmentation: SegmentationConfig::default(),
            tesseract: TesseractConfig::default(),
            poll_interval_ms: default_poll_interval_ms(),
            fallback_enabled: default_fallback_enabled(),
            mask_dir: None,
        }
    }
}

impl AppConfig {
    /// The configured default region.
    pub fn region_rect(&self) -> Rect {
        let [x1, y1, x2, y2] = self.region;
        Rect::from_corners(x1, y1, x2, y2)
    }

    pub fn mask_dir(&self) -> PathBuf {
        self.mask_dir
            .clone()
            .unwrap_or_else(crate::paths::get_masks_dir)
    }

    pub fn recognizer_options(&self) -> RecognizerOptions {
        RecognizerOptions {
            segmentation: self.segmentation.clone(),
            fallback_enabled: self.fallback_enabled,
        }
    }
}

/// Loads configuration from `path` or returns defaults.
///
/// A missing or malformed file is logged and falls back to defaults.
pub fn load_config(path: &Path) -> AppConfig {
    tracing::debug!("Looking for config at: {}", path.display());

    if !path.exists() {
        tracing::info!("{} not found. Using default config.", path.display());
        return AppConfig::default();
    }

    match fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(config) => {
                tracing::info!("Config loaded from {}", path.display());
                config
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to parse {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                AppConfig::default()
            }
        },
        Err(e) => {
            tracing::warn!("Failed to read {}: {}. Using defaults.", path.display(), e);
            AppConfig::default()
        }
    }
}

/// Writes `config` to `path` as pretty-printed JSON.
pub fn save_config(path: &Path, config: &AppConfig) -> Result<()> {
    let json = serde_json::to_string_pretty(config)?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = load_config(&dir.path().join("config.json"));
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.region_rect(), Rect::new(800, 250, 280, 100));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{ "region": [10, 10, 0, 0], "segmentation": { "max_distance": 40 } }"#,
        )
        .unwrap();

        let config = load_config(&path);
        assert_eq!(config.region_rect(), Rect::new(0, 0, 10, 10));
        assert_eq!(config.segmentation.max_distance, 40);
        assert_eq!(config.segmentation.target_color, [255, 255, 255]);
        assert_eq!(config.tesseract.language, "chi_sim+eng");
        assert_eq!(config.poll_interval_ms, 1000);
        assert!(config.fallback_enabled);
    }

    #[test]
    fn test_malformed_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        assert_eq!(load_config(&path), AppConfig::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = AppConfig {
            poll_interval_ms: 250,
            fallback_enabled: false,
            mask_dir: Some(PathBuf::from("out/masks")),
            ..Default::default()
        };

        save_config(&path, &config).unwrap();
        assert_eq!(load_config(&path), config);
        assert_eq!(config.mask_dir(), PathBuf::from("out/masks"));
    }
}
