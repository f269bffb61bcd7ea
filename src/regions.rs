//! Named capture regions saved in regions.json.
//!
//! Regions are soft-deleted: a deleted region stays in the file with
//! `"deleted": true` so it can be restored later.
//!
//! ```json
//! {
//!   "wave banner": { "left": 800, "top": 250, "width": 280, "height": 100 }
//! }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::capture::Rect;

/// A saved screen region.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRegion {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
    #[serde(default, skip_serializing_if = "is_false")]
    pub deleted: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl NamedRegion {
    /// Creates a region from two corners given in any order.
    pub fn from_points(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        let rect = Rect::from_corners(x1, y1, x2, y2);
        Self {
            left: rect.left,
            top: rect.top,
            width: rect.width,
            height: rect.height,
            deleted: false,
        }
    }

    pub fn right(&self) -> i64 {
        self.rect().right()
    }

    pub fn bottom(&self) -> i64 {
        self.rect().bottom()
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.left, self.top, self.width, self.height)
    }
}

/// Loads all regions from `path`, keyed by name.
///
/// A missing or unparseable file yields an empty map; individual malformed
/// entries are skipped.
pub fn load_regions(path: &Path) -> BTreeMap<String, NamedRegion> {
    let mut regions = BTreeMap::new();

    let Ok(contents) = fs::read_to_string(path) else {
        return regions;
    };
    let Ok(serde_json::Value::Object(entries)) = serde_json::from_str::<serde_json::Value>(&contents)
    else {
        tracing::warn!("{} is not a JSON object, ignoring it", path.display());
        return regions;
    };

    for (name, value) in entries {
        match serde_json::from_value::<NamedRegion>(value) {
            Ok(region) => {
                regions.insert(name, region);
            }
            Err(e) => tracing::warn!("Skipping malformed region {:?}: {}", name, e),
        }
    }

    regions
}

/// Writes every region, soft-deleted ones included, to `path`.
pub fn save_regions(path: &Path, regions: &BTreeMap<String, NamedRegion>) -> Result<()> {
    let json = serde_json::to_string_pretty(regions)?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

/// Human-readable description of a region.
pub fn format_region(region: &NamedRegion) -> String {
    format!(
        "left={}, top={}, width={}, height={} (right={}, bottom={})",
        region.left,
        region.top,
        region.width,
        region.height,
        region.right(),
        region.bottom()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_from_points_any_order() {
        let region = NamedRegion::from_points(300, 400, 100, 200);
        assert_eq!((region.left, region.top, region.width, region.height), (100, 200, 200, 200));
        assert_eq!(region.right(), 300);
        assert_eq!(region.bottom(), 400);
        assert!(!region.deleted);
    }

    #[test]
    fn test_save_and_load_keeps_deleted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("regions.json");

        let mut regions = BTreeMap::new();
        regions.insert("banner".to_string(), NamedRegion::from_points(800, 250, 1080, 350));
        let mut old = NamedRegion::from_points(0, 0, 10, 10);
        old.deleted = true;
        regions.insert("old".to_string(), old);

        save_regions(&path, &regions).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written.matches("deleted").count(), 1);

        assert_eq!(load_regions(&path), regions);
    }

    #[test]
    fn test_load_skips_malformed_entries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("regions.json");
        fs::write(
            &path,
            r#"{
                "good": { "left": 1, "top": 2, "width": 3, "height": 4 },
                "missing": { "left": 1, "top": 2 },
                "wrong": "nope"
            }"#,
        )
        .unwrap();

        let regions = load_regions(&path);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions["good"].rect(), Rect::new(1, 2, 3, 4));
    }

    #[test]
    fn test_load_missing_or_invalid_file() {
        let dir = tempdir().unwrap();
        assert!(load_regions(&dir.path().join("absent.json")).is_empty());

        let path = dir.path().join("regions.json");
        fs::write(&path, "[1, 2, 3]").unwrap();
        assert!(load_regions(&path).is_empty());
    }

    #[test]
    fn test_format_region() {
        let region = NamedRegion::from_points(10, 20, 110, 70);
        assert_eq!(
            format_region(&region),
            "left=10, top=20, width=100, height=50 (right=110, bottom=70)"
        );
    }
}
