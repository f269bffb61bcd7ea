//! Color masks of captured regions, saved for diagnostics.
//!
//! A mask keeps only the pixels that exactly match a sampled color and makes
//! everything else transparent. Masks are written once as `<unix-seconds>.png`
//! and never rewritten. A mask identical to one already in the directory is
//! not saved again.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use image::{ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};

use crate::capture::{self, Rect, ScreenSource};
use crate::error::ExportError;

/// Result of a mask export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// A new mask was written at this path
    Saved(PathBuf),
    /// An identical mask already exists; nothing was written
    Duplicate { existing: PathBuf },
}

/// Builds an RGBA mask: pixels equal to `color` stay opaque with their RGB,
/// all others become fully transparent black.
pub fn build_mask(frame: &RgbImage, color: Rgb<u8>) -> RgbaImage {
    RgbaImage::from_fn(frame.width(), frame.height(), |x, y| {
        let pixel = *frame.get_pixel(x, y);
        if pixel == color {
            let Rgb([r, g, b]) = pixel;
            Rgba([r, g, b, 255])
        } else {
            Rgba([0, 0, 0, 0])
        }
    })
}

/// Scans `dir` for a PNG whose dimensions and RGBA pixels equal `mask`.
///
/// Unreadable or undecodable files are skipped. A missing directory has no
/// duplicates.
pub fn find_duplicate(dir: &Path, mask: &RgbaImage) -> Result<Option<PathBuf>, ExportError> {
    if !dir.is_dir() {
        return Ok(None);
    }

    let entries = fs::read_dir(dir).map_err(|source| ExportError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    for entry in entries.flatten() {
        let path = entry.path();
        let is_png = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("png"));
        if !is_png || !path.is_file() {
            continue;
        }

        // Header-only check first so mismatched sizes never get decoded.
        match image::image_dimensions(&path) {
            Ok(dims) if dims == mask.dimensions() => {}
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!("Skipping unreadable mask {}: {}", path.display(), e);
                continue;
            }
        }

        match image::open(&path) {
            Ok(existing) if existing.to_rgba8().as_raw() == mask.as_raw() => {
                return Ok(Some(path));
            }
            Ok(_) => {}
            Err(e) => tracing::debug!("Skipping undecodable mask {}: {}", path.display(), e),
        }
    }

    Ok(None)
}

/// Saves `mask` into `dir` unless an identical image is already there.
///
/// Creates `dir` if needed. Existing files are never replaced: a second,
/// different mask saved within the same second fails with an `AlreadyExists`
/// I/O error.
pub fn save_mask(dir: &Path, mask: &RgbaImage) -> Result<ExportOutcome, ExportError> {
    if let Some(existing) = find_duplicate(dir, mask)? {
        tracing::info!("Mask identical to {}, not saving", existing.display());
        return Ok(ExportOutcome::Duplicate { existing });
    }

    fs::create_dir_all(dir).map_err(|source| ExportError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let path = dir.join(format!("{}.png", Utc::now().timestamp()));
    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .map_err(|source| ExportError::Io {
            path: path.clone(),
            source,
        })?;
    let mut writer = BufWriter::new(file);
    mask.write_to(&mut writer, ImageFormat::Png)?;
    writer.flush().map_err(|source| ExportError::Io {
        path: path.clone(),
        source,
    })?;
    tracing::info!("Saved mask to {}", path.display());

    Ok(ExportOutcome::Saved(path))
}

/// Captures `rect`, keeps only the pixels matching the color under
/// `sample_point`, and saves the mask into `dir` unless an identical one
/// exists.
pub fn export_mask(
    screen: &dyn ScreenSource,
    rect: &Rect,
    sample_point: (i32, i32),
    dir: &Path,
) -> Result<ExportOutcome, ExportError> {
    let frame = capture::capture(screen, rect)?;
    let color = capture::sample_pixel(screen, sample_point.0, sample_point.1)?;
    tracing::debug!("Mask color at {:?}: {:?}", sample_point, color);

    save_mask(dir, &build_mask(&frame, color))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn two_tone() -> RgbImage {
        RgbImage::from_fn(4, 2, |x, _| {
            if x % 2 == 0 { Rgb([200, 10, 10]) } else { Rgb([201, 10, 10]) }
        })
    }

    #[test]
    fn test_build_mask_exact_match_only() {
        let mask = build_mask(&two_tone(), Rgb([200, 10, 10]));

        assert_eq!(mask.dimensions(), (4, 2));
        assert_eq!(*mask.get_pixel(0, 0), Rgba([200, 10, 10, 255]));
        assert_eq!(*mask.get_pixel(1, 0), Rgba([0, 0, 0, 0]));
        assert_eq!(*mask.get_pixel(2, 1), Rgba([200, 10, 10, 255]));
    }

    #[test]
    fn test_save_mask_writes_timestamped_png() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("nested");
        let mask = build_mask(&two_tone(), Rgb([200, 10, 10]));

        let ExportOutcome::Saved(path) = save_mask(&target, &mask).unwrap() else {
            panic!("expected a new file");
        };

        assert_eq!(path.parent(), Some(target.as_path()));
        let stem = path.file_stem().unwrap().to_str().unwrap();
        assert!(stem.parse::<i64>().is_ok(), "file stem {stem} is not unix seconds");
        assert_eq!(image::open(&path).unwrap().to_rgba8(), mask);
    }

    #[test]
    fn test_save_mask_twice_is_duplicate() {
        let dir = tempdir().unwrap();
        let mask = build_mask(&two_tone(), Rgb([201, 10, 10]));

        let first = save_mask(dir.path(), &mask).unwrap();
        let second = save_mask(dir.path(), &mask).unwrap();

        let ExportOutcome::Saved(saved) = first else {
            panic!("first export should save");
        };
        assert_eq!(second, ExportOutcome::Duplicate { existing: saved });
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_save_mask_never_replaces_existing_file() {
        let dir = tempdir().unwrap();
        let first = build_mask(&two_tone(), Rgb([200, 10, 10]));
        let second = build_mask(&two_tone(), Rgb([201, 10, 10]));

        let ExportOutcome::Saved(first_path) = save_mask(dir.path(), &first).unwrap() else {
            panic!("first export should save");
        };
        match save_mask(dir.path(), &second) {
            Ok(ExportOutcome::Saved(second_path)) => assert_ne!(second_path, first_path),
            Err(ExportError::Io { path, source }) => {
                assert_eq!(path, first_path);
                assert_eq!(source.kind(), std::io::ErrorKind::AlreadyExists);
            }
            other => panic!("unexpected outcome {:?}", other),
        }

        assert_eq!(image::open(&first_path).unwrap().to_rgba8(), first);
    }

    #[test]
    fn test_save_mask_name_collision_is_an_error() {
        let dir = tempdir().unwrap();
        let now = Utc::now().timestamp();
        // Occupy the next few seconds' names with a different-sized image.
        let occupant = RgbaImage::from_pixel(1, 1, Rgba([1, 2, 3, 255]));
        for ts in now..now + 3 {
            occupant.save(dir.path().join(format!("{}.png", ts))).unwrap();
        }

        let mask = build_mask(&two_tone(), Rgb([200, 10, 10]));
        match save_mask(dir.path(), &mask) {
            Err(ExportError::Io { path, source }) => {
                assert_eq!(source.kind(), std::io::ErrorKind::AlreadyExists);
                assert_eq!(image::open(&path).unwrap().to_rgba8(), occupant);
            }
            other => panic!("expected a name collision, got {:?}", other),
        }
    }

    #[test]
    fn test_find_duplicate_ignores_different_content_and_size() {
        let dir = tempdir().unwrap();
        let mask = build_mask(&two_tone(), Rgb([200, 10, 10]));

        let other_color = build_mask(&two_tone(), Rgb([201, 10, 10]));
        other_color.save(dir.path().join("1.png")).unwrap();
        RgbaImage::new(3, 3).save(dir.path().join("2.png")).unwrap();
        fs::write(dir.path().join("3.png"), b"not a png").unwrap();
        fs::write(dir.path().join("notes.txt"), b"hello").unwrap();

        assert_eq!(find_duplicate(dir.path(), &mask).unwrap(), None);
    }

    #[test]
    fn test_find_duplicate_missing_dir() {
        let dir = tempdir().unwrap();
        let mask = RgbaImage::new(1, 1);
        assert_eq!(find_duplicate(&dir.path().join("absent"), &mask).unwrap(), None);
    }
}
