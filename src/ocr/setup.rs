use anyhow::{Context, Result, anyhow};
use std::fs;
use std::path::{Path, PathBuf};

use crate::paths::get_tesseract_dir;

const TESSDATA_REPO: &str = "https://github.com/tesseract-ocr/tessdata_fast/raw/main";

const TESSERACT_EXE: &str = if cfg!(windows) {
    "tesseract.exe"
} else {
    "tesseract"
};

const COMMON_EXECUTABLES: &[&str] = &[
    r"C:\Program Files\Tesseract-OCR\tesseract.exe",
    r"C:\Program Files (x86)\Tesseract-OCR\tesseract.exe",
    "/usr/bin/tesseract",
    "/usr/local/bin/tesseract",
    "/opt/homebrew/bin/tesseract",
];

const COMMON_TESSDATA_DIRS: &[&str] = &[
    r"C:\Program Files\Tesseract-OCR\tessdata",
    r"C:\Program Files (x86)\Tesseract-OCR\tessdata",
    "/usr/share/tesseract-ocr/5/tessdata",
    "/usr/share/tesseract-ocr/4.00/tessdata",
    "/usr/share/tessdata",
    "/usr/local/share/tessdata",
    "/opt/homebrew/share/tessdata",
];

/// Splits a Tesseract language spec like `chi_sim+eng` into its codes.
pub fn language_codes(language: &str) -> Vec<&str> {
    language
        .split('+')
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .collect()
}

/// True if `dir` holds a `.traineddata` file for every language in `language`.
pub fn has_languages(dir: &Path, language: &str) -> bool {
    let codes = language_codes(language);
    !codes.is_empty()
        && codes
            .iter()
            .all(|code| dir.join(format!("{}.traineddata", code)).is_file())
}

/// Finds the Tesseract executable.
///
/// Checks the configured path, the app-local tesseract directory, PATH, and
/// common install locations, in that order.
pub fn find_tesseract_executable(configured: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = configured {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        tracing::warn!(
            "Configured tesseract executable {} not found, searching",
            path.display()
        );
    }

    let local_exe = get_tesseract_dir().join(TESSERACT_EXE);
    if local_exe.is_file() {
        return Ok(local_exe);
    }

    // Check PATH
    if let Ok(output) = std::process::Command::new("tesseract")
        .arg("--version")
        .output()
    {
        if output.status.success() {
            return Ok(PathBuf::from("tesseract"));
        }
    }

    COMMON_EXECUTABLES
        .iter()
        .map(PathBuf::from)
        .find(|p| p.is_file())
        .ok_or_else(|| anyhow!("Tesseract not found. Please install Tesseract-OCR."))
}

/// Finds a tessdata directory holding every language in `language`.
///
/// Returns `None` when no candidate qualifies, in which case Tesseract falls
/// back to its compiled-in default.
pub fn find_tessdata_dir(configured: Option<&Path>, language: &str) -> Option<PathBuf> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Some(dir) = configured {
        candidates.push(dir.to_path_buf());
    }
    candidates.push(get_tesseract_dir().join("tessdata"));
    if let Ok(prefix) = std::env::var("TESSDATA_PREFIX") {
        let prefix = PathBuf::from(prefix);
        candidates.push(prefix.join("tessdata"));
        candidates.push(prefix);
    }
    candidates.extend(COMMON_TESSDATA_DIRS.iter().map(PathBuf::from));

    candidates
        .into_iter()
        .find(|dir| has_languages(dir, language))
}

/// Ensures trained data for every language in `language` is available,
/// copying from a system install or downloading into the app-local tessdata
/// directory when needed. Returns the directory to pass to Tesseract.
pub fn ensure_tessdata(language: &str) -> Result<PathBuf> {
    if let Some(dir) = find_tessdata_dir(None, language) {
        tracing::info!("Tessdata for {} found at: {}", language, dir.display());
        return Ok(dir);
    }

    let local = get_tesseract_dir().join("tessdata");
    fs::create_dir_all(&local)
        .with_context(|| format!("Failed to create {}", local.display()))?;

    for code in language_codes(language) {
        let target = local.join(format!("{}.traineddata", code));
        if target.is_file() {
            continue;
        }

        let system_copy = COMMON_TESSDATA_DIRS
            .iter()
            .map(|dir| Path::new(dir).join(format!("{}.traineddata", code)))
            .find(|p| p.is_file());

        match system_copy {
            Some(source) => {
                tracing::info!("Copying {}.traineddata from: {}", code, source.display());
                fs::copy(&source, &target)?;
            }
            None => download_traineddata(code, &target)?,
        }
    }

    tracing::info!("Tessdata ready at: {}", local.display());
    Ok(local)
}

/// Downloads `<code>.traineddata` from the tessdata_fast repository.
fn download_traineddata(code: &str, target: &Path) -> Result<()> {
    let url = format!("{}/{}.traineddata", TESSDATA_REPO, code);
    tracing::info!("Downloading {}", url);

    let client = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(300))
        .build()?;

    let response = client
        .get(&url)
        .header("User-Agent", "wave-number-ocr")
        .send()?;

    if !response.status().is_success() {
        return Err(anyhow!(
            "Failed to download {}.traineddata: HTTP {}",
            code,
            response.status()
        ));
    }

    let bytes = response.bytes()?;
    fs::write(target, &bytes).with_context(|| format!("Failed to write {}", target.display()))?;

    tracing::info!("Downloaded {}.traineddata ({} bytes)", code, bytes.len());
    Ok(())
}
