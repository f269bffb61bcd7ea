//! wave-number-ocr
//!
//! Command line front end: reads the wave number from a screen region, polls
//! it, samples pixels, exports color masks and manages saved regions.

use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, Parser, Subcommand};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

use wave_number_ocr::config::{AppConfig, load_config, save_config};
use wave_number_ocr::ocr::{
    OcrAdapter, TesseractBackend, ensure_tessdata, find_tessdata_dir, find_tesseract_executable,
};
use wave_number_ocr::regions::{NamedRegion, format_region, load_regions, save_regions};
use wave_number_ocr::{
    DesktopScreen, ExportOutcome, ImageScreen, Rect, ScreenSource, WatchEvent, WaveRecognizer,
    capture, mask, paths, spawn_watch,
};

const LOG_FILE: &str = "wave_number_ocr.log";

/// Reads the "第X波" wave number from the screen
#[derive(Parser, Debug)]
#[command(name = "wave-number-ocr", version)]
struct Cli {
    /// Config file (defaults to config.json next to the executable)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Read from a saved screenshot instead of the live desktop
    #[arg(long, global = true)]
    screenshot: Option<PathBuf>,

    /// Desktop coordinate of the screenshot's top-left pixel
    #[arg(
        long,
        global = true,
        num_args = 2,
        value_names = ["X", "Y"],
        allow_negative_numbers = true,
        requires = "screenshot"
    )]
    origin: Option<Vec<i32>>,

    #[command(subcommand)]
    command: Command,
}

/// Where to capture: explicit corners, a saved region, or the configured default.
#[derive(Args, Debug)]
struct Target {
    /// Two opposite corners, in any order
    #[arg(
        num_args = 4,
        value_names = ["X1", "Y1", "X2", "Y2"],
        allow_negative_numbers = true
    )]
    corners: Option<Vec<i32>>,

    /// Use a region saved with `region save`
    #[arg(long, conflicts_with = "corners")]
    region: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read the wave number once and print it, or `null`
    Recognize(Target),

    /// Poll the wave number and print each reading
    Watch {
        #[command(flatten)]
        target: Target,

        /// Milliseconds between readings (defaults to the config value)
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Stop after this many readings
        #[arg(long)]
        count: Option<u64>,
    },

    /// Print the color of one screen pixel as `R G B`
    Sample {
        #[arg(allow_negative_numbers = true)]
        x: i32,
        #[arg(allow_negative_numbers = true)]
        y: i32,
    },

    /// Save a mask of the pixels in a region matching the color at --at
    ExportMask {
        #[arg(
            num_args = 4,
            required = true,
            value_names = ["X1", "Y1", "X2", "Y2"],
            allow_negative_numbers = true
        )]
        corners: Vec<i32>,

        /// Pixel whose color is kept
        #[arg(
            long,
            num_args = 2,
            required = true,
            value_names = ["SX", "SY"],
            allow_negative_numbers = true
        )]
        at: Vec<i32>,

        /// Output directory (defaults to the config value)
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Manage saved regions
    #[command(subcommand)]
    Region(RegionCommand),

    /// Write the effective configuration to the config file
    InitConfig,

    /// Locate Tesseract and fetch missing trained data
    Setup,
}

#[derive(Subcommand, Debug)]
enum RegionCommand {
    /// Save (or overwrite) a named region
    Save {
        name: String,
        #[arg(
            num_args = 4,
            required = true,
            value_names = ["X1", "Y1", "X2", "Y2"],
            allow_negative_numbers = true
        )]
        corners: Vec<i32>,
    },

    /// List saved regions
    List {
        /// Include deleted regions
        #[arg(long)]
        all: bool,
    },

    /// Mark a region as deleted
    Delete { name: String },

    /// Undo a delete
    Restore { name: String },
}

fn init_logging() -> Result<()> {
    paths::ensure_directories()?;
    let log_path = paths::get_logs_dir().join(LOG_FILE);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open {}", log_path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_ansi(false)
        .with_writer(std::io::stderr.and(Mutex::new(file)))
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))
}

fn install_panic_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        let msg = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        let location = panic_info
            .location()
            .map(|loc| format!(" at {}:{}:{}", loc.file(), loc.line(), loc.column()))
            .unwrap_or_default();
        tracing::error!("[PANIC]{} {}", location, msg);
    }));
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging()?;
    install_panic_hook();

    let config_path = cli.config.clone().unwrap_or_else(paths::get_config_path);
    let config = load_config(&config_path);

    match &cli.command {
        Command::Recognize(target) => {
            let rect = resolve_target(target, &config)?;
            let recognizer = build_recognizer(&cli, &config)?;
            match recognizer.recognize_rect(&rect)? {
                Some(wave) => println!("{}", wave),
                None => println!("null"),
            }
        }
        Command::Watch {
            target,
            interval_ms,
            count,
        } => {
            let rect = resolve_target(target, &config)?;
            let interval = Duration::from_millis(interval_ms.unwrap_or(config.poll_interval_ms));
            run_watch(build_recognizer(&cli, &config)?, rect, interval, *count)?;
        }
        Command::Sample { x, y } => {
            let screen = build_screen(&cli)?;
            let color = capture::sample_pixel(screen.as_ref(), *x, *y)?;
            let [r, g, b] = color.0;
            println!("{} {} {}", r, g, b);
        }
        Command::ExportMask { corners, at, dir } => {
            let rect = rect_from_corners(corners)?;
            let sample_point = match at.as_slice() {
                &[x, y] => (x, y),
                _ => bail!("--at takes exactly two values"),
            };
            let dir = dir.clone().unwrap_or_else(|| config.mask_dir());
            let screen = build_screen(&cli)?;
            match mask::export_mask(screen.as_ref(), &rect, sample_point, &dir)? {
                ExportOutcome::Saved(path) => println!("{}", path.display()),
                ExportOutcome::Duplicate { existing } => {
                    println!("duplicate of {}", existing.display())
                }
            }
        }
        Command::Region(command) => run_region_command(command, &paths::get_regions_path())?,
        Command::InitConfig => {
            save_config(&config_path, &config)?;
            println!("{}", config_path.display());
        }
        Command::Setup => run_setup(&config)?,
    }

    Ok(())
}

fn rect_from_corners(corners: &[i32]) -> Result<Rect> {
    match corners {
        &[x1, y1, x2, y2] => Ok(Rect::from_corners(x1, y1, x2, y2)),
        _ => bail!("Expected four coordinates, got {}", corners.len()),
    }
}

/// Explicit corners win, then a saved region, then the configured default.
fn resolve_target(target: &Target, config: &AppConfig) -> Result<Rect> {
    if let Some(corners) = &target.corners {
        return rect_from_corners(corners);
    }

    if let Some(name) = &target.region {
        let regions = load_regions(&paths::get_regions_path());
        return match regions.get(name) {
            Some(region) if !region.deleted => Ok(region.rect()),
            _ => bail!("No saved region named {:?}", name),
        };
    }

    Ok(config.region_rect())
}

fn build_screen(cli: &Cli) -> Result<Box<dyn ScreenSource>> {
    let Some(path) = &cli.screenshot else {
        return Ok(Box::new(DesktopScreen));
    };

    let mut screen = ImageScreen::open(path)?;
    if let Some(&[x, y]) = cli.origin.as_deref() {
        screen = screen.with_origin(x, y);
    }
    tracing::info!("Reading from screenshot {}", path.display());
    Ok(Box::new(screen))
}

fn build_recognizer(cli: &Cli, config: &AppConfig) -> Result<WaveRecognizer> {
    let tesseract = &config.tesseract;
    let executable = find_tesseract_executable(tesseract.executable.as_deref())?;
    let tessdata = find_tessdata_dir(tesseract.tessdata_dir.as_deref(), &tesseract.language);
    if tessdata.is_none() {
        tracing::warn!(
            "No tessdata directory with {} found, relying on Tesseract's default. Run `setup` if recognition fails.",
            tesseract.language
        );
    }

    let backend = TesseractBackend::new(executable, tesseract.language.clone())
        .with_tessdata_dir(tessdata)
        .with_psm(tesseract.psm);

    Ok(WaveRecognizer::new(
        build_screen(cli)?,
        OcrAdapter::new(Box::new(backend)),
        config.recognizer_options(),
    ))
}

fn run_watch(
    recognizer: WaveRecognizer,
    rect: Rect,
    interval: Duration,
    count: Option<u64>,
) -> Result<()> {
    let watcher = spawn_watch(recognizer, rect, interval)?;

    let mut seen: u64 = 0;
    while count.is_none_or(|limit| seen < limit) {
        let Ok(event) = watcher.events().recv() else {
            break;
        };
        seen += 1;

        if let WatchEvent::Reading {
            wave, captured_at, ..
        } = event
        {
            println!(
                "{} {}",
                captured_at.format("%H:%M:%S%.3f"),
                wave.as_deref().unwrap_or("null")
            );
        }
    }

    watcher
        .stop()
        .map_err(|_| anyhow!("Watch thread panicked"))?;
    Ok(())
}

fn run_region_command(command: &RegionCommand, path: &Path) -> Result<()> {
    let mut regions = load_regions(path);

    match command {
        RegionCommand::Save { name, corners } => {
            let &[x1, y1, x2, y2] = corners.as_slice() else {
                bail!("Expected four coordinates, got {}", corners.len());
            };
            let region = NamedRegion::from_points(x1, y1, x2, y2);
            if region.rect().is_empty() {
                bail!("Region {:?} has zero width or height", name);
            }
            println!("{}: {}", name, format_region(&region));
            regions.insert(name.clone(), region);
            save_regions(path, &regions)?;
        }
        RegionCommand::List { all } => {
            for (name, region) in regions.iter().filter(|(_, r)| *all || !r.deleted) {
                let marker = if region.deleted { " [deleted]" } else { "" };
                println!("{}: {}{}", name, format_region(region), marker);
            }
        }
        RegionCommand::Delete { name } => {
            set_deleted(&mut regions, name, true)?;
            save_regions(path, &regions)?;
        }
        RegionCommand::Restore { name } => {
            set_deleted(&mut regions, name, false)?;
            save_regions(path, &regions)?;
        }
    }

    Ok(())
}

fn set_deleted(
    regions: &mut std::collections::BTreeMap<String, NamedRegion>,
    name: &str,
    deleted: bool,
) -> Result<()> {
    let region = regions
        .get_mut(name)
        .ok_or_else(|| anyhow!("No saved region named {:?}", name))?;
    region.deleted = deleted;
    tracing::info!(
        "Region {:?} {}",
        name,
        if deleted { "deleted" } else { "restored" }
    );
    Ok(())
}

fn run_setup(config: &AppConfig) -> Result<()> {
    let tesseract = &config.tesseract;
    let executable = find_tesseract_executable(tesseract.executable.as_deref())?;
    println!("tesseract: {}", executable.display());

    let tessdata = match find_tessdata_dir(tesseract.tessdata_dir.as_deref(), &tesseract.language)
    {
        Some(dir) => dir,
        None => ensure_tessdata(&tesseract.language)?,
    };
    println!("tessdata: {}", tessdata.display());
    Ok(())
}
