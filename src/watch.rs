//! Polling worker that repeatedly reads the wave number.
//!
//! The worker thread owns the recognizer and reports every reading over an
//! mpsc channel. A failed capture or OCR pass is reported and polling
//! continues; one bad frame never ends the loop.

use chrono::{DateTime, Local};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::capture::Rect;
use crate::recognizer::WaveRecognizer;

/// Longest single sleep, so a stop request is noticed promptly.
const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// One polling result.
#[derive(Debug, Clone, PartialEq)]
pub enum WatchEvent {
    /// A recognition pass finished; `wave` is `None` when no number was visible
    Reading {
        iteration: u64,
        wave: Option<String>,
        captured_at: DateTime<Local>,
    },
    /// Capture or OCR failed for this iteration
    Failed {
        iteration: u64,
        error: String,
        captured_at: DateTime<Local>,
    },
}

/// Handle to a running watch loop.
pub struct Watcher {
    events: Receiver<WatchEvent>,
    stop: Arc<AtomicBool>,
    handle: JoinHandle<WaveRecognizer>,
}

impl Watcher {
    /// The stream of polling results.
    pub fn events(&self) -> &Receiver<WatchEvent> {
        &self.events
    }

    /// Stops the loop, waits for the worker and hands the recognizer back.
    pub fn stop(self) -> thread::Result<WaveRecognizer> {
        self.stop.store(true, Ordering::SeqCst);
        drop(self.events);
        self.handle.join()
    }
}

/// Starts polling `rect` every `interval` on a dedicated thread.
pub fn spawn_watch(
    recognizer: WaveRecognizer,
    rect: Rect,
    interval: Duration,
) -> std::io::Result<Watcher> {
    let (sender, events) = channel();
    let stop = Arc::new(AtomicBool::new(false));
    let worker_stop = Arc::clone(&stop);

    let handle = thread::Builder::new()
        .name("wave-watch".to_string())
        .spawn(move || run_watch_loop(recognizer, rect, interval, sender, worker_stop))?;

    Ok(Watcher {
        events,
        stop,
        handle,
    })
}

/// Runs until `stop` is set or the receiving side hangs up.
fn run_watch_loop(
    recognizer: WaveRecognizer,
    rect: Rect,
    interval: Duration,
    sender: Sender<WatchEvent>,
    stop: Arc<AtomicBool>,
) -> WaveRecognizer {
    tracing::info!(
        "Watch started: {}x{} at ({}, {}) every {:?}",
        rect.width,
        rect.height,
        rect.left,
        rect.top,
        interval
    );

    let mut iteration: u64 = 0;
    while !stop.load(Ordering::SeqCst) {
        iteration += 1;
        let started = Instant::now();
        let captured_at = Local::now();

        let event = match recognizer.recognize_rect(&rect) {
            Ok(wave) => WatchEvent::Reading {
                iteration,
                wave,
                captured_at,
            },
            Err(e) => {
                tracing::warn!("Watch iteration {} failed: {}", iteration, e);
                WatchEvent::Failed {
                    iteration,
                    error: e.to_string(),
                    captured_at,
                }
            }
        };

        if sender.send(event).is_err() {
            tracing::debug!("Watch receiver dropped, exiting");
            break;
        }

        let deadline = started + interval;
        while !stop.load(Ordering::SeqCst) {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::sleep((deadline - now).min(SLEEP_SLICE));
        }
    }

    tracing::info!("Watch stopped after {} iterations", iteration);
    recognizer
}
