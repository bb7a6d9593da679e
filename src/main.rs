//! slidecycle - Timed crossfade slide-cycle controller
//!
//! Main entry point for the console demo.
//!
//! # Overview
//!
//! This binary crate runs one full slideshow cycle against the
//! tracing-backed console surfaces. It initializes:
//! - Configuration loading ([`ConfigManager`] - slideshow.yaml)
//! - Logging infrastructure (file rotation + console output)
//! - Tokio async runtime (2 worker threads for timers and preloads)
//! - The cycle controller ([`SlideCycle`] - wired to the console surfaces)
//!
//! # Execution Flow
//!
//! 1. Load configuration from slidecycle-data/slideshow.yaml (defaults if
//!    missing; the debug switch decides log verbosity, so this runs first)
//! 2. Initialize logging → logs/slidecycle.<date>
//! 3. Create tokio runtime with 2 worker threads
//! 4. Discover JPEG sources in the configured image directory, falling back
//!    to the static fallback sources
//! 5. Build the cycled playlist, start the cycle, wait for idle
//! 6. Log the metrics summary and shut the runtime down (5s timeout)
//!
//! # Configuration Files
//!
//! Expected in `slidecycle-data/`:
//! - `slideshow.yaml`: timing options, image directory, slide count

use anyhow::Result;
use camino::Utf8Path;
use regex::Regex;
use slidecycle::models::SlideshowConfig;
use slidecycle::surface::{ConsoleHome, ConsoleStage, FileImageLoader};
use slidecycle::{APP_NAME, ConfigManager, ImageSource, Playlist, SlideCycle, VERSION};
use std::sync::Arc;

/// Main entry point for the slidecycle demo
///
/// # Returns
///
/// - `Ok(())` if the cycle ran to completion (or had nothing to show)
/// - `Err(_)` if initialization failed
///
/// # Errors
///
/// This function can fail if:
/// - The config directory cannot be created or the file cannot be read
/// - Logging initialization fails (disk space, permissions)
/// - Tokio runtime creation fails (system resources)
fn main() -> Result<()> {
    // Config before logging: the debug switch decides verbosity
    let config_manager = ConfigManager::new("slidecycle-data")?;
    let config = config_manager.load()?;

    // Setup logging with both file and console output
    let _guard = slidecycle::logging::setup_logging("logs", "slidecycle", config.debug_mode, true)?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);
    tracing::info!(
        "Effective configuration - hold: {}ms, fade: {}ms, teardown: {}ms, slides: {}",
        config.timing.hold_ms,
        config.timing.fade_ms,
        config.timing.teardown_ms,
        config.slide_count
    );

    // Create tokio runtime for the cycle driver, timers, and preloads
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(2)
        .thread_name("slidecycle-worker")
        .build()?;

    tracing::info!("Tokio runtime initialized with {} worker threads", 2);

    let result = runtime.block_on(run_cycle(&config));

    // Shutdown the tokio runtime gracefully
    runtime.shutdown_timeout(std::time::Duration::from_secs(5));

    tracing::info!("Application shutdown complete");

    result
}

/// Run one full cycle against the console surfaces and report metrics.
async fn run_cycle(config: &SlideshowConfig) -> Result<()> {
    let sources = discover_sources(config);
    let playlist = Playlist::cycled(&sources, config.slide_count);
    tracing::info!(
        "Built playlist: {} slides from {} source(s)",
        playlist.len(),
        sources.len()
    );

    let cycle = SlideCycle::new(
        config.timing,
        Arc::new(ConsoleStage::new()),
        Arc::new(ConsoleHome::new()),
        Arc::new(FileImageLoader::new()),
    );

    match cycle.start(playlist).await {
        Ok(true) => {
            cycle.wait_until_idle().await;
        }
        Ok(false) => {
            // Unreachable with a freshly built controller; keep the report
            tracing::warn!("Controller already had an active cycle");
        }
        Err(error) => {
            // Nothing to show is a reportable outcome, not a crash
            tracing::error!("Cycle refused to start: {}", error);
        }
    }

    cycle.metrics().log_summary();
    Ok(())
}

/// Scan the configured image directory for JPEG sources, sorted by name.
///
/// Falls back to the configured static sources when the directory is
/// missing, unreadable, or holds no matching files. An empty `imageDir`
/// skips discovery entirely.
fn discover_sources(config: &SlideshowConfig) -> Vec<ImageSource> {
    let jpeg = Regex::new(r"(?i)\.jpe?g$").expect("Invalid JPEG extension regex");

    let mut discovered: Vec<ImageSource> = Vec::new();
    if !config.image_dir.is_empty() {
        match Utf8Path::new(&config.image_dir).read_dir_utf8() {
            Ok(entries) => {
                for entry in entries.flatten() {
                    let path = entry.path();
                    if jpeg.is_match(path.as_str()) {
                        discovered.push(ImageSource::new(path.as_str()));
                    }
                }
            }
            Err(error) => {
                tracing::warn!(
                    "Failed to read image directory {}: {}",
                    config.image_dir,
                    error
                );
            }
        }
    }
    // Directory order is platform-dependent; sort for a stable slideshow
    discovered.sort_by(|a, b| a.as_str().cmp(b.as_str()));

    if discovered.is_empty() {
        tracing::warn!(
            "No images discovered in '{}', using {} fallback source(s)",
            config.image_dir,
            config.fallback_sources.len()
        );
        return config
            .fallback_sources
            .iter()
            .cloned()
            .map(ImageSource::from)
            .collect();
    }

    tracing::info!(
        "Discovered {} JPEG source(s) in '{}'",
        discovered.len(),
        config.image_dir
    );
    discovered
}
