// Runtime metrics module
//
// Provides lightweight metrics tracking for monitoring cycle behavior

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crate::surface::ReleaseTrigger;

/// Cycle runtime metrics
///
/// Uses atomic operations for thread-safe metric tracking without locks.
/// Metrics are collected across every run of a controller and can be logged
/// on shutdown to see how the slideshow actually behaved: how many slides
/// went up, how often loads failed, and which guard ended up releasing each
/// faded-out buffer.
#[derive(Debug)]
pub struct Metrics {
    /// Total number of slides made visible (first displays and crossfade targets)
    pub slides_shown: AtomicUsize,

    /// Total number of preloads that resolved as failed (slide shown anyway)
    pub load_failures: AtomicUsize,

    /// Total number of crossfades triggered
    pub crossfades: AtomicUsize,

    /// Buffer releases where the fade-out completion signal arrived
    pub releases_signaled: AtomicUsize,

    /// Buffer releases forced by the fallback timer (signal never arrived)
    pub releases_fallback: AtomicUsize,

    /// Buffer releases forced early because the slot was needed for new content
    pub releases_forced: AtomicUsize,

    /// Cycles that ran their whole playlist
    pub cycles_completed: AtomicUsize,

    /// Cycles ended early by an explicit stop
    pub cycles_stopped: AtomicUsize,

    /// Number of events broadcast to subscribers
    pub events_broadcast: AtomicU64,

    /// Controller start time
    start_time: Instant,
}

impl Metrics {
    /// Create a new Metrics instance
    pub fn new() -> Self {
        Self {
            slides_shown: AtomicUsize::new(0),
            load_failures: AtomicUsize::new(0),
            crossfades: AtomicUsize::new(0),
            releases_signaled: AtomicUsize::new(0),
            releases_fallback: AtomicUsize::new(0),
            releases_forced: AtomicUsize::new(0),
            cycles_completed: AtomicUsize::new(0),
            cycles_stopped: AtomicUsize::new(0),
            events_broadcast: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a slide becoming visible
    pub fn record_slide_shown(&self) {
        self.slides_shown.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed preload
    pub fn record_load_failure(&self) {
        self.load_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a crossfade being triggered
    pub fn record_crossfade(&self) {
        self.crossfades.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a buffer release, by what triggered it
    pub fn record_release(&self, trigger: ReleaseTrigger) {
        let counter = match trigger {
            ReleaseTrigger::Signaled => &self.releases_signaled,
            ReleaseTrigger::FallbackTimeout => &self.releases_fallback,
            ReleaseTrigger::Forced => &self.releases_forced,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a cycle reaching idle, completed or stopped
    pub fn record_cycle(&self, stopped: bool) {
        if stopped {
            self.cycles_stopped.fetch_add(1, Ordering::Relaxed);
        } else {
            self.cycles_completed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record an event broadcast to subscribers
    pub fn record_event_broadcast(&self) {
        self.events_broadcast.fetch_add(1, Ordering::Relaxed);
    }

    /// Get total uptime
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Total buffer releases across all triggers
    pub fn releases_total(&self) -> usize {
        self.releases_signaled.load(Ordering::Relaxed)
            + self.releases_fallback.load(Ordering::Relaxed)
            + self.releases_forced.load(Ordering::Relaxed)
    }

    /// Get average slides shown per finished cycle
    pub fn avg_slides_per_cycle(&self) -> f64 {
        let slides = self.slides_shown.load(Ordering::Relaxed);
        let cycles = self.cycles_completed.load(Ordering::Relaxed)
            + self.cycles_stopped.load(Ordering::Relaxed);
        if cycles > 0 {
            slides as f64 / cycles as f64
        } else {
            0.0
        }
    }

    /// Log metrics summary
    pub fn log_summary(&self) {
        let uptime = self.uptime();
        tracing::info!("=== Cycle Metrics Summary ===");
        tracing::info!("Uptime: {:.2}s", uptime.as_secs_f64());
        tracing::info!(
            "Slides: {} shown, {} preload failures, {} crossfades",
            self.slides_shown.load(Ordering::Relaxed),
            self.load_failures.load(Ordering::Relaxed),
            self.crossfades.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Buffer releases: {} signaled, {} fallback, {} forced",
            self.releases_signaled.load(Ordering::Relaxed),
            self.releases_fallback.load(Ordering::Relaxed),
            self.releases_forced.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Cycles: {} completed, {} stopped (avg {:.1} slides per cycle)",
            self.cycles_completed.load(Ordering::Relaxed),
            self.cycles_stopped.load(Ordering::Relaxed),
            self.avg_slides_per_cycle()
        );
        tracing::info!(
            "Events broadcast: {}",
            self.events_broadcast.load(Ordering::Relaxed)
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
