use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timing options for one slide cycle, in milliseconds.
///
/// Serialized under the recognized camelCase option names so configuration
/// files stay compatible with the widget embeddings that already use them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideTiming {
    /// Time each slide stays fully visible before the next transition begins.
    #[serde(rename = "holdDurationMs", default = "default_hold_ms")]
    pub hold_ms: u64,

    /// Crossfade duration (fade-in and fade-out run concurrently over this).
    #[serde(rename = "fadeDurationMs", default = "default_fade_ms")]
    pub fade_ms: u64,

    /// Overlay fade-out duration during teardown.
    #[serde(rename = "teardownDurationMs", default = "default_teardown_ms")]
    pub teardown_ms: u64,

    /// Extra time after a fade before a missing completion signal is given
    /// up on and the resource is released anyway.
    #[serde(rename = "fallbackMarginMs", default = "default_fallback_margin_ms")]
    pub fallback_margin_ms: u64,
}

impl Default for SlideTiming {
    fn default() -> Self {
        Self {
            hold_ms: default_hold_ms(),
            fade_ms: default_fade_ms(),
            teardown_ms: default_teardown_ms(),
            fallback_margin_ms: default_fallback_margin_ms(),
        }
    }
}

impl SlideTiming {
    pub fn hold(&self) -> Duration {
        Duration::from_millis(self.hold_ms)
    }

    pub fn fade(&self) -> Duration {
        Duration::from_millis(self.fade_ms)
    }

    pub fn teardown(&self) -> Duration {
        Duration::from_millis(self.teardown_ms)
    }

    pub fn fallback_margin(&self) -> Duration {
        Duration::from_millis(self.fallback_margin_ms)
    }

    /// Latest point after a crossfade trigger at which the faded-out buffer
    /// is released, signal or no signal.
    pub fn release_deadline(&self) -> Duration {
        Duration::from_millis(self.fade_ms + self.fallback_margin_ms)
    }

    /// Latest point after teardown begins at which the overlay is removed,
    /// signal or no signal.
    pub fn removal_deadline(&self) -> Duration {
        Duration::from_millis(self.teardown_ms + self.fallback_margin_ms)
    }
}

/// Application configuration persisted as `slideshow.yaml`.
///
/// Everything has a default; a missing or partial file never blocks a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlideshowConfig {
    #[serde(rename = "timing", default)]
    pub timing: SlideTiming,

    /// Directory scanned for slide sources. Empty disables discovery and
    /// goes straight to `fallback_sources`.
    #[serde(rename = "imageDir", default = "default_image_dir")]
    pub image_dir: String,

    /// Static sources used when discovery finds nothing.
    #[serde(rename = "fallbackSources", default = "default_fallback_sources")]
    pub fallback_sources: Vec<String>,

    /// Length of the playlist built for each run; short source pools are
    /// cycled up to this count.
    #[serde(rename = "slideCount", default = "default_slide_count")]
    pub slide_count: usize,

    #[serde(rename = "debugMode", default)]
    pub debug_mode: bool,
}

impl Default for SlideshowConfig {
    fn default() -> Self {
        Self {
            timing: SlideTiming::default(),
            image_dir: default_image_dir(),
            fallback_sources: default_fallback_sources(),
            slide_count: default_slide_count(),
            debug_mode: false,
        }
    }
}

fn default_hold_ms() -> u64 {
    5000
}

fn default_fade_ms() -> u64 {
    900
}

fn default_teardown_ms() -> u64 {
    400
}

fn default_fallback_margin_ms() -> u64 {
    300
}

fn default_image_dir() -> String {
    "media1".to_string()
}

fn default_fallback_sources() -> Vec<String> {
    vec!["media1/banana.jpg".to_string()]
}

fn default_slide_count() -> usize {
    6
}
