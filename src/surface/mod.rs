//! Surface module - trait seams for the visual and loading collaborators.
//!
//! The controller drives an overlay it does not render and images it does
//! not decode. Everything visual sits behind these traits so the cycle logic
//! stays framework-agnostic and testable:
//!
//! - [`Stage`]: the overlay region the controller mounts, populates through
//!   two persistent buffer slots, fades, and unmounts
//! - [`HomeView`]: the external view hidden during a run, plus the start
//!   affordance enable/disable contract
//! - [`ImageLoader`]: resource preloading with a load-or-error completion
//!
//! # Signal contract
//!
//! Completion-style operations return a `tokio::sync::oneshot::Receiver`
//! instead of blocking: the implementation fires the sender when the visual
//! transition (or frame commit, or load) has actually happened. Senders are
//! allowed to be dropped without firing — that is the "signal never arrives"
//! case the controller guards against with fallback timers, so
//! implementations never need to promise delivery.
//!
//! # Usage Example
//!
//! ```ignore
//! use slidecycle::surface::{ConsoleHome, ConsoleStage, FileImageLoader};
//!
//! let stage = Arc::new(ConsoleStage::new());
//! let home = Arc::new(ConsoleHome::new());
//! let loader = Arc::new(FileImageLoader::new());
//! let cycle = SlideCycle::new(timing, stage, home, loader);
//! ```

pub mod console;

pub use console::{ConsoleHome, ConsoleStage, FileImageLoader};

use std::fmt;
use std::time::Duration;

use tokio::sync::oneshot;

use crate::models::ImageSource;

/// Identifier for one of the two persistent slide slots.
///
/// The cycle alternates between the two instead of creating a slot per
/// slide, so resource handles never accumulate and there is no flash
/// between removal and insertion of elements.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SlideBuffer {
    A,
    B,
}

impl SlideBuffer {
    /// The opposite slot; alternation is strictly turn-based.
    pub fn other(self) -> Self {
        match self {
            SlideBuffer::A => SlideBuffer::B,
            SlideBuffer::B => SlideBuffer::A,
        }
    }
}

impl fmt::Display for SlideBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlideBuffer::A => f.write_str("A"),
            SlideBuffer::B => f.write_str("B"),
        }
    }
}

/// Direction of an opacity transition on a buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FadeDirection {
    /// Opacity 0 → 1.
    In,
    /// Opacity 1 → 0.
    Out,
}

impl fmt::Display for FadeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FadeDirection::In => f.write_str("in"),
            FadeDirection::Out => f.write_str("out"),
        }
    }
}

/// What finally caused a faded-out buffer to be released.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReleaseTrigger {
    /// The fade-out completion signal arrived.
    Signaled,
    /// The signal never arrived; the fallback timer fired.
    FallbackTimeout,
    /// The buffer was needed for new content while its guard was still
    /// pending, so the release was forced early.
    Forced,
}

impl fmt::Display for ReleaseTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReleaseTrigger::Signaled => "signaled",
            ReleaseTrigger::FallbackTimeout => "fallback-timeout",
            ReleaseTrigger::Forced => "forced",
        };
        f.write_str(name)
    }
}

/// Result of a preload: resolved on load or on error, never abandoned by
/// the controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded,
    /// Load failed (or the loader dropped its sender). Non-fatal: the slide
    /// is shown anyway, possibly broken.
    Failed,
}

/// The overlay region: mounted, populated, faded, and unmounted by the
/// controller.
///
/// # Contract
///
/// - `attach` is only called on the currently hidden buffer, and only after
///   any earlier release guard on that buffer has settled.
/// - `release` must be idempotent; the reuse path can call it for a buffer
///   that was already released by its guard.
/// - Fade and frame-commit receivers follow the module-level signal
///   contract: firing is best-effort, dropping is allowed.
#[cfg_attr(test, mockall::automock)]
pub trait Stage: Send + Sync {
    /// Create the full-viewport overlay with both buffers hidden.
    fn mount(&self);

    /// Populate `buffer` with `source` (hidden; no visual change yet).
    fn attach(&self, buffer: SlideBuffer, source: &ImageSource);

    /// Make `buffer` fully visible with no animation. Used for the first
    /// slide to avoid a fade-from-blank flash.
    fn show_immediate(&self, buffer: SlideBuffer);

    /// Start an opacity transition on `buffer` over `duration`. The receiver
    /// resolves when the transition has visually completed.
    fn begin_fade(
        &self,
        buffer: SlideBuffer,
        direction: FadeDirection,
        duration: Duration,
    ) -> oneshot::Receiver<()>;

    /// Resolves once the render layer has committed a layout pass, so a
    /// subsequently triggered transition animates instead of jumping.
    fn frame_committed(&self) -> oneshot::Receiver<()>;

    /// Drop the resource handle held by `buffer`. Idempotent.
    fn release(&self, buffer: SlideBuffer);

    /// Start the whole-overlay fade-out used during teardown.
    fn begin_overlay_fade(&self, duration: Duration) -> oneshot::Receiver<()>;

    /// Remove the overlay and everything in it.
    fn unmount(&self);
}

/// The external "home" view the slideshow temporarily replaces.
///
/// Not owned by the controller: only shown, hidden, and asked to reflect
/// the start affordance state (disabled while a cycle is active, re-enabled
/// on return to idle — exactly once per cycle).
#[cfg_attr(test, mockall::automock)]
pub trait HomeView: Send + Sync {
    fn set_visible(&self, visible: bool);

    fn set_trigger_enabled(&self, enabled: bool);
}

/// Resource preloading seam.
#[cfg_attr(test, mockall::automock)]
pub trait ImageLoader: Send + Sync {
    /// Begin loading `source`. The receiver resolves with the load-or-error
    /// outcome; a dropped sender counts as [`LoadOutcome::Failed`].
    fn preload(&self, source: &ImageSource) -> oneshot::Receiver<LoadOutcome>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_alternation() {
        assert_eq!(SlideBuffer::A.other(), SlideBuffer::B);
        assert_eq!(SlideBuffer::B.other(), SlideBuffer::A);
        assert_eq!(SlideBuffer::A.other().other(), SlideBuffer::A);
    }

    #[test]
    fn test_display_names() {
        assert_eq!(SlideBuffer::A.to_string(), "A");
        assert_eq!(FadeDirection::Out.to_string(), "out");
        assert_eq!(ReleaseTrigger::FallbackTimeout.to_string(), "fallback-timeout");
    }
}
