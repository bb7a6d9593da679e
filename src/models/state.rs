use std::fmt;

use crate::surface::SlideBuffer;

/// Lifecycle phase of a slide cycle.
///
/// The machine is strictly forward: a cycle that has begun can only move
/// toward `Ending` and back to `Idle`. Every teardown path passes through
/// `Ending`, including the aborted start on an empty playlist (which never
/// reaches `Starting`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SlideshowState {
    /// No cycle in progress; the start affordance is enabled.
    #[default]
    Idle,
    /// Start accepted: overlay mounting and first-image preload underway.
    Starting,
    /// First image visible; the hold/crossfade loop is advancing.
    Running,
    /// Teardown underway: timers cancelled, overlay fading out.
    Ending,
}

impl SlideshowState {
    /// Whether a transition from `self` to `to` is a legal state change.
    ///
    /// Same-state "transitions" are not changes and always return false;
    /// callers treat them as no-ops. The advance self-loop while `Running`
    /// never goes through a state change at all.
    pub fn can_transition(self, to: SlideshowState) -> bool {
        use SlideshowState::*;
        matches!(
            (self, to),
            (Idle, Starting)
                | (Idle, Ending)
                | (Starting, Running)
                | (Starting, Ending)
                | (Running, Ending)
                | (Ending, Idle)
        )
    }

    /// True while a cycle owns the surface (`Starting` or `Running`).
    ///
    /// `stop()` acts only in these states; `start()` only outside them
    /// (and outside `Ending`).
    pub fn is_active(self) -> bool {
        matches!(self, SlideshowState::Starting | SlideshowState::Running)
    }
}

impl fmt::Display for SlideshowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SlideshowState::Idle => "idle",
            SlideshowState::Starting => "starting",
            SlideshowState::Running => "running",
            SlideshowState::Ending => "ending",
        };
        f.write_str(name)
    }
}

/// Snapshot of one controller's cycle progress.
///
/// Held behind [`crate::state::StateManager`]; read through
/// [`snapshot()`](crate::state::StateManager::snapshot) or
/// [`read()`](crate::state::StateManager::read), mutated through
/// [`update()`](crate::state::StateManager::update) so change events are
/// emitted consistently.
#[derive(Clone, Debug)]
pub struct CycleStatus {
    pub state: SlideshowState,

    // Per-run progress
    pub playlist_len: usize,
    pub slides_shown: usize,
    pub visible_buffer: Option<SlideBuffer>,
    pub overlay_mounted: bool,

    /// Incremented on every accepted start. Detached timer callbacks carry
    /// the epoch they were scheduled under and no-op when it has moved on.
    pub epoch: u64,
}

impl Default for CycleStatus {
    fn default() -> Self {
        Self {
            state: SlideshowState::Idle,
            playlist_len: 0,
            slides_shown: 0,
            visible_buffer: None,
            overlay_mounted: false,
            epoch: 0,
        }
    }
}

impl CycleStatus {
    /// Display index of the currently visible slide, if any.
    pub fn current_index(&self) -> Option<usize> {
        self.slides_shown.checked_sub(1)
    }

    /// Slides not yet shown in this run.
    pub fn remaining(&self) -> usize {
        self.playlist_len.saturating_sub(self.slides_shown)
    }

    /// True once every playlist entry has been displayed.
    pub fn exhausted(&self) -> bool {
        self.slides_shown >= self.playlist_len
    }

    /// Clear per-run progress after teardown. The epoch is left alone: it
    /// only moves forward, on accepted starts.
    pub fn reset_run(&mut self) {
        self.playlist_len = 0;
        self.slides_shown = 0;
        self.visible_buffer = None;
        self.overlay_mounted = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SlideshowState::*;

    #[test]
    fn test_legal_transitions() {
        assert!(Idle.can_transition(Starting));
        assert!(Idle.can_transition(Ending));
        assert!(Starting.can_transition(Running));
        assert!(Starting.can_transition(Ending));
        assert!(Running.can_transition(Ending));
        assert!(Ending.can_transition(Idle));
    }

    #[test]
    fn test_illegal_transitions() {
        assert!(!Idle.can_transition(Running));
        assert!(!Starting.can_transition(Idle));
        assert!(!Running.can_transition(Starting));
        assert!(!Running.can_transition(Idle));
        assert!(!Ending.can_transition(Running));
        assert!(!Ending.can_transition(Starting));
    }

    #[test]
    fn test_same_state_is_not_a_change() {
        for state in [Idle, Starting, Running, Ending] {
            assert!(!state.can_transition(state));
        }
    }

    #[test]
    fn test_is_active() {
        assert!(!Idle.is_active());
        assert!(Starting.is_active());
        assert!(Running.is_active());
        assert!(!Ending.is_active());
    }

    #[test]
    fn test_default_status() {
        let status = CycleStatus::default();
        assert_eq!(status.state, Idle);
        assert_eq!(status.current_index(), None);
        assert!(status.exhausted());
        assert_eq!(status.epoch, 0);
    }

    #[test]
    fn test_progress_accounting() {
        let mut status = CycleStatus {
            playlist_len: 3,
            slides_shown: 1,
            ..CycleStatus::default()
        };
        assert_eq!(status.current_index(), Some(0));
        assert_eq!(status.remaining(), 2);
        assert!(!status.exhausted());

        status.slides_shown = 3;
        assert!(status.exhausted());
    }

    #[test]
    fn test_reset_run_keeps_epoch() {
        let mut status = CycleStatus {
            state: Ending,
            playlist_len: 6,
            slides_shown: 6,
            visible_buffer: Some(SlideBuffer::B),
            overlay_mounted: true,
            epoch: 4,
        };
        status.reset_run();
        assert_eq!(status.playlist_len, 0);
        assert_eq!(status.slides_shown, 0);
        assert_eq!(status.visible_buffer, None);
        assert!(!status.overlay_mounted);
        assert_eq!(status.epoch, 4);
        // reset_run does not touch the state field either
        assert_eq!(status.state, Ending);
    }
}
