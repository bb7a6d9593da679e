// State management module
//
// This module provides the StateManager which wraps CycleStatus with
// thread-safe access using Arc<RwLock<T>> and emits slideshow events for
// observers (demo binary, tests, embedding UIs).

use std::sync::{Arc, RwLock};

use tokio::sync::broadcast;
use tracing::warn;

use crate::metrics::Metrics;
use crate::models::{CycleStatus, ImageSource, SlideshowState};
use crate::surface::{ReleaseTrigger, SlideBuffer};

/// Events emitted as a cycle progresses.
///
/// Emitted to notify interested parties about cycle progress without
/// requiring them to poll the status.
#[derive(Clone, Debug, PartialEq)]
pub enum SlideshowEvent {
    /// The state machine moved.
    StateChanged {
        from: SlideshowState,
        to: SlideshowState,
    },

    /// The overlay was created with both buffers hidden.
    OverlayMounted,

    /// The overlay was removed during teardown.
    OverlayRemoved,

    /// A slide became the visible one (first display or crossfade target).
    SlideShown {
        index: usize,
        source: ImageSource,
        buffer: SlideBuffer,
    },

    /// A preload resolved as failed; the slide is shown anyway.
    SlideLoadFailed {
        index: usize,
        source: ImageSource,
    },

    /// Both fades of a crossfade were triggered.
    CrossfadeStarted {
        from_index: usize,
        to_index: usize,
    },

    /// A faded-out buffer's resource handle was dropped.
    BufferReleased {
        buffer: SlideBuffer,
        trigger: ReleaseTrigger,
    },

    /// The cycle returned to idle.
    CycleFinished {
        slides_shown: usize,
        stopped: bool,
    },
}

/// Thread-safe status manager with event emission
///
/// The central bookkeeping component for one controller:
/// - Provides thread-safe access to [`CycleStatus`] via `Arc<RwLock<T>>`
/// - Validates state transitions against the
///   [`SlideshowState`] legality table
/// - Emits [`SlideshowEvent`]s over a tokio broadcast channel
///
/// # Usage
///
/// Always go through `StateManager` instead of holding a `CycleStatus`:
/// - [`read()`](Self::read) / [`snapshot()`](Self::snapshot) for queries
/// - [`transition()`](Self::transition) for state machine moves
/// - [`update()`](Self::update) for progress mutations with automatic
///   change events
/// - [`subscribe()`](Self::subscribe) for listening to events
///
/// # Related Types
///
/// - [`crate::models::CycleStatus`]: the underlying status structure
/// - [`SlideshowEvent`]: event types emitted on mutations
/// - [`crate::cycle::SlideCycle`]: primary producer of these events
pub struct StateManager {
    /// Cycle status protected by RwLock for thread-safe access
    status: Arc<RwLock<CycleStatus>>,

    /// Broadcast channel for emitting slideshow events.
    /// Multiple subscribers can listen simultaneously.
    event_tx: broadcast::Sender<SlideshowEvent>,

    /// Optional metrics sink; every broadcast event is counted when present.
    metrics: Option<Arc<Metrics>>,
}

impl StateManager {
    /// Create a new StateManager in `Idle` with a broadcast buffer of 100
    /// events.
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(100);
        Self {
            status: Arc::new(RwLock::new(CycleStatus::default())),
            event_tx,
            metrics: None,
        }
    }

    /// Create a StateManager that counts broadcast events on `metrics`.
    pub fn with_metrics(metrics: Arc<Metrics>) -> Self {
        Self {
            metrics: Some(metrics),
            ..Self::new()
        }
    }

    /// Get a read-only snapshot of the current status.
    ///
    /// Clones the whole status, so it is safe to hold without locks. For a
    /// single field, prefer [`read()`](Self::read) with a closure.
    pub fn snapshot(&self) -> CycleStatus {
        self.status.read().unwrap().clone()
    }

    /// Execute a function with read access to the status.
    ///
    /// # Example
    /// ```ignore
    /// let active = manager.read(|status| status.state.is_active());
    /// ```
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&CycleStatus) -> R,
    {
        let status = self.status.read().unwrap();
        f(&status)
    }

    /// Current state machine position.
    pub fn state(&self) -> SlideshowState {
        self.read(|status| status.state)
    }

    /// Epoch of the current (or most recent) run.
    pub fn epoch(&self) -> u64 {
        self.read(|status| status.epoch)
    }

    /// Subscribe to slideshow events.
    ///
    /// Returns a receiver notified of all future events. Lagging receivers
    /// miss events rather than blocking the cycle.
    pub fn subscribe(&self) -> broadcast::Receiver<SlideshowEvent> {
        self.event_tx.subscribe()
    }

    /// Send an event to all subscribers. A send with no subscribers is fine.
    fn emit(&self, event: SlideshowEvent) {
        if let Some(metrics) = &self.metrics {
            metrics.record_event_broadcast();
        }
        let _ = self.event_tx.send(event);
    }

    /// Move the state machine, emitting [`SlideshowEvent::StateChanged`].
    ///
    /// Same-state calls are quiet no-ops; illegal moves are rejected with a
    /// warning. Returns whether the state actually changed.
    pub fn transition(&self, to: SlideshowState) -> bool {
        let from = {
            let mut status = self.status.write().unwrap();
            let from = status.state;
            if from == to {
                return false;
            }
            if !from.can_transition(to) {
                warn!(%from, %to, "illegal state transition rejected");
                return false;
            }
            status.state = to;
            from
        };
        self.emit(SlideshowEvent::StateChanged { from, to });
        true
    }

    /// Update progress fields and emit the events implied by the change.
    ///
    /// Detects overlay mount/unmount (the only diff-derived events). The
    /// state field must be moved with [`transition()`](Self::transition),
    /// not here; a state edit through `update` still emits but is warned
    /// about when illegal.
    ///
    /// # Returns
    /// The events that were emitted.
    pub fn update<F>(&self, update_fn: F) -> Vec<SlideshowEvent>
    where
        F: FnOnce(&mut CycleStatus),
    {
        let changes = {
            let mut status = self.status.write().unwrap();
            let old = status.clone();
            update_fn(&mut status);
            self.detect_changes(&old, &status)
        };
        for change in &changes {
            self.emit(change.clone());
        }
        changes
    }

    /// Detect what changed between two snapshots and generate events.
    fn detect_changes(&self, old: &CycleStatus, new: &CycleStatus) -> Vec<SlideshowEvent> {
        let mut changes = Vec::new();

        if old.state != new.state {
            if !old.state.can_transition(new.state) {
                warn!(from = %old.state, to = %new.state, "state changed outside the legality table");
            }
            changes.push(SlideshowEvent::StateChanged {
                from: old.state,
                to: new.state,
            });
        }

        if old.overlay_mounted != new.overlay_mounted {
            if new.overlay_mounted {
                changes.push(SlideshowEvent::OverlayMounted);
            } else {
                changes.push(SlideshowEvent::OverlayRemoved);
            }
        }

        changes
    }

    // Convenience methods for the cycle controller

    /// Atomically claim an idle controller for a new run.
    ///
    /// In one critical section: requires `Idle`, moves to `Starting`, bumps
    /// the epoch, and seeds per-run progress. Returns the new epoch, or
    /// `None` if a cycle already owns the controller (the double-start
    /// no-op).
    pub fn begin_cycle(&self, playlist_len: usize) -> Option<u64> {
        let epoch = {
            let mut status = self.status.write().unwrap();
            if status.state != SlideshowState::Idle {
                return None;
            }
            status.state = SlideshowState::Starting;
            status.epoch += 1;
            status.playlist_len = playlist_len;
            status.slides_shown = 0;
            status.visible_buffer = None;
            status.overlay_mounted = false;
            status.epoch
        };
        self.emit(SlideshowEvent::StateChanged {
            from: SlideshowState::Idle,
            to: SlideshowState::Starting,
        });
        Some(epoch)
    }

    /// Record a slide becoming visible.
    pub fn slide_shown(&self, index: usize, source: ImageSource, buffer: SlideBuffer) {
        self.update(|status| {
            status.slides_shown = index + 1;
            status.visible_buffer = Some(buffer);
        });
        self.emit(SlideshowEvent::SlideShown {
            index,
            source,
            buffer,
        });
    }

    /// Record a non-fatal preload failure.
    pub fn slide_load_failed(&self, index: usize, source: ImageSource) {
        self.emit(SlideshowEvent::SlideLoadFailed { index, source });
    }

    /// Record both fades of a crossfade being triggered.
    pub fn crossfade_started(&self, from_index: usize, to_index: usize) {
        self.emit(SlideshowEvent::CrossfadeStarted {
            from_index,
            to_index,
        });
    }

    /// Record a buffer release and what finally triggered it.
    pub fn buffer_released(&self, buffer: SlideBuffer, trigger: ReleaseTrigger) {
        self.emit(SlideshowEvent::BufferReleased { buffer, trigger });
    }

    /// Close out a run: `Ending → Idle`, clear per-run progress, and emit
    /// [`SlideshowEvent::CycleFinished`].
    pub fn finish_cycle(&self, stopped: bool) {
        let slides_shown = {
            let mut status = self.status.write().unwrap();
            let shown = status.slides_shown;
            if status.state == SlideshowState::Ending {
                status.state = SlideshowState::Idle;
            } else {
                warn!(state = %status.state, "cycle finished outside Ending");
                status.state = SlideshowState::Idle;
            }
            status.reset_run();
            shown
        };
        self.emit(SlideshowEvent::StateChanged {
            from: SlideshowState::Ending,
            to: SlideshowState::Idle,
        });
        self.emit(SlideshowEvent::CycleFinished {
            slides_shown,
            stopped,
        });
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}

// Make StateManager cloneable for sharing across tasks
impl Clone for StateManager {
    fn clone(&self) -> Self {
        Self {
            status: Arc::clone(&self.status),
            event_tx: self.event_tx.clone(),
            metrics: self.metrics.clone(),
        }
    }
}
