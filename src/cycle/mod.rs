//! The slide-cycle controller.
//!
//! [`SlideCycle`] drives a fixed-length playlist through preload → display →
//! timed hold → crossfade → next, then restores the prior view. One spawned
//! driver task owns the sequencing; every suspension point races a
//! cancellation channel so [`stop()`](SlideCycle::stop) lands immediately,
//! and every scheduled wait registers in a [`TimerSet`] so it can be
//! cancelled en masse and counted by tests.
//!
//! # Lifecycle
//!
//! ```text
//! Idle     -[start, playlist non-empty]-> Starting
//! Starting -[first frame ready]->         Running
//! Running  -[entries remain]->            Running   (advance self-loop)
//! Running  -[playlist exhausted]->        Ending
//! Starting|Running -[stop()]->            Ending
//! Idle     -[start, playlist empty]->     Ending    (no overlay mounted)
//! Ending   -[teardown done]->             Idle
//! ```
//!
//! All paths out of a cycle converge on one teardown tail, so the home view
//! and the start affordance are restored exactly once per cycle — even when
//! no overlay was ever created.
//!
//! # Fault tolerance
//!
//! A failed preload is logged and the slide is shown anyway; a fade or
//! overlay completion signal that never arrives is bounded by a fallback
//! timer. Only an empty playlist is reported to the caller as an error.

pub mod timers;

pub use timers::{TimerKind, TimerSet};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{broadcast, oneshot, watch};
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use crate::metrics::Metrics;
use crate::models::{CycleStatus, Playlist, PlaylistEntry, SlideTiming, SlideshowState};
use crate::state::{SlideshowEvent, StateManager};
use crate::surface::{
    FadeDirection, HomeView, ImageLoader, LoadOutcome, ReleaseTrigger, SlideBuffer, Stage,
};

/// Everything that can go wrong while cycling slides.
///
/// Only [`EmptyPlaylist`](SlideshowError::EmptyPlaylist) reaches callers of
/// [`SlideCycle::start`]; the other members are non-fatal and travel through
/// logs, events, and metrics while the cycle keeps moving.
#[derive(Error, Debug)]
pub enum SlideshowError {
    /// The start request carried nothing to show. No overlay is created.
    #[error("playlist is empty")]
    EmptyPlaylist,

    /// A preload resolved as failed. The slide is shown anyway, possibly
    /// broken, for its full hold duration.
    #[error("resource load failed for slide {index}: {image}")]
    ResourceLoad {
        index: usize,
        image: crate::models::ImageSource,
    },

    /// A visual completion signal never arrived; the fallback timer bounds
    /// the wait.
    #[error("{what} completion signal never arrived")]
    TransitionSignalMissing { what: &'static str },
}

/// A release guard still racing its fade-out signal against the fallback
/// timer. The driver holds this between advances so the buffer can be
/// settled before it takes new content.
struct PendingRelease {
    buffer: SlideBuffer,
    abort: AbortHandle,
    released: Arc<AtomicBool>,
}

impl PendingRelease {
    /// Force the release now so the buffer can be written again. The flag
    /// swap ensures exactly one of the guard task and this path performs
    /// the release, whatever order the scheduler runs them in.
    fn settle(self, cycle: &SlideCycle) {
        self.abort.abort();
        if !self.released.swap(true, Ordering::SeqCst) {
            cycle.stage.release(self.buffer);
            cycle.state.buffer_released(self.buffer, ReleaseTrigger::Forced);
            cycle.metrics.record_release(ReleaseTrigger::Forced);
            debug!(buffer = %self.buffer, "release forced before buffer reuse");
        }
    }
}

/// Timed crossfade slide-cycle controller.
///
/// Owns the playlist sequencing, the double-buffered crossfade contract, and
/// the teardown/restart safety machinery. Visuals and loading stay behind
/// the [`crate::surface`] seams, so the controller runs the same against a
/// real render layer, the console demo surface, or test fakes.
///
/// Instances are independent: state, timers, and metrics are all
/// per-controller, and the handle is cheap to clone for sharing with tasks.
///
/// # Example
///
/// ```ignore
/// let cycle = SlideCycle::new(timing, stage, home, loader);
/// cycle.start(playlist).await?;
/// cycle.wait_until_idle().await;
/// ```
#[derive(Clone)]
pub struct SlideCycle {
    timing: SlideTiming,
    stage: Arc<dyn Stage>,
    home: Arc<dyn HomeView>,
    loader: Arc<dyn ImageLoader>,

    /// Shared status + event hub for this controller.
    state: StateManager,

    /// Registry of outstanding hold and fallback-release timers.
    timers: Arc<TimerSet>,

    metrics: Arc<Metrics>,

    /// Cancellation sender for the current run. Replaced on every accepted
    /// start so a stale stop cannot bleed into a later cycle.
    cancel: Arc<Mutex<Option<watch::Sender<bool>>>>,
}

impl SlideCycle {
    /// Create a controller in `Idle` over the given surface collaborators.
    ///
    /// Timing travels with the controller, not with `start()`: the four
    /// recognized options always move together.
    pub fn new(
        timing: SlideTiming,
        stage: Arc<dyn Stage>,
        home: Arc<dyn HomeView>,
        loader: Arc<dyn ImageLoader>,
    ) -> Self {
        let metrics = Arc::new(Metrics::new());
        Self {
            timing,
            stage,
            home,
            loader,
            state: StateManager::with_metrics(Arc::clone(&metrics)),
            timers: Arc::new(TimerSet::new()),
            metrics,
            cancel: Arc::new(Mutex::new(None)),
        }
    }

    /// Begin a cycle over `playlist`.
    ///
    /// Returns `Ok(true)` when the cycle was accepted and the driver task is
    /// running, `Ok(false)` when a cycle already owns the controller (the
    /// double-start no-op), and [`SlideshowError::EmptyPlaylist`] when there
    /// is nothing to show — in which case no overlay is created and the
    /// controller settles straight back to `Idle`.
    ///
    /// Completion is observed through [`subscribe()`](Self::subscribe) or
    /// [`wait_until_idle()`](Self::wait_until_idle).
    pub async fn start(&self, playlist: Playlist) -> Result<bool, SlideshowError> {
        if playlist.is_empty() {
            if self.state.state() != SlideshowState::Idle {
                debug!(state = %self.state.state(), "start ignored: cycle already active");
                return Ok(false);
            }
            warn!("start rejected: empty playlist");
            // Straight to Ending, never Starting: the shared teardown tail
            // still restores the home view and the start affordance.
            if self.state.transition(SlideshowState::Ending) {
                self.teardown(false).await;
            }
            return Err(SlideshowError::EmptyPlaylist);
        }

        let Some(epoch) = self.state.begin_cycle(playlist.len()) else {
            debug!(state = %self.state.state(), "start ignored: cycle already active");
            return Ok(false);
        };

        // Fresh cancellation channel per run; the previous run's sender (if
        // any) is gone by now, taken during its teardown.
        let (cancel_tx, cancel_rx) = watch::channel(false);
        *self
            .cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(cancel_tx);

        info!(slides = playlist.len(), epoch, hold_ms = self.timing.hold_ms, "slideshow starting");
        self.home.set_trigger_enabled(false);
        self.home.set_visible(false);
        self.stage.mount();
        self.state.update(|status| status.overlay_mounted = true);

        let cycle = self.clone();
        tokio::spawn(async move {
            let stopped = cycle.drive(&playlist, epoch, cancel_rx).await;
            // The natural end and stop() both land in Ending already; this
            // covers the cancellation paths that return without a move.
            cycle.state.transition(SlideshowState::Ending);
            cycle.teardown(stopped).await;
        });

        Ok(true)
    }

    /// End the cycle now.
    ///
    /// Acts only while `Starting` or `Running`: flips to `Ending`, cancels
    /// every pending timer synchronously (the pending count is zero when
    /// this returns), and signals the driver, which proceeds to the shared
    /// teardown. Returns whether a cycle was actually stopped.
    pub fn stop(&self) -> bool {
        if !self.state.read(|status| status.state.is_active()) {
            debug!(state = %self.state.state(), "stop ignored: no active cycle");
            return false;
        }
        self.state.transition(SlideshowState::Ending);
        let cancelled = self.timers.cancel_all();
        if let Some(cancel_tx) = self
            .cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            let _ = cancel_tx.send(true);
        }
        info!(cancelled, "stop requested; teardown underway");
        true
    }

    /// Current state machine position.
    pub fn state(&self) -> SlideshowState {
        self.state.state()
    }

    /// Snapshot of the controller's progress.
    pub fn status(&self) -> CycleStatus {
        self.state.snapshot()
    }

    /// Number of outstanding scheduled timers (hold + fallback-release).
    pub fn pending_timers(&self) -> usize {
        self.timers.pending()
    }

    /// Subscribe to this controller's [`SlideshowEvent`] stream.
    pub fn subscribe(&self) -> broadcast::Receiver<SlideshowEvent> {
        self.state.subscribe()
    }

    /// The controller's runtime metrics.
    pub fn metrics(&self) -> Arc<Metrics> {
        Arc::clone(&self.metrics)
    }

    /// The timing this controller was built with.
    pub fn timing(&self) -> SlideTiming {
        self.timing
    }

    /// Resolve once the controller is `Idle` (immediately if it already is).
    pub async fn wait_until_idle(&self) {
        // Subscribe before the state check so the transition cannot slip
        // between the two.
        let mut rx = self.state.subscribe();
        if self.state.state() == SlideshowState::Idle {
            return;
        }
        loop {
            match rx.recv().await {
                Ok(SlideshowEvent::StateChanged {
                    to: SlideshowState::Idle,
                    ..
                }) => return,
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(_)) => {
                    if self.state.state() == SlideshowState::Idle {
                        return;
                    }
                }
                Err(broadcast::error::RecvError::Closed) => return,
            }
        }
    }

    /// Run one cycle until its end state. Returns whether it was stopped
    /// early.
    async fn drive(
        &self,
        playlist: &Playlist,
        epoch: u64,
        mut cancel_rx: watch::Receiver<bool>,
    ) -> bool {
        let Some(first) = playlist.get(0) else {
            return false; // start() rejects empty playlists
        };

        // First image: preload, then show at full opacity right away.
        // Fading in from a blank buffer would flash black under the fade.
        let outcome = tokio::select! {
            outcome = Self::resolve(self.loader.preload(&first.source)) => outcome,
            _ = cancel_rx.changed() => return true,
        };
        if outcome == LoadOutcome::Failed {
            self.note_load_failure(first);
        }
        if self.is_stale(epoch) {
            return true;
        }

        self.stage.attach(SlideBuffer::A, &first.source);
        self.stage.show_immediate(SlideBuffer::A);
        self.state.transition(SlideshowState::Running);
        self.state
            .slide_shown(first.index, first.source.clone(), SlideBuffer::A);
        self.metrics.record_slide_shown();
        info!(index = 0, source = %first.source, "first slide visible");

        let mut visible = SlideBuffer::A;
        let mut pending_release: Option<PendingRelease> = None;
        let mut next_index = 1;

        loop {
            tokio::select! {
                _ = self.timers.sleep(TimerKind::Hold, epoch, self.timing.hold()) => {}
                _ = cancel_rx.changed() => return true,
            }
            if self.is_stale(epoch) {
                return true;
            }

            let entry = match playlist.get(next_index) {
                Some(entry) => entry,
                None => {
                    info!(slides = playlist.len(), "playlist exhausted");
                    self.state.transition(SlideshowState::Ending);
                    return false;
                }
            };

            // Preload is load-or-error: it always resolves, so the only way
            // out early is cancellation.
            let outcome = tokio::select! {
                outcome = Self::resolve(self.loader.preload(&entry.source)) => outcome,
                _ = cancel_rx.changed() => return true,
            };
            if outcome == LoadOutcome::Failed {
                self.note_load_failure(entry);
            }

            let target = visible.other();
            // The hidden slot may still have a release guard racing its
            // fallback window (hold shorter than fade + margin). Settle it
            // before the slot takes new content; alternation stays strictly
            // turn-based.
            if let Some(pending) = pending_release.take() {
                pending.settle(self);
            }

            self.stage.attach(target, &entry.source);
            if self.await_frame_commits(&mut cancel_rx).await {
                return true;
            }

            // Trigger both fades together. The fade-in needs no completion
            // bookkeeping; the fade-out feeds the release guard.
            let _ = self
                .stage
                .begin_fade(target, FadeDirection::In, self.timing.fade());
            let fade_out = self
                .stage
                .begin_fade(visible, FadeDirection::Out, self.timing.fade());
            self.state.crossfade_started(next_index - 1, next_index);
            self.metrics.record_crossfade();
            self.state
                .slide_shown(entry.index, entry.source.clone(), target);
            self.metrics.record_slide_shown();
            debug!(
                index = next_index,
                source = %entry.source,
                from = %visible,
                to = %target,
                "crossfade started"
            );

            pending_release = Some(self.spawn_release_guard(visible, fade_out, epoch));
            visible = target;
            next_index += 1;
        }
    }

    /// Shared teardown tail. Every path out of a cycle — natural end,
    /// explicit stop, empty start — funnels through here, so the home view
    /// and the start affordance are restored exactly once per cycle.
    async fn teardown(&self, stopped: bool) {
        self.cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let cancelled = self.timers.cancel_all();
        if cancelled > 0 {
            debug!(cancelled, "timers still pending at teardown");
        }

        let overlay_mounted = self.state.read(|status| status.overlay_mounted);
        if overlay_mounted {
            let fade = self.stage.begin_overlay_fade(self.timing.teardown());
            self.await_overlay_fade(fade).await;
            self.stage.unmount();
            self.state.update(|status| status.overlay_mounted = false);
        }

        self.home.set_visible(true);
        self.home.set_trigger_enabled(true);
        self.state.finish_cycle(stopped);
        self.metrics.record_cycle(stopped);
        info!(stopped, "cycle finished; controller idle");
    }

    /// Dual guard on overlay removal: the fade signal or the removal
    /// deadline, whichever first. Deliberately not a registered timer —
    /// teardown belongs to `Ending` and must ride out a `stop()`.
    async fn await_overlay_fade(&self, fade: oneshot::Receiver<()>) {
        let expired = tokio::time::sleep(self.timing.removal_deadline());
        tokio::pin!(expired);
        tokio::select! {
            result = fade => {
                if result.is_err() {
                    let error = SlideshowError::TransitionSignalMissing { what: "overlay fade" };
                    warn!(%error, "waiting out the removal deadline");
                    expired.await;
                }
            }
            _ = &mut expired => {
                let error = SlideshowError::TransitionSignalMissing { what: "overlay fade" };
                warn!(%error, "removing overlay anyway");
            }
        }
    }

    /// Detach a guard that releases `buffer` once its fade-out signal
    /// resolves, or at `fade + fallback margin` if it never does.
    fn spawn_release_guard(
        &self,
        buffer: SlideBuffer,
        fade_out: oneshot::Receiver<()>,
        epoch: u64,
    ) -> PendingRelease {
        let released = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&released);
        let stage = Arc::clone(&self.stage);
        let state = self.state.clone();
        let metrics = Arc::clone(&self.metrics);
        let deadline = self.timing.release_deadline();

        let abort = self
            .timers
            .spawn_guarded(TimerKind::FallbackRelease, epoch, async move {
                let trigger = Self::await_fade_out(fade_out, deadline, buffer).await;
                // Stale guards (run torn down or restarted underneath the
                // timer) leave the buffer to teardown's unmount.
                if state.read(|s| s.epoch != epoch || !s.state.is_active()) {
                    debug!(%buffer, "stale release guard");
                    return;
                }
                if flag.swap(true, Ordering::SeqCst) {
                    return; // settled by the reuse path
                }
                stage.release(buffer);
                state.buffer_released(buffer, trigger);
                metrics.record_release(trigger);
                debug!(%buffer, %trigger, "previous slide released");
            });

        PendingRelease {
            buffer,
            abort,
            released,
        }
    }

    /// Race a fade-out completion signal against the fallback deadline. A
    /// dropped sender means the signal will never come; the full window is
    /// still waited out rather than yanking a buffer that may be mid-fade.
    async fn await_fade_out(
        fade_out: oneshot::Receiver<()>,
        deadline: Duration,
        buffer: SlideBuffer,
    ) -> ReleaseTrigger {
        let expired = tokio::time::sleep(deadline);
        tokio::pin!(expired);
        tokio::select! {
            result = fade_out => match result {
                Ok(()) => ReleaseTrigger::Signaled,
                Err(_) => {
                    let error = SlideshowError::TransitionSignalMissing { what: "fade-out" };
                    warn!(%buffer, %error, "waiting out the fallback window");
                    expired.await;
                    ReleaseTrigger::FallbackTimeout
                }
            },
            _ = &mut expired => {
                let error = SlideshowError::TransitionSignalMissing { what: "fade-out" };
                warn!(%buffer, %error, "releasing on fallback");
                ReleaseTrigger::FallbackTimeout
            }
        }
    }

    /// Wait for two frame commits so freshly attached content has a
    /// committed layout before its fade triggers; without them the
    /// transition jumps instead of animating. A dropped sender degrades to
    /// an un-animated switch rather than a stall. Returns whether the wait
    /// was cancelled.
    async fn await_frame_commits(&self, cancel_rx: &mut watch::Receiver<bool>) -> bool {
        for _ in 0..2 {
            let committed = self.stage.frame_committed();
            tokio::select! {
                _ = committed => {}
                _ = cancel_rx.changed() => return true,
            }
        }
        false
    }

    /// Collapse a dropped loader sender into a failed load.
    async fn resolve(rx: oneshot::Receiver<LoadOutcome>) -> LoadOutcome {
        rx.await.unwrap_or(LoadOutcome::Failed)
    }

    /// Stale-cycle check for code resumed after a suspension point: the run
    /// may have been stopped through a channel this waiter was not
    /// selecting on.
    fn is_stale(&self, epoch: u64) -> bool {
        self.state
            .read(|status| status.epoch != epoch || !status.state.is_active())
    }

    fn note_load_failure(&self, entry: &PlaylistEntry) {
        let error = SlideshowError::ResourceLoad {
            index: entry.index,
            image: entry.source.clone(),
        };
        warn!(%error, "proceeding with the slide anyway");
        self.state
            .slide_load_failed(entry.index, entry.source.clone());
        self.metrics.record_load_failure();
    }
}
