//! Tracing-backed surface implementations.
//!
//! These stand in for a real render layer: stage operations are logged, fade
//! completions fire after the real duration on a spawned sleep, and preloads
//! actually read the source from disk. Good enough to watch a full cycle run
//! from a terminal, and the implementations the demo binary wires up.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use camino::Utf8PathBuf;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use super::{FadeDirection, HomeView, ImageLoader, LoadOutcome, SlideBuffer, Stage};
use crate::models::ImageSource;

/// Stage that narrates overlay operations through tracing.
///
/// Keeps per-buffer bookkeeping of what is attached so release logs carry
/// the source name and double releases stay quiet.
#[derive(Debug, Default)]
pub struct ConsoleStage {
    slots: Mutex<[Option<ImageSource>; 2]>,
}

impl ConsoleStage {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot_index(buffer: SlideBuffer) -> usize {
        match buffer {
            SlideBuffer::A => 0,
            SlideBuffer::B => 1,
        }
    }

    /// Fire `tx` after `duration`, standing in for a transition-end signal.
    fn signal_after(duration: Duration, tx: oneshot::Sender<()>) {
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            let _ = tx.send(());
        });
    }
}

impl Stage for ConsoleStage {
    fn mount(&self) {
        info!("overlay mounted (buffers A/B hidden)");
    }

    fn attach(&self, buffer: SlideBuffer, source: &ImageSource) {
        debug!(%buffer, %source, "attached source to buffer");
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots[Self::slot_index(buffer)] = Some(source.clone());
    }

    fn show_immediate(&self, buffer: SlideBuffer) {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        match &slots[Self::slot_index(buffer)] {
            Some(source) => info!(%buffer, %source, "showing slide at full opacity"),
            None => warn!(%buffer, "show requested for an empty buffer"),
        }
    }

    fn begin_fade(
        &self,
        buffer: SlideBuffer,
        direction: FadeDirection,
        duration: Duration,
    ) -> oneshot::Receiver<()> {
        debug!(%buffer, %direction, ?duration, "fade started");
        let (tx, rx) = oneshot::channel();
        Self::signal_after(duration, tx);
        rx
    }

    fn frame_committed(&self) -> oneshot::Receiver<()> {
        // No render loop to sync with; commit immediately.
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(());
        rx
    }

    fn release(&self, buffer: SlideBuffer) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let released = slots[Self::slot_index(buffer)].take();
        match released {
            Some(source) => debug!(%buffer, %source, "buffer released"),
            None => debug!(%buffer, "buffer already clear"),
        }
    }

    fn begin_overlay_fade(&self, duration: Duration) -> oneshot::Receiver<()> {
        info!(?duration, "overlay fading out");
        let (tx, rx) = oneshot::channel();
        Self::signal_after(duration, tx);
        rx
    }

    fn unmount(&self) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        *slots = [None, None];
        info!("overlay removed");
    }
}

/// Home view that narrates visibility and trigger changes.
#[derive(Debug, Default)]
pub struct ConsoleHome;

impl ConsoleHome {
    pub fn new() -> Self {
        Self
    }
}

impl HomeView for ConsoleHome {
    fn set_visible(&self, visible: bool) {
        if visible {
            info!("home view restored");
        } else {
            info!("home view hidden");
        }
    }

    fn set_trigger_enabled(&self, enabled: bool) {
        debug!(enabled, "start trigger toggled");
    }
}

/// Loader that preloads by reading the source path from disk.
///
/// Sources are treated as filesystem paths, optionally resolved against a
/// base directory. A failed read resolves as [`LoadOutcome::Failed`]; the
/// cycle shows the slide regardless.
#[derive(Debug, Default)]
pub struct FileImageLoader {
    base_dir: Option<Utf8PathBuf>,
}

impl FileImageLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative sources against `base_dir`.
    pub fn with_base_dir(base_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
        }
    }

    fn resolve(&self, source: &ImageSource) -> Utf8PathBuf {
        let path = Utf8PathBuf::from(source.as_str());
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path,
        }
    }
}

impl ImageLoader for FileImageLoader {
    fn preload(&self, source: &ImageSource) -> oneshot::Receiver<LoadOutcome> {
        let (tx, rx) = oneshot::channel();
        let path = self.resolve(source);
        let source = source.clone();
        tokio::spawn(async move {
            let outcome = match tokio::fs::read(&path).await {
                Ok(bytes) => {
                    debug!(%source, bytes = bytes.len(), "preloaded");
                    LoadOutcome::Loaded
                }
                Err(error) => {
                    warn!(%source, %path, %error, "preload failed");
                    LoadOutcome::Failed
                }
            };
            let _ = tx.send(outcome);
        });
        rx
    }
}
