//! Countable registry of the cycle's pending timers.
//!
//! Every scheduled transition the controller is waiting on — the hold before
//! the next advance, the fallback window before a forced buffer release —
//! registers here while outstanding, so `stop()` can cancel the lot
//! synchronously and tests can assert the count drops to zero. The
//! teardown-phase wait is deliberately not registered: it belongs to
//! `Ending` and must survive a stop request.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::AbortHandle;
use tracing::debug;

/// What a pending timer is scheduled to do when it fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerKind {
    /// Hold period before the next advance.
    Hold,
    /// Fallback window after a fade-out, forcing the release if the
    /// completion signal never arrives.
    FallbackRelease,
}

impl fmt::Display for TimerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerKind::Hold => f.write_str("hold"),
            TimerKind::FallbackRelease => f.write_str("fallback-release"),
        }
    }
}

#[derive(Debug)]
struct Entry {
    kind: TimerKind,
    epoch: u64,
    /// Present for detached guard tasks; inline sleeps are cancelled by
    /// dropping their future instead.
    abort: Option<AbortHandle>,
}

type Registry = Arc<Mutex<HashMap<u64, Entry>>>;

/// Removes its entry when the owning wait completes or is dropped.
struct Registration {
    entries: Registry,
    id: u64,
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}

/// Shared set of outstanding timers for one controller.
#[derive(Debug, Default)]
pub struct TimerSet {
    entries: Registry,
    next_id: AtomicU64,
}

impl TimerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of timers currently outstanding.
    pub fn pending(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Outstanding timers of one kind.
    pub fn pending_of(&self, kind: TimerKind) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|entry| entry.kind == kind)
            .count()
    }

    fn register(&self, kind: TimerKind, epoch: u64, abort: Option<AbortHandle>) -> Registration {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Entry { kind, epoch, abort });
        Registration {
            entries: Arc::clone(&self.entries),
            id,
        }
    }

    /// Sleep for `duration`, registered for the whole wait.
    ///
    /// Cancel-safe: dropping the returned future (a `select!` taking another
    /// branch, or the driver winding down) deregisters immediately.
    pub async fn sleep(&self, kind: TimerKind, epoch: u64, duration: Duration) {
        let _registration = self.register(kind, epoch, None);
        tokio::time::sleep(duration).await;
    }

    /// Spawn a detached timer task, registered until it finishes.
    ///
    /// The task stays abortable through [`cancel_all`](Self::cancel_all) and
    /// the returned handle; the future itself is responsible for checking
    /// its epoch before any side effect, since an abort only lands at the
    /// next await point.
    pub fn spawn_guarded<F>(&self, kind: TimerKind, epoch: u64, future: F) -> AbortHandle
    where
        F: Future<Output = ()> + Send + 'static,
    {
        // Register before spawning so the entry exists even if the task
        // finishes (and its registration drops) before we see the handle.
        let registration = self.register(kind, epoch, None);
        let id = registration.id;
        let handle = tokio::spawn(async move {
            let _registration = registration;
            future.await;
        });
        let abort = handle.abort_handle();
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = entries.get_mut(&id) {
            entry.abort = Some(abort.clone());
        }
        abort
    }

    /// Cancel every outstanding timer and clear the registry. Returns how
    /// many were cancelled. Synchronous: the count is zero on return.
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<Entry> = {
            let mut entries = self
                .entries
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            entries.drain().map(|(_, entry)| entry).collect()
        };
        for entry in &drained {
            debug!(kind = %entry.kind, epoch = entry.epoch, "cancelling pending timer");
            if let Some(abort) = &entry.abort {
                abort.abort();
            }
        }
        drained.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    #[tokio::test(start_paused = true)]
    async fn test_sleep_registers_while_waiting() {
        let timers = Arc::new(TimerSet::new());
        assert_eq!(timers.pending(), 0);

        let waiting = Arc::clone(&timers);
        let task = tokio::spawn(async move {
            waiting
                .sleep(TimerKind::Hold, 1, Duration::from_millis(500))
                .await;
        });
        tokio::task::yield_now().await;
        assert_eq!(timers.pending(), 1);
        assert_eq!(timers.pending_of(TimerKind::Hold), 1);
        assert_eq!(timers.pending_of(TimerKind::FallbackRelease), 0);

        task.await.expect("sleep task");
        assert_eq!(timers.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_sleep_deregisters() {
        let timers = Arc::new(TimerSet::new());
        tokio::select! {
            _ = timers.sleep(TimerKind::Hold, 1, Duration::from_secs(10)) => {
                panic!("long sleep should lose the race");
            }
            _ = tokio::time::sleep(Duration::from_millis(10)) => {}
        }
        assert_eq!(timers.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_guarded_task_deregisters_on_completion() {
        let timers = Arc::new(TimerSet::new());
        let fired = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&fired);
        timers.spawn_guarded(TimerKind::FallbackRelease, 1, async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            flag.store(true, Ordering::SeqCst);
        });
        tokio::task::yield_now().await;
        assert_eq!(timers.pending_of(TimerKind::FallbackRelease), 1);

        tokio::time::sleep(Duration::from_millis(100)).await;
        tokio::task::yield_now().await;
        assert!(fired.load(Ordering::SeqCst));
        assert_eq!(timers.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all_aborts_guarded_tasks() {
        let timers = Arc::new(TimerSet::new());
        let fired = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&fired);
        timers.spawn_guarded(TimerKind::FallbackRelease, 1, async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            flag.store(true, Ordering::SeqCst);
        });
        tokio::task::yield_now().await;

        assert_eq!(timers.cancel_all(), 1);
        assert_eq!(timers.pending(), 0);

        // Well past the would-be deadline: the aborted task never fired.
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(!fired.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all_counts_inline_sleeps() {
        let timers = Arc::new(TimerSet::new());
        let waiting = Arc::clone(&timers);
        let task = tokio::spawn(async move {
            waiting
                .sleep(TimerKind::Hold, 1, Duration::from_secs(5))
                .await;
        });
        tokio::task::yield_now().await;

        assert_eq!(timers.cancel_all(), 1);
        assert_eq!(timers.pending(), 0);
        // The sleeping future itself still runs to its deadline unless its
        // owner drops it; only the registry entry is gone.
        task.abort();
    }
}
