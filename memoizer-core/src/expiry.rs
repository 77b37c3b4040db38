//! Per-entry expiry timers.
//!
//! An [`ExpiryTimer`] owns the tokio task that evicts one entry. Scheduling
//! counts a pending expiration; the handle then leaves that state exactly
//! once, either by firing ([`ExpiryTimer::fire`]) or by being dropped, which
//! aborts the task. Overwrite, clear and clear-all all remove entries by
//! dropping them, so they all cancel through `Drop`.
//!
//! The task runs on the caller's runtime when there is one. A runtime can
//! shut down while timers are still sleeping on it; such a timer moves to
//! the crate's background runtime with its original wall-clock deadline, so
//! an armed timer always has a task that will fire.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::{debug, error};

use crate::MemoizerStats;

static NEXT_TIMER_ID: AtomicU64 = AtomicU64::new(1);

/// Runtime used when the caller is not inside a tokio runtime, and for
/// timers whose runtime shut down before they fired.
static BACKGROUND_RUNTIME: Lazy<Option<Runtime>> = Lazy::new(|| {
    Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("memoizer-expiry")
        .enable_time()
        .build()
        .map_err(|err| error!(error = %err, "failed to start expiry runtime"))
        .ok()
});

fn background_handle() -> Option<Handle> {
    BACKGROUND_RUNTIME.as_ref().map(|rt| rt.handle().clone())
}

fn runtime_handle() -> Option<Handle> {
    Handle::try_current().ok().or_else(background_handle)
}

/// State shared between a timer handle and whichever task currently
/// carries its eviction.
#[derive(Default)]
struct TimerTask {
    cancelled: AtomicBool,
    abort: Mutex<Option<AbortHandle>>,
}

impl TimerTask {
    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        // taken out first: aborting may drop the task's future on this thread
        let abort = self.abort.lock().take();
        if let Some(abort) = abort {
            abort.abort();
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// The eviction callback while it is waiting inside a task.
///
/// Dropped without having fired and without being cancelled means the
/// runtime went away, in which case the callback is spawned again on the
/// background runtime.
struct PendingFire<F>
where
    F: FnOnce(u64) + Send + 'static,
{
    id: u64,
    deadline: std::time::Instant,
    on_fire: Option<F>,
    task: Arc<TimerTask>,
}

impl<F> PendingFire<F>
where
    F: FnOnce(u64) + Send + 'static,
{
    fn fire(mut self) {
        if let Some(on_fire) = self.on_fire.take() {
            on_fire(self.id);
        }
    }

    /// Spawns this callback on `handle`, to run at `at`.
    fn spawn_on(self, handle: &Handle, at: Instant) {
        if self.task.is_cancelled() {
            return;
        }

        let task = Arc::clone(&self.task);
        let spawned = handle.spawn(async move {
            tokio::time::sleep_until(at).await;
            self.fire();
        });

        // checked again under the lock, the handle may have been dropped meanwhile
        let mut abort = task.abort.lock();
        if task.is_cancelled() {
            spawned.abort();
        } else {
            *abort = Some(spawned.abort_handle());
        }
    }
}

impl<F> Drop for PendingFire<F>
where
    F: FnOnce(u64) + Send + 'static,
{
    fn drop(&mut self) {
        let Some(on_fire) = self.on_fire.take() else {
            return;
        };
        if self.task.is_cancelled() {
            return;
        }

        let Some(handle) = background_handle() else {
            error!(timer_id = self.id, "runtime shut down and no expiry runtime available, value will not expire");
            return;
        };
        debug!(timer_id = self.id, "runtime shut down before expiry, moving timer to background runtime");
        let at = {
            let _enter = handle.enter();
            Instant::now() + self.deadline.saturating_duration_since(std::time::Instant::now())
        };
        PendingFire {
            id: self.id,
            deadline: self.deadline,
            on_fire: Some(on_fire),
            task: Arc::clone(&self.task),
        }
        .spawn_on(&handle, at);
    }
}

/// Owned handle to a scheduled eviction.
pub(crate) struct ExpiryTimer {
    id: u64,
    max_age: Duration,
    task: Arc<TimerTask>,
    stats: Arc<MemoizerStats>,
    armed: bool,
}

impl ExpiryTimer {
    /// Schedules `on_fire` to run once `max_age` has elapsed.
    ///
    /// `on_fire` receives the timer id so it can verify that the entry it is
    /// about to evict still owns this timer. Returns `None`, without counting
    /// a pending expiration, if no runtime is available.
    pub(crate) fn schedule<F>(
        max_age: Duration,
        stats: Arc<MemoizerStats>,
        on_fire: F,
    ) -> Option<Self>
    where
        F: FnOnce(u64) + Send + 'static,
    {
        let handle = runtime_handle()?;
        let id = NEXT_TIMER_ID.fetch_add(1, Ordering::Relaxed);
        let task = Arc::new(TimerTask::default());

        // fixed now so the deadline does not depend on when the task is first polled
        let at = {
            let _enter = handle.enter();
            Instant::now() + max_age
        };
        PendingFire {
            id,
            deadline: std::time::Instant::now() + max_age,
            on_fire: Some(on_fire),
            task: Arc::clone(&task),
        }
        .spawn_on(&handle, at);

        stats.record_scheduled();
        Some(Self {
            id,
            max_age,
            task,
            stats,
            armed: true,
        })
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Marks the timer as fired and counts the expiration.
    pub(crate) fn fire(mut self) {
        self.armed = false;
        self.stats.record_expired();
    }
}

impl Drop for ExpiryTimer {
    fn drop(&mut self) {
        if self.armed {
            self.task.cancel();
            self.stats.record_cancelled();
        }
    }
}

impl std::fmt::Debug for ExpiryTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpiryTimer")
            .field("id", &self.id)
            .field("max_age", &self.max_age)
            .field("armed", &self.armed)
            .finish()
    }
}
