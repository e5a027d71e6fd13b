//! Poll expiry
//!
//! Evaluated polls stay readable for a grace period and are then dropped from
//! the store. Each scheduled key moves `Pending -> Fired` (the poll was removed
//! or was already gone) or `Pending -> Cancelled`.
//!
//! Expiry tasks run on the caller's Tokio runtime, or else on the runtime the
//! scheduler was built in. With neither, scheduling fails with
//! [`VotingError::SchedulerUnavailable`]. The delay itself goes through
//! [`Timer`] and can be faked in tests.
//!
//! Lock order is store, then the pending map. A firing task claims its ticket
//! and removes the poll under one store lock.

use super::error::VotingError;
use super::poll::PollKey;
use super::store::PollStore;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, info};

/// Default grace period between evaluation and removal
pub const DEFAULT_EXPIRY_DELAY: Duration = Duration::from_secs(300);

/// Source of delays for the scheduler
#[async_trait]
pub trait Timer: Send + Sync + 'static {
    /// Complete after `delay` has elapsed
    async fn sleep(&self, delay: Duration);
}

/// Timer backed by the Tokio clock
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTimer;

#[async_trait]
impl Timer for TokioTimer {
    async fn sleep(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

/// How a scheduled expiry ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryOutcome {
    /// The timer fired and the evaluated poll was removed
    Removed,
    /// The timer fired but the poll was already gone or is active
    Skipped,
    /// The expiry was cancelled before it fired
    Cancelled,
}

/// Handle to one scheduled expiry
#[derive(Debug)]
pub struct ExpiryHandle {
    key: PollKey,
    task: JoinHandle<ExpiryOutcome>,
}

impl ExpiryHandle {
    pub fn key(&self) -> &PollKey {
        &self.key
    }

    /// Wait for the expiry to fire or be cancelled
    pub async fn outcome(self) -> ExpiryOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_cancelled() => ExpiryOutcome::Cancelled,
            Err(e) => std::panic::resume_unwind(e.into_panic()),
        }
    }
}

#[derive(Debug)]
struct PendingExpiry {
    ticket: u64,
    abort: AbortHandle,
}

/// Schedules delayed removal of evaluated polls
pub struct ExpiryScheduler {
    store: PollStore,
    timer: Arc<dyn Timer>,
    runtime: Option<Handle>,
    pending: Arc<Mutex<HashMap<PollKey, PendingExpiry>>>,
    next_ticket: AtomicU64,
}

impl std::fmt::Debug for ExpiryScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpiryScheduler")
            .field("pending", &self.pending_count())
            .field("has_runtime", &self.runtime.is_some())
            .finish_non_exhaustive()
    }
}

impl ExpiryScheduler {
    /// Create a scheduler using the Tokio clock
    pub fn new(store: PollStore) -> Self {
        Self::with_timer(store, Arc::new(TokioTimer))
    }

    /// Create a scheduler with a custom timer. The current Tokio runtime, if
    /// any, is kept for scheduling from threads outside it.
    pub fn with_timer(store: PollStore, timer: Arc<dyn Timer>) -> Self {
        Self {
            store,
            timer,
            runtime: Handle::try_current().ok(),
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_ticket: AtomicU64::new(0),
        }
    }

    /// Runtime new expiry tasks are spawned on
    pub(crate) fn runtime(&self) -> Result<Handle, VotingError> {
        Handle::try_current()
            .ok()
            .or_else(|| self.runtime.clone())
            .ok_or(VotingError::SchedulerUnavailable)
    }

    /// Remove the poll under `key` after `delay`, if it is then still stored
    /// and evaluated. Scheduling a key that is already pending replaces the
    /// earlier timer.
    pub fn schedule(&self, key: PollKey, delay: Duration) -> Result<ExpiryHandle, VotingError> {
        let runtime = self.runtime()?;
        Ok(self.schedule_on(&runtime, key, delay))
    }

    pub(crate) fn schedule_on(
        &self,
        runtime: &Handle,
        key: PollKey,
        delay: Duration,
    ) -> ExpiryHandle {
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        let store = self.store.clone();
        let timer = self.timer.clone();
        let pending = self.pending.clone();
        let task_key = key.clone();

        // Hold the pending map while spawning so the task cannot look for its
        // ticket before it is registered.
        let mut guard = self.pending.lock();
        let task = runtime.spawn(async move {
            timer.sleep(delay).await;

            let mut claimed = false;
            let removed = store.remove_if(&task_key, |poll| {
                claimed = claim_ticket(&pending, &task_key, ticket);
                claimed && poll.is_some_and(|poll| !poll.is_active())
            });
            if !claimed {
                return ExpiryOutcome::Cancelled;
            }

            match removed {
                Some(_) => {
                    info!(poll_id = %task_key.id, scope = %task_key.scope, "Deleted expired poll");
                    ExpiryOutcome::Removed
                }
                None => {
                    debug!(poll_id = %task_key.id, scope = %task_key.scope, "Expiry fired for a poll that is gone or active");
                    ExpiryOutcome::Skipped
                }
            }
        });

        let previous = guard.insert(
            key.clone(),
            PendingExpiry {
                ticket,
                abort: task.abort_handle(),
            },
        );
        drop(guard);

        if let Some(previous) = previous {
            previous.abort.abort();
        }
        debug!(poll_id = %key.id, scope = %key.scope, delay_secs = delay.as_secs(), "Scheduled poll expiry");

        ExpiryHandle { key, task }
    }

    /// Cancel a pending expiry. Returns false if nothing was pending.
    pub fn cancel(&self, key: &PollKey) -> bool {
        let entry = self.pending.lock().remove(key);
        match entry {
            Some(entry) => {
                entry.abort.abort();
                debug!(poll_id = %key.id, scope = %key.scope, "Cancelled poll expiry");
                true
            }
            None => false,
        }
    }

    /// Whether an expiry is waiting to fire for `key`
    pub fn is_pending(&self, key: &PollKey) -> bool {
        self.pending.lock().contains_key(key)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}

/// Take the pending entry for `key` if it still carries `ticket`
fn claim_ticket(
    pending: &Mutex<HashMap<PollKey, PendingExpiry>>,
    key: &PollKey,
    ticket: u64,
) -> bool {
    let mut pending = pending.lock();
    match pending.get(key) {
        Some(entry) if entry.ticket == ticket => {
            pending.remove(key);
            true
        }
        _ => false,
    }
}
