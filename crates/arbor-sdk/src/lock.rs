//! FIFO mutation lock.
//!
//! An async mutex that hands out grants strictly in arrival order. Each
//! grant is identified by a lock id that must be presented on release, and
//! is force-released when held past the safety timeout. Each queued request
//! gives up on its own after the wait timeout without disturbing the rest
//! of the queue.

use crate::config::LockConfig;
use crate::error::{Result, SdkError};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use ulid::Ulid;

/// The current grant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LockHolder {
    pub lock_id: String,
    pub owner_id: String,
    pub acquired_at: Instant,
}

/// A request waiting in the queue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueuedRequest {
    pub owner_id: String,
    pub enqueued_at: Instant,
}

/// Running lock counters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LockStats {
    pub acquisitions: u64,
    pub releases: u64,
    pub timeouts: u64,
    pub forced_releases: u64,
    /// Mean time between request and grant.
    pub mean_wait: Duration,
}

struct Waiter {
    ticket: u64,
    owner_id: String,
    enqueued_at: Instant,
    grant: oneshot::Sender<LockHolder>,
}

#[derive(Default)]
struct LockState {
    holder: Option<LockHolder>,
    queue: VecDeque<Waiter>,
    safety: Option<JoinHandle<()>>,
    next_ticket: u64,
    stats: LockStats,
    total_wait: Duration,
}

fn mean_duration(total: Duration, count: u64) -> Duration {
    if count == 0 {
        return Duration::ZERO;
    }
    let nanos = total.as_nanos() / u128::from(count);
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}

struct Shared {
    config: LockConfig,
    state: Mutex<LockState>,
}

impl Shared {
    fn new_holder(owner_id: String) -> LockHolder {
        LockHolder {
            lock_id: Ulid::new().to_string(),
            owner_id,
            acquired_at: Instant::now(),
        }
    }

    /// Install `holder` and arm its safety timer.
    fn install(self: &Arc<Self>, state: &mut LockState, holder: LockHolder, waited: Duration) {
        state.stats.acquisitions += 1;
        state.total_wait += waited;
        state.stats.mean_wait = mean_duration(state.total_wait, state.stats.acquisitions);
        state.safety = self.arm_safety(holder.lock_id.clone());
        tracing::trace!(owner = %holder.owner_id, lock_id = %holder.lock_id, "lock granted");
        state.holder = Some(holder);
    }

    fn arm_safety(self: &Arc<Self>, lock_id: String) -> Option<JoinHandle<()>> {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                tracing::warn!(%lock_id, "no runtime, safety timeout not armed");
                return None;
            }
        };
        let shared = Arc::downgrade(self);
        let timeout = self.config.safety_timeout;
        Some(handle.spawn(async move {
            tokio::time::sleep(timeout).await;
            if let Some(shared) = shared.upgrade() {
                shared.force_release(&lock_id);
            }
        }))
    }

    fn force_release(self: &Arc<Self>, lock_id: &str) {
        let mut state = self.state.lock();
        let owned = state.holder.as_ref().is_some_and(|h| h.lock_id == lock_id);
        if !owned {
            return;
        }
        // The timer task is the one running; dropping its handle detaches it.
        state.safety = None;
        if let Some(holder) = state.holder.take() {
            tracing::warn!(
                owner = %holder.owner_id,
                %lock_id,
                held_ms = holder.acquired_at.elapsed().as_millis() as u64,
                "lock held past safety timeout, forcing release"
            );
        }
        state.stats.forced_releases += 1;
        self.promote(&mut state);
    }

    /// Hand the lock to the oldest waiter still listening.
    fn promote(self: &Arc<Self>, state: &mut LockState) {
        while let Some(waiter) = state.queue.pop_front() {
            let holder = Self::new_holder(waiter.owner_id);
            if waiter.grant.send(holder.clone()).is_ok() {
                self.install(state, holder, waiter.enqueued_at.elapsed());
                return;
            }
            tracing::trace!(owner = %holder.owner_id, "abandoned lock request skipped");
        }
    }
}

/// A FIFO async mutex guarding a batch of mutations.
///
/// Cloning shares the same lock.
#[derive(Clone)]
pub struct MutationLock {
    shared: Arc<Shared>,
}

impl MutationLock {
    pub fn new(config: LockConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                state: Mutex::new(LockState::default()),
            }),
        }
    }

    pub fn config(&self) -> &LockConfig {
        &self.shared.config
    }

    /// Acquire the lock for `owner_id`, queueing behind earlier requests.
    /// Fails with [`SdkError::LockTimeout`] if the grant does not arrive
    /// within the configured wait timeout.
    pub async fn acquire(&self, owner_id: impl Into<String>) -> Result<LockHolder> {
        self.acquire_with_timeout(owner_id, self.shared.config.wait_timeout)
            .await
    }

    /// Like [`acquire`](Self::acquire) with an explicit wait timeout.
    pub async fn acquire_with_timeout(
        &self,
        owner_id: impl Into<String>,
        wait: Duration,
    ) -> Result<LockHolder> {
        let owner_id = owner_id.into();
        let started = Instant::now();
        let (ticket, mut receiver) = {
            let mut state = self.shared.state.lock();
            if state.holder.is_none() {
                let holder = Shared::new_holder(owner_id);
                self.shared.install(&mut state, holder.clone(), Duration::ZERO);
                return Ok(holder);
            }
            let (sender, receiver) = oneshot::channel();
            let ticket = state.next_ticket;
            state.next_ticket += 1;
            state.queue.push_back(Waiter {
                ticket,
                owner_id: owner_id.clone(),
                enqueued_at: started,
                grant: sender,
            });
            tracing::trace!(owner = %owner_id, queued = state.queue.len(), "lock request queued");
            (ticket, receiver)
        };

        match tokio::time::timeout(wait, &mut receiver).await {
            Ok(Ok(holder)) => Ok(holder),
            Ok(Err(_)) => Err(self.timed_out(owner_id, started)),
            Err(_) => {
                let mut state = self.shared.state.lock();
                if let Some(pos) = state.queue.iter().position(|w| w.ticket == ticket) {
                    state.queue.remove(pos);
                    drop(state);
                    return Err(self.timed_out(owner_id, started));
                }
                drop(state);
                // Granted between the deadline and taking the state lock.
                receiver
                    .try_recv()
                    .map_err(|_| self.timed_out(owner_id, started))
            }
        }
    }

    fn timed_out(&self, owner: String, started: Instant) -> SdkError {
        let waited_ms = started.elapsed().as_millis() as u64;
        self.shared.state.lock().stats.timeouts += 1;
        tracing::warn!(%owner, waited_ms, "lock wait timed out");
        SdkError::LockTimeout { owner, waited_ms }
    }

    /// Release the grant identified by `lock_id` and promote the next
    /// waiter.
    pub fn release(&self, lock_id: &str) -> Result<()> {
        let mut state = self.shared.state.lock();
        let expected = match &state.holder {
            None => return Err(SdkError::NotHeld),
            Some(holder) => holder.lock_id.clone(),
        };
        if expected != lock_id {
            return Err(SdkError::LockMismatch {
                expected,
                presented: lock_id.to_string(),
            });
        }
        if let Some(timer) = state.safety.take() {
            timer.abort();
        }
        if let Some(holder) = state.holder.take() {
            tracing::trace!(owner = %holder.owner_id, %lock_id, "lock released");
        }
        state.stats.releases += 1;
        self.shared.promote(&mut state);
        Ok(())
    }

    pub fn is_locked(&self) -> bool {
        self.shared.state.lock().holder.is_some()
    }

    pub fn holder(&self) -> Option<LockHolder> {
        self.shared.state.lock().holder.clone()
    }

    /// Snapshot of the waiting requests, oldest first.
    pub fn queue(&self) -> Vec<QueuedRequest> {
        self.shared
            .state
            .lock()
            .queue
            .iter()
            .map(|w| QueuedRequest {
                owner_id: w.owner_id.clone(),
                enqueued_at: w.enqueued_at,
            })
            .collect()
    }

    pub fn stats(&self) -> LockStats {
        self.shared.state.lock().stats.clone()
    }
}

impl Default for MutationLock {
    fn default() -> Self {
        Self::new(LockConfig::default())
    }
}

impl std::fmt::Debug for MutationLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("MutationLock")
            .field("holder", &state.holder)
            .field("queued", &state.queue.len())
            .field("stats", &state.stats)
            .finish()
    }
}
