//! # Process-wide refresh lock.
//!
//! [`MutualExclusionLock`] guarantees that at most one refresh body executes at
//! a time, whichever task asks for it. It is a single-permit semaphore acquired
//! with a **bounded** wait so that a waiting task can keep checking its own
//! cancellation:
//!
//! ```text
//! loop {
//!   ├─► acquire(poll)        ─► Some(guard) → run refresh body
//!   └─► token.is_cancelled() ─► true        → give up, no refresh
//! }
//! ```
//!
//! ## Rules
//! - Not reentrant: a holder that acquires again waits for itself.
//! - Release is tied to [`LockGuard`] drop, so a failing refresh still releases.

use std::{sync::{Arc, atomic::{AtomicU64, Ordering}}, time::Duration};

use tokio::{sync::{OwnedSemaphorePermit, Semaphore}, time};
use tokio_util::sync::CancellationToken;

/// Single-holder lock shared by every refresh task of a scheduler.
#[derive(Debug)]
pub struct MutualExclusionLock {
    permit: Arc<Semaphore>,
    attempts: AtomicU64,
}

/// Proof of holding the [`MutualExclusionLock`]; releases on drop.
#[derive(Debug)]
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct LockGuard {
    _permit: OwnedSemaphorePermit,
}

impl LockGuard {
    /// Releases the lock explicitly.
    pub fn release(self) {}
}

impl Default for MutualExclusionLock {
    fn default() -> Self {
        Self::new()
    }
}

impl MutualExclusionLock {
    pub fn new() -> Self {
        Self {
            permit: Arc::new(Semaphore::new(1)),
            attempts: AtomicU64::new(0),
        }
    }

    /// Tries to take the lock, waiting at most `timeout`.
    ///
    /// Returns `None` if the lock is still held by someone else when the
    /// timeout elapses. `Duration::ZERO` makes a single non-waiting attempt.
    pub async fn acquire(&self, timeout: Duration) -> Option<LockGuard> {
        self.attempts.fetch_add(1, Ordering::Relaxed);

        if timeout.is_zero() {
            return self
                .permit
                .clone()
                .try_acquire_owned()
                .ok()
                .map(|p| LockGuard { _permit: p });
        }
        match time::timeout(timeout, self.permit.clone().acquire_owned()).await {
            Ok(Ok(p)) => Some(LockGuard { _permit: p }),
            Ok(Err(_closed)) => None,
            Err(_elapsed) => None,
        }
    }

    /// Retries [`acquire`](Self::acquire) with `poll` bounds until acquired or `token` is cancelled.
    ///
    /// Returns `None` only when the token was cancelled while waiting.
    pub async fn acquire_cancellable(
        &self,
        poll: Duration,
        token: &CancellationToken,
    ) -> Option<LockGuard> {
        let poll = poll.max(Duration::from_millis(1));
        loop {
            if let Some(guard) = self.acquire(poll).await {
                return Some(guard);
            }
            if token.is_cancelled() {
                return None;
            }
        }
    }

    /// True while some task holds the lock.
    pub fn is_held(&self) -> bool {
        self.permit.available_permits() == 0
    }

    /// Total number of acquisition attempts so far (each bounded wait counts once).
    pub fn acquire_attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn second_acquire_times_out_while_held() {
        let lock = MutualExclusionLock::new();
        let guard = lock.acquire(Duration::from_millis(100)).await;
        assert!(guard.is_some());
        assert!(lock.is_held());

        assert!(lock.acquire(Duration::from_millis(100)).await.is_none());
        assert!(lock.acquire(Duration::ZERO).await.is_none());

        drop(guard);
        assert!(!lock.is_held());
        assert!(lock.acquire(Duration::ZERO).await.is_some());
        assert_eq!(lock.acquire_attempts(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellable_wait_gives_up_on_cancel() {
        let lock = Arc::new(MutualExclusionLock::new());
        let held = lock.acquire(Duration::ZERO).await;
        assert!(held.is_some());

        let token = CancellationToken::new();
        let waiter = {
            let lock = Arc::clone(&lock);
            let token = token.clone();
            tokio::spawn(async move {
                lock.acquire_cancellable(Duration::from_millis(100), &token)
                    .await
                    .is_some()
            })
        };

        time::sleep(Duration::from_millis(450)).await;
        token.cancel();
        let acquired = waiter.await.expect("waiter panicked");
        assert!(!acquired);
        assert!(lock.acquire_attempts() >= 4);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellable_wait_acquires_after_release() {
        let lock = Arc::new(MutualExclusionLock::new());
        let held = lock.acquire(Duration::ZERO).await;

        let waiter = {
            let lock = Arc::clone(&lock);
            tokio::spawn(async move {
                let token = CancellationToken::new();
                lock.acquire_cancellable(Duration::from_millis(100), &token)
                    .await
                    .is_some()
            })
        };

        time::sleep(Duration::from_millis(250)).await;
        drop(held);
        assert!(waiter.await.expect("waiter panicked"));
    }
}
