//! # Block-aware cancellation token.
//!
//! [`BlockAwareToken`] wraps the base [`CancellationToken`] of a refresh run and
//! turns prolonged blocking of other work into a synthetic cancellation, so a
//! recurring background refresh yields to interactive work without the
//! subscriber knowing anything about blocking.
//!
//! ## `is_cancelled()` logic
//! ```text
//! base cancelled                          → true
//! already tripped on blocking             → true
//! reschedule && probe.is_blocking()
//!   ├─ first observation                  → start timer, false
//!   ├─ blocked for > threshold            → trip (was_blocking = true), true
//!   └─ otherwise                          → false
//! not blocking                            → reset timer, false
//! ```
//!
//! ## Rules
//! - Only tasks that reschedule trip on blocking; one-shot refreshes run to the end.
//! - Blocking must be **continuous** (as observed by polls); any poll that
//!   sees no blocking resets the timer.
//! - Tripping is sticky for the lifetime of the token.

use std::{sync::{Arc, Mutex, PoisonError}, time::Duration};

use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::sync::BlockingProbe;

#[derive(Debug, Default)]
struct BlockState {
    since: Option<Instant>,
    was_blocking: bool,
}

/// Cancellation token handed to [`Subscriber::refresh`](crate::Subscriber::refresh).
pub struct BlockAwareToken {
    base: CancellationToken,
    reschedule: bool,
    threshold: Duration,
    probe: Arc<dyn BlockingProbe>,
    state: Mutex<BlockState>,
}

impl BlockAwareToken {
    /// Wraps `base`.
    ///
    /// `reschedule` is the owning task's policy at the start of the run.
    pub fn new(
        base: CancellationToken,
        reschedule: bool,
        threshold: Duration,
        probe: Arc<dyn BlockingProbe>,
    ) -> Self {
        Self {
            base,
            reschedule,
            threshold,
            probe,
            state: Mutex::new(BlockState::default()),
        }
    }

    /// Token that only follows `base` (never trips on blocking).
    pub fn unaware(base: CancellationToken) -> Self {
        Self::new(
            base,
            false,
            Duration::MAX,
            Arc::new(std::sync::atomic::AtomicBool::new(false)),
        )
    }

    /// True if the base token is cancelled or the refresh blocked others for too long.
    pub fn is_cancelled(&self) -> bool {
        if self.base.is_cancelled() {
            return true;
        }
        let mut st = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if st.was_blocking {
            return true;
        }
        if self.reschedule && self.probe.is_blocking() {
            let now = Instant::now();
            match st.since {
                None => st.since = Some(now),
                Some(since) if now.duration_since(since) > self.threshold => {
                    st.was_blocking = true;
                    return true;
                }
                Some(_) => {}
            }
        } else {
            st.since = None;
        }
        false
    }

    /// Completes once [`is_cancelled`](Self::is_cancelled) would return `true`.
    ///
    /// Base cancellation is observed immediately; blocking is sampled a few
    /// times per threshold.
    pub async fn cancelled(&self) {
        let poll = (self.threshold / 4).clamp(Duration::from_millis(1), Duration::from_millis(50));
        loop {
            if self.is_cancelled() {
                return;
            }
            tokio::select! {
                _ = self.base.cancelled() => return,
                _ = time::sleep(poll) => {}
            }
        }
    }

    /// True once the token tripped because of blocking.
    pub fn was_blocking(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .was_blocking
    }

    /// True if the base token (user or scheduler cancellation) is cancelled.
    pub fn is_base_cancelled(&self) -> bool {
        self.base.is_cancelled()
    }

    /// The wrapped base token.
    pub fn base(&self) -> &CancellationToken {
        &self.base
    }
}

impl std::fmt::Debug for BlockAwareToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockAwareToken")
            .field("base_cancelled", &self.base.is_cancelled())
            .field("reschedule", &self.reschedule)
            .field("threshold", &self.threshold)
            .field("was_blocking", &self.was_blocking())
            .finish()
    }
}
