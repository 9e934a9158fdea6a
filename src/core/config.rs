//! # Scheduler configuration.
//!
//! Provides [`SchedulerConfig`] centralized settings for the refresh scheduler.
//!
//! ## Sentinel values
//! - `max_workers = 0` → unlimited worker pool (no semaphore created)
//! - `grace = 0s` → shutdown does not wait for tasks

use std::time::Duration;

use crate::{policies::JitterPolicy, provider::Depth};

/// Default refresh interval (one hour).
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(3600);
/// Default delay before retrying a postponed refresh.
pub const DEFAULT_POSTPONE_DELAY: Duration = Duration::from_secs(5);
/// Default continuous blocking time after which a rescheduling refresh yields.
pub const DEFAULT_BLOCKING_THRESHOLD: Duration = Duration::from_millis(250);
/// Default bounded wait of one refresh lock attempt.
pub const DEFAULT_LOCK_POLL: Duration = Duration::from_millis(100);

/// Configuration of the refresh scheduler.
///
/// ## Field semantics
/// - `interval`: initial value of the shared refresh interval (see [`RefreshSettings`](crate::RefreshSettings))
/// - `postpone_delay`: delay before a postponed refresh is retried
/// - `blocking_threshold`: continuous blocking tolerated before a refresh yields
/// - `lock_poll`: bounded wait per lock attempt; cancellation is checked in between
/// - `max_workers`: refresh tasks that may hold a worker at once (`0` = unlimited)
/// - `grace`: maximum wait for tasks to stop on shutdown
/// - `depth`: depth passed to every subscriber refresh
/// - `jitter`: randomization of the normal interval
#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    pub interval: Duration,
    pub postpone_delay: Duration,
    pub blocking_threshold: Duration,
    pub lock_poll: Duration,
    pub max_workers: usize,
    pub grace: Duration,
    pub depth: Depth,
    pub jitter: JitterPolicy,
}

impl SchedulerConfig {
    /// Returns the worker pool limit as an `Option`.
    ///
    /// - `None` → unlimited (no semaphore)
    /// - `Some(n)` → at most `n` tasks hold a worker
    #[inline]
    pub fn worker_limit(&self) -> Option<usize> {
        if self.max_workers == 0 {
            None
        } else {
            Some(self.max_workers)
        }
    }

    /// Lock poll clamped to at least 1ms, so the acquire loop never spins.
    #[inline]
    pub fn lock_poll_clamped(&self) -> Duration {
        self.lock_poll.max(Duration::from_millis(1))
    }
}

impl Default for SchedulerConfig {
    /// Default configuration:
    ///
    /// - `interval = 3600s`
    /// - `postpone_delay = 5s`
    /// - `blocking_threshold = 250ms`
    /// - `lock_poll = 100ms`
    /// - `max_workers = 0` (unlimited)
    /// - `grace = 60s`
    /// - `depth = Depth::Infinite`
    /// - `jitter = JitterPolicy::None`
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            postpone_delay: DEFAULT_POSTPONE_DELAY,
            blocking_threshold: DEFAULT_BLOCKING_THRESHOLD,
            lock_poll: DEFAULT_LOCK_POLL,
            max_workers: 0,
            grace: Duration::from_secs(60),
            depth: Depth::Infinite,
            jitter: JitterPolicy::None,
        }
    }
}
