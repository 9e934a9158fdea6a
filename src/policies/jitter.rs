//! # Jitter policy for refresh intervals.
//!
//! Many participants usually share one global refresh interval. Without
//! randomization their periodic refreshes line up and queue behind the
//! refresh lock at the same moment. [`JitterPolicy`] spreads them out.
//!
//! - [`JitterPolicy::None`]: exact interval, predictable
//! - [`JitterPolicy::Equal`]: interval/2 + random[0, interval/2]
//! - [`JitterPolicy::Bounded`]: interval ± random[0, interval × fraction]
//!
//! Jitter is never applied to the postponement delay.

use rand::Rng;
use std::time::Duration;

/// Policy controlling randomization of the refresh interval.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum JitterPolicy {
    /// No jitter: use the exact interval.
    #[default]
    None,

    /// Equal jitter: delay = interval/2 + random[0, interval/2].
    Equal,

    /// Symmetric jitter of at most `interval × fraction` in either direction.
    ///
    /// `fraction` is clamped to `[0.0, 1.0]`.
    Bounded(f64),
}

impl JitterPolicy {
    /// Applies jitter to the given interval.
    pub fn apply(&self, interval: Duration) -> Duration {
        match self {
            JitterPolicy::None => interval,
            JitterPolicy::Equal => Self::equal_jitter(interval),
            JitterPolicy::Bounded(fraction) => Self::bounded_jitter(interval, *fraction),
        }
    }

    /// Equal jitter: interval/2 + random[0, interval/2]
    fn equal_jitter(interval: Duration) -> Duration {
        let ms = interval.as_millis().min(u128::from(u64::MAX)) as u64;
        if ms == 0 {
            return Duration::ZERO;
        }
        let half = ms / 2;
        let jitter = if half == 0 {
            0
        } else {
            rand::rng().random_range(0..=half)
        };
        Duration::from_millis(half + jitter)
    }

    /// Bounded jitter: interval ± random[0, interval × fraction]
    fn bounded_jitter(interval: Duration, fraction: f64) -> Duration {
        let fraction = if fraction.is_finite() {
            fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let ms = interval.as_millis().min(u128::from(u64::MAX)) as u64;
        let spread = (ms as f64 * fraction) as u64;
        if spread == 0 {
            return interval;
        }
        let low = ms.saturating_sub(spread);
        let high = ms.saturating_add(spread);
        Duration::from_millis(rand::rng().random_range(low..=high))
    }
}
