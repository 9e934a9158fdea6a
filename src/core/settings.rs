//! # Runtime-mutable refresh settings.
//!
//! The refresh interval is a single global knob shared by every task of a
//! scheduler. Changing it affects the next scheduling decision of every task;
//! with `resleep` set, tasks currently sleeping through a normal interval
//! restart their sleep with the new value.
//!
//! ```text
//! set_interval(d, resleep) ──► watch::Sender ──► actor sleeping on interval
//!                                                 ├─ resleep: reset deadline = now + d
//!                                                 └─ otherwise: keep current deadline
//! ```

use std::{sync::Arc, time::Duration};

use tokio::sync::watch;

/// Latest interval value plus whether sleeping tasks should pick it up now.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct IntervalUpdate {
    pub interval: Duration,
    pub resleep: bool,
}

/// Handle to the shared refresh interval. Cheap to clone.
#[derive(Clone, Debug)]
pub struct RefreshSettings {
    tx: Arc<watch::Sender<IntervalUpdate>>,
}

impl RefreshSettings {
    pub fn new(interval: Duration) -> Self {
        let (tx, _rx) = watch::channel(IntervalUpdate {
            interval,
            resleep: false,
        });
        Self { tx: Arc::new(tx) }
    }

    /// Current refresh interval.
    pub fn interval(&self) -> Duration {
        self.tx.borrow().interval
    }

    /// Changes the refresh interval.
    ///
    /// With `resleep`, tasks sleeping through a normal interval restart the
    /// sleep with `interval` from now. Postponement sleeps are unaffected.
    pub fn set_interval(&self, interval: Duration, resleep: bool) {
        self.tx.send_replace(IntervalUpdate { interval, resleep });
        tracing::debug!(?interval, resleep, "refresh interval changed");
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<IntervalUpdate> {
        self.tx.subscribe()
    }
}
