//! # Task lifecycle state.
//!
//! ```text
//! Idle ──schedule──► Scheduled ──worker──► Running ──► {Completed, Cancelled, Postponed}
//!  ▲                     ▲                                   │
//!  │                     └────────── Sleeping { delay } ◄────┤ reschedule
//!  └─────────────────────────────────────────────────────────┘ stop
//! ```
//! The outcome of the last run is kept separately as
//! [`RefreshTask::last_status`](crate::RefreshTask::last_status).

use std::time::Duration;

/// Where a task currently is in its schedule.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TaskState {
    /// Not scheduled.
    #[default]
    Idle,
    /// Waiting for a worker.
    Scheduled,
    /// Owns a worker; waiting for the refresh lock or refreshing.
    Running,
    /// Waiting `delay` before the next run.
    Sleeping { delay: Duration },
}

impl TaskState {
    /// True unless the task is idle.
    pub fn is_live(&self) -> bool {
        !matches!(self, TaskState::Idle)
    }
}
