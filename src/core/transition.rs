//! # Rescheduling transition table.
//!
//! Single decision point applied every time a run of a task finishes:
//!
//! ```text
//! status      restart_on_cancel  reschedule   → next
//! Cancelled   false              *            → Stop (flag reset to true)
//! any         *                  false        → Stop
//! Postponed   *                  true         → Reschedule(postpone_delay, same trigger)
//! any         *                  true         → Reschedule(jitter(interval), Scheduled)
//! ```
//!
//! `restart_on_cancel` is a one-shot suppression: it is reset to `true` after
//! every finished run.

use std::time::Duration;

use crate::{
    core::{RefreshSettings, SchedulerConfig},
    events::{Status, Trigger},
    tasks::RefreshTask,
};

/// What the actor does after a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Next {
    Stop,
    Reschedule {
        delay: Duration,
        trigger: Trigger,
        /// Interval `delay` was derived from; set for normal-interval sleeps,
        /// which follow interval changes.
        interval: Option<Duration>,
    },
}

/// Applies the transition table to the run that just finished.
pub(crate) fn on_task_finished(
    task: &RefreshTask,
    status: &Status,
    trigger: Trigger,
    cfg: &SchedulerConfig,
    settings: &RefreshSettings,
) -> Next {
    let restart_on_cancel = task.restart_on_cancel();
    task.set_restart_on_cancel(true);

    match status {
        Status::Cancelled if !restart_on_cancel => Next::Stop,
        _ if !task.reschedule() => Next::Stop,
        Status::Postponed(_) => Next::Reschedule {
            delay: cfg.postpone_delay,
            trigger,
            interval: None,
        },
        _ => {
            let interval = settings.interval();
            Next::Reschedule {
                delay: cfg.jitter.apply(interval),
                trigger: Trigger::Scheduled,
                interval: Some(interval),
            }
        }
    }
}
