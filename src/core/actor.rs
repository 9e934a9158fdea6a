//! # RefreshActor: the life of one scheduled task.
//!
//! Drives one [`RefreshTask`] through the scheduling state machine until it
//! stops, is removed, or the scheduler shuts down.
//!
//! ## Architecture
//! ```text
//! loop {
//!   ├─► sleep(delay)                      state = Sleeping { delay }
//!   │     ├─ elapsed                      → run with trigger
//!   │     ├─ woken by refresh()           → run with USER
//!   │     ├─ interval changed + resleep   → restart sleep (normal interval only)
//!   │     ├─ task.cancel()                → Cancelled (no event)
//!   │     └─ lifetime cancelled           → exit
//!   ├─► acquire worker (optional)         state = Scheduled
//!   ├─► run_once()                        state = Running
//!   ├─► record status, deliver result
//!   └─► on_task_finished()
//!         ├─ Reschedule { delay, trigger } → next iteration
//!         └─ Stop → registry.retire()
//!               ├─ rerun requested → run again with USER
//!               └─ otherwise       → exit (state = Idle)
//! }
//! ```
//!
//! ## Rules
//! - Runs of one task are strictly sequential.
//! - A cancel applies to the run or wait in flight: the run token is renewed
//!   after every run, whatever its status, and after every cancelled wait.
//! - Lifetime cancellation (remove / shutdown) ends the actor without rescheduling.

use std::{sync::Arc, time::Duration};

use tokio::{select, sync::{OwnedSemaphorePermit, watch}, time::{self, Instant}};
use tokio_util::sync::CancellationToken;

use crate::{
    core::{
        context::SchedulerContext,
        registry::Registry,
        runner::{Delivery, deliver, run_once},
        settings::IntervalUpdate,
        transition::{Next, on_task_finished},
    },
    events::{Status, Trigger},
    tasks::{TaskRef, TaskState},
};

/// Where an actor starts: the first sleep and the trigger of the first run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Start {
    pub delay: Duration,
    pub trigger: Trigger,
}

/// How a wait before a run ended.
enum Wake {
    Run(Trigger),
    Cancelled,
    Shutdown,
}

pub(crate) struct RefreshActor {
    ctx: Arc<SchedulerContext>,
    registry: Arc<Registry>,
    task: TaskRef,
    generation: u64,
}

impl RefreshActor {
    pub(crate) fn new(
        ctx: Arc<SchedulerContext>,
        registry: Arc<Registry>,
        task: TaskRef,
        generation: u64,
    ) -> Self {
        Self {
            ctx,
            registry,
            task,
            generation,
        }
    }

    /// Runs until the task stops or `lifetime` is cancelled.
    pub(crate) async fn run(
        self,
        lifetime: CancellationToken,
        mut token: CancellationToken,
        start: Start,
    ) {
        let mut interval_rx = self.ctx.settings.subscribe();
        let mut next = Next::Reschedule {
            delay: start.delay,
            trigger: start.trigger,
            interval: None,
        };

        loop {
            let (delay, trigger, interval) = match next {
                Next::Reschedule {
                    delay,
                    trigger,
                    interval,
                } => (delay, trigger, interval),
                Next::Stop => {
                    if self.registry.retire(&self.task, self.generation).await {
                        tracing::debug!(task = self.task.name(), "refresh task stopped");
                        return;
                    }
                    (Duration::ZERO, Trigger::User, None)
                }
            };

            let wake = self
                .sleep(delay, trigger, interval, &token, &lifetime, &mut interval_rx)
                .await;
            let trigger = match wake {
                Wake::Run(trigger) => trigger,
                Wake::Shutdown => break,
                Wake::Cancelled => {
                    next = self.cancelled_before_run(trigger);
                    token = self.task.renew_run_token(&lifetime);
                    continue;
                }
            };

            self.task.set_state(TaskState::Scheduled);
            let permit = match self.acquire_worker(&token, &lifetime).await {
                Ok(permit) => permit,
                Err(Wake::Cancelled) => {
                    next = self.cancelled_before_run(trigger);
                    token = self.task.renew_run_token(&lifetime);
                    continue;
                }
                Err(_) => break,
            };

            self.task.set_state(TaskState::Running);
            let outcome = run_once(&self.ctx, &self.task, trigger, Delivery::Background, &token).await;
            drop(permit);

            self.task.record_status(outcome.status.clone());
            deliver(&self.task, trigger, Delivery::Background, outcome.action);
            if lifetime.is_cancelled() {
                break;
            }
            token = self.task.renew_run_token(&lifetime);

            next = on_task_finished(
                &self.task,
                &outcome.status,
                trigger,
                &self.ctx.cfg,
                &self.ctx.settings,
            );
            tracing::debug!(
                task = self.task.name(),
                status = outcome.status.as_label(),
                ?next,
                "refresh run finished"
            );
        }

        self.task.set_state(TaskState::Idle);
    }

    /// Waits `delay` before the next run.
    ///
    /// `interval` is the interval `delay` was derived from, for sleeps that
    /// follow interval changes.
    async fn sleep(
        &self,
        delay: Duration,
        trigger: Trigger,
        interval: Option<Duration>,
        token: &CancellationToken,
        lifetime: &CancellationToken,
        interval_rx: &mut watch::Receiver<IntervalUpdate>,
    ) -> Wake {
        if self.task.take_rerun() {
            return Wake::Run(Trigger::User);
        }
        let latest = *interval_rx.borrow_and_update();
        let delay = match missed_resleep(interval, latest) {
            Some(interval) => self.ctx.cfg.jitter.apply(interval),
            None => delay,
        };
        self.task.set_state(if delay.is_zero() {
            TaskState::Scheduled
        } else {
            TaskState::Sleeping { delay }
        });

        let sleep = time::sleep(delay);
        tokio::pin!(sleep);
        let mut watching = interval.is_some();
        loop {
            select! {
                biased;
                _ = lifetime.cancelled() => return Wake::Shutdown,
                _ = token.cancelled() => return Wake::Cancelled,
                _ = self.task.wake.notified() => {
                    if self.task.take_rerun() {
                        return Wake::Run(Trigger::User);
                    }
                }
                changed = interval_rx.changed(), if watching => match changed {
                    Ok(()) => {
                        let update = *interval_rx.borrow_and_update();
                        if update.resleep {
                            let delay = self.ctx.cfg.jitter.apply(update.interval);
                            sleep.as_mut().reset(Instant::now() + delay);
                            self.task.set_state(TaskState::Sleeping { delay });
                            tracing::debug!(task = self.task.name(), ?delay, "refresh sleep restarted");
                        }
                    }
                    Err(_) => watching = false,
                },
                _ = &mut sleep => return Wake::Run(trigger),
            }
        }
    }

    /// Takes a worker permit when the pool is bounded.
    async fn acquire_worker(
        &self,
        token: &CancellationToken,
        lifetime: &CancellationToken,
    ) -> Result<Option<OwnedSemaphorePermit>, Wake> {
        let Some(sem) = &self.ctx.workers else {
            return Ok(None);
        };
        select! {
            biased;
            _ = lifetime.cancelled() => Err(Wake::Shutdown),
            _ = token.cancelled() => Err(Wake::Cancelled),
            permit = Arc::clone(sem).acquire_owned() => permit.map(Some).map_err(|_closed| Wake::Shutdown),
        }
    }

    /// Records a cancellation that happened before the refresh body started.
    fn cancelled_before_run(&self, trigger: Trigger) -> Next {
        tracing::debug!(task = self.task.name(), "refresh cancelled before running");
        self.task.record_status(Status::Cancelled);
        on_task_finished(
            &self.task,
            &Status::Cancelled,
            trigger,
            &self.ctx.cfg,
            &self.ctx.settings,
        )
    }
}

/// New interval to sleep for when a resleep update was published after the
/// sleep's delay was computed from `base`.
fn missed_resleep(base: Option<Duration>, latest: IntervalUpdate) -> Option<Duration> {
    match base {
        Some(base) if latest.resleep && latest.interval != base => Some(latest.interval),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: Duration = Duration::from_secs(3600);
    const MINUTE: Duration = Duration::from_secs(60);

    fn update(interval: Duration, resleep: bool) -> IntervalUpdate {
        IntervalUpdate { interval, resleep }
    }

    #[test]
    fn resleep_published_before_sleep_is_applied() {
        assert_eq!(missed_resleep(Some(HOUR), update(MINUTE, true)), Some(MINUTE));
    }

    #[test]
    fn current_or_lazy_interval_keeps_delay() {
        assert_eq!(missed_resleep(Some(HOUR), update(HOUR, true)), None);
        assert_eq!(missed_resleep(Some(HOUR), update(MINUTE, false)), None);
    }

    #[test]
    fn postponement_sleeps_ignore_interval() {
        assert_eq!(missed_resleep(None, update(MINUTE, true)), None);
    }
}
