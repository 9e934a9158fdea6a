//! # TaskScheduler: public entry point of the refresh scheduler.
//!
//! Owns the shared [`SchedulerContext`] and the [`Registry`] of live tasks and
//! exposes everything callers do with refresh tasks.
//!
//! ## Architecture
//! ```text
//! schedule(task, delay) ──► Registry.submit ──► RefreshActor (periodic, SCHEDULED)
//! refresh(task)         ──► Registry.submit ──► RefreshActor (one run, USER)
//!                              └─ already live → wake it / queue one rerun
//! refresh_now(task, tok) ──► run_once inline (foreground, USER)
//!
//! find / cancel / cancel_without_restart / remove / join  (by Family)
//! shutdown() ──► cancel runtime token ──► wait up to cfg.grace
//! ```
//!
//! ## Example
//! ```rust,ignore
//! let scheduler = TaskScheduler::builder(SchedulerConfig::default())
//!     .with_listener(Arc::new(LogListener::new()))
//!     .build();
//!
//! let task = Arc::new(
//!     RefreshTask::new("Refresh CVS", subscriber, collector, ResourceSet::new(["/p"]))
//!         .with_reschedule(true),
//! );
//! scheduler.schedule(task, Duration::from_secs(5)).await?;
//! // ...
//! scheduler.shutdown().await?;
//! ```

use std::{sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;

use crate::{
    core::{
        RefreshSettings,
        SchedulerConfig,
        actor::Start,
        builder::SchedulerBuilder,
        context::SchedulerContext,
        registry::Registry,
        runner::{Delivery, RefreshOutcome, deliver, run_once},
    },
    error::SchedulerError,
    events::Trigger,
    listeners::ListenerRegistry,
    sync::{Activity, MutualExclusionLock},
    tasks::{Family, TaskRef},
};

/// Background scheduler of refresh tasks.
pub struct TaskScheduler {
    ctx: Arc<SchedulerContext>,
    registry: Arc<Registry>,
    runtime_token: CancellationToken,
}

impl TaskScheduler {
    pub(crate) fn from_context(ctx: SchedulerContext) -> Self {
        let runtime_token = CancellationToken::new();
        Self {
            ctx: Arc::new(ctx),
            registry: Registry::new(runtime_token.clone()),
            runtime_token,
        }
    }

    /// Scheduler with its own lock, listener registry and activity tracker.
    pub fn new(cfg: SchedulerConfig) -> Self {
        SchedulerBuilder::new(cfg).build()
    }

    pub fn builder(cfg: SchedulerConfig) -> SchedulerBuilder {
        SchedulerBuilder::new(cfg)
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.ctx.cfg
    }

    /// Runtime-mutable refresh interval shared by all tasks.
    pub fn settings(&self) -> &RefreshSettings {
        &self.ctx.settings
    }

    pub fn listeners(&self) -> &Arc<ListenerRegistry> {
        &self.ctx.listeners
    }

    pub fn lock(&self) -> &Arc<MutualExclusionLock> {
        &self.ctx.lock
    }

    /// Build and foreground activity observed by refreshes.
    pub fn activity(&self) -> &Arc<Activity> {
        &self.ctx.activity
    }

    /// Starts periodic refreshing of `task` after `delay`.
    ///
    /// Only tasks with `reschedule = true` are scheduled; returns `Ok(false)`
    /// for one-shot tasks. Scheduling a live task is a no-op.
    pub async fn schedule(&self, task: TaskRef, delay: Duration) -> Result<bool, SchedulerError> {
        if !task.reschedule() {
            tracing::debug!(task = task.name(), "one-shot task not scheduled");
            return Ok(false);
        }
        let start = Start {
            delay,
            trigger: Trigger::Scheduled,
        };
        self.registry.submit(&self.ctx, task, start, |_| {}).await?;
        Ok(true)
    }

    /// Requests a user-triggered background refresh of `task`.
    ///
    /// A sleeping task is woken and refreshes now; a running task refreshes
    /// once more after the current run. Whether the task keeps refreshing
    /// afterwards depends on its `reschedule` flag.
    pub async fn refresh(&self, task: TaskRef) -> Result<(), SchedulerError> {
        let start = Start {
            delay: Duration::ZERO,
            trigger: Trigger::User,
        };
        let spawned = self
            .registry
            .submit(&self.ctx, task, start, |live| live.request_rerun())
            .await?;
        if !spawned {
            tracing::debug!("refresh requested on a live task");
        }
        Ok(())
    }

    /// Refreshes `task` inline on behalf of a waiting caller.
    ///
    /// The run is serialized with every other refresh through the lock,
    /// classified like a background run, and its result action is resolved
    /// before returning. It is cancelled through `token` only and never
    /// reschedules.
    pub async fn refresh_now(
        &self,
        task: &TaskRef,
        token: &CancellationToken,
    ) -> Result<RefreshOutcome, SchedulerError> {
        if self.runtime_token.is_cancelled() {
            return Err(SchedulerError::Closed);
        }
        let run = token.child_token();
        let outcome = run_once(&self.ctx, task, Trigger::User, Delivery::Foreground, &run).await;
        task.record_status(outcome.status.clone());
        deliver(task, Trigger::User, Delivery::Foreground, outcome.action.clone());
        Ok(outcome)
    }

    /// Live tasks of `family`, ordered by task id.
    pub async fn find(&self, family: &Family) -> Vec<TaskRef> {
        self.registry.find(family).await
    }

    /// Cancels the current run or wait of every live task of `family`.
    ///
    /// Tasks restart according to their `restart_on_cancel` flag. Returns the
    /// number of tasks cancelled.
    pub async fn cancel(&self, family: &Family) -> usize {
        let tasks = self.registry.find(family).await;
        tasks.iter().filter(|t| t.cancel()).count()
    }

    /// Cancels every live task of `family` and suppresses their restart once.
    pub async fn cancel_without_restart(&self, family: &Family) -> usize {
        let tasks = self.registry.find(family).await;
        tasks.iter().filter(|t| t.cancel_without_restart()).count()
    }

    /// Stops every task of `family` for good and waits for them.
    pub async fn remove(&self, family: &Family) -> usize {
        let handles = self.registry.take(family).await;
        let removed = handles.len();
        for handle in &handles {
            handle.cancel();
        }
        for handle in handles {
            tracing::debug!(task = handle.task().name(), "refresh task removed");
            handle.stop().await;
        }
        removed
    }

    /// Waits until no task of `family` is live.
    pub async fn join(&self, family: &Family) {
        for done in self.registry.done_tokens(family).await {
            done.cancelled().await;
        }
    }

    /// Number of live tasks.
    pub async fn len(&self) -> usize {
        self.registry.len().await
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub fn is_closed(&self) -> bool {
        self.runtime_token.is_cancelled()
    }

    /// Stops every task and waits up to `cfg.grace` for them to exit.
    ///
    /// Further submissions fail with [`SchedulerError::Closed`].
    pub async fn shutdown(&self) -> Result<(), SchedulerError> {
        self.runtime_token.cancel();
        let handles = self.registry.drain().await;
        for handle in &handles {
            handle.cancel();
        }

        let grace = self.ctx.cfg.grace;
        let all_done = async {
            for handle in &handles {
                handle.done().cancelled().await;
            }
        };
        if tokio::time::timeout(grace, all_done).await.is_ok() {
            tracing::debug!(tasks = handles.len(), "refresh scheduler stopped");
            return Ok(());
        }

        let stuck: Vec<String> = handles
            .iter()
            .filter(|h| !h.done().is_cancelled())
            .map(|h| h.task().name().to_string())
            .collect();
        tracing::warn!(?grace, ?stuck, "refresh tasks did not stop within grace");
        Err(SchedulerError::GraceExceeded { grace, stuck })
    }
}

impl Drop for TaskScheduler {
    fn drop(&mut self) {
        self.runtime_token.cancel();
    }
}
