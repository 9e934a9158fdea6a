//! # Run a single refresh of a task.
//!
//! Executes one refresh of a [`RefreshTask`] under the global mutual-exclusion
//! lock and turns whatever happened into a [`Status`].
//!
//! ## Flow
//! ```text
//! token cancelled?            ──► Cancelled            (no event)
//! build running?              ──► Postponed(BuildConflict) (no event, lock untouched)
//! lock.acquire_cancellable()
//!   └─ cancelled while waiting ─► Cancelled            (no event)
//! RefreshEvent::start ──► listeners.notify(Started)
//! subscriber.add_change_listener(collector)
//! subscriber.refresh(resources, depth, BlockAwareToken)   (panics caught)
//! subscriber.remove_change_listener(collector)
//! release lock
//! classify ──► event.finish ──► listeners.notify(Done) ──► ResultAction
//! ```
//!
//! ## Rules
//! - The lock is held for the subscriber call only, never across listener dispatch.
//! - The change listener is always unregistered, whatever the outcome.
//! - Subscriber and collector errors and panics never escape: they become `Failed`.
//! - A panicking result action is logged and dropped; the task carries on.

use std::{panic::{self, AssertUnwindSafe}, sync::{Arc, Mutex, PoisonError}};

use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use crate::{
    core::{classify::{RunFacts, classify, count_out_of_sync}, context::SchedulerContext},
    error::SyncError,
    events::{PostponeReason, RefreshEvent, Status, Trigger},
    listeners::Phase,
    provider::{ChangeListener, ChangeListenerRef, SyncChange},
    results::ResultAction,
    sync::BlockAwareToken,
    tasks::RefreshTask,
};

/// Result of one refresh run.
#[derive(Clone, Debug)]
pub struct RefreshOutcome {
    /// Final status of the run.
    pub status: Status,
    /// Finalized event; `None` when the run ended before the refresh body started.
    pub event: Option<RefreshEvent>,
    /// Action handed back for the run (listener action, or the failure itself).
    pub action: Option<ResultAction>,
}

impl RefreshOutcome {
    fn early(status: Status) -> Self {
        Self {
            status,
            event: None,
            action: None,
        }
    }
}

/// Where the result of a run is delivered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Delivery {
    /// Modal run on behalf of a waiting caller.
    Foreground,
    /// Scheduled or queued run.
    Background,
}

/// Temporary change listener recording out-of-sync changes seen during one refresh.
#[derive(Default)]
struct ChangeCollector {
    changes: Mutex<Vec<SyncChange>>,
}

impl ChangeCollector {
    fn take(&self) -> Vec<SyncChange> {
        std::mem::take(&mut *self.changes.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl ChangeListener for ChangeCollector {
    fn sync_changed(&self, changes: &[SyncChange]) {
        let mut seen = self.changes.lock().unwrap_or_else(PoisonError::into_inner);
        seen.extend(changes.iter().filter(|c| c.is_out_of_sync()).cloned());
    }
}

/// Executes one refresh of `task`, cancellable through `token`.
///
/// Only background runs of rescheduling tasks yield to blocking.
pub(crate) async fn run_once(
    ctx: &SchedulerContext,
    task: &RefreshTask,
    trigger: Trigger,
    mode: Delivery,
    token: &CancellationToken,
) -> RefreshOutcome {
    if token.is_cancelled() {
        return RefreshOutcome::early(Status::Cancelled);
    }
    if ctx.activity.is_building() {
        tracing::debug!(task = task.name(), "build in progress, refresh postponed");
        return RefreshOutcome::early(Status::Postponed(PostponeReason::BuildConflict));
    }

    let Some(guard) = ctx
        .lock
        .acquire_cancellable(ctx.cfg.lock_poll_clamped(), token)
        .await
    else {
        tracing::debug!(task = task.name(), "cancelled while waiting for refresh lock");
        return RefreshOutcome::early(Status::Cancelled);
    };

    let subscriber = task.subscriber();
    let event = RefreshEvent::start(
        task.name(),
        trigger,
        subscriber.id(),
        task.resources().clone(),
    );
    ctx.listeners.notify(&event, Phase::Started).await;

    let collector = Arc::new(ChangeCollector::default());
    let as_listener: ChangeListenerRef = collector.clone();
    subscriber.add_change_listener(as_listener.clone());

    let monitor = BlockAwareToken::new(
        token.clone(),
        mode == Delivery::Background && task.reschedule(),
        ctx.cfg.blocking_threshold,
        Arc::clone(&ctx.probe),
    );
    let depth = ctx.cfg.depth;
    let result = AssertUnwindSafe(subscriber.refresh(task.resources(), depth, &monitor))
        .catch_unwind()
        .await
        .unwrap_or_else(|_| {
            tracing::error!(task = task.name(), "subscriber panicked during refresh");
            Err(SyncError::unrecoverable("subscriber panicked"))
        });

    subscriber.remove_change_listener(&as_listener);
    guard.release();

    let changes = collector.take();
    let status = classify(
        RunFacts {
            result: &result,
            was_blocking: monitor.was_blocking(),
            base_cancelled: monitor.is_base_cancelled(),
            new_changes: changes.len(),
        },
        || {
            panic::catch_unwind(AssertUnwindSafe(|| {
                count_out_of_sync(task.collector().as_ref(), task.resources(), depth)
            }))
            .map_err(|_| {
                tracing::error!(task = task.name(), "sync info collector panicked");
                SyncError::unrecoverable("sync info collector panicked")
            })
        },
    );

    let event = event.finish(changes, status.clone());
    let action = ctx.listeners.notify(&event, Phase::Done).await;
    let action = match &status {
        Status::Failed(cause) => Some(ResultAction::Error(Arc::clone(cause))),
        _ => action,
    };

    RefreshOutcome {
        status,
        event: Some(event),
        action,
    }
}

/// Hands the action of a finished run to the user, or parks it on the task.
///
/// ```text
/// Foreground                → resolve now
/// Background Immediate      → resolve now
/// Background Error + User   → report now
/// Background otherwise      → attach to the task's PendingResult
/// ```
pub(crate) fn deliver(task: &RefreshTask, trigger: Trigger, mode: Delivery, action: Option<ResultAction>) {
    let Some(action) = action else {
        return;
    };
    let now = match (&action, mode) {
        (_, Delivery::Foreground) => true,
        (ResultAction::Immediate(_), Delivery::Background) => true,
        (ResultAction::Error(_), Delivery::Background) => trigger == Trigger::User,
        (ResultAction::Deferred(_), Delivery::Background) => false,
    };
    if !now {
        task.pending_result().attach(action);
        return;
    }
    match panic::catch_unwind(AssertUnwindSafe(|| action.resolve())) {
        Ok(Ok(())) => {}
        Ok(Err(cause)) => {
            tracing::error!(task = task.name(), error = %cause, label = cause.as_label(), "refresh failed");
        }
        Err(_) => {
            tracing::error!(task = task.name(), action = action.name(), "result action panicked");
        }
    }
}
