//! # refreshvisor
//!
//! **Refreshvisor** is a background refresh scheduler for Rust.
//!
//! It periodically re-synchronizes sets of resources against a
//! [`Subscriber`] (for example a remote repository) while staying out of the
//! way of interactive work: refresh bodies never overlap, a refresh yields
//! when it blocks other work for too long, and every outcome is classified
//! and handed to listeners.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │ RefreshTask  │   │ RefreshTask  │   │ RefreshTask  │
//!     │ (cvs, /p1)   │   │ (git, /p2)   │   │ (git, /p3)   │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  TaskScheduler                                                    │
//! │  - Registry (live actors by task id)                              │
//! │  - MutualExclusionLock (one refresh body at a time)               │
//! │  - Activity (builds / foreground work)                            │
//! │  - RefreshSettings (shared interval, watch channel)               │
//! │  - ListenerRegistry (refresh listeners)                           │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │ RefreshActor │   │ RefreshActor │   │ RefreshActor │
//!     │ sleep / run  │   │ sleep / run  │   │ sleep / run  │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            └──────────────────┼──────────────────┘
//!                               ▼
//!                    lock ─► Subscriber::refresh(.., BlockAwareToken)
//!                               ▼
//!                 classify ─► listeners ─► ResultAction
//! ```
//!
//! ### Lifecycle
//! ```text
//! Idle ─► Scheduled ─► Running ─► { Completed, Failed, Cancelled, Postponed }
//!                                      │
//!   reschedule = true ─────────────────┤ Postponed → sleep(postpone_delay)
//!                                      │ otherwise → sleep(interval)
//!   cancelled && !restart_on_cancel ───┴─► Idle (flag reset)
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                           |
//! |-------------------|---------------------------------------------------------------|----------------------------------------------|
//! | **Scheduling**    | Periodic, manual and foreground refreshes; family operations. | [`TaskScheduler`], [`RefreshTask`], [`Family`] |
//! | **Exclusion**     | One refresh body at a time, cancellable while waiting.        | [`MutualExclusionLock`]                      |
//! | **Blocking**      | Refreshes yield to interactive work after a threshold.        | [`BlockAwareToken`], [`Activity`]            |
//! | **Listeners**     | Observe refresh runs, hand back result actions.               | [`RefreshListener`], [`ResultAction`]        |
//! | **Errors**        | Typed errors for subscribers and the scheduler.               | [`SyncError`], [`SchedulerError`]            |
//! | **Configuration** | Centralized settings plus a runtime-mutable interval.         | [`SchedulerConfig`], [`RefreshSettings`]     |
//!
//! ## Optional features
//! - `logging` (default): exports the built-in [`LogListener`].
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use async_trait::async_trait;
//! use refreshvisor::{
//!     BlockAwareToken, ChangeListenerRef, Depth, RefreshTask, Resource, ResourceSet,
//!     SchedulerConfig, Subscriber, SubscriberId, SyncError, SyncInfoCollector, SyncChange,
//!     TaskScheduler,
//! };
//!
//! struct Remote;
//!
//! #[async_trait]
//! impl Subscriber for Remote {
//!     fn id(&self) -> SubscriberId { SubscriberId::new("remote") }
//!     async fn refresh(&self, _: &ResourceSet, _: Depth, token: &BlockAwareToken) -> Result<(), SyncError> {
//!         if token.is_cancelled() { return Err(SyncError::Canceled); }
//!         Ok(())
//!     }
//!     fn add_change_listener(&self, _: ChangeListenerRef) {}
//!     fn remove_change_listener(&self, _: &ChangeListenerRef) {}
//! }
//!
//! struct NothingOutOfSync;
//!
//! impl SyncInfoCollector for NothingOutOfSync {
//!     fn count_for(&self, _: &dyn Fn(&Resource) -> bool) -> usize { 0 }
//!     fn sync_infos(&self, _: &Resource, _: Depth) -> Vec<SyncChange> { Vec::new() }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let scheduler = TaskScheduler::new(SchedulerConfig::default());
//!
//!     let task = Arc::new(
//!         RefreshTask::new("Refresh remote", Arc::new(Remote), Arc::new(NothingOutOfSync), ResourceSet::new(["/project"]))
//!             .with_reschedule(true),
//!     );
//!     scheduler.schedule(task.clone(), Duration::ZERO).await?;
//!
//!     scheduler.shutdown().await?;
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod listeners;
mod policies;
mod provider;
mod results;
mod sync;
mod tasks;

#[cfg(test)]
mod testing;

// ---- Public re-exports ----

pub use self::core::{
    DEFAULT_BLOCKING_THRESHOLD, DEFAULT_INTERVAL, DEFAULT_LOCK_POLL, DEFAULT_POSTPONE_DELAY,
    RefreshOutcome, RefreshSettings, SchedulerBuilder, SchedulerConfig, TaskScheduler,
};
pub use error::{SchedulerError, SyncError};
pub use events::{PostponeReason, RefreshEvent, Status, Trigger};
pub use listeners::{ListenerRef, ListenerRegistry, Phase, RefreshListener};
pub use policies::JitterPolicy;
pub use provider::{
    ChangeKind, ChangeListener, ChangeListenerRef, Depth, Resource, ResourceSet, Subscriber,
    SubscriberId, SubscriberRef, SyncChange, SyncInfoCollector,
};
pub use results::{Action, ActionFn, ActionRef, PendingResult, ResultAction};
pub use sync::{Activity, ActivityGuard, ActivityKind, BlockAwareToken, BlockingProbe, LockGuard, MutualExclusionLock};
pub use tasks::{Family, RefreshTask, TaskId, TaskRef, TaskState};

// Optional: expose the built-in tracing listener.
// Enable with: `--features logging` (on by default)
#[cfg(feature = "logging")]
pub use listeners::LogListener;
