//! # Refresh event.
//!
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically, so listeners can restore ordering across tasks.

use std::{
    sync::{Arc, atomic::{AtomicU64, Ordering as AtomicOrdering}},
    time::{Duration, SystemTime},
};

use crate::{events::Status, provider::{ResourceSet, SubscriberId, SyncChange}};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// What caused a refresh run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trigger {
    /// Requested by a person (manual refresh).
    User,
    /// Started by the periodic schedule.
    Scheduled,
}

/// One refresh run as seen by listeners.
///
/// While `on_refresh_started` runs the event is not finalized: it has no
/// status, no stop time and no changes.
#[derive(Clone, Debug)]
pub struct RefreshEvent {
    seq: u64,
    task: Arc<str>,
    trigger: Trigger,
    subscriber: SubscriberId,
    resources: ResourceSet,
    started_at: SystemTime,
    stopped_at: Option<SystemTime>,
    changes: Vec<SyncChange>,
    status: Option<Status>,
}

impl RefreshEvent {
    /// Creates the event of a run that is about to start.
    pub fn start(
        task: impl Into<Arc<str>>,
        trigger: Trigger,
        subscriber: SubscriberId,
        resources: ResourceSet,
    ) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            task: task.into(),
            trigger,
            subscriber,
            resources,
            started_at: SystemTime::now(),
            stopped_at: None,
            changes: Vec::new(),
            status: None,
        }
    }

    /// Finalizes the event with the changes observed and the classified status.
    pub fn finish(mut self, changes: Vec<SyncChange>, status: Status) -> Self {
        let status = match status {
            s @ (Status::Postponed(_) | Status::Cancelled) => {
                self.changes = Vec::new();
                s
            }
            s => {
                self.changes = changes;
                s
            }
        };
        self.stopped_at = Some(SystemTime::now());
        self.status = Some(status);
        self
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Name of the task that produced this event.
    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn trigger(&self) -> Trigger {
        self.trigger
    }

    pub fn subscriber(&self) -> &SubscriberId {
        &self.subscriber
    }

    pub fn resources(&self) -> &ResourceSet {
        &self.resources
    }

    pub fn started_at(&self) -> SystemTime {
        self.started_at
    }

    pub fn stopped_at(&self) -> Option<SystemTime> {
        self.stopped_at
    }

    /// Wall-clock run time, once finalized.
    pub fn elapsed(&self) -> Option<Duration> {
        self.stopped_at
            .and_then(|end| end.duration_since(self.started_at).ok())
    }

    /// Changes newly observed during this run.
    pub fn changes(&self) -> &[SyncChange] {
        &self.changes
    }

    /// Final status; `None` until finalized.
    pub fn status(&self) -> Option<&Status> {
        self.status.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_some()
    }
}
