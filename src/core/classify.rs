//! # Status classification.
//!
//! Turns the facts of one refresh run into its [`Status`]:
//!
//! ```text
//! Err(_) && token tripped on blocking  → Postponed(Blocking)
//! Err(Canceled)                        → Cancelled
//! Err(e)                               → Failed(e)
//! Ok && base token cancelled           → Cancelled
//! Ok && counting failed                → Failed
//! Ok → change_count = authoritative out-of-sync count within scope
//!      change_count == 0               → Completed { 0, 0 }
//!      otherwise                       → Completed { change_count, new_change_count }
//! ```
//!
//! `change_count` comes from the collector (post-refresh state) and
//! `new_change_count` from the changes seen during the run. They are
//! independent best-effort counters.

use std::sync::Arc;

use crate::{
    error::SyncError,
    events::{PostponeReason, Status},
    provider::{Depth, Resource, ResourceSet, SyncInfoCollector},
};

/// What happened during one run.
pub(crate) struct RunFacts<'a> {
    pub result: &'a Result<(), SyncError>,
    pub was_blocking: bool,
    pub base_cancelled: bool,
    pub new_changes: usize,
}

/// Classifies a run; `count_out_of_sync` is only queried for successful runs.
pub(crate) fn classify(
    facts: RunFacts<'_>,
    count_out_of_sync: impl FnOnce() -> Result<usize, SyncError>,
) -> Status {
    match facts.result {
        Err(_) if facts.was_blocking => Status::Postponed(PostponeReason::Blocking),
        Err(SyncError::Canceled) => Status::Cancelled,
        Err(e) => Status::Failed(Arc::new(e.clone())),
        Ok(()) if facts.base_cancelled => Status::Cancelled,
        Ok(()) => match count_out_of_sync() {
            Err(e) => Status::Failed(Arc::new(e)),
            Ok(0) => Status::Completed {
                change_count: 0,
                new_change_count: 0,
            },
            Ok(change_count) => Status::Completed {
                change_count,
                new_change_count: facts.new_changes,
            },
        },
    }
}

/// Out-of-sync resources of `collector` covered by `resources` at `depth`.
pub(crate) fn count_out_of_sync(
    collector: &dyn SyncInfoCollector,
    resources: &ResourceSet,
    depth: Depth,
) -> usize {
    collector.count_for(&|r: &Resource| resources.covers(r, depth))
}
