//! # Classified outcome of a refresh run.

use std::sync::Arc;

use crate::error::SyncError;

/// Why a run was postponed rather than executed or failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PostponeReason {
    /// A build was running when the task started.
    BuildConflict,
    /// The refresh blocked other work for longer than the blocking threshold.
    Blocking,
}

/// Terminal status of one refresh run.
///
/// `Postponed` and `Cancelled` never carry change data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Status {
    /// The run was cancelled by the user or by the scheduler.
    Cancelled,
    /// The run yielded to other work and will be retried soon.
    Postponed(PostponeReason),
    /// The subscriber failed; carries the original cause.
    Failed(Arc<SyncError>),
    /// The refresh completed.
    ///
    /// `change_count` is the number of out-of-sync resources within the
    /// refreshed scope after the refresh; `new_change_count` the number of
    /// changes observed during this refresh. Both are best-effort counters.
    Completed {
        change_count: usize,
        new_change_count: usize,
    },
}

impl Status {
    /// `Completed` with no out-of-sync resources at all.
    pub fn is_no_changes(&self) -> bool {
        matches!(self, Status::Completed { change_count: 0, .. })
    }

    pub fn is_postponed(&self) -> bool {
        matches!(self, Status::Postponed(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Status::Cancelled)
    }

    /// The failure cause, if the run failed.
    pub fn error(&self) -> Option<&Arc<SyncError>> {
        match self {
            Status::Failed(e) => Some(e),
            _ => None,
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            Status::Cancelled => "cancelled",
            Status::Postponed(PostponeReason::BuildConflict) => "postponed_build",
            Status::Postponed(PostponeReason::Blocking) => "postponed_blocking",
            Status::Failed(_) => "failed",
            Status::Completed { change_count: 0, .. } => "no_changes",
            Status::Completed { .. } => "completed",
        }
    }
}
