//! Error types used by the refresh scheduler and by subscribers.
//!
//! This module defines two main error enums:
//!
//! - [`SchedulerError`]: errors raised by the scheduler itself.
//! - [`SyncError`]: errors raised by a [`Subscriber`](crate::Subscriber) refresh.
//!
//! Subscriber errors never escape a refresh task: they are converted into
//! [`Status::Failed`](crate::Status::Failed) and handed to listeners.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by the scheduler.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// Shutdown grace period was exceeded; some tasks did not stop in time.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Names of the tasks that did not stop in time.
        stuck: Vec<String>,
    },

    /// Work was submitted after [`TaskScheduler::shutdown`](crate::TaskScheduler::shutdown).
    #[error("scheduler is shut down")]
    Closed,
}

impl SchedulerError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use refreshvisor::SchedulerError;
    ///
    /// assert_eq!(SchedulerError::Closed.as_label(), "scheduler_closed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            SchedulerError::GraceExceeded { .. } => "scheduler_grace_exceeded",
            SchedulerError::Closed => "scheduler_closed",
        }
    }
}

/// # Errors produced by a subscriber refresh.
///
/// A subscriber reports either a failure carrying a recoverable/unrecoverable
/// severity, or [`SyncError::Canceled`] when it observed the cancellation
/// token and stopped early.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Refresh failed but the next scheduled run may succeed.
    #[error("refresh failed: {message}")]
    Recoverable {
        /// The underlying error message.
        message: String,
    },

    /// Refresh failed and retrying is not expected to help.
    #[error("refresh failed (unrecoverable): {message}")]
    Unrecoverable {
        /// The underlying error message.
        message: String,
    },

    /// Subscriber observed cancellation and stopped.
    #[error("refresh cancelled")]
    Canceled,
}

impl SyncError {
    /// Shorthand for [`SyncError::Recoverable`].
    pub fn recoverable(message: impl Into<String>) -> Self {
        SyncError::Recoverable {
            message: message.into(),
        }
    }

    /// Shorthand for [`SyncError::Unrecoverable`].
    pub fn unrecoverable(message: impl Into<String>) -> Self {
        SyncError::Unrecoverable {
            message: message.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use refreshvisor::SyncError;
    ///
    /// assert_eq!(SyncError::recoverable("io").as_label(), "sync_recoverable");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            SyncError::Recoverable { .. } => "sync_recoverable",
            SyncError::Unrecoverable { .. } => "sync_unrecoverable",
            SyncError::Canceled => "sync_canceled",
        }
    }

    /// Indicates whether a later refresh may succeed.
    ///
    /// `Canceled` counts as recoverable: nothing went wrong with the data.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, SyncError::Unrecoverable { .. })
    }

    /// True if the subscriber stopped because of cancellation.
    pub fn is_canceled(&self) -> bool {
        matches!(self, SyncError::Canceled)
    }
}
